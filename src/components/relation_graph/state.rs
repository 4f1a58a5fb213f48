use std::collections::HashSet;

use log::info;

use super::floating::FloatingAnimator;
use super::interaction::InteractionController;
use super::simulation::{LayoutSimulator, TickOutcome};
use crate::config::EngineConfig;
use crate::error::GraphError;
use crate::model::RelationGraph;

/// Extra hit slop around a node's radius, in layout units.
pub const HIT_PADDING: f64 = 4.0;
const ZOOM_MIN: f64 = 0.25;
const ZOOM_MAX: f64 = 4.0;

/// Screen = graph * `k` + (`x`, `y`).
#[derive(Clone, Debug)]
pub struct ViewTransform {
	#[allow(missing_docs)]
	pub x: f64,
	#[allow(missing_docs)]
	pub y: f64,
	/// Zoom factor.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

/// Background drag in progress.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	#[allow(missing_docs)]
	pub active: bool,
	/// Screen point the pan started at.
	pub start_x: f64,
	#[allow(missing_docs)]
	pub start_y: f64,
	/// Transform offset when the pan started.
	pub transform_start_x: f64,
	#[allow(missing_docs)]
	pub transform_start_y: f64,
}

/// Hovered node, its neighbors, and the fade of their highlight.
#[derive(Clone, Debug, Default)]
pub struct HoverState {
	/// Node under the pointer.
	pub node: Option<usize>,
	/// Nodes sharing an edge with `node`.
	pub neighbors: HashSet<usize>,
	/// Highlight strength, 0 to 1.
	pub highlight_t: f64,
	/// Previously hovered node, kept while its highlight fades out.
	pub prev_node: Option<usize>,
	#[allow(missing_docs)]
	pub prev_neighbors: HashSet<usize>,
	delay_t: f64,
}

/// Everything one graph view needs per frame: layout, idle motion, drag and the camera.
pub struct RelationGraphState {
	#[allow(missing_docs)]
	pub simulator: LayoutSimulator,
	#[allow(missing_docs)]
	pub floating: FloatingAnimator,
	#[allow(missing_docs)]
	pub interaction: InteractionController,
	#[allow(missing_docs)]
	pub transform: ViewTransform,
	#[allow(missing_docs)]
	pub pan: PanState,
	#[allow(missing_docs)]
	pub hover: HoverState,
	/// Viewport width in CSS pixels.
	pub width: f64,
	/// Viewport height in CSS pixels.
	pub height: f64,
	/// Seconds of animation time, used for the edge flow.
	pub flow_time: f64,
	last_time: Option<f64>,
}

impl RelationGraphState {
	/// Lay out the subject and its `display_count` best peers in a `width` x `height` viewport.
	pub fn new(
		graph: &RelationGraph,
		display_count: usize,
		config: &EngineConfig,
		width: f64,
		height: f64,
	) -> Result<Self, GraphError> {
		let shown = graph.top_peers(display_count);
		let mut simulator = LayoutSimulator::new(&shown, config.simulation)?;
		simulator.resize(width, height);
		let floating = FloatingAnimator::new(simulator.nodes(), &config.floating);
		info!(
			"graph view ready: {} of {} peers shown",
			shown.nodes.len().saturating_sub(1),
			graph.nodes.len().saturating_sub(1)
		);

		Ok(Self {
			interaction: InteractionController::new(config.simulation.drag_alpha),
			simulator,
			floating,
			transform: ViewTransform::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			flow_time: 0.0,
			last_time: None,
		})
	}

	/// Undo the view transform.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under the screen point, if any.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.simulator
			.nodes()
			.iter()
			.enumerate()
			.rev()
			.find(|(_, node)| {
				let (dx, dy) = (node.x - gx, node.y - gy);
				(dx * dx + dy * dy).sqrt() < node.radius + HIT_PADDING
			})
			.map(|(index, _)| index)
	}

	/// Hover `node` (or nothing), recomputing its neighbors.
	pub fn set_hover(&mut self, node: Option<usize>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Keep the previous highlight around while it fades out.
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(index) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for &(source, target) in self.simulator.edges() {
				if source == index {
					self.hover.neighbors.insert(target);
				} else if target == index {
					self.hover.neighbors.insert(source);
				}
			}
		}
	}

	/// Whether `index` is hovered, a neighbor of the hovered node, or fading out of either.
	pub fn is_highlighted(&self, index: usize) -> bool {
		self.hover.node == Some(index)
			|| self.hover.neighbors.contains(&index)
			|| self.hover.prev_node == Some(index)
			|| self.hover.prev_neighbors.contains(&index)
	}

	#[allow(missing_docs)]
	pub fn is_hovered(&self, index: usize) -> bool {
		self.hover.node == Some(index) || self.hover.prev_node == Some(index)
	}

	#[allow(missing_docs)]
	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Advance one frame. `time` is a monotonic timestamp in milliseconds.
	///
	/// The simulator owns the layout while it runs; once it settles the floating animator takes
	/// over until the next drag.
	pub fn tick(&mut self, time: f64) {
		let dt = self
			.last_time
			.map_or(0.0, |last| ((time - last) / 1000.0).clamp(0.0, 0.1));
		self.last_time = Some(time);
		self.flow_time += dt;

		match self.simulator.tick() {
			TickOutcome::Settled => self.floating.start(),
			TickOutcome::Running => {}
			TickOutcome::Idle => self.floating.tick(time / 1000.0, self.simulator.nodes_mut()),
		}

		self.step_highlight(dt);
	}

	fn step_highlight(&mut self, dt: f64) {
		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	/// New viewport size. The layout follows the viewport center.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.simulator.resize(width, height);
	}

	/// Pointer pressed at a screen point: grab the node under it or start panning.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if let Some(index) = self.node_at_position(sx, sy) {
			let pointer = self.screen_to_graph(sx, sy);
			self.interaction
				.begin_drag(&mut self.simulator, &mut self.floating, index, pointer);
			self.set_hover(Some(index));
		} else {
			self.pan = PanState {
				active: true,
				start_x: sx,
				start_y: sy,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	/// Drag the held node, pan, or update hover, depending on what the pointer is doing.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if self.interaction.dragged().is_some() {
			let pointer = self.screen_to_graph(sx, sy);
			self.interaction.drag_to(&mut self.simulator, pointer);
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		} else {
			let hovered = self.node_at_position(sx, sy);
			self.set_hover(hovered);
		}
	}

	/// End any drag or pan.
	pub fn pointer_up(&mut self) {
		self.interaction
			.end_drag(&mut self.simulator, &mut self.floating);
		self.pan.active = false;
	}

	/// Pointer left the canvas: like [`pointer_up`](Self::pointer_up), and clear hover.
	pub fn pointer_leave(&mut self) {
		self.pointer_up();
		self.set_hover(None);
	}

	/// Zoom by `factor` keeping the screen point under the cursor fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let k = (self.transform.k * factor).clamp(ZOOM_MIN, ZOOM_MAX);
		let ratio = k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = k;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::FloatingConfig;
	use crate::model::RelationshipCategory::*;
	use crate::model::tests::sample_graph;

	fn state() -> RelationGraphState {
		let graph = sample_graph(&[
			("ann", 90, Core),
			("bob", 70, Collaboration),
			("cy", 50, Networking),
			("dee", 30, New),
			("eve", 10, Dormant),
		]);
		RelationGraphState::new(&graph, 4, &EngineConfig::default(), 800.0, 600.0).unwrap()
	}

	fn run_to_settle(state: &mut RelationGraphState, from: f64) -> f64 {
		let mut time = from;
		while state.simulator.is_running() {
			time += 16.0;
			state.tick(time);
			assert!(time < from + 16.0 * 2_000.0, "never settled");
		}
		time
	}

	#[test]
	fn shows_only_the_top_peers() {
		let state = state();
		assert_eq!(state.simulator.nodes().len(), 5);
		assert!(state.simulator.node_index("eve").is_none());
		assert_eq!(state.simulator.center(), (400.0, 300.0));
	}

	#[test]
	fn floating_takes_over_at_settle() {
		let mut state = state();
		state.tick(0.0);
		assert!(!state.floating.is_running());
		let time = run_to_settle(&mut state, 0.0);
		assert!(state.floating.is_running());

		let index = state.simulator.node_index("bob").unwrap();
		let rest = state.simulator.nodes()[index].rest.unwrap();
		state.tick(time + 500.0);
		let node = &state.simulator.nodes()[index];
		let (dx, dy) = (node.x - rest.0, node.y - rest.1);
		assert!(dx.abs() <= 6.0 && dy.abs() <= 6.0 * 0.8);
	}

	#[test]
	fn dragging_a_node_pins_it_where_it_was_dropped() {
		let mut state = state();
		let time = run_to_settle(&mut state, 0.0);
		let index = state.simulator.node_index("cy").unwrap();
		let node = &state.simulator.nodes()[index];
		let (sx, sy) = (node.x, node.y);

		state.pointer_down(sx, sy);
		assert_eq!(state.interaction.dragged(), Some(index));
		assert!(!state.floating.is_running());
		assert!(state.simulator.is_running());
		state.pointer_move(sx + 30.0, sy - 20.0);
		state.tick(time + 16.0);
		assert_eq!(
			state.simulator.nodes()[index].fixed,
			Some((sx + 30.0, sy - 20.0))
		);

		state.pointer_up();
		assert_eq!(state.simulator.nodes()[index].fixed, None);
		run_to_settle(&mut state, time + 16.0);
		let node = &state.simulator.nodes()[index];
		assert!(node.pinned);
		assert_eq!(node.rest, Some((node.x, node.y)));
		assert!(state.floating.is_running());
	}

	#[test]
	fn released_node_does_not_jump_when_floating_takes_over() {
		let mut state = state();
		let mut time = run_to_settle(&mut state, 0.0);
		let index = state.simulator.node_index("ann").unwrap();
		let node = &state.simulator.nodes()[index];
		let (sx, sy) = (node.x, node.y);

		// Drop far outside the link distance so the spring pulls the node back after release.
		state.pointer_down(sx, sy);
		for _ in 0..10 {
			time += 16.0;
			state.pointer_move(sx - 150.0, sy + 120.0);
			state.tick(time);
		}
		state.pointer_up();
		let settle_time = run_to_settle(&mut state, time);
		let node = &state.simulator.nodes()[index];
		let settled = (node.x, node.y);
		let drop = (sx - 150.0, sy + 120.0);
		assert!((settled.0 - drop.0).hypot(settled.1 - drop.1) > 20.0);

		state.tick(settle_time + 16.0);
		let node = &state.simulator.nodes()[index];
		let amplitude = FloatingConfig::default().amplitude_max;
		assert!((node.x - settled.0).abs() <= amplitude);
		assert!((node.y - settled.1).abs() <= amplitude * 0.8);
	}

	#[test]
	fn background_drag_pans_and_wheel_zooms_around_the_cursor() {
		let mut state = state();
		state.pointer_down(5.0, 5.0);
		state.pointer_move(25.0, 15.0);
		state.pointer_up();
		assert_eq!((state.transform.x, state.transform.y), (20.0, 10.0));

		let before = state.screen_to_graph(300.0, 200.0);
		state.zoom_at(300.0, 200.0, 2.0);
		let after = state.screen_to_graph(300.0, 200.0);
		assert!((before.0 - after.0).abs() < 1e-9 && (before.1 - after.1).abs() < 1e-9);
		state.zoom_at(0.0, 0.0, 100.0);
		assert_eq!(state.transform.k, ZOOM_MAX);
	}

	#[test]
	fn hover_highlights_neighbors() {
		let mut state = state();
		let subject = state.simulator.node_index("me").unwrap();
		let ann = state.simulator.node_index("ann").unwrap();
		state.set_hover(Some(ann));
		assert!(state.is_hovered(ann));
		assert!(state.is_highlighted(subject));
		state.set_hover(None);
		assert!(state.has_active_highlight());
		assert_eq!(state.hover.prev_node, Some(ann));
	}
}
