//! Drag lifecycle of a single node.

use log::debug;

use super::floating::FloatingAnimator;
use super::simulation::LayoutSimulator;

/// Commands a drag issues to the layout.
pub trait DragTarget {
	/// Current position of node `index`, or `None` if there is no such node.
	fn position(&self, index: usize) -> Option<(f64, f64)>;
	/// Hold node `index` at `(x, y)`.
	fn pin(&mut self, index: usize, x: f64, y: f64);
	/// Let node `index` move again.
	fn unpin(&mut self, index: usize);
	/// Position node `index` floats around.
	fn set_rest(&mut self, index: usize, x: f64, y: f64);
	/// Reheat the layout to `alpha`.
	fn restart(&mut self, alpha: f64);
	/// Alpha the layout decays towards.
	fn set_alpha_target(&mut self, target: f64);
	/// Whether the layout is still moving.
	fn is_running(&self) -> bool;
}

impl DragTarget for LayoutSimulator {
	fn position(&self, index: usize) -> Option<(f64, f64)> {
		self.nodes().get(index).map(|node| (node.x, node.y))
	}

	fn pin(&mut self, index: usize, x: f64, y: f64) {
		LayoutSimulator::pin(self, index, x, y);
	}

	fn unpin(&mut self, index: usize) {
		LayoutSimulator::unpin(self, index);
	}

	fn set_rest(&mut self, index: usize, x: f64, y: f64) {
		LayoutSimulator::set_rest(self, index, x, y);
	}

	fn restart(&mut self, alpha: f64) {
		LayoutSimulator::restart(self, alpha);
	}

	fn set_alpha_target(&mut self, target: f64) {
		LayoutSimulator::set_alpha_target(self, target);
	}

	fn is_running(&self) -> bool {
		LayoutSimulator::is_running(self)
	}
}

/// Where a drag gesture stands.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum DragState {
	/// No node is held.
	#[default]
	Idle,
	/// Node `index` follows the pointer.
	Dragging {
		#[allow(missing_docs)]
		index: usize,
		/// Node position minus pointer position at grab time.
		offset: (f64, f64),
		/// Last position the node was pinned at.
		last: (f64, f64),
	},
}

/// Turns pointer gestures into layout commands. Holds at most one node at a time.
#[derive(Debug)]
pub struct InteractionController {
	state: DragState,
	drag_alpha: f64,
}

impl InteractionController {
	/// `drag_alpha` is the heat the layout is kept at while a node is held.
	pub fn new(drag_alpha: f64) -> Self {
		Self {
			state: DragState::Idle,
			drag_alpha,
		}
	}

	#[allow(missing_docs)]
	pub fn state(&self) -> DragState {
		self.state
	}

	/// Index of the held node.
	pub fn dragged(&self) -> Option<usize> {
		match self.state {
			DragState::Dragging { index, .. } => Some(index),
			DragState::Idle => None,
		}
	}

	/// Grab node `index` with the pointer at `pointer` (layout coordinates). Returns `false` when
	/// a node is already held or `index` is unknown.
	pub fn begin_drag(
		&mut self,
		target: &mut impl DragTarget,
		animator: &mut FloatingAnimator,
		index: usize,
		pointer: (f64, f64),
	) -> bool {
		if self.dragged().is_some() {
			return false;
		}
		let Some((x, y)) = target.position(index) else {
			return false;
		};

		animator.stop();
		target.pin(index, x, y);
		target.restart(self.drag_alpha);
		target.set_alpha_target(self.drag_alpha);
		self.state = DragState::Dragging {
			index,
			offset: (x - pointer.0, y - pointer.1),
			last: (x, y),
		};
		debug!("drag started on node {index}");
		true
	}

	/// Move the held node with the pointer, keeping the grab offset.
	pub fn drag_to(&mut self, target: &mut impl DragTarget, pointer: (f64, f64)) {
		let DragState::Dragging { index, offset, .. } = self.state else {
			return;
		};
		let position = (pointer.0 + offset.0, pointer.1 + offset.1);
		target.pin(index, position.0, position.1);
		self.state = DragState::Dragging {
			index,
			offset,
			last: position,
		};
	}

	/// Release the held node where it was dropped. The layout cools down and takes its rest
	/// position from where it settles. Floating resumes at that settle, or right away when the
	/// layout is already at rest.
	pub fn end_drag(&mut self, target: &mut impl DragTarget, animator: &mut FloatingAnimator) {
		let DragState::Dragging { index, last, .. } = self.state else {
			return;
		};
		self.state = DragState::Idle;

		target.unpin(index);
		target.set_rest(index, last.0, last.1);
		target.set_alpha_target(0.0);
		if !target.is_running() {
			animator.start();
		}
		debug!("drag ended on node {index} at ({:.1}, {:.1})", last.0, last.1);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{FloatingConfig, SimulationConfig};
	use crate::model::RelationshipCategory::*;
	use crate::model::tests::sample_graph;

	#[derive(Default)]
	struct Recorder {
		calls: Vec<String>,
		running: bool,
	}

	impl DragTarget for Recorder {
		fn position(&self, index: usize) -> Option<(f64, f64)> {
			(index < 3).then_some((10.0, 20.0))
		}

		fn pin(&mut self, index: usize, x: f64, y: f64) {
			self.calls.push(format!("pin {index} {x} {y}"));
		}

		fn unpin(&mut self, index: usize) {
			self.calls.push(format!("unpin {index}"));
		}

		fn set_rest(&mut self, index: usize, x: f64, y: f64) {
			self.calls.push(format!("rest {index} {x} {y}"));
		}

		fn restart(&mut self, alpha: f64) {
			self.running = true;
			self.calls.push(format!("restart {alpha}"));
		}

		fn set_alpha_target(&mut self, target: f64) {
			self.calls.push(format!("target {target}"));
		}

		fn is_running(&self) -> bool {
			self.running
		}
	}

	fn animator() -> FloatingAnimator {
		FloatingAnimator::new(&[], &FloatingConfig::default())
	}

	#[test]
	fn drag_issues_pin_restart_and_release_commands() {
		let mut target = Recorder::default();
		let mut floating = animator();
		floating.start();
		let mut drag = InteractionController::new(0.3);

		assert!(drag.begin_drag(&mut target, &mut floating, 1, (12.0, 18.0)));
		assert!(!floating.is_running());
		assert!(!drag.begin_drag(&mut target, &mut floating, 2, (0.0, 0.0)));
		drag.drag_to(&mut target, (40.0, 50.0));
		drag.end_drag(&mut target, &mut floating);

		assert_eq!(
			target.calls,
			[
				"pin 1 10 20",
				"restart 0.3",
				"target 0.3",
				"pin 1 38 52",
				"unpin 1",
				"rest 1 38 52",
				"target 0",
			]
		);
		assert_eq!(drag.state(), DragState::Idle);
		// Still running, so floating waits for the settle.
		assert!(!floating.is_running());
	}

	#[test]
	fn release_on_an_idle_layout_resumes_floating() {
		let mut target = Recorder::default();
		let mut floating = animator();
		let mut drag = InteractionController::new(0.3);
		drag.begin_drag(&mut target, &mut floating, 0, (10.0, 20.0));
		target.running = false;
		drag.end_drag(&mut target, &mut floating);
		assert!(floating.is_running());
	}

	#[test]
	fn unknown_node_is_not_grabbed() {
		let mut target = Recorder::default();
		let mut drag = InteractionController::new(0.3);
		assert!(!drag.begin_drag(&mut target, &mut animator(), 7, (0.0, 0.0)));
		assert!(target.calls.is_empty());
		drag.end_drag(&mut target, &mut animator());
		assert!(target.calls.is_empty());
	}

	#[test]
	fn released_node_stays_pinned_and_out_of_its_sector() {
		let graph = sample_graph(&[("ann", 90, Core), ("bob", 60, Core), ("cy", 30, Networking)]);
		let mut sim = LayoutSimulator::new(&graph, SimulationConfig::default()).unwrap();
		sim.run_until_settled(2_000).expect("settles");
		let mut floating = FloatingAnimator::new(sim.nodes(), &FloatingConfig::default());
		let mut drag = InteractionController::new(sim.config().drag_alpha);

		// Core sits at angle zero; drop ann on the opposite side of the subject.
		let index = sim.node_index("ann").unwrap();
		let (x, y) = (sim.nodes()[index].x, sim.nodes()[index].y);
		let drop = (sim.center().0 - 120.0, sim.center().1);
		assert!(drag.begin_drag(&mut sim, &mut floating, index, (x, y)));
		for _ in 0..20 {
			drag.drag_to(&mut sim, drop);
			sim.tick();
		}
		drag.end_drag(&mut sim, &mut floating);
		assert_eq!(sim.nodes()[index].fixed, None);

		sim.run_until_settled(2_000).expect("settles");
		let node = &sim.nodes()[index];
		assert!(node.pinned);
		assert_eq!(node.rest, Some((node.x, node.y)));
		// No clustering pull back towards angle zero: it stays on the far side.
		assert!(node.x < sim.center().0);
	}
}
