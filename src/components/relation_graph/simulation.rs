use std::collections::HashMap;

use log::debug;

use super::forces;
use super::scale::{SUBJECT_RADIUS, link_distance, peer_radius};
use crate::config::SimulationConfig;
use crate::error::GraphError;
use crate::model::{Grade, NodeKind, RelationGraph, RelationshipCategory};
use crate::util::SeededRng;

/// Largest angular offset from its sector center a peer starts at.
const INITIAL_ANGLE_JITTER: f64 = 0.35;

/// A node as the simulator sees it: graph attributes plus kinematic state.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutNode {
	/// Id of the graph node this was built from.
	pub id: String,
	/// Display name.
	pub label: String,
	/// Subject or peer.
	pub kind: NodeKind,
	/// Relationship category. Always `None` for the subject.
	pub category: Option<RelationshipCategory>,
	/// Relationship score, 0 when the payload had none.
	pub score: u8,
	/// Grade from the payload, or banded from the score.
	pub grade: Option<Grade>,
	/// Drawn and collision radius.
	pub radius: f64,
	/// Rest length of the link to the subject. Zero for the subject itself.
	pub link_distance: f64,
	#[allow(missing_docs)]
	pub x: f64,
	#[allow(missing_docs)]
	pub y: f64,
	#[allow(missing_docs)]
	pub vx: f64,
	#[allow(missing_docs)]
	pub vy: f64,
	/// Position forced by a drag, or the subject's anchor; overrides all forces while set.
	pub fixed: Option<(f64, f64)>,
	/// Resting position the floating animator drifts around.
	pub rest: Option<(f64, f64)>,
	/// Set once the user has dragged the node. Never cleared.
	pub pinned: bool,
}

impl LayoutNode {
	/// Whether this is the centre of the graph.
	pub fn is_subject(&self) -> bool {
		self.kind == NodeKind::Subject
	}
}

#[derive(Clone, Debug)]
pub(super) struct Link {
	pub(super) source: usize,
	pub(super) target: usize,
	pub(super) distance: f64,
	pub(super) strength: f64,
	pub(super) bias: f64,
}

/// Result of one simulation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
	/// The simulation is stopped; nothing moved.
	Idle,
	/// Forces were applied.
	Running,
	/// Alpha fell below its floor on this tick; rest positions were captured.
	Settled,
}

/// Force-directed layout of a subject-centred graph around a movable viewport center.
pub struct LayoutSimulator {
	config: SimulationConfig,
	nodes: Vec<LayoutNode>,
	links: Vec<Link>,
	edges: Vec<(usize, usize)>,
	index_by_id: HashMap<String, usize>,
	center: (f64, f64),
	subject: Option<usize>,
	alpha: f64,
	alpha_target: f64,
	running: bool,
	ticks: u64,
	rng: SeededRng,
}

impl LayoutSimulator {
	/// Validate `graph` and place the subject at the center with every peer in its category
	/// wedge at its link distance. The simulation starts hot.
	pub fn new(graph: &RelationGraph, config: SimulationConfig) -> Result<Self, GraphError> {
		graph.validate()?;
		let center = (0.0, 0.0);

		let nodes = graph
			.nodes
			.iter()
			.map(|node| {
				let score = node.score_or_zero();
				let (radius, distance) = if node.is_subject() {
					(SUBJECT_RADIUS, 0.0)
				} else {
					(
						peer_radius(score),
						link_distance(score, config.min_link_distance, config.max_link_distance),
					)
				};
				let (x, y) = match node.relationship_category {
					Some(category) if !node.is_subject() => {
						let mut rng = SeededRng::for_id(&node.id);
						let angle = category.target_angle()
							+ rng.range(-INITIAL_ANGLE_JITTER, INITIAL_ANGLE_JITTER);
						(
							center.0 + angle.cos() * distance,
							center.1 + angle.sin() * distance,
						)
					}
					_ => center,
				};
				LayoutNode {
					id: node.id.clone(),
					label: node.label.clone(),
					kind: node.kind,
					category: node.relationship_category.filter(|_| !node.is_subject()),
					score,
					grade: node.effective_grade(),
					radius,
					link_distance: distance,
					x,
					y,
					vx: 0.0,
					vy: 0.0,
					fixed: node.is_subject().then_some(center),
					rest: None,
					pinned: false,
				}
			})
			.collect::<Vec<_>>();
		let subject = nodes.iter().position(LayoutNode::is_subject);

		let index_by_id = nodes
			.iter()
			.enumerate()
			.map(|(index, node)| (node.id.clone(), index))
			.collect::<HashMap<_, _>>();

		let mut edges = graph
			.edges
			.iter()
			.filter_map(|edge| {
				let source = *index_by_id.get(&edge.source)?;
				let target = *index_by_id.get(&edge.target)?;
				(source != target).then_some((source, target))
			})
			.collect::<Vec<_>>();
		edges.sort_unstable();
		edges.dedup();

		let mut degree = vec![0usize; nodes.len()];
		for &(source, target) in &edges {
			degree[source] += 1;
			degree[target] += 1;
		}
		let links = edges
			.iter()
			.map(|&(source, target)| {
				let (source_degree, target_degree) = (degree[source] as f64, degree[target] as f64);
				// The peer end carries the rest distance; a subject-to-subject edge cannot exist.
				let peer = if nodes[target].is_subject() {
					source
				} else {
					target
				};
				Link {
					source,
					target,
					distance: nodes[peer].link_distance,
					strength: config.link_strength / source_degree.min(target_degree),
					bias: source_degree / (source_degree + target_degree),
				}
			})
			.collect();

		debug!(
			"layout built: {} nodes, {} links",
			nodes.len(),
			edges.len()
		);

		Ok(Self {
			config,
			nodes,
			links,
			edges,
			index_by_id,
			center,
			subject,
			alpha: config.alpha_start,
			alpha_target: 0.0,
			running: true,
			ticks: 0,
			rng: SeededRng::new(0x5eed),
		})
	}

	/// Nodes in graph order.
	pub fn nodes(&self) -> &[LayoutNode] {
		&self.nodes
	}

	/// `(source, target)` node indices. Positions are always read from `nodes`.
	pub fn edges(&self) -> &[(usize, usize)] {
		&self.edges
	}

	/// Index of the node with `id` in [`nodes`](Self::nodes).
	pub fn node_index(&self, id: &str) -> Option<usize> {
		self.index_by_id.get(id).copied()
	}

	/// Layout center: the middle of the viewport.
	pub fn center(&self) -> (f64, f64) {
		self.center
	}

	#[allow(missing_docs)]
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Whether ticks still apply forces.
	pub fn is_running(&self) -> bool {
		self.running
	}

	#[allow(missing_docs)]
	pub fn config(&self) -> &SimulationConfig {
		&self.config
	}

	/// Reheat to `alpha` and resume ticking.
	pub fn restart(&mut self, alpha: f64) {
		self.alpha = alpha;
		self.running = true;
	}

	/// Alpha the schedule decays towards. A non-zero target keeps the simulation warm.
	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target;
	}

	/// Hold node `index` at `(x, y)` and mark it permanently pinned.
	pub fn pin(&mut self, index: usize, x: f64, y: f64) {
		if let Some(node) = self.nodes.get_mut(index) {
			node.fixed = Some((x, y));
			node.pinned = true;
			node.x = x;
			node.y = y;
			node.vx = 0.0;
			node.vy = 0.0;
		}
	}

	/// Release the fixed position of node `index`. The pinned mark stays. The subject is never
	/// released; it stays anchored where it was dropped.
	pub fn unpin(&mut self, index: usize) {
		if let Some(node) = self.nodes.get_mut(index) {
			node.fixed = node.is_subject().then_some((node.x, node.y));
		}
	}

	/// Move the layout center to the middle of a `width` x `height` viewport. Every position is
	/// translated with it so the current layout is kept.
	pub fn resize(&mut self, width: f64, height: f64) {
		let center = (width / 2.0, height / 2.0);
		let (dx, dy) = (center.0 - self.center.0, center.1 - self.center.1);
		if dx == 0.0 && dy == 0.0 {
			return;
		}
		let shift = |point: &mut Option<(f64, f64)>| {
			if let Some((x, y)) = point {
				*x += dx;
				*y += dy;
			}
		};
		for node in &mut self.nodes {
			node.x += dx;
			node.y += dy;
			shift(&mut node.fixed);
			shift(&mut node.rest);
		}
		self.center = center;
	}

	/// Set the position node `index` floats around until the next settle recaptures it.
	pub fn set_rest(&mut self, index: usize, x: f64, y: f64) {
		if let Some(node) = self.nodes.get_mut(index) {
			node.rest = Some((x, y));
		}
	}

	pub(super) fn nodes_mut(&mut self) -> &mut [LayoutNode] {
		&mut self.nodes
	}

	/// Advance one step. Returns [`TickOutcome::Settled`] exactly once per run, on the tick alpha
	/// drops below its floor.
	pub fn tick(&mut self) -> TickOutcome {
		if !self.running {
			return TickOutcome::Idle;
		}

		let config = self.config;
		self.alpha += (self.alpha_target - self.alpha) * config.alpha_decay;
		let alpha = self.alpha;

		forces::apply_links(&mut self.nodes, &self.links, alpha, &mut self.rng);
		forces::apply_many_body(
			&mut self.nodes,
			config.charge_strength,
			config.charge_distance_min,
			alpha,
			&mut self.rng,
		);
		forces::apply_centering(&mut self.nodes, self.center, config.center_strength, alpha);
		forces::apply_collision(
			&mut self.nodes,
			config.collision_padding,
			config.collision_strength,
			&mut self.rng,
		);
		let anchor = self
			.subject
			.map_or(self.center, |index| (self.nodes[index].x, self.nodes[index].y));
		forces::apply_clustering(&mut self.nodes, anchor, config.cluster_gain, alpha);

		let retain = 1.0 - config.velocity_decay;
		for node in &mut self.nodes {
			if let Some((x, y)) = node.fixed {
				node.x = x;
				node.y = y;
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx *= retain;
			node.vy *= retain;
			node.x += node.vx;
			node.y += node.vy;
		}
		self.ticks += 1;

		if self.alpha < config.alpha_min {
			self.running = false;
			self.capture_rest();
			debug!("layout settled after {} ticks", self.ticks);
			return TickOutcome::Settled;
		}
		TickOutcome::Running
	}

	/// Tick until settled. Returns the number of ticks taken, or `None` if `max_ticks` ran out.
	pub fn run_until_settled(&mut self, max_ticks: usize) -> Option<usize> {
		for count in 1..=max_ticks {
			match self.tick() {
				TickOutcome::Settled => return Some(count),
				TickOutcome::Idle => return None,
				TickOutcome::Running => {}
			}
		}
		None
	}

	/// Every peer rests where it settled, dragged ones included, so floating starts from the
	/// position on screen.
	fn capture_rest(&mut self) {
		for node in &mut self.nodes {
			if !node.is_subject() {
				node.rest = Some((node.x, node.y));
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::f64::consts::PI;

	use super::*;
	use crate::model::tests::sample_graph;
	use crate::model::{GraphEdge, RelationshipCategory::*};

	// Half a sector plus slack for same-wedge repulsion.
	const SECTOR_TOLERANCE: f64 = PI / 6.0 + 0.35;

	fn twelve_peers() -> RelationGraph {
		sample_graph(&[
			("a1", 95, Core),
			("a2", 40, Core),
			("b1", 85, Collaboration),
			("b2", 30, Collaboration),
			("c1", 75, Networking),
			("c2", 20, Networking),
			("d1", 65, New),
			("d2", 10, New),
			("e1", 55, Personal),
			("e2", 5, Personal),
			("f1", 45, Dormant),
			("f2", 0, Dormant),
		])
	}

	fn angular_error(node: &LayoutNode, center: (f64, f64)) -> f64 {
		let angle = (node.y - center.1).atan2(node.x - center.0);
		let target = node.category.expect("peer").target_angle();
		forces::wrap_angle(target - angle).abs()
	}

	fn assert_clustered(sim: &LayoutSimulator) {
		for node in sim.nodes().iter().filter(|node| !node.is_subject() && !node.pinned) {
			let error = angular_error(node, sim.center());
			assert!(
				error <= SECTOR_TOLERANCE,
				"{} is {error:.3} rad from its sector",
				node.id
			);
		}
	}

	#[test]
	fn settles_into_category_sectors() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		let ticks = sim.run_until_settled(2_000).expect("settles");
		assert!(ticks <= 310, "took {ticks} ticks");
		assert!(!sim.is_running());
		assert_clustered(&sim);
	}

	#[test]
	fn rotated_layout_sorts_itself_back() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		sim.run_until_settled(2_000).expect("settles");

		let (sin, cos) = (100f64.to_radians().sin(), 100f64.to_radians().cos());
		for node in sim.nodes_mut() {
			let (x, y) = (node.x, node.y);
			node.x = x * cos - y * sin;
			node.y = x * sin + y * cos;
		}
		sim.restart(1.0);
		sim.run_until_settled(2_000).expect("settles again");
		assert_clustered(&sim);
	}

	#[test]
	fn higher_scores_settle_closer_to_the_subject() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		sim.run_until_settled(2_000).expect("settles");
		let subject = &sim.nodes()[0];
		let distance = |id: &str| {
			let node = &sim.nodes()[sim.node_index(id).unwrap()];
			((node.x - subject.x).powi(2) + (node.y - subject.y).powi(2)).sqrt()
		};
		assert!(distance("a1") < distance("a2"));
		assert!(distance("b1") < distance("b2"));
	}

	#[test]
	fn settle_captures_rest_positions_for_peers_only() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		assert!(sim.nodes().iter().all(|node| node.rest.is_none()));
		sim.run_until_settled(2_000).expect("settles");
		for node in sim.nodes() {
			if node.is_subject() {
				assert_eq!(node.rest, None);
			} else {
				assert_eq!(node.rest, Some((node.x, node.y)));
			}
		}
		assert_eq!(sim.tick(), TickOutcome::Idle);
	}

	#[test]
	fn pinned_node_holds_its_fixed_position() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		let index = sim.node_index("c1").unwrap();
		sim.pin(index, -40.0, 25.0);
		for _ in 0..50 {
			sim.tick();
		}
		let node = &sim.nodes()[index];
		assert_eq!((node.x, node.y), (-40.0, 25.0));
		assert!(node.pinned);

		sim.unpin(index);
		sim.set_rest(index, -40.0, 25.0);
		sim.run_until_settled(2_000).expect("settles");
		let node = &sim.nodes()[index];
		assert!(node.pinned && node.fixed.is_none());
		// Released nodes rest where they settled, not where they were dropped.
		assert_eq!(node.rest, Some((node.x, node.y)));
	}

	#[test]
	fn subject_stays_anchored_at_the_center() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		let subject = sim.node_index("me").unwrap();
		sim.run_until_settled(2_000).expect("settles");
		let node = &sim.nodes()[subject];
		assert_eq!((node.x, node.y), sim.center());

		sim.pin(subject, 30.0, -20.0);
		sim.unpin(subject);
		sim.restart(0.3);
		sim.run_until_settled(2_000).expect("settles");
		let node = &sim.nodes()[subject];
		assert_eq!(node.fixed, Some((30.0, -20.0)));
		assert_eq!((node.x, node.y), (30.0, -20.0));
	}

	#[test]
	fn warm_alpha_target_keeps_the_simulation_running() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		sim.set_alpha_target(0.3);
		assert_eq!(sim.run_until_settled(1_000), None);
		assert!(sim.alpha() > 0.29);
		sim.set_alpha_target(0.0);
		assert!(sim.run_until_settled(1_000).is_some());
	}

	#[test]
	fn resize_moves_the_center_and_keeps_the_layout() {
		let mut sim = LayoutSimulator::new(&twelve_peers(), SimulationConfig::default()).unwrap();
		sim.run_until_settled(2_000).expect("settles");
		let before = sim.nodes().to_vec();
		sim.resize(800.0, 600.0);
		assert_eq!(sim.center(), (400.0, 300.0));
		for (old, new) in before.iter().zip(sim.nodes()) {
			assert!((new.x - old.x - 400.0).abs() < 1e-9);
			assert!((new.y - old.y - 300.0).abs() < 1e-9);
		}
		assert_clustered(&sim);
	}

	#[test]
	fn invalid_graphs_are_rejected() {
		let mut graph = twelve_peers();
		graph.edges.push(GraphEdge {
			source: "me".to_owned(),
			target: "nobody".to_owned(),
		});
		assert!(matches!(
			LayoutSimulator::new(&graph, SimulationConfig::default()),
			Err(GraphError::DanglingEdge { .. })
		));
	}
}
