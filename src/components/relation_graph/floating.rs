//! Idle drift of settled peers around their rest positions.

use std::collections::HashMap;
use std::f64::consts::TAU;

use log::debug;

use super::simulation::LayoutNode;
use crate::config::FloatingConfig;
use crate::util::SeededRng;

/// Per-node motion parameters, fixed for the lifetime of a graph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatParams {
	/// Radians, in `[0, 2π)`.
	pub phase: f64,
	/// Radians per second.
	pub speed: f64,
	/// Horizontal reach in layout units; vertical reach is 0.8 of it.
	pub amplitude: f64,
}

impl FloatParams {
	/// Parameters drawn from a generator keyed by `id`, so a node drifts the same way on every load.
	pub fn seeded(id: &str, config: &FloatingConfig) -> Self {
		let mut rng = SeededRng::for_id(id);
		Self {
			phase: rng.range(0.0, TAU),
			speed: rng.range(config.speed_min, config.speed_max),
			amplitude: rng.range(config.amplitude_min, config.amplitude_max),
		}
	}
}

/// Offset from the rest position at time `t` (seconds).
pub fn displacement(params: &FloatParams, t: f64) -> (f64, f64) {
	let FloatParams {
		phase,
		speed,
		amplitude,
	} = *params;
	(
		amplitude * (t * speed + phase).sin(),
		amplitude * (t * speed * 0.7 + phase * 1.3).cos() * 0.8,
	)
}

/// Drives the idle drift once the layout has settled.
pub struct FloatingAnimator {
	params: HashMap<String, FloatParams>,
	running: bool,
}

impl FloatingAnimator {
	/// Seed parameters for every peer in `nodes`. Starts stopped.
	pub fn new(nodes: &[LayoutNode], config: &FloatingConfig) -> Self {
		let params = nodes
			.iter()
			.filter(|node| !node.is_subject())
			.map(|node| (node.id.clone(), FloatParams::seeded(&node.id, config)))
			.collect();
		Self {
			params,
			running: false,
		}
	}

	#[allow(missing_docs)]
	pub fn start(&mut self) {
		if !self.running {
			debug!("floating started for {} nodes", self.params.len());
		}
		self.running = true;
	}

	#[allow(missing_docs)]
	pub fn stop(&mut self) {
		self.running = false;
	}

	#[allow(missing_docs)]
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Parameters of the peer with `id`. `None` for the subject.
	pub fn params(&self, id: &str) -> Option<&FloatParams> {
		self.params.get(id)
	}

	/// Place every eligible node at its rest position plus the drift at time `t`. Nodes being
	/// dragged or without a rest position are left alone.
	pub fn tick(&self, t: f64, nodes: &mut [LayoutNode]) {
		if !self.running {
			return;
		}
		for node in nodes {
			if node.is_subject() || node.fixed.is_some() {
				continue;
			}
			let (Some((base_x, base_y)), Some(params)) = (node.rest, self.params.get(&node.id))
			else {
				continue;
			};
			let (dx, dy) = displacement(params, t);
			node.x = base_x + dx;
			node.y = base_y + dy;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::SimulationConfig;
	use crate::model::RelationshipCategory::*;
	use crate::model::tests::sample_graph;
	use crate::components::relation_graph::simulation::LayoutSimulator;

	fn settled() -> LayoutSimulator {
		let graph = sample_graph(&[("ann", 90, Core), ("bob", 40, Personal), ("cy", 10, Dormant)]);
		let mut sim = LayoutSimulator::new(&graph, SimulationConfig::default()).unwrap();
		sim.run_until_settled(2_000).expect("settles");
		sim
	}

	#[test]
	fn displacement_stays_within_amplitude_per_axis() {
		let config = FloatingConfig::default();
		for id in ["ann", "bob", "cy", "a-much-longer-node-id"] {
			let params = FloatParams::seeded(id, &config);
			assert!(params.amplitude >= config.amplitude_min && params.amplitude < config.amplitude_max);
			assert!(params.speed >= config.speed_min && params.speed < config.speed_max);
			for step in 0..2_000 {
				let (dx, dy) = displacement(&params, f64::from(step) * 0.05);
				assert!(dx.abs() <= params.amplitude);
				assert!(dy.abs() <= params.amplitude * 0.8);
			}
		}
	}

	#[test]
	fn parameters_are_deterministic_per_id() {
		let config = FloatingConfig::default();
		assert_eq!(FloatParams::seeded("ann", &config), FloatParams::seeded("ann", &config));
		assert_ne!(FloatParams::seeded("ann", &config), FloatParams::seeded("bob", &config));
	}

	#[test]
	fn tick_moves_peers_around_rest_and_skips_the_rest() {
		let mut sim = settled();
		let mut animator = FloatingAnimator::new(sim.nodes(), &FloatingConfig::default());
		let subject_before = (sim.nodes()[0].x, sim.nodes()[0].y);
		let dragged = sim.node_index("bob").unwrap();
		sim.pin(dragged, 12.0, 34.0);

		let before = sim.nodes().to_vec();
		animator.tick(3.0, sim.nodes_mut());
		assert_eq!(sim.nodes(), &before[..]);

		animator.start();
		animator.tick(3.0, sim.nodes_mut());
		for node in sim.nodes() {
			if node.is_subject() {
				assert_eq!((node.x, node.y), subject_before);
			} else if node.id == "bob" {
				assert_eq!((node.x, node.y), (12.0, 34.0));
			} else {
				let (base_x, base_y) = node.rest.unwrap();
				let (dx, dy) = displacement(animator.params(&node.id).unwrap(), 3.0);
				assert_eq!((node.x, node.y), (base_x + dx, base_y + dy));
			}
		}
		assert!(animator.params("me").is_none());
	}
}
