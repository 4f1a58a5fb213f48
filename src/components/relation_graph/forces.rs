use std::f64::consts::{PI, TAU};

use super::simulation::{LayoutNode, Link};
use crate::util::SeededRng;

fn jiggle(rng: &mut SeededRng) -> f64 {
	(rng.next_f64() - 0.5) * 1e-6
}

/// Wrap an angle into `[-PI, PI)`.
pub(super) fn wrap_angle(angle: f64) -> f64 {
	(angle + PI).rem_euclid(TAU) - PI
}

/// Spring each link towards its rest distance, splitting the correction by degree.
pub(super) fn apply_links(
	nodes: &mut [LayoutNode],
	links: &[Link],
	alpha: f64,
	rng: &mut SeededRng,
) {
	for link in links {
		let (source, target) = (link.source, link.target);
		let mut dx = nodes[target].x + nodes[target].vx - nodes[source].x - nodes[source].vx;
		let mut dy = nodes[target].y + nodes[target].vy - nodes[source].y - nodes[source].vy;
		if dx == 0.0 {
			dx = jiggle(rng);
		}
		if dy == 0.0 {
			dy = jiggle(rng);
		}

		let length = (dx * dx + dy * dy).sqrt();
		let correction = (length - link.distance) / length * alpha * link.strength;
		dx *= correction;
		dy *= correction;

		nodes[target].vx -= dx * link.bias;
		nodes[target].vy -= dy * link.bias;
		nodes[source].vx += dx * (1.0 - link.bias);
		nodes[source].vy += dy * (1.0 - link.bias);
	}
}

/// Pairwise charge; negative strength repels with magnitude `|strength| * alpha / distance`.
pub(super) fn apply_many_body(
	nodes: &mut [LayoutNode],
	strength: f64,
	distance_min: f64,
	alpha: f64,
	rng: &mut SeededRng,
) {
	let distance_min_sq = distance_min * distance_min;
	for i in 0..nodes.len() {
		for j in (i + 1)..nodes.len() {
			let mut dx = nodes[j].x - nodes[i].x;
			let mut dy = nodes[j].y - nodes[i].y;
			if dx == 0.0 {
				dx = jiggle(rng);
			}
			if dy == 0.0 {
				dy = jiggle(rng);
			}

			let mut distance_sq = dx * dx + dy * dy;
			if distance_sq < distance_min_sq {
				distance_sq = (distance_min_sq * distance_sq).sqrt();
			}
			let weight = strength * alpha / distance_sq;

			nodes[i].vx += dx * weight;
			nodes[i].vy += dy * weight;
			nodes[j].vx -= dx * weight;
			nodes[j].vy -= dy * weight;
		}
	}
}

pub(super) fn apply_centering(
	nodes: &mut [LayoutNode],
	center: (f64, f64),
	strength: f64,
	alpha: f64,
) {
	let scale = strength * alpha;
	for node in nodes {
		node.vx += (center.0 - node.x) * scale;
		node.vy += (center.1 - node.y) * scale;
	}
}

/// Resolve overlaps between padded radii using next-tick positions. Heavier (larger) nodes
/// move less.
pub(super) fn apply_collision(
	nodes: &mut [LayoutNode],
	padding: f64,
	strength: f64,
	rng: &mut SeededRng,
) {
	for i in 0..nodes.len() {
		let radius_i = nodes[i].radius + padding;
		for j in (i + 1)..nodes.len() {
			let radius_j = nodes[j].radius + padding;
			let min_distance = radius_i + radius_j;

			let mut dx = (nodes[i].x + nodes[i].vx) - (nodes[j].x + nodes[j].vx);
			let mut dy = (nodes[i].y + nodes[i].vy) - (nodes[j].y + nodes[j].vy);
			let mut distance_sq = dx * dx + dy * dy;
			if distance_sq >= min_distance * min_distance {
				continue;
			}
			if dx == 0.0 {
				dx = jiggle(rng);
				distance_sq += dx * dx;
			}
			if dy == 0.0 {
				dy = jiggle(rng);
				distance_sq += dy * dy;
			}

			let distance = distance_sq.sqrt();
			let push = (min_distance - distance) / distance * strength;
			let share_i = (radius_j * radius_j) / (radius_i * radius_i + radius_j * radius_j);

			nodes[i].vx += dx * push * share_i;
			nodes[i].vy += dy * push * share_i;
			nodes[j].vx -= dx * push * (1.0 - share_i);
			nodes[j].vy -= dy * push * (1.0 - share_i);
		}
	}
}

/// Rotate each free, never-dragged peer towards its category angle around `center`.
/// The tangential nudge grows with the angular error and the radial distance.
pub(super) fn apply_clustering(
	nodes: &mut [LayoutNode],
	center: (f64, f64),
	gain: f64,
	alpha: f64,
) {
	for node in nodes {
		if node.pinned || node.fixed.is_some() {
			continue;
		}
		let Some(category) = node.category else {
			continue;
		};

		let dx = node.x - center.0;
		let dy = node.y - center.1;
		let radius = (dx * dx + dy * dy).sqrt();
		if radius < 1e-6 {
			continue;
		}

		let error = wrap_angle(category.target_angle() - dy.atan2(dx));
		let push = error * radius * gain * alpha;
		node.vx += -dy / radius * push;
		node.vy += dx / radius * push;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::{NodeKind, RelationshipCategory};

	fn node(x: f64, y: f64, category: Option<RelationshipCategory>) -> LayoutNode {
		LayoutNode {
			id: format!("{x}:{y}"),
			label: String::new(),
			kind: if category.is_some() {
				NodeKind::Peer
			} else {
				NodeKind::Subject
			},
			category,
			score: 50,
			grade: None,
			radius: 10.0,
			link_distance: 100.0,
			x,
			y,
			vx: 0.0,
			vy: 0.0,
			fixed: None,
			rest: None,
			pinned: false,
		}
	}

	#[test]
	fn wrap_angle_picks_the_short_way_round() {
		assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
		assert!((wrap_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
		assert!((wrap_angle(0.25) - 0.25).abs() < 1e-12);
	}

	#[test]
	fn clustering_skips_pinned_nodes_and_the_subject() {
		let mut nodes = vec![
			node(0.0, 0.0, None),
			node(0.0, 100.0, Some(RelationshipCategory::Core)),
			node(0.0, 100.0, Some(RelationshipCategory::Core)),
		];
		nodes[2].pinned = true;
		apply_clustering(&mut nodes, (0.0, 0.0), 0.08, 1.0);

		assert_eq!((nodes[0].vx, nodes[0].vy), (0.0, 0.0));
		assert_eq!((nodes[2].vx, nodes[2].vy), (0.0, 0.0));
		// Core sits at angle zero, so a peer on the +y axis is nudged tangentially towards +x.
		assert!(nodes[1].vx > 0.0);
		assert!(nodes[1].vy.abs() < 1e-9);
	}

	#[test]
	fn clustering_stops_at_the_target_angle() {
		let mut nodes = vec![node(100.0, 0.0, Some(RelationshipCategory::Core))];
		apply_clustering(&mut nodes, (0.0, 0.0), 0.08, 1.0);
		assert!(nodes[0].vx.abs() < 1e-9 && nodes[0].vy.abs() < 1e-9);
	}

	#[test]
	fn repulsion_pushes_apart_symmetrically() {
		let mut nodes = vec![node(-10.0, 0.0, None), node(10.0, 0.0, None)];
		let mut rng = SeededRng::new(1);
		apply_many_body(&mut nodes, -200.0, 1.0, 1.0, &mut rng);
		assert!(nodes[0].vx < 0.0 && nodes[1].vx > 0.0);
		assert!((nodes[0].vx + nodes[1].vx).abs() < 1e-9);
		assert!((nodes[1].vx - 10.0).abs() < 1e-9);
	}

	#[test]
	fn collision_separates_overlapping_nodes() {
		let mut nodes = vec![node(0.0, 0.0, None), node(5.0, 0.0, None)];
		let mut rng = SeededRng::new(1);
		apply_collision(&mut nodes, 4.0, 1.0, &mut rng);
		assert!(nodes[0].vx < 0.0 && nodes[1].vx > 0.0);
		let gap = (nodes[1].x + nodes[1].vx) - (nodes[0].x + nodes[0].vx);
		assert!((gap - 28.0).abs() < 1e-9);
	}
}
