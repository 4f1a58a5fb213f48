//! Mappings from peer scores to layout and drawing quantities.

/// Rendered radius of the subject node.
pub const SUBJECT_RADIUS: f64 = 22.0;
const PEER_RADIUS_MIN: f64 = 8.0;
const PEER_RADIUS_MAX: f64 = 16.0;

/// Rest length of a peer's link: inverse affine in score, clamped to `[min, max]`.
pub fn link_distance(score: u8, min: f64, max: f64) -> f64 {
	let t = f64::from(score.min(100)) / 100.0;
	(max - (max - min) * t).clamp(min, max)
}

/// Rendered radius of a peer.
pub fn peer_radius(score: u8) -> f64 {
	let t = f64::from(score.min(100)) / 100.0;
	PEER_RADIUS_MIN + (PEER_RADIUS_MAX - PEER_RADIUS_MIN) * t
}

/// Fill color of a relationship category.
pub fn category_color(sector: usize) -> &'static str {
	const COLORS: [&str; 6] = [
		"#e4572e", "#17bebb", "#4c6ef5", "#76b041", "#ffc914", "#8d8d99",
	];
	COLORS[sector % COLORS.len()]
}
