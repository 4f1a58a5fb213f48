//! Engine configuration. Every field has a default so partial JSON documents are accepted.

use serde::Deserialize;

use crate::error::ConfigError;

/// Settings of the streaming analysis endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisConfig {
	/// Stream URL without query string.
	pub endpoint: String,
	/// Iteration bound forwarded to the analysis service.
	pub max_iterations: u32,
}

impl Default for AnalysisConfig {
	fn default() -> Self {
		Self {
			endpoint: "/api/relation-graph/analyze-stream".to_owned(),
			max_iterations: 3,
		}
	}
}

/// Force model constants of the layout simulator.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
	/// Alpha the first run starts at.
	pub alpha_start: f64,
	/// Alpha floor below which the simulation halts.
	pub alpha_min: f64,
	/// Fraction of the distance to the alpha target covered per tick.
	pub alpha_decay: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	/// Link distance of a peer scoring 100.
	pub min_link_distance: f64,
	/// Link distance of a peer scoring 0.
	pub max_link_distance: f64,
	/// Multiplier on the degree-based link strength.
	pub link_strength: f64,
	/// Many-body strength, negative for repulsion.
	pub charge_strength: f64,
	/// Closest distance the many-body force is evaluated at.
	pub charge_distance_min: f64,
	/// Pull of every node towards the viewport center.
	pub center_strength: f64,
	/// Extra clearance added around each node's rendered radius.
	pub collision_padding: f64,
	/// Share of the overlap resolved per tick.
	pub collision_strength: f64,
	/// Gain of the angular clustering force.
	pub cluster_gain: f64,
	/// Alpha a drag restarts the simulation at and holds while dragging.
	pub drag_alpha: f64,
}

impl Default for SimulationConfig {
	fn default() -> Self {
		let alpha_min = 0.001;
		Self {
			alpha_start: 1.0,
			alpha_min,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
			velocity_decay: 0.4,
			min_link_distance: 50.0,
			max_link_distance: 150.0,
			link_strength: 1.0,
			charge_strength: -200.0,
			charge_distance_min: 1.0,
			center_strength: 0.05,
			collision_padding: 4.0,
			collision_strength: 0.7,
			cluster_gain: 0.08,
			drag_alpha: 0.3,
		}
	}
}

/// Idle motion ranges of the floating animator.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FloatingConfig {
	/// Lower bound of the angular speed, radians per second.
	pub speed_min: f64,
	/// Upper bound of the angular speed, radians per second.
	pub speed_max: f64,
	/// Lower bound of the drift amplitude in layout units.
	pub amplitude_min: f64,
	/// Upper bound of the drift amplitude in layout units.
	pub amplitude_max: f64,
}

impl Default for FloatingConfig {
	fn default() -> Self {
		Self {
			speed_min: 0.4,
			speed_max: 1.1,
			amplitude_min: 2.0,
			amplitude_max: 6.0,
		}
	}
}

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	#[allow(missing_docs)]
	pub analysis: AnalysisConfig,
	#[allow(missing_docs)]
	pub simulation: SimulationConfig,
	#[allow(missing_docs)]
	pub floating: FloatingConfig,
}

impl EngineConfig {
	/// Parse a JSON document, filling missing fields with defaults.
	pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		let sim = &self.simulation;
		if !(sim.alpha_min > 0.0 && sim.alpha_min < sim.alpha_start) {
			return Err(ConfigError::OutOfRange("alphaMin must lie in (0, alphaStart)"));
		}
		if !(sim.alpha_decay > 0.0 && sim.alpha_decay < 1.0) {
			return Err(ConfigError::OutOfRange("alphaDecay must lie in (0, 1)"));
		}
		if !(0.0..1.0).contains(&sim.velocity_decay) {
			return Err(ConfigError::OutOfRange("velocityDecay must lie in [0, 1)"));
		}
		if sim.min_link_distance > sim.max_link_distance {
			return Err(ConfigError::OutOfRange(
				"minLinkDistance must not exceed maxLinkDistance",
			));
		}
		let float = &self.floating;
		if float.speed_min > float.speed_max || float.amplitude_min > float.amplitude_max {
			return Err(ConfigError::OutOfRange("floating ranges must be ordered"));
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn partial_json_keeps_defaults() {
		let config = EngineConfig::from_json(
			r#"{"analysis":{"maxIterations":5},"simulation":{"minLinkDistance":40}}"#,
		)
		.unwrap();
		assert_eq!(config.analysis.max_iterations, 5);
		assert_eq!(config.analysis.endpoint, AnalysisConfig::default().endpoint);
		assert_eq!(config.simulation.min_link_distance, 40.0);
		assert_eq!(config.simulation.max_link_distance, 150.0);
	}

	#[test]
	fn default_alpha_decay_reaches_floor_in_300_ticks() {
		let sim = SimulationConfig::default();
		let remaining = (1.0 - sim.alpha_decay).powi(300);
		assert!((remaining - sim.alpha_min).abs() < 1e-9);
	}

	#[test]
	fn inverted_ranges_are_rejected() {
		let error =
			EngineConfig::from_json(r#"{"simulation":{"minLinkDistance":200}}"#).unwrap_err();
		assert!(matches!(error, ConfigError::OutOfRange(_)));
	}
}
