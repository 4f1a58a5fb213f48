//! Error types shared by the analysis controller, the data model and configuration.

use thiserror::Error;

/// Structural problems in a relationship graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
	/// The graph has no subject node.
	#[error("graph has no subject node")]
	MissingSubject,
	/// The graph has more than one subject node.
	#[error("graph has {0} subject nodes, expected exactly one")]
	MultipleSubjects(usize),
	/// Two nodes share an id.
	#[error("duplicate node id `{0}`")]
	DuplicateNode(String),
	/// A peer carries no relationship category.
	#[error("peer `{0}` has no relationship category")]
	MissingCategory(String),
	/// A category name outside the six known clusters.
	#[error("unknown relationship category `{0}`")]
	UnknownCategory(String),
	/// An edge whose endpoints are not a known node and a known peer.
	#[error("edge {from} -> {to} does not reference an existing peer")]
	DanglingEdge {
		/// Edge source id.
		from: String,
		/// Edge target id.
		to: String,
	},
}

/// Failures of one analysis attempt. All of them are terminal for the attempt.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
	/// The stream could not be opened or dropped without a payload.
	#[error("connection error: {0}")]
	Connection(String),
	/// The service reported `success: false`.
	#[error("analysis failed: {0}")]
	AnalysisFailure(String),
	/// An event payload could not be decoded.
	#[error("malformed `{event}` payload: {reason}")]
	MalformedPayload {
		/// Event name the payload arrived with.
		event: String,
		/// Decoder message.
		reason: String,
	},
	/// A cache entry could not be decoded.
	#[error("corrupted cache entry: {0}")]
	CacheCorruption(String),
	/// The key/value store rejected a write.
	#[error("storage error: {0}")]
	Storage(String),
	/// The result graph violates a structural invariant.
	#[error("invalid result graph: {0}")]
	InvalidGraph(#[from] GraphError),
}

impl AnalysisError {
	/// Message shown to the user in the session's error state.
	pub fn user_message(&self) -> String {
		match self {
			Self::Connection(_) | Self::MalformedPayload { .. } => "connection lost".to_owned(),
			Self::AnalysisFailure(message) => message.clone(),
			other => other.to_string(),
		}
	}
}

/// Configuration could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// The JSON document was invalid.
	#[error("invalid engine configuration: {0}")]
	Json(#[from] serde_json::Error),
	/// A value was outside its allowed range.
	#[error("invalid engine configuration: {0}")]
	OutOfRange(&'static str),
}
