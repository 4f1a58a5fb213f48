use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::storage::KeyValueStore;
use crate::error::AnalysisError;
use crate::model::GraphResult;

/// Key of the cached result.
pub const CACHE_KEY: &str = "relation_graph_cache";
/// Key of the "analysis in progress" hint.
pub const STATUS_KEY: &str = "graph_analysis_status";
const ANALYZING: &str = "analyzing";

/// A completed analysis together with the counts it was requested with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
	/// Result graph as received.
	pub data: Arc<GraphResult>,
	/// Peers the service was asked to analyze.
	pub analyze_count: usize,
	/// Peers the view shows.
	pub display_count: usize,
	/// Milliseconds since the Unix epoch at write time.
	pub timestamp: f64,
}

/// Typed access to the cache keys of a [`KeyValueStore`].
pub struct GraphCache {
	store: Box<dyn KeyValueStore>,
}

impl GraphCache {
	pub fn new(store: Box<dyn KeyValueStore>) -> Self {
		Self { store }
	}

	/// Decode the cached entry. A corrupted entry is removed and reported as a miss.
	pub fn load(&self) -> Option<CacheEntry> {
		let raw = self.store.get_item(CACHE_KEY)?;
		match serde_json::from_str::<CacheEntry>(&raw) {
			Ok(entry) => Some(entry),
			Err(error) => {
				let error = AnalysisError::CacheCorruption(error.to_string());
				warn!("discarding cached graph: {error}");
				self.store.remove_item(CACHE_KEY);
				None
			}
		}
	}

	pub fn store(&self, entry: &CacheEntry) -> Result<(), AnalysisError> {
		let raw = serde_json::to_string(entry)
			.map_err(|error| AnalysisError::Storage(error.to_string()))?;
		self.store.set_item(CACHE_KEY, &raw)?;
		debug!(
			"cached graph with {} nodes ({} bytes)",
			entry.data.graph.nodes.len(),
			raw.len()
		);
		Ok(())
	}

	pub fn clear(&self) {
		self.store.remove_item(CACHE_KEY);
	}

	pub fn mark_analyzing(&self) {
		if let Err(error) = self.store.set_item(STATUS_KEY, ANALYZING) {
			warn!("could not persist analysis hint: {error}");
		}
	}

	pub fn clear_analyzing(&self) {
		self.store.remove_item(STATUS_KEY);
	}

	pub fn is_marked_analyzing(&self) -> bool {
		self.store.get_item(STATUS_KEY).as_deref() == Some(ANALYZING)
	}
}
