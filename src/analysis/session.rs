use std::sync::Arc;

use super::events::{ProgressPayload, StartPayload};
use crate::model::GraphResult;

/// Steps reported when the service omits `totalSteps`.
pub const DEFAULT_TOTAL_STEPS: u32 = 5;

/// Lifecycle of an analysis attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
	/// Nothing running.
	#[default]
	Idle,
	/// A stream is open.
	Analyzing,
	/// The result graph is available.
	Complete,
	/// The attempt failed; `error_message` is set.
	Error,
}

impl SessionStatus {
	#[allow(missing_docs)]
	pub fn label(self) -> &'static str {
		match self {
			Self::Idle => "idle",
			Self::Analyzing => "analyzing",
			Self::Complete => "complete",
			Self::Error => "error",
		}
	}
}

/// Snapshot of the controller's session. Cheap to clone.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisSession {
	#[allow(missing_docs)]
	pub status: SessionStatus,
	/// 0 to 100, never decreasing while analyzing.
	pub progress_percent: f64,
	/// Latest human-readable progress text.
	pub message: String,
	#[allow(missing_docs)]
	pub current_step: u32,
	#[allow(missing_docs)]
	pub total_steps: u32,
	#[allow(missing_docs)]
	pub analyzed_count: usize,
	#[allow(missing_docs)]
	pub target_count: usize,
	/// Set only in [`SessionStatus::Error`].
	pub error_message: Option<String>,
	/// Set only in [`SessionStatus::Complete`].
	pub result_graph: Option<Arc<GraphResult>>,
	/// Peers the current attempt asked the service to analyze.
	pub requested_analyze_count: usize,
	/// Peers the current attempt will display.
	pub requested_display_count: usize,
}

impl Default for AnalysisSession {
	fn default() -> Self {
		Self {
			status: SessionStatus::Idle,
			progress_percent: 0.0,
			message: String::new(),
			current_step: 0,
			total_steps: DEFAULT_TOTAL_STEPS,
			analyzed_count: 0,
			target_count: 0,
			error_message: None,
			result_graph: None,
			requested_analyze_count: 0,
			requested_display_count: 0,
		}
	}
}

impl AnalysisSession {
	pub(super) fn begin(&mut self, analyze_count: usize, display_count: usize) {
		*self = Self {
			status: SessionStatus::Analyzing,
			target_count: analyze_count,
			requested_analyze_count: analyze_count,
			requested_display_count: display_count,
			..Self::default()
		};
	}

	pub(super) fn reset(&mut self) {
		*self = Self::default();
	}

	pub(super) fn apply_start(&mut self, payload: &StartPayload) {
		self.advance_progress(payload.progress);
		self.message.clone_from(&payload.message);
	}

	pub(super) fn apply_progress(&mut self, payload: &ProgressPayload) {
		self.advance_progress(payload.progress);
		self.message.clone_from(&payload.message);
		self.total_steps = payload.total_steps.unwrap_or(DEFAULT_TOTAL_STEPS).max(1);
		self.current_step = payload.current_step.unwrap_or(0).min(self.total_steps);
		if let Some(analyzed) = payload.analyzed_count {
			self.analyzed_count = analyzed;
		}
		if let Some(total) = payload.total_count {
			self.target_count = total;
		}
	}

	pub(super) fn complete(&mut self, result: Arc<GraphResult>) {
		self.status = SessionStatus::Complete;
		self.progress_percent = 100.0;
		self.current_step = self.total_steps;
		self.error_message = None;
		self.result_graph = Some(result);
	}

	pub(super) fn fail(&mut self, message: String) {
		self.status = SessionStatus::Error;
		self.error_message = Some(message);
		self.result_graph = None;
	}

	fn advance_progress(&mut self, progress: f64) {
		let progress = if progress.is_finite() {
			progress.clamp(0.0, 100.0)
		} else {
			0.0
		};
		self.progress_percent = self.progress_percent.max(progress);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn progress_never_moves_backwards() {
		let mut session = AnalysisSession::default();
		session.begin(20, 10);
		session.apply_progress(&ProgressPayload {
			progress: 60.0,
			..ProgressPayload::default()
		});
		session.apply_progress(&ProgressPayload {
			progress: 30.0,
			current_step: Some(9),
			total_steps: Some(4),
			..ProgressPayload::default()
		});
		assert_eq!(session.progress_percent, 60.0);
		assert_eq!(session.current_step, 4);
		assert_eq!(session.total_steps, 4);
	}

	#[test]
	fn begin_clears_previous_outcome() {
		let mut session = AnalysisSession::default();
		session.fail("boom".to_owned());
		session.begin(5, 3);
		assert_eq!(session.status, SessionStatus::Analyzing);
		assert_eq!(session.error_message, None);
		assert_eq!(session.target_count, 5);
		assert_eq!(session.requested_display_count, 3);
	}
}
