use serde::Deserialize;

use crate::error::AnalysisError;
use crate::model::GraphResult;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StartPayload {
	pub message: String,
	pub progress: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressPayload {
	pub message: String,
	pub progress: f64,
	pub current_step: Option<u32>,
	pub total_steps: Option<u32>,
	pub analyzed_count: Option<usize>,
	pub total_count: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CompletePayload {
	pub success: bool,
	#[serde(default)]
	pub data: Option<GraphResult>,
	#[serde(default)]
	pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ErrorPayload {
	pub message: Option<String>,
}

/// One decoded event of the analysis stream.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
	/// The service accepted the job.
	Start(StartPayload),
	/// A progress snapshot.
	Progress(ProgressPayload),
	/// The job finished, successfully or not.
	Complete(Box<CompletePayload>),
	/// The service reported an error with a payload.
	Failed(ErrorPayload),
	/// The transport failed without a payload.
	Disconnected,
}

impl StreamEvent {
	/// Decode a named event. Unknown names (keep-alives, default `message` events) yield `None`.
	/// An `error` event without data is a transport failure.
	pub fn decode(name: &str, data: Option<&str>) -> Result<Option<Self>, AnalysisError> {
		let Some(data) = data else {
			return match name {
				"error" => Ok(Some(Self::Disconnected)),
				"start" | "progress" | "complete" => Err(malformed(name, "missing payload")),
				_ => Ok(None),
			};
		};

		let event = match name {
			"start" => Self::Start(parse(name, data)?),
			"progress" => Self::Progress(parse(name, data)?),
			"complete" => Self::Complete(Box::new(parse(name, data)?)),
			"error" => Self::Failed(parse(name, data)?),
			_ => return Ok(None),
		};
		Ok(Some(event))
	}
}

fn parse<T: serde::de::DeserializeOwned>(name: &str, data: &str) -> Result<T, AnalysisError> {
	serde_json::from_str(data).map_err(|error| malformed(name, &error.to_string()))
}

fn malformed(name: &str, reason: &str) -> AnalysisError {
	AnalysisError::MalformedPayload {
		event: name.to_owned(),
		reason: reason.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn progress_defaults_missing_fields() {
		let event = StreamEvent::decode("progress", Some(r#"{"progress":40,"message":"scoring"}"#))
			.unwrap()
			.unwrap();
		let StreamEvent::Progress(payload) = event else {
			panic!("expected progress, got {event:?}");
		};
		assert_eq!(payload.progress, 40.0);
		assert_eq!(payload.total_steps, None);
		assert_eq!(payload.message, "scoring");
	}

	#[test]
	fn error_without_data_is_a_disconnect() {
		assert_eq!(
			StreamEvent::decode("error", None).unwrap(),
			Some(StreamEvent::Disconnected)
		);
		assert_eq!(
			StreamEvent::decode("error", Some(r#"{"message":"rate limited"}"#)).unwrap(),
			Some(StreamEvent::Failed(ErrorPayload {
				message: Some("rate limited".to_owned())
			}))
		);
	}

	#[test]
	fn garbage_is_malformed_and_unknown_names_are_skipped() {
		assert!(matches!(
			StreamEvent::decode("complete", Some("{oops")),
			Err(AnalysisError::MalformedPayload { event, .. }) if event == "complete"
		));
		assert_eq!(StreamEvent::decode("ping", Some("{}")).unwrap(), None);
	}
}
