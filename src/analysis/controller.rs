use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::cache::{CacheEntry, GraphCache};
use super::events::{CompletePayload, StreamEvent};
use super::session::{AnalysisSession, SessionStatus};
use super::storage::KeyValueStore;
use super::stream::{EventSink, StreamConnector, StreamHandle};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::util::now_millis;

/// Identifies a subscription for [`AnalysisSessionController::unsubscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Rc<dyn Fn(&AnalysisSession)>;

#[derive(Default)]
struct Subscribers {
	next_id: u64,
	entries: Vec<(SubscriptionId, Subscriber)>,
}

struct ControllerInner {
	config: AnalysisConfig,
	connector: Box<dyn StreamConnector>,
	cache: GraphCache,
	session: AnalysisSession,
	stream: Option<Box<dyn StreamHandle>>,
	// Listener closures of the last closed stream may still be on the stack.
	retired: Option<Box<dyn StreamHandle>>,
	generation: u64,
	interrupted: bool,
}

impl ControllerInner {
	fn stream_url(&self, analyze_count: usize) -> String {
		let separator = if self.config.endpoint.contains('?') {
			'&'
		} else {
			'?'
		};
		format!(
			"{}{separator}limit={analyze_count}&max_iterations={}",
			self.config.endpoint, self.config.max_iterations
		)
	}

	fn close_stream(&mut self) {
		if let Some(mut stream) = self.stream.take() {
			stream.close();
			self.retired = Some(stream);
		}
	}

	fn finish(&mut self, payload: CompletePayload) {
		if !payload.success {
			let message = payload
				.message
				.unwrap_or_else(|| "analysis failed".to_owned());
			self.fail(AnalysisError::AnalysisFailure(message));
			return;
		}
		let Some(result) = payload.data else {
			let message = payload
				.message
				.unwrap_or_else(|| "analysis finished without a result".to_owned());
			self.fail(AnalysisError::AnalysisFailure(message));
			return;
		};
		if let Err(graph_error) = result.graph.validate() {
			self.fail(graph_error.into());
			return;
		}

		let result = Arc::new(result);
		let entry = CacheEntry {
			data: Arc::clone(&result),
			analyze_count: self.session.requested_analyze_count,
			display_count: self.session.requested_display_count,
			timestamp: now_millis(),
		};
		if let Err(cache_error) = self.cache.store(&entry) {
			warn!("analysis result not cached: {cache_error}");
		}
		self.cache.clear_analyzing();
		info!(
			"analysis complete: {} nodes, {} edges",
			result.graph.nodes.len(),
			result.graph.edges.len()
		);
		self.session.complete(result);
	}

	fn fail(&mut self, failure: AnalysisError) {
		error!("analysis attempt failed: {failure}");
		self.cache.clear_analyzing();
		self.session.fail(failure.user_message());
	}
}

impl Drop for ControllerInner {
	fn drop(&mut self) {
		self.close_stream();
	}
}

/// Owns the analysis session state machine and its push stream.
///
/// Handles are cheap clones sharing one session. All methods run on the UI thread; subscribers
/// are notified after internal borrows are released, so they may call back into the
/// controller.
#[derive(Clone)]
pub struct AnalysisSessionController {
	inner: Rc<RefCell<ControllerInner>>,
	subscribers: Rc<RefCell<Subscribers>>,
}

impl AnalysisSessionController {
	/// Create an idle controller. Reads the "analysis in progress" hint left by a previous page.
	pub fn new(
		config: AnalysisConfig,
		connector: impl StreamConnector + 'static,
		store: impl KeyValueStore + 'static,
	) -> Self {
		let cache = GraphCache::new(Box::new(store));
		let interrupted = cache.is_marked_analyzing();
		if interrupted {
			info!("previous analysis did not finish before reload");
		}
		Self {
			inner: Rc::new(RefCell::new(ControllerInner {
				config,
				connector: Box::new(connector),
				cache,
				session: AnalysisSession::default(),
				stream: None,
				retired: None,
				generation: 0,
				interrupted,
			})),
			subscribers: Rc::new(RefCell::new(Subscribers::default())),
		}
	}

	/// Current session state.
	pub fn snapshot(&self) -> AnalysisSession {
		self.inner.borrow().session.clone()
	}

	/// Whether a stream is currently open.
	pub fn has_open_stream(&self) -> bool {
		self.inner.borrow().stream.is_some()
	}

	/// Whether the previous page load left an analysis unfinished.
	pub fn was_interrupted(&self) -> bool {
		self.inner.borrow().interrupted
	}

	/// Call `callback` with a snapshot after every state change.
	pub fn subscribe(&self, callback: impl Fn(&AnalysisSession) + 'static) -> SubscriptionId {
		let mut subscribers = self.subscribers.borrow_mut();
		let id = SubscriptionId(subscribers.next_id);
		subscribers.next_id += 1;
		subscribers.entries.push((id, Rc::new(callback)));
		id
	}

	#[allow(missing_docs)]
	pub fn unsubscribe(&self, id: SubscriptionId) {
		self.subscribers
			.borrow_mut()
			.entries
			.retain(|(entry, _)| *entry != id);
	}

	/// Begin an analysis of `analyze_count` peers. Returns `false` without touching the session
	/// when one is already running.
	pub fn start(&self, analyze_count: usize, display_count: usize) -> bool {
		{
			let mut guard = self.inner.borrow_mut();
			let inner = &mut *guard;
			if inner.session.status == SessionStatus::Analyzing {
				debug!("start ignored: analysis already running");
				return false;
			}

			inner.close_stream();
			inner.generation += 1;
			inner.interrupted = false;
			inner.session.begin(analyze_count, display_count);
			inner.cache.mark_analyzing();

			let url = inner.stream_url(analyze_count);
			let sink = self.sink(inner.generation);
			match inner.connector.open(&url, sink) {
				Ok(stream) => {
					info!("analysis started: analyze {analyze_count}, display {display_count}");
					inner.stream = Some(stream);
				}
				Err(open_error) => inner.fail(open_error),
			}
		}
		self.notify();
		true
	}

	/// Close the stream and return to idle. Safe to call in any state.
	pub fn cancel(&self) {
		{
			let mut inner = self.inner.borrow_mut();
			inner.close_stream();
			inner.generation += 1;
			inner.cache.clear_analyzing();
			if inner.session.status == SessionStatus::Analyzing {
				info!("analysis cancelled");
			}
			inner.session.reset();
		}
		self.notify();
	}

	/// Apply one decoded stream event to the running session.
	pub fn on_stream_event(&self, event: StreamEvent) {
		{
			let mut inner = self.inner.borrow_mut();
			if inner.session.status != SessionStatus::Analyzing {
				debug!("stream event ignored in {} state", inner.session.status.label());
				return;
			}
			match event {
				StreamEvent::Start(payload) => inner.session.apply_start(&payload),
				StreamEvent::Progress(payload) => inner.session.apply_progress(&payload),
				StreamEvent::Complete(payload) => {
					inner.close_stream();
					inner.finish(*payload);
				}
				StreamEvent::Failed(payload) => {
					inner.close_stream();
					let message = payload
						.message
						.unwrap_or_else(|| "analysis failed".to_owned());
					inner.fail(AnalysisError::AnalysisFailure(message));
				}
				StreamEvent::Disconnected => {
					inner.close_stream();
					inner.fail(AnalysisError::Connection(
						"stream closed without a payload".to_owned(),
					));
				}
			}
		}
		self.notify();
	}

	/// Result and counts of the last successful analysis, without network access.
	pub fn load_from_cache(&self) -> Option<CacheEntry> {
		self.inner.borrow().cache.load()
	}

	#[allow(missing_docs)]
	pub fn clear_cache(&self) {
		self.inner.borrow().cache.clear();
	}

	/// Teardown: close any stream and drop all subscribers. The session state is kept.
	pub fn dispose(&self) {
		{
			let mut inner = self.inner.borrow_mut();
			inner.close_stream();
			inner.retired = None;
			inner.generation += 1;
		}
		self.subscribers.borrow_mut().entries.clear();
	}

	fn sink(&self, generation: u64) -> EventSink {
		let inner = Rc::downgrade(&self.inner);
		let subscribers = Rc::downgrade(&self.subscribers);
		EventSink::new(move |name, data| {
			let (Some(inner), Some(subscribers)) = (inner.upgrade(), subscribers.upgrade()) else {
				return;
			};
			AnalysisSessionController { inner, subscribers }.dispatch(generation, name, data);
		})
	}

	fn dispatch(&self, generation: u64, name: &str, data: Option<&str>) {
		{
			let inner = self.inner.borrow();
			if inner.generation != generation || inner.stream.is_none() {
				debug!("dropping `{name}` event from a closed stream");
				return;
			}
		}

		match StreamEvent::decode(name, data) {
			Ok(Some(event)) => self.on_stream_event(event),
			Ok(None) => {}
			Err(decode_error) => {
				{
					let mut inner = self.inner.borrow_mut();
					inner.close_stream();
					inner.fail(decode_error);
				}
				self.notify();
			}
		}
	}

	fn notify(&self) {
		let snapshot = self.snapshot();
		let callbacks = self
			.subscribers
			.borrow()
			.entries
			.iter()
			.map(|(_, callback)| Rc::clone(callback))
			.collect::<Vec<_>>();
		for callback in callbacks {
			callback(&snapshot);
		}
	}
}
