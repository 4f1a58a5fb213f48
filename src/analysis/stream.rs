use std::rc::Rc;

use log::debug;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventSource, MessageEvent};

use crate::error::AnalysisError;

const EVENT_NAMES: [&str; 4] = ["start", "progress", "complete", "error"];

/// Receives raw named events from a push stream.
#[derive(Clone)]
pub struct EventSink {
	deliver: Rc<dyn Fn(&str, Option<&str>)>,
}

impl EventSink {
	#[allow(missing_docs)]
	pub fn new(deliver: impl Fn(&str, Option<&str>) + 'static) -> Self {
		Self {
			deliver: Rc::new(deliver),
		}
	}

	/// Forward one event. `data` is `None` when the transport carried no payload.
	pub fn dispatch(&self, name: &str, data: Option<&str>) {
		(self.deliver)(name, data);
	}
}

/// An open push stream.
pub trait StreamHandle {
	/// Stop delivering events and release the connection. Must be idempotent.
	fn close(&mut self);
}

/// Opens push streams.
pub trait StreamConnector {
	/// Open a stream at `url` delivering into `sink`.
	fn open(&self, url: &str, sink: EventSink) -> Result<Box<dyn StreamHandle>, AnalysisError>;
}

/// Server-sent events through the browser `EventSource`.
#[derive(Clone, Copy, Debug, Default)]
pub struct EventSourceConnector;

impl StreamConnector for EventSourceConnector {
	fn open(&self, url: &str, sink: EventSink) -> Result<Box<dyn StreamHandle>, AnalysisError> {
		let source = EventSource::new(url)
			.map_err(|error| AnalysisError::Connection(format!("{error:?}")))?;

		let mut handle = EventSourceHandle {
			source,
			listeners: Vec::with_capacity(EVENT_NAMES.len()),
			closed: false,
		};
		for name in EVENT_NAMES {
			let sink = sink.clone();
			let listener = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
				let data = event
					.dyn_ref::<MessageEvent>()
					.and_then(|message| message.data().as_string());
				sink.dispatch(name, data.as_deref());
			});
			handle
				.source
				.add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
				.map_err(|error| AnalysisError::Connection(format!("{error:?}")))?;
			handle.listeners.push((name, listener));
		}

		debug!("event source opened: {url}");
		Ok(Box::new(handle))
	}
}

struct EventSourceHandle {
	source: EventSource,
	listeners: Vec<(&'static str, Closure<dyn FnMut(Event)>)>,
	closed: bool,
}

impl StreamHandle for EventSourceHandle {
	fn close(&mut self) {
		if self.closed {
			return;
		}
		self.closed = true;
		self.source.close();
		for (name, listener) in &self.listeners {
			let _ = self
				.source
				.remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
		}
		debug!("event source closed: {}", self.source.url());
	}
}

impl Drop for EventSourceHandle {
	fn drop(&mut self) {
		self.close();
	}
}
