//! Streaming analysis session: state machine, push-stream lifecycle and result cache.

mod cache;
mod controller;
mod events;
mod session;
mod storage;
mod stream;

pub use cache::{CACHE_KEY, CacheEntry, STATUS_KEY};
pub use controller::{AnalysisSessionController, SubscriptionId};
pub use events::{CompletePayload, ErrorPayload, ProgressPayload, StartPayload, StreamEvent};
pub use session::{AnalysisSession, DEFAULT_TOTAL_STEPS, SessionStatus};
pub use storage::{KeyValueStore, MemoryStore, SessionStore};
pub use stream::{EventSink, EventSourceConnector, StreamConnector, StreamHandle};
