use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::AnalysisError;

/// Session-scoped string key/value store.
pub trait KeyValueStore {
	/// Value under `key`, if any.
	fn get_item(&self, key: &str) -> Option<String>;
	/// Overwrite `key` with `value`.
	fn set_item(&self, key: &str, value: &str) -> Result<(), AnalysisError>;
	/// Remove `key`; missing keys are ignored.
	fn remove_item(&self, key: &str);
}

/// Browser `sessionStorage`.
pub struct SessionStore {
	storage: web_sys::Storage,
}

impl SessionStore {
	/// Bind to the window's session storage.
	pub fn open() -> Result<Self, AnalysisError> {
		let window =
			web_sys::window().ok_or_else(|| AnalysisError::Storage("no window".to_owned()))?;
		let storage = window
			.session_storage()
			.map_err(|error| AnalysisError::Storage(format!("{error:?}")))?
			.ok_or_else(|| AnalysisError::Storage("session storage unavailable".to_owned()))?;
		Ok(Self { storage })
	}
}

impl KeyValueStore for SessionStore {
	fn get_item(&self, key: &str) -> Option<String> {
		self.storage.get_item(key).ok().flatten()
	}

	fn set_item(&self, key: &str, value: &str) -> Result<(), AnalysisError> {
		self.storage
			.set_item(key, value)
			.map_err(|error| AnalysisError::Storage(format!("{error:?}")))
	}

	fn remove_item(&self, key: &str) {
		let _ = self.storage.remove_item(key);
	}
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
	items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
	#[allow(missing_docs)]
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.items.borrow().len()
	}

	#[allow(missing_docs)]
	pub fn is_empty(&self) -> bool {
		self.items.borrow().is_empty()
	}
}

impl KeyValueStore for MemoryStore {
	fn get_item(&self, key: &str) -> Option<String> {
		self.items.borrow().get(key).cloned()
	}

	fn set_item(&self, key: &str, value: &str) -> Result<(), AnalysisError> {
		self.items
			.borrow_mut()
			.insert(key.to_owned(), value.to_owned());
		Ok(())
	}

	fn remove_item(&self, key: &str) {
		self.items.borrow_mut().remove(key);
	}
}
