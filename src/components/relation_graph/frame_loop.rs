use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{debug, warn};
use wasm_bindgen::prelude::*;

struct LoopInner {
	callback: Option<Closure<dyn FnMut(f64)>>,
	pending: Option<i32>,
	stopped: bool,
}

fn request_frame(inner: &Rc<RefCell<LoopInner>>) {
	let Some(window) = web_sys::window() else {
		return;
	};
	let mut inner = inner.borrow_mut();
	if inner.stopped {
		return;
	}
	let Some(callback) = inner.callback.as_ref() else {
		return;
	};
	match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
		Ok(handle) => inner.pending = Some(handle),
		Err(err) => warn!("requestAnimationFrame failed: {err:?}"),
	}
}

/// A requestAnimationFrame loop that can be stopped. Dropping it stops it too.
pub struct FrameLoop {
	inner: Rc<RefCell<LoopInner>>,
}

impl FrameLoop {
	/// Call `on_frame` with the frame timestamp (milliseconds) on every animation frame.
	pub fn start(mut on_frame: impl FnMut(f64) + 'static) -> Self {
		let inner = Rc::new(RefCell::new(LoopInner {
			callback: None,
			pending: None,
			stopped: false,
		}));
		// The closure only holds a weak handle so the loop and its closure do not keep each
		// other alive.
		let weak: Weak<RefCell<LoopInner>> = Rc::downgrade(&inner);
		let callback = Closure::<dyn FnMut(f64)>::new(move |time: f64| {
			let Some(inner) = weak.upgrade() else {
				return;
			};
			{
				let mut state = inner.borrow_mut();
				state.pending = None;
				if state.stopped {
					return;
				}
			}
			on_frame(time);
			request_frame(&inner);
		});
		inner.borrow_mut().callback = Some(callback);
		request_frame(&inner);
		debug!("frame loop started");
		Self { inner }
	}

	/// Cancel the pending frame. Idempotent.
	pub fn stop(&self) {
		let mut inner = self.inner.borrow_mut();
		if inner.stopped {
			return;
		}
		inner.stopped = true;
		if let (Some(handle), Some(window)) = (inner.pending.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(handle);
		}
		debug!("frame loop stopped");
	}
}

impl Drop for FrameLoop {
	fn drop(&mut self) {
		self.stop();
	}
}
