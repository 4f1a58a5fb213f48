use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use leptos::prelude::*;
use log::{error, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent, WheelEvent, Window,
};

use super::frame_loop::FrameLoop;
use super::render;
use super::state::RelationGraphState;
use crate::config::EngineConfig;
use crate::model::GraphResult;

type ResizeCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn window_size(window: &Window) -> (f64, f64) {
	(
		window
			.inner_width()
			.ok()
			.and_then(|width| width.as_f64())
			.unwrap_or(800.0),
		window
			.inner_height()
			.ok()
			.and_then(|height| height.as_f64())
			.unwrap_or(600.0),
	)
}

fn viewport_size(
	canvas: &HtmlCanvasElement,
	fullscreen: bool,
	width: Option<f64>,
	height: Option<f64>,
) -> (f64, f64) {
	if fullscreen {
		if let Some(window) = web_sys::window() {
			return window_size(&window);
		}
	}
	(
		width.unwrap_or_else(|| {
			canvas
				.parent_element()
				.map(|p| p.client_width() as f64)
				.unwrap_or(800.0)
		}),
		height.unwrap_or_else(|| {
			canvas
				.parent_element()
				.map(|p| p.client_height() as f64)
				.unwrap_or(600.0)
		}),
	)
}

fn context_2d(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok().flatten()?.dyn_into().ok()
}

fn local_point(
	canvas_ref: NodeRef<leptos::html::Canvas>,
	client_x: i32,
	client_y: i32,
) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		client_x as f64 - rect.left(),
		client_y as f64 - rect.top(),
	))
}

fn first_touch(ev: &TouchEvent, canvas_ref: NodeRef<leptos::html::Canvas>) -> Option<(f64, f64)> {
	let touch = ev.touches().get(0)?;
	local_point(canvas_ref, touch.client_x(), touch.client_y())
}

/// Canvas view of an analysis result: the subject and its top `display_count` peers, laid out by
/// the force simulation and draggable with mouse or touch.
#[component]
pub fn RelationGraphCanvas(
	/// Result to draw. `None` clears the canvas.
	#[prop(into)]
	result: Signal<Option<Arc<GraphResult>>>,
	/// How many of the best peers to show.
	#[prop(into)]
	display_count: Signal<usize>,
	/// Force and floating constants.
	#[prop(optional)]
	config: EngineConfig,
	/// Fill the window and follow its resizes.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width; defaults to the parent's.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height; defaults to the parent's.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<RelationGraphState>>> = Rc::new(RefCell::new(None));
	let frames: Rc<RefCell<Option<FrameLoop>>> = Rc::new(RefCell::new(None));
	let resize_cb: ResizeCallback = Rc::new(RefCell::new(None));
	let (state_init, frames_init, resize_cb_init) =
		(state.clone(), frames.clone(), resize_cb.clone());

	Effect::new(move |_| {
		let result = result.get();
		let display_count = display_count.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let (w, h) = viewport_size(&canvas, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		*state_init.borrow_mut() = result.and_then(|result| {
			RelationGraphState::new(&result.graph, display_count, &config, w, h)
				.map_err(|err| error!("cannot lay out graph: {err}"))
				.ok()
		});

		if frames_init.borrow().is_some() {
			return;
		}
		let Some(ctx) = context_2d(&canvas) else {
			error!("canvas has no 2d context");
			return;
		};

		if fullscreen {
			let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
			*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
				let Some(window) = web_sys::window() else {
					return;
				};
				let (nw, nh) = window_size(&window);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(s) = state_resize.borrow_mut().as_mut() {
					s.resize(nw, nh);
				}
			}));
			if let (Some(cb), Some(window)) = (resize_cb_init.borrow().as_ref(), web_sys::window())
			{
				if window
					.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref())
					.is_err()
				{
					warn!("could not listen for window resize");
				}
			}
		}

		let state_frame = state_init.clone();
		*frames_init.borrow_mut() = Some(FrameLoop::start(move |time| {
			match state_frame.borrow_mut().as_mut() {
				Some(s) => {
					s.tick(time);
					render::render(s, &ctx);
				}
				None => render::clear(&ctx, canvas.width() as f64, canvas.height() as f64),
			}
		}));
	});

	let teardown = StoredValue::new_local((frames, resize_cb));
	on_cleanup(move || {
		teardown.try_with_value(|(frames, resize_cb)| {
			if let Some(frames) = frames.borrow_mut().take() {
				frames.stop();
			}
			if let (Some(cb), Some(window)) = (resize_cb.borrow_mut().take(), web_sys::window()) {
				let _ = window
					.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		});
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(s) = state_md.borrow_mut().as_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(s) = state_mm.borrow_mut().as_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(s) = state_mu.borrow_mut().as_mut() {
			s.pointer_up();
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(s) = state_ml.borrow_mut().as_mut() {
			s.pointer_leave();
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = local_point(canvas_ref, ev.client_x(), ev.client_y()) else {
			return;
		};
		if let Some(s) = state_wh.borrow_mut().as_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.zoom_at(x, y, factor);
		}
	};

	let state_ts = state.clone();
	let on_touchstart = move |ev: TouchEvent| {
		ev.prevent_default();
		let Some((x, y)) = first_touch(&ev, canvas_ref) else {
			return;
		};
		if let Some(s) = state_ts.borrow_mut().as_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_tm = state.clone();
	let on_touchmove = move |ev: TouchEvent| {
		ev.prevent_default();
		let Some((x, y)) = first_touch(&ev, canvas_ref) else {
			return;
		};
		if let Some(s) = state_tm.borrow_mut().as_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_te = state;
	let on_touchend = move |_: TouchEvent| {
		if let Some(s) = state_te.borrow_mut().as_mut() {
			s.pointer_up();
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="relation-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			on:touchstart=on_touchstart
			on:touchmove=on_touchmove
			on:touchend=on_touchend.clone()
			on:touchcancel=on_touchend
			style="display: block; cursor: grab; touch-action: none;"
		/>
	}
}
