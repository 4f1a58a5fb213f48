use std::sync::Arc;

use leptos::prelude::*;
use log::{info, warn};

use crate::analysis::{
	AnalysisSession, AnalysisSessionController, EventSourceConnector, MemoryStore, SessionStatus,
	SessionStore,
};
use crate::components::relation_graph::RelationGraphCanvas;
use crate::config::EngineConfig;
use crate::model::GraphResult;

const DEFAULT_ANALYZE_COUNT: usize = 20;
const DEFAULT_DISPLAY_COUNT: usize = 10;
const MAX_COUNT: usize = 200;
/// `<script type="application/json">` element the host page may put engine overrides in.
const CONFIG_ELEMENT_ID: &str = "relation-graph-config";

fn inline_config() -> Option<String> {
	web_sys::window()?
		.document()?
		.get_element_by_id(CONFIG_ELEMENT_ID)?
		.text_content()
}

fn config_from(raw: Option<&str>) -> EngineConfig {
	let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
		return EngineConfig::default();
	};
	match EngineConfig::from_json(raw) {
		Ok(config) => {
			info!("engine config loaded from #{CONFIG_ELEMENT_ID}");
			config
		}
		Err(err) => {
			warn!("ignoring #{CONFIG_ELEMENT_ID}: {err}");
			EngineConfig::default()
		}
	}
}

fn build_controller(config: &EngineConfig) -> AnalysisSessionController {
	match SessionStore::open() {
		Ok(store) => {
			AnalysisSessionController::new(config.analysis.clone(), EventSourceConnector, store)
		}
		Err(err) => {
			warn!("result cache disabled: {err}");
			AnalysisSessionController::new(
				config.analysis.clone(),
				EventSourceConnector,
				MemoryStore::new(),
			)
		}
	}
}

fn progress_line(session: &AnalysisSession) -> String {
	match session.status {
		SessionStatus::Idle => String::new(),
		SessionStatus::Analyzing => format!(
			"{:.0}% · step {}/{} · {}",
			session.progress_percent, session.current_step, session.total_steps, session.message
		),
		SessionStatus::Complete => format!(
			"Analyzed {} contacts, showing the top {}",
			session.requested_analyze_count, session.requested_display_count
		),
		SessionStatus::Error => session
			.error_message
			.clone()
			.unwrap_or_else(|| "analysis failed".to_owned()),
	}
}

fn count_input(value: RwSignal<usize>) -> impl IntoView {
	view! {
		<input
			type="number"
			min="1"
			max=MAX_COUNT.to_string()
			prop:value=move || value.get()
			on:input=move |ev| {
				if let Ok(count) = event_target_value(&ev).parse::<usize>() {
					value.set(count.clamp(1, MAX_COUNT));
				}
			}
		/>
	}
}

/// Relationship graph page: analysis controls, progress readout and the graph canvas.
#[component]
pub fn Home() -> impl IntoView {
	let config = config_from(inline_config().as_deref());
	let controller = build_controller(&config);

	let session = RwSignal::new(controller.snapshot());
	let shown = RwSignal::new(None::<Arc<GraphResult>>);
	let analyze_count = RwSignal::new(DEFAULT_ANALYZE_COUNT);
	let display_count = RwSignal::new(DEFAULT_DISPLAY_COUNT);
	let interrupted = controller.was_interrupted();

	if let Some(entry) = controller.load_from_cache() {
		analyze_count.set(entry.analyze_count);
		display_count.set(entry.display_count);
		shown.set(Some(entry.data));
	}

	controller.subscribe(move |snapshot| {
		if let Some(result) = &snapshot.result_graph {
			let fresh = shown.with_untracked(|current| {
				current
					.as_ref()
					.is_none_or(|current| !Arc::ptr_eq(current, result))
			});
			if fresh {
				display_count.set(snapshot.requested_display_count);
				shown.set(Some(result.clone()));
			}
		}
		session.set(snapshot.clone());
	});

	let controller = StoredValue::new_local(controller);
	on_cleanup(move || {
		controller.try_with_value(|controller| controller.dispose());
	});

	let on_start = move |_| {
		controller.with_value(|controller| {
			controller.start(analyze_count.get_untracked(), display_count.get_untracked());
		});
	};
	let on_cancel = move |_| controller.with_value(|controller| controller.cancel());
	let on_clear = move |_| {
		controller.with_value(|controller| controller.clear_cache());
		shown.set(None);
	};
	let analyzing = move || session.with(|s| s.status == SessionStatus::Analyzing);

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<RelationGraphCanvas
					result=shown
					display_count=display_count
					config=config
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Relationship Graph"</h1>
					<p class="subtitle">"Drag contacts to pin them. Scroll to zoom. Drag background to pan."</p>
					<Show when=move || interrupted>
						<p class="hint">"The previous analysis did not finish. Start it again to refresh."</p>
					</Show>
					<div class="controls">
						<label>"Analyze " {count_input(analyze_count)}</label>
						<label>"Show " {count_input(display_count)}</label>
						<button on:click=on_start disabled=analyzing>"Analyze"</button>
						<button on:click=on_cancel disabled=move || !analyzing()>"Cancel"</button>
						<button on:click=on_clear disabled=analyzing>"Clear cache"</button>
					</div>
					<Show when=analyzing>
						<progress max="100" value=move || session.with(|s| s.progress_percent.to_string()) />
					</Show>
					<p class="status">{move || session.with(progress_line)}</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn inline_config_overrides_defaults_and_bad_input_falls_back() {
		assert_eq!(config_from(None), EngineConfig::default());
		assert_eq!(config_from(Some("  \n ")), EngineConfig::default());

		let config = config_from(Some(r#"{"analysis":{"maxIterations":3}}"#));
		assert_eq!(config.analysis.max_iterations, 3);
		assert_eq!(config.simulation, EngineConfig::default().simulation);

		assert_eq!(config_from(Some("{not json")), EngineConfig::default());
		assert_eq!(
			config_from(Some(r#"{"floating":{"speedMin":2,"speedMax":1}}"#)),
			EngineConfig::default()
		);
	}

	#[test]
	fn progress_line_follows_the_session_status() {
		let mut session = AnalysisSession::default();
		assert_eq!(progress_line(&session), "");

		session.status = SessionStatus::Analyzing;
		session.progress_percent = 50.0;
		session.current_step = 2;
		session.message = "scoring".to_owned();
		assert_eq!(progress_line(&session), "50% · step 2/5 · scoring");

		session.status = SessionStatus::Error;
		session.error_message = Some("rate limited".to_owned());
		assert_eq!(progress_line(&session), "rate limited");
	}
}
