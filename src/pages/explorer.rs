use std::collections::HashSet;

use futures_util::future::join;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{info, warn};
use web_sys::SubmitEvent;

use crate::components::concept_graph::ConceptGraphCanvas;
use crate::graph::merge::merge;
use crate::graph::model::{ConceptGraph, NodeId};
use crate::oracle::{
	LlmOracle, OracleConfig, OracleError, OracleMode, EXPLANATION_UNAVAILABLE,
};

fn result_state<T>(result: &Result<T, OracleError>) -> &'static str {
	if result.is_ok() { "ok" } else { "failed" }
}

/// The explorer page: search bar, mode toggle, explanation panel and the
/// graph canvas, plus the search/expand/explain flows gluing them to the
/// oracle.
#[component]
pub fn Explorer() -> impl IntoView {
	let graph = RwSignal::new(ConceptGraph::new());
	let loading = RwSignal::new(HashSet::<NodeId>::new());
	let mode = RwSignal::new(OracleMode::Default);
	let query = RwSignal::new(String::new());
	let active = RwSignal::new(None::<NodeId>);
	let panel_pending = RwSignal::new(false);
	let searching = RwSignal::new(false);
	// One client for the whole session; settings are injected here and
	// nowhere else.
	let oracle = StoredValue::new_local(LlmOracle::new(OracleConfig::from_build_env()));

	let on_search = move |ev: SubmitEvent| {
		ev.prevent_default();
		let term = query.get_untracked().trim().to_string();
		if term.is_empty() || searching.get_untracked() {
			return;
		}
		let mode_now = mode.get_untracked();

		// The reset to a bare root is deliberate and survives a failed
		// fetch; only the paired fetch below commits all-or-nothing.
		let Some(root) = graph.try_update(|g| g.reset_to_root(&term)) else {
			return;
		};
		active.set(Some(root));
		panel_pending.set(true);
		searching.set(true);
		loading.update(|l| {
			l.clear();
			l.insert(root);
		});

		spawn_local(async move {
			let oracle = oracle.get_value();
			let (related, explanation) = join(
				oracle.try_related(&term, mode_now),
				oracle.try_explanation(&term),
			)
			.await;

			match (related, explanation) {
				(Ok(items), Ok(text)) => {
					graph.update(|g| {
						let outcome = merge(g, root, (0.0, 0.0), &items);
						if let Some(node) = g.node_mut(root) {
							if node.explanation.is_none() {
								node.explanation = Some(text);
							}
						}
						info!(
							"search {term:?}: +{} nodes, +{} edges",
							outcome.nodes_added, outcome.edges_added
						);
					});
				}
				(related, explanation) => {
					warn!(
						"search {term:?} failed (related: {}, explanation: {}), graph left at root",
						result_state(&related),
						result_state(&explanation)
					);
				}
			}
			if active.get_untracked() == Some(root) {
				panel_pending.set(false);
			}
			loading.update(|l| {
				l.remove(&root);
			});
			searching.set(false);
		});
	};

	let on_node_click = Callback::new(move |id: NodeId| {
		active.set(Some(id));
		let Some((label, cached)) = graph
			.with_untracked(|g| g.node(id).map(|n| (n.label.clone(), n.explanation.clone())))
		else {
			return;
		};
		if cached.is_some() {
			// Cache hit: at most one fetch per node per session.
			panel_pending.set(false);
			return;
		}
		panel_pending.set(true);
		spawn_local(async move {
			let oracle = oracle.get_value();
			match oracle.try_explanation(&label).await {
				Ok(text) => graph.update(|g| {
					if let Some(node) = g.node_mut(id) {
						if node.explanation.is_none() {
							node.explanation = Some(text);
						}
					}
				}),
				// Failures are not cached, so another click retries.
				Err(err) => warn!("explanation for {label:?} failed: {err}"),
			}
			// The panel derives from the active node, so a result for a
			// node the user has moved on from is never displayed.
			if active.get_untracked() == Some(id) {
				panel_pending.set(false);
			}
		});
	});

	let on_node_expand = Callback::new(move |(id, pos): (NodeId, (f64, f64))| {
		if loading.with_untracked(|l| l.contains(&id)) {
			return;
		}
		let Some(label) = graph.with_untracked(|g| g.node(id).map(|n| n.label.clone())) else {
			return;
		};
		let mode_now = mode.get_untracked();
		loading.update(|l| {
			l.insert(id);
		});
		spawn_local(async move {
			let oracle = oracle.get_value();
			let items = oracle.fetch_related(&label, mode_now).await;
			if items.is_empty() {
				info!("no expansion for {label:?}");
			} else {
				graph.update(|g| {
					let outcome = merge(g, id, pos, &items);
					info!(
						"expanded {label:?}: +{} nodes, +{} edges",
						outcome.nodes_added, outcome.edges_added
					);
				});
			}
			loading.update(|l| {
				l.remove(&id);
			});
		});
	});

	let panel = move || {
		active
			.get()
			.and_then(|id| {
				graph.with(|g| g.node(id).map(|n| (n.label.clone(), n.explanation.clone())))
			})
			.map(|(label, explanation)| {
				let text = match explanation {
					Some(text) => text,
					None if panel_pending.get() => "Asking the oracle…".to_string(),
					None => EXPLANATION_UNAVAILABLE.to_string(),
				};
				view! {
					<div class="explanation-panel">
						<h2>{label}</h2>
						<p>{text}</p>
					</div>
				}
			})
	};

	view! {
		<div class="explorer">
			<ConceptGraphCanvas
				data=graph
				loading=loading
				on_node_click=on_node_click
				on_node_expand=on_node_expand
			/>
			<div class="explorer-overlay">
				<h1>"Concept Canvas"</h1>
				<form on:submit=on_search>
					<input
						type="text"
						placeholder="Start with a concept…"
						prop:value=move || query.get()
						on:input=move |ev| query.set(event_target_value(&ev))
					/>
					<button type="submit" disabled=move || searching.get()>
						{move || if searching.get() { "Searching…" } else { "Explore" }}
					</button>
				</form>
				<label class="mode-toggle">
					<input
						type="checkbox"
						prop:checked=move || mode.get() == OracleMode::Precise
						on:change=move |ev| {
							mode.set(if event_target_checked(&ev) {
								OracleMode::Precise
							} else {
								OracleMode::Default
							});
						}
					/>
					"Precise relations"
				</label>
				<p class="hint">
					"Click a node for an explanation. Hold it for a second to expand. Drag to rearrange, scroll to zoom."
				</p>
			</div>
			{panel}
		</div>
	}
}
