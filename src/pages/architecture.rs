use leptos::prelude::*;
use leptos::task::spawn_local;
use log::info;

use crate::components::architecture_graph::ArchitectureGraphCanvas;
use crate::components::node_details::NodeDetails;
use crate::components::scan_log::ScanLog;
use crate::config::ConsoleConfig;
use crate::crawl::{Crawler, LogLine, RestFetcher, ScanObserver, ScanStatus};
use crate::graph::classify::style;
use crate::graph::{GraphData, NodeType};
use crate::state::{IndexedGraph, Session};

/// Pushes crawl progress into the page's signals.
struct SignalObserver {
	log: RwSignal<Vec<LogLine>>,
	graph: RwSignal<GraphData>,
}

impl ScanObserver for SignalObserver {
	fn log(&self, line: &LogLine) {
		self.log.update(|lines| lines.push(line.clone()));
	}

	fn graph_updated(&self, graph: &GraphData) {
		self.graph.set(graph.clone());
	}
}

/// Project scan page: inputs, filters, the swim-lane graph and its log.
#[component]
pub fn Architecture() -> impl IntoView {
	let session = expect_context::<RwSignal<Session>>();
	let config = expect_context::<ConsoleConfig>();

	// restore the cached scan so switching tabs doesn't re-scan
	let cached = session.with_untracked(|s| s.last_scan.clone());
	let live_log = RwSignal::new(cached.as_ref().map(|o| o.log.clone()).unwrap_or_default());
	let live_graph = RwSignal::new(cached.map(|o| o.graph).unwrap_or_default());
	// ticket id of the scan in flight
	let active_scan = RwSignal::new(None::<u64>);
	let scanning = Signal::derive(move || active_scan.with(Option::is_some));
	let show_export = RwSignal::new(false);

	let indexed = Memo::new(move |_| IndexedGraph::new(live_graph.get()));
	let highlight = Signal::derive(move || {
		session.with(|s| indexed.with(|g| g.highlight(&s.interaction)))
	});
	let visible = Signal::derive(move || {
		session.with(|s| indexed.with(|g| g.visible(&s.interaction, &s.search, &s.hidden_types)))
	});
	let selected = Signal::derive(move || session.with(|s| s.interaction.selected.clone()));
	let focused = Signal::derive(move || {
		let id = session.with(|s| s.interaction.selected.clone().or_else(|| s.interaction.hovered.clone()))?;
		live_graph.with(|g| g.node(&id).cloned())
	});
	let banner = Signal::derive(move || {
		session.with(|s| {
			s.last_scan.as_ref().and_then(|o| match (o.status, o.error_message()) {
				(_, Some(err)) => Some(("banner banner-error", err)),
				(ScanStatus::Degraded, None) => Some((
					"banner banner-warn",
					"Scan finished with partial data; see the log for failed requests.".to_owned(),
				)),
				_ => None,
			})
		})
	});

	let start_scan = move || {
		let Some((project, token, ticket)) = session.try_update(|s| {
			(s.project.clone(), s.access_token.clone(), s.begin_scan())
		}) else {
			return;
		};
		info!("starting scan of {project}");
		live_log.set(Vec::new());
		live_graph.set(GraphData::default());
		active_scan.set(Some(ticket.id()));

		let config = config.clone();
		spawn_local(async move {
			let crawler = Crawler::new(RestFetcher::new(token, &config), config);
			let observer = SignalObserver {
				log: live_log,
				graph: live_graph,
			};
			let outcome = crawler.scan(&project, &ticket, &observer).await;
			if ticket.is_current() {
				live_graph.set(outcome.graph.clone());
				live_log.set(outcome.log.clone());
			}
			active_scan.update(|active| {
				if *active == Some(ticket.id()) {
					*active = None;
				}
			});
			session.update(|s| {
				s.finish_scan(&ticket, outcome);
			});
		});
	};

	let on_node_hover = Callback::new(move |id: Option<String>| {
		session.update(|s| s.interaction.hover(id));
	});
	let on_node_click = Callback::new(move |id: String| {
		session.update(|s| s.interaction.click(&id));
	});
	let on_background_click = Callback::new(move |_: ()| {
		session.update(|s| s.interaction.clear_selection());
	});

	let type_toggles = NodeType::ALL
		.iter()
		.map(|node_type| {
			let node_type = *node_type;
			let node_style = style(node_type);
			view! {
				<label class="type-toggle" style=format!("border-color: {}", node_style.color)>
					<input
						type="checkbox"
						prop:checked=move || session.with(|s| !s.hidden_types.contains(&node_type))
						on:change=move |_| session.update(|s| s.toggle_type(node_type))
					/>
					{node_style.lane_title}
				</label>
			}
		})
		.collect_view();

	view! {
		<div class="architecture-page">
			<form
				class="scan-form"
				on:submit=move |ev| {
					ev.prevent_default();
					start_scan();
				}
			>
				<input
					type="text"
					placeholder="Project number or id"
					prop:value=move || session.with(|s| s.project.clone())
					on:input=move |ev| {
						let value = event_target_value(&ev);
						if session.try_update(|s| s.set_project(value)).unwrap_or(false) {
							live_log.set(Vec::new());
							live_graph.set(GraphData::default());
							active_scan.set(None);
						}
					}
				/>
				<input
					type="password"
					placeholder="Access token"
					autocomplete="off"
					prop:value=move || session.with(|s| s.access_token.clone())
					on:input=move |ev| {
						let value = event_target_value(&ev);
						session.update(|s| s.access_token = value);
					}
				/>
				<button type="submit" disabled=move || scanning.get()>
					{move || if scanning.get() { "Scanning…" } else { "Scan" }}
				</button>
				<button
					type="button"
					on:click=move |_| {
						session.update(Session::reset);
						live_log.set(Vec::new());
						live_graph.set(GraphData::default());
						active_scan.set(None);
					}
				>
					"Reset"
				</button>
			</form>

			{move || banner.get().map(|(class, text)| view! { <div class=class>{text}</div> })}

			<div class="filters">
				<input
					type="search"
					placeholder="Filter by name, id or type"
					prop:value=move || session.with(|s| s.search.clone())
					on:input=move |ev| {
						let value = event_target_value(&ev);
						session.update(|s| s.search = value);
					}
				/>
				{type_toggles}
				<button type="button" on:click=move |_| show_export.update(|v| *v = !*v)>
					"Export JSON"
				</button>
			</div>

			<div class="graph-layout">
				<div class="graph-panel">
					<Show
						when=move || live_graph.with(|g| !g.is_empty())
						fallback=|| view! { <p class="empty-graph">"Run a scan to map the project."</p> }
					>
						<ArchitectureGraphCanvas
							graph=live_graph
							highlight=highlight
							visible=visible
							selected=selected
							on_node_hover=on_node_hover
							on_node_click=on_node_click
							on_background_click=on_background_click
						/>
					</Show>
				</div>
				<NodeDetails node=focused />
			</div>

			<Show when=move || show_export.get()>
				<pre class="graph-export">
					{move || live_graph.with(|g| serde_json::to_string_pretty(g).unwrap_or_default())}
				</pre>
			</Show>

			<ScanLog lines=live_log scanning=scanning />
		</div>
	}
}
