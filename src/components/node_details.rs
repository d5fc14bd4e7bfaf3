use leptos::prelude::*;

use crate::graph::classify::{classify_cloud_run, console_link};
use crate::graph::{GraphNode, NodeType};

/// Side panel for the focused node: identity, console link and raw payload.
#[component]
pub fn NodeDetails(#[prop(into)] node: Signal<Option<GraphNode>>) -> impl IntoView {
	move || {
		let Some(node) = node.get() else {
			return view! { <aside class="node-details empty">"Hover or click a resource to inspect it."</aside> }
				.into_any();
		};
		let hosting = match node.node_type {
			NodeType::CloudRunService => Some(classify_cloud_run(&node.data)),
			_ => None,
		}
		.filter(|kind| kind.is_agent_hosting())
		.and_then(|kind| kind.badge());
		let link = console_link(&node);
		let payload = serde_json::to_string_pretty(&node.data).unwrap_or_default();

		view! {
			<aside class="node-details">
				<h3>{node.label.clone()}</h3>
				<p class="node-type">
					{node.node_type.as_str()}
					{hosting.map(|badge| view! { <span class="badge">{badge}</span> })}
				</p>
				<code class="node-id">{node.id.clone()}</code>
				{link.map(|href| view! {
					<p><a href=href target="_blank" rel="noopener">"Open in Cloud console"</a></p>
				})}
				<pre class="node-payload">{payload}</pre>
			</aside>
		}
		.into_any()
	}
}
