use leptos::prelude::*;

use crate::crawl::{LogLevel, LogLine};

fn level_class(level: LogLevel) -> &'static str {
	match level {
		LogLevel::Info => "log-line",
		LogLevel::Warn => "log-line log-warn",
		LogLevel::Error => "log-line log-error",
	}
}

/// Expandable live scan log.
#[component]
pub fn ScanLog(#[prop(into)] lines: Signal<Vec<LogLine>>, #[prop(into)] scanning: Signal<bool>) -> impl IntoView {
	let warnings = move || {
		lines.with(|l| l.iter().filter(|line| line.level != LogLevel::Info).count())
	};

	view! {
		<details class="scan-log" open=move || scanning.get()>
			<summary>
				"Scan log (" {move || lines.with(Vec::len)} " lines"
				{move || match warnings() {
					0 => String::new(),
					n => format!(", {n} problem(s)"),
				}}
				")"
			</summary>
			<ol>
				{move || {
					lines
						.get()
						.into_iter()
						.map(|line| {
							view! { <li class=level_class(line.level)>{line.to_string()}</li> }
						})
						.collect_view()
				}}
			</ol>
		</details>
	}
}
