//! Architecture graph console: crawls an agent platform project and renders
//! its resources as an explorable swim-lane graph.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

mod components;
pub mod config;
pub mod crawl;
pub mod error;
pub mod graph;
mod pages;
pub mod state;

use crate::config::ConsoleConfig;
use crate::pages::architecture::Architecture;
use crate::pages::not_found::NotFound;
use crate::state::Session;

/// Routes `log` output to the browser console and installs the panic hook.
/// Safe to call more than once.
pub fn init_logging() {
	if console_log::init_with_level(Level::Debug).is_ok() {
		info!("{} {} starting", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
	}
	console_error_panic_hook::set_once();
}

/// An app router which renders the architecture page and handles 404's.
///
/// The session lives here so a scan survives route changes.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();
	provide_context(ConsoleConfig::load());
	provide_context(RwSignal::new(Session::new()));

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		<Title text="Architecture Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Architecture />
			</Routes>
		</Router>
	}
}
