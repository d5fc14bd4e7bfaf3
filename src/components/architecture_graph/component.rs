use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ArchitectureGraphState;
use crate::graph::{GraphData, Highlight};

fn local_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?;
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn parent_size(canvas: &HtmlCanvasElement, height: Option<f64>) -> (f64, f64) {
	let parent = canvas.parent_element();
	let w = parent
		.as_ref()
		.map(|p| p.client_width() as f64)
		.filter(|w| *w > 0.0)
		.unwrap_or(1200.0);
	let h = height.unwrap_or_else(|| {
		parent
			.map(|p| p.client_height() as f64)
			.filter(|h| *h > 0.0)
			.unwrap_or(640.0)
	});
	(w, h)
}

/// Swim-lane canvas of the scanned resources.
///
/// Rendering is driven by `graph`, `visible` (nodes outside it are not laid
/// out), `highlight` (everything else is dimmed) and `selected`. Pointer
/// input is reported back through the callbacks.
#[component]
pub fn ArchitectureGraphCanvas(
	#[prop(into)] graph: Signal<GraphData>,
	#[prop(into)] highlight: Signal<Option<Highlight>>,
	#[prop(into)] visible: Signal<Option<HashSet<String>>>,
	#[prop(into)] selected: Signal<Option<String>>,
	on_node_hover: Callback<Option<String>>,
	on_node_click: Callback<String>,
	on_background_click: Callback<()>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state = Rc::new(RefCell::new(ArchitectureGraphState::new(1200.0, 640.0)));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

	let state_data = state.clone();
	Effect::new(move |_| {
		let data = graph.get();
		let visible = visible.get();
		let mut s = state_data.borrow_mut();
		s.set_graph(data);
		s.set_visible(visible);
	});

	let state_focus = state.clone();
	Effect::new(move |_| {
		let mut s = state_focus.borrow_mut();
		s.set_highlight(highlight.get());
		s.selected = selected.get();
	});

	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window): Option<Window> = web_sys::window() else {
			return;
		};
		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => return,
			},
			_ => {
				log::error!("canvas 2d context unavailable");
				return;
			}
		};

		let (w, h) = parent_size(&canvas, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		state_init.borrow_mut().resize(w, h);

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let (nw, nh) = parent_size(&canvas_resize, height);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			state_resize.borrow_mut().resize(nw, nh);
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner, canvas_anim) =
			(state_init.clone(), animate_init.clone(), canvas.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			// unmounted canvases stop their frame loop
			if !canvas_anim.is_connected() {
				return;
			}
			{
				let mut s = state_anim.borrow_mut();
				s.tick(0.016);
				render::render(&s, &ctx);
			}
			if let (Some(cb), Some(win)) = (animate_inner.borrow().as_ref(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		if let Some((x, y)) = local_position(canvas_ref, &ev) {
			state_md.borrow_mut().start_pan(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(canvas_ref, &ev) else {
			return;
		};
		let changed = {
			let mut s = state_mm.borrow_mut();
			s.pan_to(x, y);
			let hovered = if s.pan.moved {
				None
			} else {
				s.node_at_position(x, y).map(|n| n.id.clone())
			};
			(s.hovered != hovered).then(|| {
				s.hovered = hovered.clone();
				hovered
			})
		};
		if let Some(hovered) = changed {
			on_node_hover.run(hovered);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let clicked = {
			let mut s = state_mu.borrow_mut();
			if !s.end_pan() {
				return;
			}
			local_position(canvas_ref, &ev).map(|(x, y)| s.node_at_position(x, y).map(|n| n.id.clone()))
		};
		match clicked {
			Some(Some(id)) => on_node_click.run(id),
			Some(None) => on_background_click.run(()),
			None => {}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let had_hover = {
			let mut s = state_ml.borrow_mut();
			s.end_pan();
			s.hovered.take().is_some()
		};
		if had_hover {
			on_node_hover.run(None);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		if let Some((x, y)) = local_position(canvas_ref, &ev) {
			state_wh.borrow_mut().zoom_at(x, y, ev.delta_y() < 0.0);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="architecture-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
