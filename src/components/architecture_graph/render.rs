use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{
	ArchitectureGraphState, CARD_HEIGHT, CARD_WIDTH, LANE_HEADER, LANE_WIDTH, PlacedNode,
};
use crate::graph::classify::{lane, style};

const BACKGROUND: &str = "#f8f9fa";
const LANE_FILL: &str = "rgba(60, 64, 67, 0.04)";
const LABEL_MAX_CHARS: usize = 22;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn truncate(label: &str) -> String {
	if label.chars().count() <= LABEL_MAX_CHARS {
		return label.to_owned();
	}
	let mut short: String = label.chars().take(LABEL_MAX_CHARS - 1).collect();
	short.push('…');
	short
}

pub fn render(state: &ArchitectureGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_lanes(state, ctx);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_lanes(state: &ArchitectureGraphState, ctx: &CanvasRenderingContext2d) {
	let bottom = state
		.nodes
		.iter()
		.map(|n| n.y + CARD_HEIGHT)
		.fold(LANE_HEADER + CARD_HEIGHT, f64::max)
		+ 16.0;
	ctx.set_font("600 12px sans-serif");
	for node_type in &state.lanes {
		let x = 8.0 + lane(*node_type) as f64 * LANE_WIDTH;
		ctx.set_fill_style_str(LANE_FILL);
		ctx.fill_rect(x, 4.0, LANE_WIDTH - 16.0 + 8.0, bottom);
		ctx.set_fill_style_str("#5f6368");
		let _ = ctx.fill_text(style(*node_type).lane_title, x + 8.0, 26.0);
	}
}

fn draw_edges(state: &ArchitectureGraphState, ctx: &CanvasRenderingContext2d) {
	let t = ease_out_cubic(state.highlight.t);
	let has_highlight = state.has_active_highlight();

	for edge in &state.edges {
		let (from, to) = (&state.nodes[edge.from], &state.nodes[edge.to]);
		let (x1, y1) = (from.x + CARD_WIDTH, from.y + CARD_HEIGHT / 2.0);
		let (x2, y2) = (to.x, to.y + CARD_HEIGHT / 2.0);
		let bend = ((x2 - x1).abs() / 2.0).max(24.0);

		let lit = has_highlight && state.is_edge_highlighted(&edge.id);
		// t=0: every edge at 0.45; t=1: lineage at 0.9, the rest at 0.08
		let (alpha, width) = if !has_highlight {
			(0.45, 1.25)
		} else if lit {
			(0.45 + 0.45 * t, 1.25 + 0.75 * t)
		} else {
			(0.45 - 0.37 * t, 1.25)
		};

		ctx.set_stroke_style_str(&format!("rgba(66, 133, 244, {alpha})"));
		ctx.set_line_width(width / state.transform.k.max(0.5));
		if edge.reference {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(6.0),
				&JsValue::from_f64(4.0),
			));
		}
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.bezier_curve_to(x1 + bend, y1, x2 - bend, y2, x2, y2);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		ctx.set_fill_style_str(&format!("rgba(66, 133, 244, {alpha})"));
		ctx.begin_path();
		ctx.move_to(x2, y2);
		ctx.line_to(x2 - 7.0, y2 - 4.0);
		ctx.line_to(x2 - 7.0, y2 + 4.0);
		ctx.close_path();
		ctx.fill();
	}
}

fn draw_nodes(state: &ArchitectureGraphState, ctx: &CanvasRenderingContext2d) {
	let t = ease_out_cubic(state.highlight.t);
	let has_highlight = state.has_active_highlight();

	for node in &state.nodes {
		let lit = state.is_node_highlighted(&node.id);
		let alpha = if has_highlight && !lit { 1.0 - 0.75 * t } else { 1.0 };
		draw_card(state, ctx, node, alpha, has_highlight && lit, t);
	}
}

fn draw_card(
	state: &ArchitectureGraphState,
	ctx: &CanvasRenderingContext2d,
	node: &PlacedNode,
	alpha: f64,
	lit: bool,
	t: f64,
) {
	let node_style = style(node.node_type);
	let (x, y) = (node.x, node.y);
	ctx.set_global_alpha(alpha);

	if lit && t > 0.01 {
		ctx.set_fill_style_str(&format!("rgba(66, 133, 244, {})", 0.18 * t));
		ctx.fill_rect(x - 4.0, y - 4.0, CARD_WIDTH + 8.0, CARD_HEIGHT + 8.0);
	}

	ctx.set_fill_style_str("white");
	ctx.fill_rect(x, y, CARD_WIDTH, CARD_HEIGHT);
	ctx.set_fill_style_str(node_style.color);
	ctx.fill_rect(x, y, 28.0, CARD_HEIGHT);

	let selected = state.selected.as_deref() == Some(node.id.as_str());
	let hovered = state.hovered.as_deref() == Some(node.id.as_str());
	let (outline, outline_width) = if selected {
		("#1a73e8", 2.5)
	} else if hovered {
		("#5f6368", 1.5)
	} else {
		("#dadce0", 1.0)
	};
	ctx.set_stroke_style_str(outline);
	ctx.set_line_width(outline_width);
	ctx.stroke_rect(x, y, CARD_WIDTH, CARD_HEIGHT);

	ctx.set_fill_style_str("white");
	ctx.set_font("bold 10px sans-serif");
	let _ = ctx.fill_text(node_style.glyph, x + 6.0, y + CARD_HEIGHT / 2.0 + 4.0);

	ctx.set_fill_style_str("#202124");
	ctx.set_font("12px sans-serif");
	let _ = ctx.fill_text(&truncate(&node.label), x + 36.0, y + 17.0);

	ctx.set_fill_style_str("#5f6368");
	ctx.set_font("10px sans-serif");
	let _ = ctx.fill_text(node.node_type.as_str(), x + 36.0, y + 31.0);

	if let Some(badge) = node.badge {
		ctx.set_fill_style_str(node_style.color);
		ctx.fill_rect(x + CARD_WIDTH - 34.0, y + 4.0, 30.0, 14.0);
		ctx.set_fill_style_str("white");
		ctx.set_font("bold 9px sans-serif");
		let _ = ctx.fill_text(badge, x + CARD_WIDTH - 30.0, y + 14.0);
	}
	ctx.set_global_alpha(1.0);
}
