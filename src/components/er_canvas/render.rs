use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::interaction::SelectionBox;
use super::state::{
	ATTRIBUTE_RADIUS_X, ATTRIBUTE_RADIUS_Y, ENTITY_HALF_HEIGHT, ENTITY_HALF_WIDTH, EditorState,
	RELATIONSHIP_HALF_HEIGHT, RELATIONSHIP_HALF_WIDTH,
};
use super::types::{Node, NodeKind};

const BACKGROUND: &str = "#f8fafc";
const GRID_LINE: &str = "#e2e8f0";
const INK: &str = "#1e293b";
const EDGE: &str = "#64748b";
const SELECTED: &str = "#2563eb";
const BADGE_RADIUS: f64 = 12.0;
const BADGE_OFFSET: f64 = 20.0;
const WEAK_INSET: f64 = 6.0;
const MULTIVALUED_OUTSET: f64 = 5.0;

fn dash(ctx: &CanvasRenderingContext2d, on: f64, off: f64) {
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(on),
		&JsValue::from_f64(off),
	));
}

fn solid(ctx: &CanvasRenderingContext2d) {
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

pub fn render(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);

	let view = state.view();
	ctx.save();
	let _ = ctx.translate(view.x, view.y);
	let _ = ctx.scale(view.zoom, view.zoom);
	if let Some(size) = state.grid() {
		draw_grid(state, ctx, size);
	}
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	ctx.set_font("14px sans-serif");
	draw_connections(state, ctx);
	for node in &state.graph().nodes {
		draw_node(ctx, node, state.is_selected(&node.id));
	}
	if let Some(area) = state.interaction.selection_box() {
		draw_selection_box(ctx, area, view.zoom);
	}
	ctx.restore();
}

fn draw_grid(state: &EditorState, ctx: &CanvasRenderingContext2d, size: f64) {
	let view = state.view();
	let (left, top) = view.screen_to_world((0.0, 0.0), (0.0, 0.0));
	let (right, bottom) = view.screen_to_world((state.width, state.height), (0.0, 0.0));

	ctx.set_stroke_style_str(GRID_LINE);
	ctx.set_line_width(1.0 / view.zoom);
	ctx.begin_path();
	let mut x = (left / size).floor() * size;
	while x <= right {
		ctx.move_to(x, top);
		ctx.line_to(x, bottom);
		x += size;
	}
	let mut y = (top / size).floor() * size;
	while y <= bottom {
		ctx.move_to(left, y);
		ctx.line_to(right, y);
		y += size;
	}
	ctx.stroke();
}

fn draw_connections(state: &EditorState, ctx: &CanvasRenderingContext2d) {
	let graph = state.graph();
	for conn in &graph.connections {
		let (Some(a), Some(b)) = (graph.node(&conn.source_id), graph.node(&conn.target_id)) else {
			continue;
		};
		let selected = state.is_selected(&a.id) || state.is_selected(&b.id);
		let many = conn.cardinality().is_some_and(|c| c.is_many());

		ctx.set_stroke_style_str(if selected { SELECTED } else { EDGE });
		ctx.set_line_width(if many { 4.0 } else { 1.5 });
		ctx.begin_path();
		ctx.move_to(a.x, a.y);
		ctx.line_to(b.x, b.y);
		ctx.stroke();

		if let Some(label) = &conn.label {
			draw_badge(ctx, a, b, label, selected);
		}
	}
}

/// Cardinality badge beside the midpoint, pushed off the line along its normal.
fn draw_badge(ctx: &CanvasRenderingContext2d, a: &Node, b: &Node, label: &str, selected: bool) {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len = (dx * dx + dy * dy).sqrt();
	let (nx, ny) = if len < 1e-6 { (0.0, -1.0) } else { (-dy / len, dx / len) };
	let (x, y) = (
		(a.x + b.x) / 2.0 + nx * BADGE_OFFSET,
		(a.y + b.y) / 2.0 + ny * BADGE_OFFSET,
	);

	ctx.begin_path();
	let _ = ctx.arc(x, y, BADGE_RADIUS, 0.0, 2.0 * PI);
	ctx.set_fill_style_str("white");
	ctx.fill();
	ctx.set_stroke_style_str(if selected { SELECTED } else { EDGE });
	ctx.set_line_width(1.5);
	ctx.stroke();
	ctx.set_fill_style_str(INK);
	let _ = ctx.fill_text(label, x, y);
}

fn draw_node(ctx: &CanvasRenderingContext2d, node: &Node, selected: bool) {
	let (x, y) = (node.x, node.y);
	ctx.set_fill_style_str("white");
	ctx.set_stroke_style_str(if selected { SELECTED } else { INK });
	ctx.set_line_width(if selected { 3.0 } else { 2.0 });

	match node.kind {
		NodeKind::Entity => {
			let (w, h) = (ENTITY_HALF_WIDTH * 2.0, ENTITY_HALF_HEIGHT * 2.0);
			ctx.fill_rect(x - ENTITY_HALF_WIDTH, y - ENTITY_HALF_HEIGHT, w, h);
			ctx.stroke_rect(x - ENTITY_HALF_WIDTH, y - ENTITY_HALF_HEIGHT, w, h);
			if node.is_weak {
				ctx.stroke_rect(
					x - ENTITY_HALF_WIDTH + WEAK_INSET,
					y - ENTITY_HALF_HEIGHT + WEAK_INSET,
					w - WEAK_INSET * 2.0,
					h - WEAK_INSET * 2.0,
				);
			}
		}
		NodeKind::Attribute => {
			if node.is_multivalued {
				ellipse(
					ctx,
					x,
					y,
					ATTRIBUTE_RADIUS_X + MULTIVALUED_OUTSET,
					ATTRIBUTE_RADIUS_Y + MULTIVALUED_OUTSET,
				);
				ctx.fill();
				ctx.stroke();
			}
			if node.is_derived {
				dash(ctx, 5.0, 5.0);
			}
			ellipse(ctx, x, y, ATTRIBUTE_RADIUS_X, ATTRIBUTE_RADIUS_Y);
			ctx.fill();
			ctx.stroke();
			solid(ctx);
		}
		NodeKind::Relationship => {
			ctx.begin_path();
			ctx.move_to(x, y - RELATIONSHIP_HALF_HEIGHT);
			ctx.line_to(x + RELATIONSHIP_HALF_WIDTH, y);
			ctx.line_to(x, y + RELATIONSHIP_HALF_HEIGHT);
			ctx.line_to(x - RELATIONSHIP_HALF_WIDTH, y);
			ctx.close_path();
			ctx.fill();
			ctx.stroke();
		}
	}

	ctx.set_fill_style_str(INK);
	let _ = ctx.fill_text(&node.label, x, y);
	if node.is_primary_key {
		let half = ctx
			.measure_text(&node.label)
			.map(|m| m.width() / 2.0)
			.unwrap_or(0.0);
		ctx.set_stroke_style_str(INK);
		ctx.set_line_width(1.0);
		ctx.begin_path();
		ctx.move_to(x - half, y + 9.0);
		ctx.line_to(x + half, y + 9.0);
		ctx.stroke();
	}
}

fn ellipse(ctx: &CanvasRenderingContext2d, x: f64, y: f64, rx: f64, ry: f64) {
	ctx.begin_path();
	let _ = ctx.ellipse(x, y, rx, ry, 0.0, 0.0, 2.0 * PI);
}

fn draw_selection_box(ctx: &CanvasRenderingContext2d, area: &SelectionBox, zoom: f64) {
	ctx.set_fill_style_str("rgba(37, 99, 235, 0.1)");
	ctx.fill_rect(area.min_x, area.min_y, area.width(), area.height());
	ctx.set_stroke_style_str(SELECTED);
	ctx.set_line_width(1.0 / zoom);
	dash(ctx, 4.0 / zoom, 4.0 / zoom);
	ctx.stroke_rect(area.min_x, area.min_y, area.width(), area.height());
	solid(ctx);
}
