use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::scale::category_color;
use super::simulation::LayoutNode;
use super::state::RelationGraphState;

const SUBJECT_COLOR: &str = "#f5f5f7";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn node_color(node: &LayoutNode) -> &'static str {
	node.category
		.map_or(SUBJECT_COLOR, |category| category_color(category.sector()))
}

pub fn clear(ctx: &CanvasRenderingContext2d, width: f64, height: f64) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, width, height);
}

pub fn render(state: &RelationGraphState, ctx: &CanvasRenderingContext2d) {
	clear(ctx, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(state: &RelationGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (line_width, dash, gap, arrow_size) = (1.5 / k, 8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);
	let nodes = state.simulator.nodes();

	for &(source, target) in state.simulator.edges() {
		let (from, to) = (&nodes[source], &nodes[target]);
		let (dx, dy) = (to.x - from.x, to.y - from.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < from.radius + to.radius {
			continue;
		}

		// t=0: all edges at base (0.6), t=1: highlighted at 0.9, others at 0.15
		let (edge_alpha, arrow_alpha, width) =
			if state.is_highlighted(source) && state.is_highlighted(target) {
				(0.6 + 0.3 * t, 0.8 + 0.1 * t, line_width * (1.0 + 0.3 * t))
			} else {
				(0.6 - 0.45 * t, 0.8 - 0.45 * t, line_width * (1.0 - 0.3 * t))
			};

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", edge_alpha));
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(from.x + ux * from.radius, from.y + uy * from.radius);
		ctx.line_to(
			to.x - ux * (to.radius + arrow_size),
			to.y - uy * (to.radius + arrow_size),
		);
		ctx.stroke();

		let _ = ctx.set_line_dash(&js_sys::Array::new());
		ctx.set_fill_style_str(&format!("rgba(100, 180, 255, {})", arrow_alpha));
		let (tip_x, tip_y) = (to.x - ux * to.radius, to.y - uy * to.radius);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_label(ctx: &CanvasRenderingContext2d, node: &LayoutNode, radius: f64, k: f64, style: &str) {
	ctx.set_fill_style_str(style);
	ctx.set_font(&format!("{}px sans-serif", 11.0 / k.max(0.5)));
	let text = match node.grade {
		Some(grade) => format!("{} · {grade:?}", node.label),
		None => node.label.clone(),
	};
	let _ = ctx.fill_text(&text, node.x + radius + 3.0, node.y + 4.0);
}

fn draw_nodes(state: &RelationGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);
	let nodes = state.simulator.nodes();

	for (index, node) in nodes.iter().enumerate() {
		if has_highlight && state.is_highlighted(index) {
			continue;
		}
		let (alpha, radius) = (1.0 - 0.7 * t, node.radius * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node_color(node));
		ctx.fill();
		if node.pinned {
			ctx.set_stroke_style_str("rgba(255, 255, 255, 0.6)");
			ctx.set_line_width(1.0 / k);
			ctx.stroke();
		}
		ctx.set_global_alpha(1.0);

		draw_label(
			ctx,
			node,
			radius,
			k,
			&format!("rgba(255, 255, 255, {})", alpha * 0.8),
		);
	}

	if !has_highlight {
		return;
	}

	for (index, node) in nodes.iter().enumerate() {
		if !state.is_highlighted(index) {
			continue;
		}
		let is_hovered = state.is_hovered(index);
		let is_neighbor =
			state.hover.neighbors.contains(&index) || state.hover.prev_neighbors.contains(&index);

		let (radius, glow_radius) = if is_hovered {
			(node.radius * (1.0 + 0.35 * t), node.radius * (1.8 + 1.2 * t))
		} else if is_neighbor {
			(node.radius * (1.0 + 0.2 * t), node.radius * (1.4 + 0.6 * t))
		} else {
			(node.radius, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
			draw_glow(ctx, node.x, node.y, radius, glow_radius, alpha);
		}

		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node_color(node));
		ctx.fill();

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(node.x, node.y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		draw_label(ctx, node, radius, k, "white");
	}
}

fn draw_glow(
	ctx: &CanvasRenderingContext2d,
	x: f64,
	y: f64,
	radius: f64,
	glow_radius: f64,
	alpha: f64,
) {
	let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) else {
		return;
	};
	let stops: [(f32, String); 3] = [
		(0.0, format!("rgba(255, 255, 255, {})", alpha)),
		(0.6, format!("rgba(200, 220, 255, {})", alpha * 0.3)),
		(1.0, "rgba(255, 255, 255, 0)".to_owned()),
	];
	for (offset, color) in &stops {
		if gradient.add_color_stop(*offset, color).is_err() {
			return;
		}
	}
	ctx.begin_path();
	let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}
