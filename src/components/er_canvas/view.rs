use serde::{Deserialize, Serialize};

use super::types::GraphData;

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;

const WHEEL_SENSITIVITY: f64 = 0.001;
const ZOOM_STEP: f64 = 1.2;
const FIT_PADDING: f64 = 100.0;

/// Camera transform: screen = world * zoom + (x, y).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
	pub x: f64,
	pub y: f64,
	pub zoom: f64,
}

impl Default for ViewState {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			zoom: 1.0,
		}
	}
}

impl ViewState {
	/// `viewport_origin` is the canvas' top-left corner in the same screen space as `screen`.
	pub fn screen_to_world(&self, screen: (f64, f64), viewport_origin: (f64, f64)) -> (f64, f64) {
		(
			(screen.0 - viewport_origin.0 - self.x) / self.zoom,
			(screen.1 - viewport_origin.1 - self.y) / self.zoom,
		)
	}

	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.x += dx;
		self.y += dy;
	}

	pub fn set_zoom(&mut self, zoom: f64) {
		self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
	}

	pub fn zoom_by(&mut self, delta: f64) {
		self.set_zoom(self.zoom + delta);
	}

	pub fn wheel(&mut self, delta_y: f64) {
		self.zoom_by(-delta_y * WHEEL_SENSITIVITY);
	}

	pub fn zoom_in(&mut self) {
		self.set_zoom(self.zoom * ZOOM_STEP);
	}

	pub fn zoom_out(&mut self) {
		self.set_zoom(self.zoom / ZOOM_STEP);
	}

	/// World coordinate currently shown at the centre of a `width` x `height` viewport.
	pub fn center(&self, width: f64, height: f64) -> (f64, f64) {
		(
			-self.x / self.zoom + width / (2.0 * self.zoom),
			-self.y / self.zoom + height / (2.0 * self.zoom),
		)
	}

	/// Frames every node with padding. Leaves the camera untouched for an empty graph.
	pub fn zoom_to_fit(&mut self, graph: &GraphData, width: f64, height: f64) {
		let Some((min_x, min_y, max_x, max_y)) = graph.bounds() else {
			return;
		};
		let (content_w, content_h) = (
			max_x - min_x + FIT_PADDING * 2.0,
			max_y - min_y + FIT_PADDING * 2.0,
		);
		let zoom = (width / content_w)
			.min(height / content_h)
			.clamp(MIN_ZOOM, MAX_ZOOM);
		let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
		*self = Self {
			x: -cx * zoom + width / 2.0,
			y: -cy * zoom + height / 2.0,
			zoom,
		};
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::er_canvas::types::Node;

	#[test]
	fn screen_to_world_removes_origin_translation_and_zoom() {
		let view = ViewState {
			x: 100.0,
			y: 50.0,
			zoom: 2.0,
		};
		assert_eq!(view.screen_to_world((130.0, 80.0), (10.0, 10.0)), (10.0, 10.0));
	}

	#[test]
	fn zoom_is_clamped() {
		let mut view = ViewState::default();
		view.zoom_by(100.0);
		assert_eq!(view.zoom, MAX_ZOOM);
		view.wheel(1_000_000.0);
		assert_eq!(view.zoom, MIN_ZOOM);
		view.zoom_out();
		assert_eq!(view.zoom, MIN_ZOOM);
	}

	#[test]
	fn zoom_to_fit_centres_content() {
		let graph = GraphData::new(
			vec![
				Node::entity("a", "A", 0.0, 0.0),
				Node::entity("b", "B", 200.0, 100.0),
			],
			Vec::new(),
		);
		let mut view = ViewState::default();
		view.zoom_to_fit(&graph, 800.0, 600.0);
		// content is 400 x 300 with padding, so both axes fit at zoom 2
		assert_eq!(view.zoom, 2.0);
		let centre = view.center(800.0, 600.0);
		assert!((centre.0 - 100.0).abs() < 1e-9);
		assert!((centre.1 - 50.0).abs() < 1e-9);
	}

	#[test]
	fn zoom_to_fit_ignores_empty_graph() {
		let mut view = ViewState::default();
		view.zoom_to_fit(&GraphData::default(), 800.0, 600.0);
		assert_eq!(view, ViewState::default());
	}
}
