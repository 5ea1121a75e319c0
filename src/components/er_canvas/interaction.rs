//! Pointer and gesture state machine.
//!
//! Exactly one of idle, panning, box-selecting or dragging is active at a time.
//! Drags and box selection work in world space, panning in screen space. Every
//! move applies the delta since the previous event, so drags compose with the
//! physics step that runs between events.

use log::debug;
use serde::{Deserialize, Serialize};

use super::physics::{Held, Velocities};
use super::selection::Selection;
use super::state::Workspace;
use super::types::GraphData;
use super::view::ViewState;

const PINCH_SENSITIVITY: f64 = 0.01;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionMode {
	#[default]
	Idle,
	Panning,
	BoxSelecting,
	DraggingNodes,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PointerButton {
	#[default]
	Primary,
	Auxiliary,
	Secondary,
}

impl PointerButton {
	/// Maps a DOM `MouseEvent.button` value.
	pub fn from_dom(button: i16) -> Self {
		match button {
			1 => PointerButton::Auxiliary,
			2 => PointerButton::Secondary,
			_ => PointerButton::Primary,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
	/// Ctrl, Cmd or Shift: extend the selection instead of replacing it.
	pub additive: bool,
	/// Space held: a primary press on the canvas pans.
	pub pan: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
	pub screen: (f64, f64),
	pub button: PointerButton,
	pub modifiers: Modifiers,
}

impl Pointer {
	pub fn primary(x: f64, y: f64) -> Self {
		Self {
			screen: (x, y),
			..Self::default()
		}
	}

	fn is_pan_gesture(&self) -> bool {
		self.modifiers.pan || self.button != PointerButton::Primary
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerTarget<'a> {
	Canvas,
	Node(&'a str),
}

/// Axis-aligned box in world space; containment includes the edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionBox {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl SelectionBox {
	pub fn between(a: (f64, f64), b: (f64, f64)) -> Self {
		Self {
			min_x: a.0.min(b.0),
			min_y: a.1.min(b.1),
			max_x: a.0.max(b.0),
			max_y: a.1.max(b.1),
		}
	}

	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	pub fn contains(&self, x: f64, y: f64) -> bool {
		x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
	}
}

#[derive(Clone, Debug, Default)]
pub struct Interaction {
	mode: InteractionMode,
	/// Screen point while panning, world point otherwise.
	anchor: (f64, f64),
	viewport_origin: (f64, f64),
	selection_box: Option<SelectionBox>,
	drag_snapshot: Option<GraphData>,
	pinch_distance: Option<f64>,
}

impl Interaction {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn mode(&self) -> InteractionMode {
		self.mode
	}

	pub fn selection_box(&self) -> Option<&SelectionBox> {
		self.selection_box.as_ref()
	}

	pub fn viewport_origin(&self) -> (f64, f64) {
		self.viewport_origin
	}

	pub fn set_viewport_origin(&mut self, origin: (f64, f64)) {
		self.viewport_origin = origin;
	}

	/// Nodes the physics step must leave alone right now.
	pub fn held<'a>(&self, selection: &'a Selection) -> Held<'a> {
		match self.mode {
			InteractionMode::DraggingNodes => Held::selection(selection),
			_ => Held::nothing(),
		}
	}

	fn to_world(&self, view: &ViewState, screen: (f64, f64)) -> (f64, f64) {
		view.screen_to_world(screen, self.viewport_origin)
	}

	fn enter(&mut self, mode: InteractionMode) {
		debug!("interaction {:?} -> {:?}", self.mode, mode);
		self.mode = mode;
	}

	pub fn pointer_down(
		&mut self,
		ws: &mut Workspace,
		velocities: &mut Velocities,
		target: PointerTarget<'_>,
		pointer: Pointer,
	) {
		if self.mode != InteractionMode::Idle {
			return;
		}
		match target {
			PointerTarget::Canvas if pointer.is_pan_gesture() => {
				self.anchor = pointer.screen;
				self.enter(InteractionMode::Panning);
			}
			PointerTarget::Canvas => {
				if !pointer.modifiers.additive {
					ws.selection.clear();
				}
				let world = self.to_world(&ws.view, pointer.screen);
				self.anchor = world;
				self.selection_box = Some(SelectionBox::between(world, world));
				self.enter(InteractionMode::BoxSelecting);
			}
			PointerTarget::Node(id) => {
				if pointer.modifiers.additive {
					ws.selection.toggle(id);
				} else if !ws.selection.contains(id) {
					ws.selection.replace([id]);
				}
				for id in ws.selection.iter() {
					velocities.zero(id);
				}
				self.anchor = self.to_world(&ws.view, pointer.screen);
				self.drag_snapshot = Some(ws.graph.clone());
				self.enter(InteractionMode::DraggingNodes);
			}
		}
	}

	pub fn pointer_move(&mut self, ws: &mut Workspace, velocities: &mut Velocities, screen: (f64, f64)) {
		match self.mode {
			InteractionMode::Idle => {}
			InteractionMode::Panning => {
				ws.view
					.pan_by(screen.0 - self.anchor.0, screen.1 - self.anchor.1);
				self.anchor = screen;
			}
			InteractionMode::BoxSelecting => {
				let area = SelectionBox::between(self.anchor, self.to_world(&ws.view, screen));
				ws.selection.replace(
					ws.graph
						.nodes
						.iter()
						.filter(|n| area.contains(n.x, n.y))
						.map(|n| n.id.clone()),
				);
				self.selection_box = Some(area);
			}
			InteractionMode::DraggingNodes => {
				let world = self.to_world(&ws.view, screen);
				let (dx, dy) = (world.0 - self.anchor.0, world.1 - self.anchor.1);
				let moving = ws.graph.moving_set(&ws.selection);
				ws.graph.translate(&moving, dx, dy);
				for id in &moving {
					velocities.zero(id);
				}
				self.anchor = world;
			}
		}
	}

	/// Ends the current gesture. After a drag that changed the graph, returns the
	/// graph as it was when the drag started, for the caller to record in history.
	pub fn pointer_up(&mut self, ws: &mut Workspace, grid_size: Option<f64>) -> Option<GraphData> {
		let mode = self.mode;
		self.enter(InteractionMode::Idle);
		self.selection_box = None;
		let snapshot = self.drag_snapshot.take();
		if mode != InteractionMode::DraggingNodes {
			return None;
		}
		let moving = ws.graph.moving_set(&ws.selection);
		if let Some(size) = grid_size {
			ws.graph.snap_to_grid(&moving, size);
		}
		// physics may have moved other nodes meanwhile; only the carried ones count
		let before = snapshot?;
		let moved = ws
			.graph
			.nodes
			.iter()
			.filter(|n| moving.contains(&n.id))
			.any(|n| before.node(&n.id).is_none_or(|b| b.x != n.x || b.y != n.y));
		moved.then_some(before)
	}

	/// Abandons any gesture in progress without recording it. Used when the
	/// graph is swapped out from under a drag.
	pub fn cancel_gesture(&mut self) {
		if self.mode != InteractionMode::Idle {
			self.enter(InteractionMode::Idle);
		}
		self.selection_box = None;
		self.drag_snapshot = None;
		self.pinch_distance = None;
	}

	/// Two-finger zoom; call on every move with both touch points.
	pub fn pinch(&mut self, view: &mut ViewState, a: (f64, f64), b: (f64, f64)) {
		let distance = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
		if let Some(last) = self.pinch_distance {
			view.zoom_by((distance - last) * PINCH_SENSITIVITY);
		}
		self.pinch_distance = Some(distance);
	}

	pub fn end_pinch(&mut self) {
		self.pinch_distance = None;
	}
}
