use serde::{Deserialize, Serialize};

use super::frames::{FrameLoop, FrameScheduler};
use super::history::{History, HistoryDepth};
use super::interaction::{Interaction, InteractionMode, Pointer, PointerTarget};
use super::physics::{PhysicsConfig, PhysicsEngine};
use super::selection::Selection;
use super::types::{GraphData, Node, NodeKind};
use super::view::ViewState;

pub const ENTITY_HALF_WIDTH: f64 = 60.0;
pub const ENTITY_HALF_HEIGHT: f64 = 25.0;
pub const ATTRIBUTE_RADIUS_X: f64 = 45.0;
pub const ATTRIBUTE_RADIUS_Y: f64 = 25.0;
pub const RELATIONSHIP_HALF_WIDTH: f64 = 60.0;
pub const RELATIONSHIP_HALF_HEIGHT: f64 = 40.0;

/// The document being edited: what the interaction machine, the physics step
/// and the history manager all read and write.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
	pub graph: GraphData,
	pub selection: Selection,
	pub view: ViewState,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
	pub physics_enabled: bool,
	pub grid_snapping: bool,
	pub grid_size: f64,
}

impl Default for EditorSettings {
	fn default() -> Self {
		Self {
			physics_enabled: true,
			grid_snapping: false,
			grid_size: 20.0,
		}
	}
}

pub struct EditorState {
	pub workspace: Workspace,
	pub config: PhysicsConfig,
	pub settings: EditorSettings,
	pub physics: PhysicsEngine,
	pub interaction: Interaction,
	pub history: History,
	pub frame_loop: FrameLoop,
	pub width: f64,
	pub height: f64,
	pub(super) next_id: u64,
}

impl EditorState {
	pub fn new(graph: GraphData, width: f64, height: f64) -> Self {
		Self {
			workspace: Workspace {
				graph,
				..Workspace::default()
			},
			config: PhysicsConfig::default(),
			settings: EditorSettings::default(),
			physics: PhysicsEngine::new(),
			interaction: Interaction::new(),
			history: History::new(),
			frame_loop: FrameLoop::default(),
			width,
			height,
			next_id: 0,
		}
	}

	pub fn graph(&self) -> &GraphData {
		&self.workspace.graph
	}

	/// Replaces the whole graph without touching history. A gesture in progress
	/// is abandoned.
	pub fn set_graph(&mut self, graph: GraphData) {
		self.interaction.cancel_gesture();
		self.workspace.graph = graph;
	}

	pub fn selection(&self) -> &Selection {
		&self.workspace.selection
	}

	pub fn set_selection(&mut self, selection: Selection) {
		self.workspace.selection = selection;
	}

	pub fn view(&self) -> &ViewState {
		&self.workspace.view
	}

	pub fn set_view(&mut self, view: ViewState) {
		self.workspace.view = view;
		self.workspace.view.set_zoom(view.zoom);
	}

	pub fn set_config(&mut self, config: PhysicsConfig) {
		self.config = config;
	}

	pub fn mode(&self) -> InteractionMode {
		self.interaction.mode()
	}

	pub fn grid(&self) -> Option<f64> {
		let size = self.settings.grid_size;
		(self.settings.grid_snapping && size > 0.0).then_some(size)
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	// history

	pub fn history_depth(&self) -> HistoryDepth {
		self.history.depth()
	}

	pub fn save_history(&mut self) {
		self.history.save(&self.workspace.graph);
	}

	pub fn undo(&mut self) -> bool {
		self.interaction.cancel_gesture();
		self.history
			.undo(&mut self.workspace.graph, &mut self.workspace.selection)
	}

	pub fn redo(&mut self) -> bool {
		self.interaction.cancel_gesture();
		self.history
			.redo(&mut self.workspace.graph, &mut self.workspace.selection)
	}

	// physics

	pub fn set_physics_enabled(&mut self, enabled: bool, scheduler: &mut impl FrameScheduler) {
		self.settings.physics_enabled = enabled;
		if enabled {
			self.frame_loop.start(scheduler);
		} else {
			self.frame_loop.stop(scheduler);
		}
	}

	/// Frame callback entry point. Returns whether the graph was stepped.
	pub fn on_frame(&mut self, scheduler: &mut impl FrameScheduler) -> bool {
		if !self.frame_loop.on_frame(scheduler) {
			return false;
		}
		self.tick();
		true
	}

	pub fn tick(&mut self) {
		let held = self.interaction.held(&self.workspace.selection);
		self.physics
			.step(&mut self.workspace.graph, &self.config, &held);
	}

	// pointer input

	pub fn set_viewport_origin(&mut self, origin: (f64, f64)) {
		self.interaction.set_viewport_origin(origin);
	}

	/// Presses at a point relative to the viewport origin, hit-testing for a node.
	pub fn pointer_down(&mut self, pointer: Pointer) {
		let world = self.screen_to_world(pointer.screen);
		let hit = self.node_at(world.0, world.1).map(|n| n.id.clone());
		let target = match hit.as_deref() {
			Some(id) => PointerTarget::Node(id),
			None => PointerTarget::Canvas,
		};
		self.interaction.pointer_down(
			&mut self.workspace,
			&mut self.physics.velocities,
			target,
			pointer,
		);
	}

	pub fn pointer_move(&mut self, screen: (f64, f64)) {
		self.interaction
			.pointer_move(&mut self.workspace, &mut self.physics.velocities, screen);
	}

	pub fn pointer_up(&mut self) {
		let grid = self.grid();
		if let Some(before) = self.interaction.pointer_up(&mut self.workspace, grid) {
			self.history.record(before);
		}
	}

	pub fn pinch(&mut self, a: (f64, f64), b: (f64, f64)) {
		self.interaction.pinch(&mut self.workspace.view, a, b);
	}

	pub fn end_pinch(&mut self) {
		self.interaction.end_pinch();
	}

	pub fn wheel(&mut self, delta_y: f64) {
		self.workspace.view.wheel(delta_y);
	}

	pub fn zoom_to_fit(&mut self) {
		self.workspace
			.view
			.zoom_to_fit(&self.workspace.graph, self.width, self.height);
	}

	// hit testing

	pub fn screen_to_world(&self, screen: (f64, f64)) -> (f64, f64) {
		self.workspace
			.view
			.screen_to_world(screen, self.interaction.viewport_origin())
	}

	/// Topmost node whose drawn shape covers the world point.
	pub fn node_at(&self, x: f64, y: f64) -> Option<&Node> {
		self.workspace
			.graph
			.nodes
			.iter()
			.rev()
			.find(|n| covers(n, x - n.x, y - n.y))
	}

	pub fn is_selected(&self, id: &str) -> bool {
		self.workspace.selection.contains(id)
	}
}

fn covers(node: &Node, dx: f64, dy: f64) -> bool {
	match node.kind {
		NodeKind::Entity => dx.abs() <= ENTITY_HALF_WIDTH && dy.abs() <= ENTITY_HALF_HEIGHT,
		NodeKind::Attribute => {
			(dx / ATTRIBUTE_RADIUS_X).powi(2) + (dy / ATTRIBUTE_RADIUS_Y).powi(2) <= 1.0
		}
		NodeKind::Relationship => {
			dx.abs() / RELATIONSHIP_HALF_WIDTH + dy.abs() / RELATIONSHIP_HALF_HEIGHT <= 1.0
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::er_canvas::frames::testing::ManualFrames;
	use crate::components::er_canvas::physics::Velocity;
	use crate::components::er_canvas::types::Connection;

	fn editor() -> EditorState {
		EditorState::new(
			GraphData::new(
				vec![
					Node::entity("E1", "Student", 0.0, 0.0),
					Node::attribute("A1", "id", 70.0, 0.0, "E1"),
					Node::relationship("R1", "Takes", 300.0, 0.0),
				],
				vec![Connection::new("c1", "E1", "A1")],
			),
			800.0,
			600.0,
		)
	}

	fn position(editor: &EditorState, id: &str) -> Option<(f64, f64)> {
		editor.graph().node(id).map(|n| (n.x, n.y))
	}

	#[test]
	fn hit_testing_follows_drawn_shapes() {
		let editor = editor();
		assert_eq!(editor.node_at(-59.0, 24.0).map(|n| n.id.as_str()), Some("E1"));
		assert_eq!(editor.node_at(110.0, 0.0).map(|n| n.id.as_str()), Some("A1"));
		assert_eq!(editor.node_at(300.0, 39.0).map(|n| n.id.as_str()), Some("R1"));
		assert!(editor.node_at(350.0, 30.0).is_none());
	}

	#[test]
	fn overlapping_shapes_pick_topmost() {
		let editor = editor();
		// (50, 0) is inside both the entity rectangle and the attribute ellipse
		assert_eq!(editor.node_at(50.0, 0.0).map(|n| n.id.as_str()), Some("A1"));
	}

	#[test]
	fn drag_carries_attribute_while_physics_runs() {
		let mut editor = editor();
		let mut frames = ManualFrames::default();
		editor.set_physics_enabled(true, &mut frames);

		editor.pointer_down(Pointer::primary(-30.0, 0.0));
		assert_eq!(editor.mode(), InteractionMode::DraggingNodes);
		let before = (position(&editor, "E1"), position(&editor, "A1"));

		editor.on_frame(&mut frames);
		editor.pointer_move((-28.0, -1.0));
		editor.on_frame(&mut frames);
		editor.pointer_move((-25.0, -3.0));
		editor.on_frame(&mut frames);

		let (Some(e1), Some(a1)) = before else {
			panic!("nodes missing");
		};
		assert_eq!(position(&editor, "E1"), Some((e1.0 + 5.0, e1.1 - 3.0)));
		assert_eq!(position(&editor, "A1"), Some((a1.0 + 5.0, a1.1 - 3.0)));
	}

	#[test]
	fn undo_after_drag_restores_pre_drag_positions() {
		let mut editor = editor();
		editor.pointer_down(Pointer::primary(300.0, 0.0));
		editor.pointer_move((320.0, 10.0));
		editor.pointer_up();
		assert_eq!(position(&editor, "R1"), Some((320.0, 10.0)));
		assert_eq!(editor.history_depth().past, 1);

		assert!(editor.undo());
		assert_eq!(position(&editor, "R1"), Some((300.0, 0.0)));
		assert!(editor.selection().is_empty());
		assert!(editor.redo());
		assert_eq!(position(&editor, "R1"), Some((320.0, 10.0)));
	}

	#[test]
	fn undo_mid_drag_keeps_redo_branch() {
		let mut editor = editor();
		editor.save_history();
		if let Some(r1) = editor.workspace.graph.node_mut("R1") {
			r1.label = "Enrolls".into();
		}

		editor.pointer_down(Pointer::primary(300.0, 0.0));
		editor.pointer_move((320.0, 10.0));
		assert!(editor.undo());
		assert_eq!(editor.mode(), InteractionMode::Idle);
		editor.pointer_up();

		assert_eq!(editor.history_depth(), HistoryDepth { past: 0, future: 1 });
		assert!(editor.redo());
		assert_eq!(editor.graph().node("R1").map(|n| n.label.as_str()), Some("Enrolls"));
	}

	#[test]
	fn click_while_physics_runs_adds_no_history() {
		let mut editor = editor();
		let drifting = position(&editor, "A1");
		editor.pointer_down(Pointer::primary(300.0, 0.0));
		editor.tick();
		editor.pointer_up();

		assert_ne!(position(&editor, "A1"), drifting);
		assert_eq!(editor.history_depth().past, 0);
	}

	#[test]
	fn non_positive_grid_size_disables_snapping() {
		let mut editor = editor();
		editor.settings.grid_snapping = true;
		editor.settings.grid_size = 0.0;
		assert_eq!(editor.grid(), None);
		editor.settings.grid_size = -20.0;
		assert_eq!(editor.grid(), None);
		editor.settings.grid_size = 20.0;
		assert_eq!(editor.grid(), Some(20.0));
	}

	#[test]
	fn disabling_physics_stops_ticks_and_keeps_velocities() {
		let mut editor = editor();
		let mut frames = ManualFrames::default();
		editor.set_physics_enabled(true, &mut frames);
		assert!(editor.on_frame(&mut frames));
		let velocity = editor.physics.velocities.get("A1");
		assert_ne!(velocity, Velocity::default());

		editor.set_physics_enabled(false, &mut frames);
		let frozen = position(&editor, "A1");
		assert!(!editor.on_frame(&mut frames));
		assert_eq!(position(&editor, "A1"), frozen);

		editor.set_physics_enabled(true, &mut frames);
		assert_eq!(editor.physics.velocities.get("A1"), velocity);
		assert!(editor.on_frame(&mut frames));
	}

	#[test]
	fn set_view_clamps_zoom() {
		let mut editor = editor();
		editor.set_view(ViewState {
			x: 1.0,
			y: 2.0,
			zoom: 9.0,
		});
		assert_eq!(
			*editor.view(),
			ViewState {
				x: 1.0,
				y: 2.0,
				zoom: 4.0
			}
		);
	}
}
