//! ER diagram editor: a force-directed canvas with selection, dragging, undo and
//! JSON persistence.

mod component;
mod edit;
mod frames;
mod graph;
mod history;
mod interaction;
mod io;
mod physics;
mod render;
mod selection;
mod state;
mod types;
mod view;

pub use component::ErCanvas;
pub use edit::{AttributeDraft, EditingTarget, EntityDraft, RelationshipDraft};
pub use frames::{AnimationFrames, FrameLoop, FrameScheduler, FrameToken};
pub use graph::snap;
pub use history::{History, HistoryDepth, MAX_HISTORY};
pub use interaction::{
	Interaction, InteractionMode, Modifiers, Pointer, PointerButton, PointerTarget, SelectionBox,
};
pub use physics::{Held, MAX_VELOCITY, PhysicsConfig, PhysicsEngine, Velocities, Velocity};
pub use selection::Selection;
pub use state::{EditorSettings, EditorState, Workspace};
pub use types::{Cardinality, Connection, GraphData, Node, NodeKind};
pub use view::{MAX_ZOOM, MIN_ZOOM, ViewState};
