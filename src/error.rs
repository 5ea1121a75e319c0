//! Errors surfaced by editor operations that validate caller input.

use thiserror::Error;

use crate::components::er_canvas::NodeKind;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejected input. Steady-state conditions inside the editor core (stale ids,
/// coincident points, empty history) are not errors.
#[derive(Debug, Error)]
pub enum Error {
	/// Import text was not a `{ nodes, connections }` document.
	#[error("invalid diagram JSON: {0}")]
	Json(#[from] serde_json::Error),

	/// A create or update draft had a blank label.
	#[error("{kind:?} label must not be empty")]
	EmptyLabel {
		/// Kind of node the draft describes.
		kind: NodeKind,
	},

	/// A draft referred to a node that does not exist or has the wrong kind.
	#[error("unknown {expected:?} node: {id}")]
	UnknownNode {
		/// Id as given in the draft.
		id: String,
		/// Kind the draft required.
		expected: NodeKind,
	},
}
