//! JSON import and export of `{ nodes, connections }` documents.

use log::info;

use super::state::EditorState;
use super::types::GraphData;
use crate::error::Result;

impl GraphData {
	/// Pretty-printed document. Flags that are false and absent parents are omitted.
	pub fn to_json(&self) -> Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	pub fn from_json(text: &str) -> Result<Self> {
		Ok(serde_json::from_str(text)?)
	}
}

impl EditorState {
	pub fn export_json(&self) -> Result<String> {
		self.workspace.graph.to_json()
	}

	/// Parses and loads a document. On error the current graph is left as it was.
	pub fn import_json(&mut self, text: &str) -> Result<()> {
		let graph = GraphData::from_json(text)?;
		self.load(graph);
		Ok(())
	}

	/// Swaps in a new graph, dropping selection, velocities and any gesture in
	/// progress. History is kept so the load itself can be undone.
	pub fn load(&mut self, graph: GraphData) {
		self.save_history();
		info!(
			"loaded diagram with {} node(s) and {} connection(s)",
			graph.nodes.len(),
			graph.connections.len()
		);
		self.workspace.graph = graph;
		self.workspace.selection.clear();
		self.physics.velocities.clear();
		self.interaction.cancel_gesture();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::er_canvas::selection::Selection;
	use crate::components::er_canvas::types::{Cardinality, Connection, Node, NodeKind};
	use crate::error::Error;

	fn sample() -> GraphData {
		let mut weak = Node::entity("e1", "Dependent", 0.0, 0.0);
		weak.is_weak = true;
		let mut key = Node::attribute("a1", "name", 80.0, 0.0, "e1");
		key.is_primary_key = true;
		let mut phones = Node::attribute("a2", "phones", -80.0, 0.0, "e1");
		phones.is_multivalued = true;
		phones.is_derived = true;
		GraphData::new(
			vec![
				weak,
				key,
				phones,
				Node::relationship("r1", "Has", 200.0, 50.5),
			],
			vec![
				Connection::new("c1", "e1", "a1"),
				Connection::new("c2", "e1", "a2"),
				Connection::new("c3", "e1", "r1").with_cardinality(Cardinality::N),
			],
		)
	}

	#[test]
	fn export_then_import_is_lossless() {
		let graph = sample();
		let text = graph.to_json().unwrap();
		assert_eq!(GraphData::from_json(&text).unwrap(), graph);
	}

	#[test]
	fn export_uses_document_field_names() {
		let text = sample().to_json().unwrap();
		let value: serde_json::Value = serde_json::from_str(&text).unwrap();
		let first = &value["nodes"][0];
		assert_eq!(first["type"], "ENTITY");
		assert_eq!(first["isWeak"], true);
		assert!(first.get("parentId").is_none());
		assert!(first.get("isPrimaryKey").is_none());
		assert_eq!(value["nodes"][1]["parentId"], "e1");
		assert_eq!(value["connections"][2]["sourceId"], "e1");
		assert_eq!(value["connections"][2]["label"], "N");
		assert!(value["connections"][0].get("label").is_none());
	}

	#[test]
	fn import_accepts_minimal_documents() {
		let text = r#"{
			"nodes": [
				{ "id": "x", "type": "ATTRIBUTE", "label": "age", "x": 1, "y": 2, "parentId": "p" }
			],
			"connections": []
		}"#;
		let graph = GraphData::from_json(text).unwrap();
		let node = graph.node("x").unwrap();
		assert_eq!(node.kind, NodeKind::Attribute);
		assert_eq!(node.parent_id.as_deref(), Some("p"));
		assert!(!node.is_primary_key && !node.is_derived);
	}

	#[test]
	fn import_rejects_wrong_shape_and_keeps_graph() {
		let mut editor = EditorState::new(sample(), 800.0, 600.0);
		editor.set_selection(Selection::from_iter(["e1"]));

		for bad in [r#"{ "nodes": [] }"#, "[]", "not json", r#"{"nodes":[{"id":"a"}],"connections":[]}"#] {
			assert!(matches!(editor.import_json(bad), Err(Error::Json(_))), "{bad}");
		}
		assert_eq!(*editor.graph(), sample());
		assert_eq!(editor.selection().len(), 1);
		assert_eq!(editor.history_depth().past, 0);
	}

	#[test]
	fn import_replaces_graph_and_can_be_undone() {
		let mut editor = EditorState::new(GraphData::default(), 800.0, 600.0);
		editor.tick();
		editor.import_json(&sample().to_json().unwrap()).unwrap();
		assert_eq!(*editor.graph(), sample());
		assert!(editor.physics.velocities.is_empty());

		assert!(editor.undo());
		assert!(editor.graph().is_empty());
	}
}
