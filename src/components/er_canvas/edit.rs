//! Create, update and delete operations behind the entity and relationship forms.
//!
//! Each one validates its draft first and then saves history before touching the
//! graph, so the top of the undo stack is always the pre-edit state.

use std::collections::HashSet;
use std::f64::consts::PI;

use log::debug;

use super::graph::snap;
use super::state::EditorState;
use super::types::{Cardinality, Connection, GraphData, Node, NodeKind};
use crate::error::{Error, Result};

const NEW_ENTITY_ATTRIBUTE_RADIUS: f64 = 100.0;
const ADDED_ATTRIBUTE_RADIUS: f64 = 80.0;
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeDraft {
	/// Set when the draft edits an attribute that already exists.
	pub id: Option<String>,
	pub label: String,
	pub is_primary_key: bool,
	pub is_multivalued: bool,
	pub is_derived: bool,
}

impl AttributeDraft {
	pub fn new(label: impl Into<String>) -> Self {
		Self {
			label: label.into(),
			..Self::default()
		}
	}

	pub fn primary_key(mut self) -> Self {
		self.is_primary_key = true;
		self
	}

	pub fn multivalued(mut self) -> Self {
		self.is_multivalued = true;
		self
	}

	pub fn derived(mut self) -> Self {
		self.is_derived = true;
		self
	}

	fn of(node: &Node) -> Self {
		Self {
			id: Some(node.id.clone()),
			label: node.label.clone(),
			is_primary_key: node.is_primary_key,
			is_multivalued: node.is_multivalued,
			is_derived: node.is_derived,
		}
	}

	fn apply(&self, node: &mut Node) {
		node.label = self.label.clone();
		node.is_primary_key = self.is_primary_key;
		node.is_multivalued = self.is_multivalued;
		node.is_derived = self.is_derived;
	}

	fn is_blank(&self) -> bool {
		self.label.trim().is_empty()
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityDraft {
	pub label: String,
	pub weak: bool,
	pub attributes: Vec<AttributeDraft>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipDraft {
	pub label: String,
	pub first: String,
	pub second: String,
	pub first_cardinality: Cardinality,
	pub second_cardinality: Cardinality,
	pub attributes: Vec<AttributeDraft>,
}

/// What a single selected node puts the forms into editing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditingTarget {
	Entity(String),
	Relationship(String),
}

fn require_label(label: &str, kind: NodeKind) -> Result<()> {
	if label.trim().is_empty() {
		return Err(Error::EmptyLabel { kind });
	}
	Ok(())
}

fn require_kind(graph: &GraphData, id: &str, expected: NodeKind) -> Result<(f64, f64)> {
	match graph.node(id) {
		Some(node) if node.kind == expected => Ok((node.x, node.y)),
		_ => Err(Error::UnknownNode {
			id: id.to_owned(),
			expected,
		}),
	}
}

fn place_attribute(
	graph: &mut GraphData,
	next_id: &mut u64,
	parent: &str,
	position: (f64, f64),
	draft: &AttributeDraft,
) -> String {
	let id = graph.fresh_id("a", next_id);
	let mut node = Node::attribute(id.clone(), draft.label.clone(), position.0, position.1, parent);
	draft.apply(&mut node);
	graph.nodes.push(node);
	let conn = graph.fresh_id("c", next_id);
	graph.connections.push(Connection::new(conn, parent, id.clone()));
	id
}

/// Adds the non-blank drafts around `centre`, evenly spaced on a circle.
fn spread_attributes(
	graph: &mut GraphData,
	next_id: &mut u64,
	parent: &str,
	centre: (f64, f64),
	drafts: &[AttributeDraft],
) {
	for (i, draft) in drafts.iter().enumerate() {
		if draft.is_blank() {
			continue;
		}
		let angle = i as f64 / drafts.len() as f64 * PI * 2.0;
		let position = (
			centre.0 + angle.cos() * NEW_ENTITY_ATTRIBUTE_RADIUS,
			centre.1 + angle.sin() * NEW_ENTITY_ATTRIBUTE_RADIUS,
		);
		place_attribute(graph, next_id, parent, position, draft);
	}
}

/// Brings the attributes owned by `parent` in line with `drafts`: known ids are
/// updated, the rest are added, and owned attributes absent from the drafts are
/// removed together with their connections.
fn reconcile_attributes(
	graph: &mut GraphData,
	next_id: &mut u64,
	parent: &str,
	drafts: &[AttributeDraft],
) {
	let Some(centre) = graph.node(parent).map(|n| (n.x, n.y)) else {
		return;
	};
	let existing: HashSet<String> = graph
		.children_of(parent)
		.filter(|n| n.is_attribute())
		.map(|n| n.id.clone())
		.collect();
	let mut kept = HashSet::new();

	for (i, draft) in drafts.iter().enumerate() {
		if draft.is_blank() {
			continue;
		}
		match draft.id.as_deref().filter(|id| existing.contains(*id)) {
			Some(id) => {
				kept.insert(id.to_owned());
				if let Some(node) = graph.node_mut(id) {
					draft.apply(node);
				}
			}
			None => {
				let angle = (existing.len() + i) as f64 * GOLDEN_ANGLE;
				let position = (
					centre.0 + angle.cos() * ADDED_ATTRIBUTE_RADIUS,
					centre.1 + angle.sin() * ADDED_ATTRIBUTE_RADIUS,
				);
				kept.insert(place_attribute(graph, next_id, parent, position, draft));
			}
		}
	}

	let stale: Vec<&String> = existing.difference(&kept).collect();
	graph.remove_cascade(stale.into_iter().map(String::as_str));
}

impl EditorState {
	/// Adds an entity at the centre of the viewport with its attributes around it.
	pub fn create_entity(&mut self, draft: &EntityDraft) -> Result<String> {
		require_label(&draft.label, NodeKind::Entity)?;
		self.save_history();

		let (mut x, mut y) = self.workspace.view.center(self.width, self.height);
		if let Some(size) = self.grid() {
			(x, y) = (snap(x, size), snap(y, size));
		}
		let graph = &mut self.workspace.graph;
		let id = graph.fresh_id("e", &mut self.next_id);
		let mut entity = Node::entity(id.clone(), draft.label.clone(), x, y);
		entity.is_weak = draft.weak;
		graph.nodes.push(entity);
		spread_attributes(graph, &mut self.next_id, &id, (x, y), &draft.attributes);

		debug!("created entity {id} with {} attribute(s)", graph.children_of(&id).count());
		Ok(id)
	}

	pub fn update_entity(&mut self, id: &str, draft: &EntityDraft) -> Result<()> {
		require_label(&draft.label, NodeKind::Entity)?;
		require_kind(&self.workspace.graph, id, NodeKind::Entity)?;
		self.save_history();

		let graph = &mut self.workspace.graph;
		if let Some(entity) = graph.node_mut(id) {
			entity.label = draft.label.clone();
			entity.is_weak = draft.weak;
		}
		reconcile_attributes(graph, &mut self.next_id, id, &draft.attributes);
		debug!("updated entity {id}");
		Ok(())
	}

	/// Adds a relationship halfway between its two entities, connected
	/// `first -> relationship -> second` with the given cardinalities.
	pub fn create_relationship(&mut self, draft: &RelationshipDraft) -> Result<String> {
		require_label(&draft.label, NodeKind::Relationship)?;
		let graph = &self.workspace.graph;
		let a = require_kind(graph, &draft.first, NodeKind::Entity)?;
		let b = require_kind(graph, &draft.second, NodeKind::Entity)?;
		self.save_history();

		let centre = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
		let graph = &mut self.workspace.graph;
		let id = graph.fresh_id("r", &mut self.next_id);
		graph
			.nodes
			.push(Node::relationship(id.clone(), draft.label.clone(), centre.0, centre.1));
		connect_entities(graph, &mut self.next_id, &id, draft);
		spread_attributes(graph, &mut self.next_id, &id, centre, &draft.attributes);

		debug!("created relationship {id} between {} and {}", draft.first, draft.second);
		Ok(id)
	}

	/// Relabels a relationship, re-points its two entity connections and
	/// reconciles its attributes. Attribute connections are preserved.
	pub fn update_relationship(&mut self, id: &str, draft: &RelationshipDraft) -> Result<()> {
		require_label(&draft.label, NodeKind::Relationship)?;
		let graph = &self.workspace.graph;
		require_kind(graph, id, NodeKind::Relationship)?;
		require_kind(graph, &draft.first, NodeKind::Entity)?;
		require_kind(graph, &draft.second, NodeKind::Entity)?;
		self.save_history();

		let graph = &mut self.workspace.graph;
		if let Some(rel) = graph.node_mut(id) {
			rel.label = draft.label.clone();
		}
		let owned: HashSet<String> = graph.children_of(id).map(|n| n.id.clone()).collect();
		graph.connections.retain(|c| {
			!c.touches(id) || owned.contains(&c.source_id) || owned.contains(&c.target_id)
		});
		connect_entities(graph, &mut self.next_id, id, draft);
		reconcile_attributes(graph, &mut self.next_id, id, &draft.attributes);
		debug!("updated relationship {id}");
		Ok(())
	}

	/// Deletes the selection, cascading to owned attributes and touching connections.
	pub fn delete_selected(&mut self) -> usize {
		if self.workspace.selection.is_empty() {
			return 0;
		}
		self.save_history();
		let removed = self
			.workspace
			.graph
			.remove_cascade(self.workspace.selection.iter());
		self.workspace.selection.clear();
		debug!("deleted {removed} node(s)");
		removed
	}

	pub fn select_all(&mut self) {
		let ids = self.workspace.graph.nodes.iter().map(|n| n.id.clone());
		self.workspace.selection.replace(ids);
	}

	/// The entity or relationship a single selection refers to; an attribute
	/// stands for its owner.
	pub fn editing_target(&self) -> Option<EditingTarget> {
		let graph = &self.workspace.graph;
		let mut node = graph.node(self.workspace.selection.single()?)?;
		if node.is_attribute() {
			node = graph.node(node.parent_id.as_deref()?)?;
		}
		match node.kind {
			NodeKind::Entity => Some(EditingTarget::Entity(node.id.clone())),
			NodeKind::Relationship => Some(EditingTarget::Relationship(node.id.clone())),
			NodeKind::Attribute => None,
		}
	}

	/// Current values of an entity, as a form would load them.
	pub fn entity_draft(&self, id: &str) -> Option<EntityDraft> {
		let graph = &self.workspace.graph;
		let entity = graph.node(id).filter(|n| n.kind == NodeKind::Entity)?;
		Some(EntityDraft {
			label: entity.label.clone(),
			weak: entity.is_weak,
			attributes: owned_attributes(graph, id),
		})
	}

	pub fn relationship_draft(&self, id: &str) -> Option<RelationshipDraft> {
		let graph = &self.workspace.graph;
		let rel = graph.node(id).filter(|n| n.kind == NodeKind::Relationship)?;
		let is_entity = |other: &str| graph.kind_of(other) == Some(NodeKind::Entity);
		let incoming = graph
			.connections
			.iter()
			.find(|c| c.target_id == id && is_entity(&c.source_id))?;
		let outgoing = graph
			.connections
			.iter()
			.find(|c| c.source_id == id && is_entity(&c.target_id))?;
		Some(RelationshipDraft {
			label: rel.label.clone(),
			first: incoming.source_id.clone(),
			second: outgoing.target_id.clone(),
			first_cardinality: incoming.cardinality().unwrap_or(Cardinality::One),
			second_cardinality: outgoing.cardinality().unwrap_or(Cardinality::N),
			attributes: owned_attributes(graph, id),
		})
	}
}

fn owned_attributes(graph: &GraphData, parent: &str) -> Vec<AttributeDraft> {
	graph
		.children_of(parent)
		.filter(|n| n.is_attribute())
		.map(AttributeDraft::of)
		.collect()
}

fn connect_entities(graph: &mut GraphData, next_id: &mut u64, rel: &str, draft: &RelationshipDraft) {
	let first = graph.fresh_id("c", next_id);
	graph.connections.push(
		Connection::new(first, draft.first.clone(), rel).with_cardinality(draft.first_cardinality),
	);
	let second = graph.fresh_id("c", next_id);
	graph.connections.push(
		Connection::new(second, rel, draft.second.clone()).with_cardinality(draft.second_cardinality),
	);
}
