//! Graph store operations over [`GraphData`].
//!
//! Every lookup tolerates stale ids: an id that no longer resolves is skipped,
//! never treated as an error.

use std::collections::HashSet;

use super::selection::Selection;
use super::types::{Connection, GraphData, Node, NodeKind};

impl GraphData {
	pub fn new(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
		Self { nodes, connections }
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.node(id).is_some()
	}

	pub fn kind_of(&self, id: &str) -> Option<NodeKind> {
		self.node(id).map(|n| n.kind)
	}

	pub fn children_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
		self.nodes
			.iter()
			.filter(move |n| n.parent_id.as_deref() == Some(parent))
	}

	/// The selection plus every attribute owned by a selected entity or relationship.
	pub fn moving_set(&self, selection: &Selection) -> HashSet<String> {
		let mut moving: HashSet<String> = selection.iter().map(str::to_owned).collect();
		for id in selection.iter() {
			if self.kind_of(id).is_some_and(NodeKind::is_anchor) {
				moving.extend(self.children_of(id).map(|child| child.id.clone()));
			}
		}
		moving
	}

	pub fn translate(&mut self, ids: &HashSet<String>, dx: f64, dy: f64) {
		for node in self.nodes.iter_mut().filter(|n| ids.contains(&n.id)) {
			node.x += dx;
			node.y += dy;
		}
	}

	pub fn snap_to_grid(&mut self, ids: &HashSet<String>, grid_size: f64) {
		if grid_size <= 0.0 {
			return;
		}
		for node in self.nodes.iter_mut().filter(|n| ids.contains(&n.id)) {
			node.x = snap(node.x, grid_size);
			node.y = snap(node.y, grid_size);
		}
	}

	/// Removes the given nodes, the attributes they own, and every connection touching
	/// any removed node.
	pub fn remove_cascade<'a, I>(&mut self, ids: I) -> usize
	where
		I: IntoIterator<Item = &'a str>,
	{
		let roots: HashSet<&str> = ids.into_iter().collect();
		let removed: HashSet<String> = self
			.nodes
			.iter()
			.filter(|n| {
				roots.contains(n.id.as_str())
					|| n.parent_id.as_deref().is_some_and(|p| roots.contains(p))
			})
			.map(|n| n.id.clone())
			.collect();
		self.nodes.retain(|n| !removed.contains(&n.id));
		self.connections
			.retain(|c| !removed.contains(&c.source_id) && !removed.contains(&c.target_id));
		removed.len()
	}

	/// Nodes whose label contains the trimmed query, case-insensitively.
	pub fn search<'a>(&'a self, query: &str) -> Vec<&'a Node> {
		let needle = query.trim().to_lowercase();
		if needle.is_empty() {
			return Vec::new();
		}
		self.nodes
			.iter()
			.filter(|n| n.label.to_lowercase().contains(&needle))
			.collect()
	}

	/// `(min_x, min_y, max_x, max_y)` over node centres.
	pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
		let first = self.nodes.first()?;
		Some(self.nodes.iter().fold(
			(first.x, first.y, first.x, first.y),
			|(min_x, min_y, max_x, max_y), n| {
				(min_x.min(n.x), min_y.min(n.y), max_x.max(n.x), max_y.max(n.y))
			},
		))
	}

	/// An id of the form `{prefix}_{n}` that no node or connection uses yet.
	pub fn fresh_id(&self, prefix: &str, counter: &mut u64) -> String {
		loop {
			*counter += 1;
			let id = format!("{prefix}_{counter}");
			if !self.contains(&id) && !self.connections.iter().any(|c| c.id == id) {
				return id;
			}
		}
	}
}

pub fn snap(value: f64, grid_size: f64) -> f64 {
	(value / grid_size).round() * grid_size
}
