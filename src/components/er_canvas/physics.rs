//! Force-directed relaxation of attribute nodes.
//!
//! Anyone may push, only attributes get pushed: entities and relationships act as
//! fixed anchors while their attributes repel each other and hang off springs.
//! Nodes under an in-progress drag are excluded from receiving force and from
//! integration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::selection::Selection;
use super::types::{GraphData, Node};

/// Per-axis speed limit, in world units per frame.
pub const MAX_VELOCITY: f64 = 10.0;

/// Live tuning knobs, read afresh on every step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhysicsConfig {
	pub repulsion: f64,
	pub collision_radius: f64,
	pub damping: f64,
	pub spring_length: f64,
	pub spring_stiffness: f64,
}

impl Default for PhysicsConfig {
	fn default() -> Self {
		Self {
			repulsion: 20000.0,
			collision_radius: 30.0,
			damping: 0.8,
			spring_length: 60.0,
			spring_stiffness: 0.05,
		}
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
	pub vx: f64,
	pub vy: f64,
}

/// Ephemeral per-node velocities. Entries for deleted nodes are left behind.
#[derive(Clone, Debug, Default)]
pub struct Velocities(HashMap<String, Velocity>);

impl Velocities {
	pub fn get(&self, id: &str) -> Velocity {
		self.0.get(id).copied().unwrap_or_default()
	}

	pub fn zero(&mut self, id: &str) {
		if let Some(v) = self.0.get_mut(id) {
			*v = Velocity::default();
		}
	}

	pub fn set(&mut self, id: &str, velocity: Velocity) {
		match self.0.get_mut(id) {
			Some(v) => *v = velocity,
			None => {
				self.0.insert(id.to_owned(), velocity);
			}
		}
	}

	pub fn clear(&mut self) {
		self.0.clear();
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	fn ensure(&mut self, id: &str) {
		if !self.0.contains_key(id) {
			self.0.insert(id.to_owned(), Velocity::default());
		}
	}

	fn accelerate(&mut self, id: &str, fx: f64, fy: f64) {
		if let Some(v) = self.0.get_mut(id) {
			v.vx += fx;
			v.vy += fy;
		}
	}
}

/// Nodes currently owned by a drag gesture.
#[derive(Clone, Copy, Debug, Default)]
pub struct Held<'a> {
	selection: Option<&'a Selection>,
}

impl<'a> Held<'a> {
	pub fn nothing() -> Self {
		Self { selection: None }
	}

	pub fn selection(selection: &'a Selection) -> Self {
		Self {
			selection: Some(selection),
		}
	}

	pub fn holds(&self, id: &str) -> bool {
		self.selection.is_some_and(|s| s.contains(id))
	}

	pub fn holds_parent_of(&self, node: &Node) -> bool {
		node.parent_id.as_deref().is_some_and(|p| self.holds(p))
	}
}

#[derive(Clone, Debug, Default)]
pub struct PhysicsEngine {
	pub velocities: Velocities,
}

impl PhysicsEngine {
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the simulation by one frame.
	pub fn step(&mut self, graph: &mut GraphData, config: &PhysicsConfig, held: &Held<'_>) {
		let nodes = &graph.nodes;
		for node in nodes {
			self.velocities.ensure(&node.id);
		}
		let pushable = |n: &Node| n.is_attribute() && !held.holds(&n.id);

		for (i, n1) in nodes.iter().enumerate() {
			for n2 in &nodes[i + 1..] {
				if !n1.is_attribute() && !n2.is_attribute() {
					continue;
				}
				let (fx, fy) = repulsion(n1, n2, config);
				if pushable(n1) {
					self.velocities.accelerate(&n1.id, fx, fy);
				}
				if pushable(n2) {
					self.velocities.accelerate(&n2.id, -fx, -fy);
				}
			}
		}

		let index: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();
		for conn in &graph.connections {
			let (Some(source), Some(target)) = (
				index.get(conn.source_id.as_str()),
				index.get(conn.target_id.as_str()),
			) else {
				continue;
			};
			if !source.is_attribute() && !target.is_attribute() {
				continue;
			}
			let (fx, fy) = spring(source, target, config);
			if pushable(source) {
				self.velocities.accelerate(&source.id, fx, fy);
			}
			if pushable(target) {
				self.velocities.accelerate(&target.id, -fx, -fy);
			}
		}

		for node in graph.nodes.iter_mut().filter(|n| n.is_attribute()) {
			if held.holds(&node.id) || held.holds_parent_of(node) {
				continue;
			}
			let mut v = self.velocities.get(&node.id);
			v.vx = (v.vx * config.damping).clamp(-MAX_VELOCITY, MAX_VELOCITY);
			v.vy = (v.vy * config.damping).clamp(-MAX_VELOCITY, MAX_VELOCITY);
			node.x += v.vx;
			node.y += v.vy;
			self.velocities.set(&node.id, v);
		}
	}
}

/// Force on `n1` (the negation acts on `n2`). Exactly coincident points are
/// pushed apart along +x so the pair can separate.
fn repulsion(n1: &Node, n2: &Node, config: &PhysicsConfig) -> (f64, f64) {
	let (dx, dy) = (n1.x - n2.x, n1.y - n2.y);
	let dist_sq = dx * dx + dy * dy;
	let (dist_sq, ux, uy) = if dist_sq == 0.0 {
		(1.0, 1.0, 0.0)
	} else {
		let dist = dist_sq.sqrt();
		(dist_sq, dx / dist, dy / dist)
	};
	let dist = dist_sq.sqrt();

	// near-coincident pairs can overflow to infinity, and inf * 0 is NaN
	let mut force = (config.repulsion / dist_sq).clamp(f64::MIN, f64::MAX);
	if dist < config.collision_radius {
		force += (config.collision_radius - dist) * 0.5;
	}
	(ux * force, uy * force)
}

/// Force on the source endpoint (the negation acts on the target).
fn spring(source: &Node, target: &Node, config: &PhysicsConfig) -> (f64, f64) {
	let (dx, dy) = (target.x - source.x, target.y - source.y);
	let dist_sq = dx * dx + dy * dy;
	if dist_sq == 0.0 {
		return (0.0, 0.0);
	}
	let dist = dist_sq.sqrt();
	let force = (dist - config.spring_length) * config.spring_stiffness;
	(dx / dist * force, dy / dist * force)
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;
	use crate::components::er_canvas::types::Connection;

	fn distance(graph: &GraphData, a: &str, b: &str) -> f64 {
		let (Some(a), Some(b)) = (graph.node(a), graph.node(b)) else {
			panic!("missing node");
		};
		((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
	}

	fn owner_and_attribute() -> GraphData {
		GraphData::new(
			vec![
				Node::entity("E1", "Student", 0.0, 0.0),
				Node::attribute("A1", "id", 0.0, 0.0, "E1"),
			],
			vec![Connection::new("c1", "E1", "A1")],
		)
	}

	fn assert_finite(graph: &GraphData, engine: &PhysicsEngine) {
		for node in &graph.nodes {
			let v = engine.velocities.get(&node.id);
			assert!(node.x.is_finite() && node.y.is_finite(), "{node:?}");
			assert!(v.vx.is_finite() && v.vy.is_finite(), "{v:?}");
		}
	}

	#[test]
	fn coincident_attributes_stay_finite_and_separate() {
		let mut graph = GraphData::new(
			vec![
				Node::attribute("a1", "x", 5.0, 5.0, "e"),
				Node::attribute("a2", "y", 5.0, 5.0, "e"),
			],
			vec![Connection::new("c", "a1", "a2")],
		);
		let mut engine = PhysicsEngine::new();
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());
		assert_finite(&graph, &engine);
		assert!(distance(&graph, "a1", "a2") > 0.0);
	}

	#[test]
	fn nearly_coincident_attributes_separate_along_their_offset() {
		let mut graph = GraphData::new(
			vec![
				Node::attribute("a1", "x", 0.0, 0.0, "e"),
				Node::attribute("a2", "y", 0.0, 1e-5, "e"),
			],
			Vec::new(),
		);
		let mut engine = PhysicsEngine::new();
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());
		assert_finite(&graph, &engine);

		let (Some(a1), Some(a2)) = (graph.node("a1"), graph.node("a2")) else {
			panic!("missing node");
		};
		assert_eq!((a1.x, a2.x), (0.0, 0.0));
		assert_eq!(a1.y, -MAX_VELOCITY);
		assert!(a2.y > MAX_VELOCITY);
	}

	#[test]
	fn subnormal_offset_does_not_produce_nan() {
		let mut graph = GraphData::new(
			vec![
				Node::attribute("a1", "x", 0.0, 0.0, "e"),
				Node::attribute("a2", "y", 1e-160, 0.0, "e"),
			],
			Vec::new(),
		);
		let mut engine = PhysicsEngine::new();
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());
		assert_finite(&graph, &engine);
	}

	#[test]
	fn velocity_is_clamped_per_axis() {
		let mut graph = GraphData::new(
			vec![
				Node::entity("e", "E", 0.0, 0.0),
				Node::attribute("a", "up", 1.0, 20.0, "e"),
				Node::attribute("b", "down", 1001.0, -20.0, "e"),
				Node::entity("f", "F", 1000.0, 0.0),
			],
			Vec::new(),
		);
		let mut engine = PhysicsEngine::new();
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());

		let a = engine.velocities.get("a");
		assert_eq!(a.vy, MAX_VELOCITY);
		assert!(a.vx > 0.0 && a.vx < MAX_VELOCITY);

		let b = engine.velocities.get("b");
		assert_eq!(b.vy, -MAX_VELOCITY);
		assert!(b.vx > 0.0 && b.vx < MAX_VELOCITY);

		let node = graph.node("a").map(|n| (n.x, n.y));
		assert_eq!(node, Some((1.0 + a.vx, 20.0 + MAX_VELOCITY)));
	}

	#[test]
	fn anchors_never_move() {
		let mut graph = owner_and_attribute();
		graph.nodes.push(Node::relationship("R1", "Takes", 10.0, 0.0));
		let mut engine = PhysicsEngine::new();
		for _ in 0..50 {
			engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());
		}
		assert_eq!(graph.node("E1").map(|n| (n.x, n.y)), Some((0.0, 0.0)));
		assert_eq!(graph.node("R1").map(|n| (n.x, n.y)), Some((10.0, 0.0)));
	}

	#[test]
	fn held_nodes_get_no_force_and_do_not_move() {
		let mut graph = owner_and_attribute();
		graph.nodes[1].x = 5.0;
		let selection = Selection::from_iter(["A1"]);
		let mut engine = PhysicsEngine::new();
		for _ in 0..10 {
			engine.step(&mut graph, &PhysicsConfig::default(), &Held::selection(&selection));
		}
		assert_eq!(graph.node("A1").map(|n| (n.x, n.y)), Some((5.0, 0.0)));
		assert_eq!(engine.velocities.get("A1"), Velocity::default());
	}

	#[test]
	fn children_of_held_parent_are_not_integrated() {
		let mut graph = owner_and_attribute();
		graph.nodes[1].x = 5.0;
		let selection = Selection::from_iter(["E1"]);
		let mut engine = PhysicsEngine::new();
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::selection(&selection));
		assert_eq!(graph.node("A1").map(|n| (n.x, n.y)), Some((5.0, 0.0)));
		// force still accumulates and is released once the parent is let go
		assert!(engine.velocities.get("A1").vx > 0.0);
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());
		assert!(graph.node("A1").is_some_and(|n| n.x > 5.0));
	}

	#[test]
	fn dangling_connection_is_skipped() {
		let mut graph = owner_and_attribute();
		graph.connections.push(Connection::new("c2", "A1", "gone"));
		graph.connections.push(Connection::new("c3", "gone", "A1"));
		let mut engine = PhysicsEngine::new();
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());
		assert_finite(&graph, &engine);
	}

	#[test]
	fn config_changes_apply_on_next_step() {
		let mut graph = owner_and_attribute();
		let mut engine = PhysicsEngine::new();
		engine.step(&mut graph, &PhysicsConfig::default(), &Held::nothing());
		let before = graph.node("A1").map(|n| (n.x, n.y));

		let frozen = PhysicsConfig {
			damping: 0.0,
			..PhysicsConfig::default()
		};
		engine.step(&mut graph, &frozen, &Held::nothing());
		assert_eq!(graph.node("A1").map(|n| (n.x, n.y)), before);
		assert_eq!(engine.velocities.get("A1"), Velocity::default());
	}

	#[test]
	fn attribute_settles_where_spring_balances_repulsion() {
		let mut graph = owner_and_attribute();
		let mut engine = PhysicsEngine::new();
		let config = PhysicsConfig::default();
		for _ in 0..600 {
			engine.step(&mut graph, &config, &Held::nothing());
			let a1 = graph.node("A1").map(|n| (n.x, n.y));
			assert_ne!(a1, Some((0.0, 0.0)));
		}
		// repulsion / d^2 == (d - springLength) * stiffness at d = 100
		let d = distance(&graph, "E1", "A1");
		assert!((d - 100.0).abs() < 1.0, "settled at {d}");
		assert!(d > config.spring_length);
	}

	#[test]
	fn attribute_settles_at_spring_length_without_repulsion() {
		let mut graph = owner_and_attribute();
		let mut engine = PhysicsEngine::new();
		let config = PhysicsConfig {
			repulsion: 0.0,
			..PhysicsConfig::default()
		};
		for _ in 0..600 {
			engine.step(&mut graph, &config, &Held::nothing());
		}
		let d = distance(&graph, "E1", "A1");
		assert!((d - config.spring_length).abs() < 1.0, "settled at {d}");
	}

	proptest! {
		#[test]
		fn steps_never_produce_nan(
			points in prop::collection::vec((-3i32..=3, -3i32..=3, any::<bool>()), 2..7),
			repulsion in 0.0f64..50_000.0,
			damping in 0.0f64..1.0,
		) {
			let nodes: Vec<Node> = points
				.iter()
				.enumerate()
				.map(|(i, &(x, y, attribute))| {
					let (x, y) = (f64::from(x) * 10.0, f64::from(y) * 10.0);
					if attribute {
						Node::attribute(format!("n{i}"), "a", x, y, "n0")
					} else {
						Node::entity(format!("n{i}"), "e", x, y)
					}
				})
				.collect();
			let connections = (1..nodes.len())
				.map(|i| Connection::new(format!("c{i}"), "n0", format!("n{i}")))
				.collect();
			let mut graph = GraphData::new(nodes, connections);
			let config = PhysicsConfig { repulsion, damping, ..PhysicsConfig::default() };
			let mut engine = PhysicsEngine::new();
			for _ in 0..5 {
				engine.step(&mut graph, &config, &Held::nothing());
			}
			for node in &graph.nodes {
				let v = engine.velocities.get(&node.id);
				prop_assert!(node.x.is_finite() && node.y.is_finite());
				prop_assert!(v.vx.is_finite() && v.vy.is_finite());
			}
		}
	}
}
