use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
	Entity,
	Attribute,
	Relationship,
}

impl NodeKind {
	/// Entities and relationships hold still under physics; only user drags move them.
	pub fn is_anchor(self) -> bool {
		matches!(self, NodeKind::Entity | NodeKind::Relationship)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: NodeKind,
	pub label: String,
	pub x: f64,
	pub y: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parent_id: Option<String>,
	#[serde(default, skip_serializing_if = "is_false")]
	pub is_primary_key: bool,
	#[serde(default, skip_serializing_if = "is_false")]
	pub is_weak: bool,
	#[serde(default, skip_serializing_if = "is_false")]
	pub is_multivalued: bool,
	#[serde(default, skip_serializing_if = "is_false")]
	pub is_derived: bool,
}

fn is_false(flag: &bool) -> bool {
	!*flag
}

impl Node {
	pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>, x: f64, y: f64) -> Self {
		Self {
			id: id.into(),
			kind,
			label: label.into(),
			x,
			y,
			parent_id: None,
			is_primary_key: false,
			is_weak: false,
			is_multivalued: false,
			is_derived: false,
		}
	}

	pub fn entity(id: impl Into<String>, label: impl Into<String>, x: f64, y: f64) -> Self {
		Self::new(id, NodeKind::Entity, label, x, y)
	}

	pub fn relationship(id: impl Into<String>, label: impl Into<String>, x: f64, y: f64) -> Self {
		Self::new(id, NodeKind::Relationship, label, x, y)
	}

	pub fn attribute(
		id: impl Into<String>,
		label: impl Into<String>,
		x: f64,
		y: f64,
		parent: impl Into<String>,
	) -> Self {
		Self {
			parent_id: Some(parent.into()),
			..Self::new(id, NodeKind::Attribute, label, x, y)
		}
	}

	pub fn is_attribute(&self) -> bool {
		self.kind == NodeKind::Attribute
	}
}

/// Cardinality marker carried in a connection label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
	#[serde(rename = "1")]
	One,
	#[serde(rename = "N")]
	N,
	#[serde(rename = "M")]
	M,
}

impl Cardinality {
	pub fn as_str(self) -> &'static str {
		match self {
			Cardinality::One => "1",
			Cardinality::N => "N",
			Cardinality::M => "M",
		}
	}

	pub fn parse(label: &str) -> Option<Self> {
		match label {
			"1" => Some(Cardinality::One),
			"N" => Some(Cardinality::N),
			"M" => Some(Cardinality::M),
			_ => None,
		}
	}

	pub fn is_many(self) -> bool {
		!matches!(self, Cardinality::One)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
	pub id: String,
	pub source_id: String,
	pub target_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub label: Option<String>,
}

impl Connection {
	pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			source_id: source.into(),
			target_id: target.into(),
			label: None,
		}
	}

	pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
		self.label = Some(cardinality.as_str().to_owned());
		self
	}

	pub fn cardinality(&self) -> Option<Cardinality> {
		self.label.as_deref().and_then(Cardinality::parse)
	}

	pub fn touches(&self, id: &str) -> bool {
		self.source_id == id || self.target_id == id
	}
}

/// The persisted diagram shape, also used as the history snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
	pub nodes: Vec<Node>,
	pub connections: Vec<Connection>,
}
