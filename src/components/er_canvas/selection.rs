use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Ordered set of selected node ids.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
	ids: IndexSet<String>,
}

impl Selection {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn len(&self) -> usize {
		self.ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	pub fn contains(&self, id: &str) -> bool {
		self.ids.contains(id)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.ids.iter().map(String::as_str)
	}

	/// The id driving "edit existing item" forms, if exactly one node is selected.
	pub fn single(&self) -> Option<&str> {
		match self.ids.len() {
			1 => self.ids.first().map(String::as_str),
			_ => None,
		}
	}

	pub fn insert(&mut self, id: impl Into<String>) -> bool {
		self.ids.insert(id.into())
	}

	pub fn toggle(&mut self, id: &str) {
		if !self.ids.shift_remove(id) {
			self.ids.insert(id.to_owned());
		}
	}

	pub fn clear(&mut self) {
		self.ids.clear();
	}

	pub fn replace<I, S>(&mut self, ids: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.ids = ids.into_iter().map(Into::into).collect();
	}
}

impl<S: Into<String>> FromIterator<S> for Selection {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		Self {
			ids: iter.into_iter().map(Into::into).collect(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn duplicates_are_collapsed() {
		let mut selection = Selection::from_iter(["a", "b", "a"]);
		assert_eq!(selection.len(), 2);
		assert!(!selection.insert("b"));
		assert_eq!(selection.iter().collect::<Vec<_>>(), ["a", "b"]);
	}

	#[test]
	fn toggle_adds_then_removes() {
		let mut selection = Selection::new();
		selection.toggle("e1");
		assert!(selection.contains("e1"));
		selection.toggle("e1");
		assert!(selection.is_empty());
	}

	#[test]
	fn single_only_for_one_element() {
		let mut selection = Selection::from_iter(["e1"]);
		assert_eq!(selection.single(), Some("e1"));
		selection.insert("e2");
		assert_eq!(selection.single(), None);
	}
}
