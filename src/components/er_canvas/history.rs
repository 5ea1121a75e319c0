//! Bounded snapshot undo/redo over the graph (nodes and connections only).

use std::collections::VecDeque;

use log::debug;

use super::selection::Selection;
use super::types::GraphData;

pub const MAX_HISTORY: usize = 50;

/// Stack depths, for enabling undo/redo controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryDepth {
	pub past: usize,
	pub future: usize,
}

#[derive(Clone, Debug, Default)]
pub struct History {
	past: VecDeque<GraphData>,
	future: VecDeque<GraphData>,
}

impl History {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn depth(&self) -> HistoryDepth {
		HistoryDepth {
			past: self.past.len(),
			future: self.future.len(),
		}
	}

	pub fn can_undo(&self) -> bool {
		!self.past.is_empty()
	}

	pub fn can_redo(&self) -> bool {
		!self.future.is_empty()
	}

	/// Captures `current` as the state to return to, invalidating any redo branch.
	pub fn save(&mut self, current: &GraphData) {
		self.record(current.clone());
	}

	/// Like [`History::save`] for a snapshot taken earlier, e.g. at the start of a drag.
	pub fn record(&mut self, snapshot: GraphData) {
		self.past.push_back(snapshot);
		if self.past.len() > MAX_HISTORY {
			self.past.pop_front();
		}
		self.future.clear();
		debug!("history saved (past={})", self.past.len());
	}

	pub fn undo(&mut self, graph: &mut GraphData, selection: &mut Selection) -> bool {
		let Some(previous) = self.past.pop_back() else {
			return false;
		};
		self.future.push_front(std::mem::replace(graph, previous));
		selection.clear();
		debug!("undo (past={}, future={})", self.past.len(), self.future.len());
		true
	}

	pub fn redo(&mut self, graph: &mut GraphData, selection: &mut Selection) -> bool {
		let Some(next) = self.future.pop_front() else {
			return false;
		};
		self.past.push_back(std::mem::replace(graph, next));
		selection.clear();
		debug!("redo (past={}, future={})", self.past.len(), self.future.len());
		true
	}

	pub fn clear(&mut self) {
		self.past.clear();
		self.future.clear();
	}
}
