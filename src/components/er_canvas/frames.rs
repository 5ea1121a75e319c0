//! Start/stop lifecycle for the per-frame physics tick.

use std::cell::RefCell;
use std::rc::Rc;

use log::{info, warn};
use wasm_bindgen::prelude::*;

/// Handle of a requested frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameToken(pub i32);

/// Something that can call back once on the next display frame.
pub trait FrameScheduler {
	fn request_frame(&mut self) -> Option<FrameToken>;
	fn cancel_frame(&mut self, token: FrameToken);
}

/// Self-rescheduling loop: at most one frame is pending at any time, and once
/// stopped no further frame is honoured.
#[derive(Clone, Debug, Default)]
pub struct FrameLoop {
	running: bool,
	pending: Option<FrameToken>,
}

impl FrameLoop {
	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn start(&mut self, scheduler: &mut impl FrameScheduler) {
		if self.running {
			return;
		}
		self.running = true;
		self.schedule(scheduler);
		info!("physics loop started");
	}

	pub fn stop(&mut self, scheduler: &mut impl FrameScheduler) {
		if !self.running {
			return;
		}
		self.running = false;
		if let Some(token) = self.pending.take() {
			scheduler.cancel_frame(token);
		}
		info!("physics loop stopped");
	}

	/// Called from the frame callback. Returns whether a tick should run now, and
	/// requests the following frame if the loop is still running.
	pub fn on_frame(&mut self, scheduler: &mut impl FrameScheduler) -> bool {
		if self.pending.take().is_none() || !self.running {
			return false;
		}
		self.schedule(scheduler);
		true
	}

	fn schedule(&mut self, scheduler: &mut impl FrameScheduler) {
		self.pending = scheduler.request_frame();
		if self.pending.is_none() {
			warn!("could not schedule the next physics frame");
			self.running = false;
		}
	}
}

/// `requestAnimationFrame`-backed scheduler sharing one callback closure.
#[derive(Clone, Default)]
pub struct AnimationFrames {
	callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
}

impl AnimationFrames {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_callback(&self, callback: Closure<dyn FnMut()>) {
		*self.callback.borrow_mut() = Some(callback);
	}
}

impl FrameScheduler for AnimationFrames {
	fn request_frame(&mut self) -> Option<FrameToken> {
		let window = web_sys::window()?;
		let callback = self.callback.borrow();
		let callback = callback.as_ref()?;
		window
			.request_animation_frame(callback.as_ref().unchecked_ref())
			.ok()
			.map(FrameToken)
	}

	fn cancel_frame(&mut self, token: FrameToken) {
		if let Some(window) = web_sys::window() {
			let _ = window.cancel_animation_frame(token.0);
		}
	}
}
