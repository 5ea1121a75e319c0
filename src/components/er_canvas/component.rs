use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, Element, HtmlCanvasElement, KeyboardEvent, MouseEvent, TouchEvent,
	WheelEvent, Window,
};

use super::edit::{AttributeDraft, EditingTarget, EntityDraft, RelationshipDraft};
use super::frames::AnimationFrames;
use super::history::HistoryDepth;
use super::interaction::{Modifiers, Pointer, PointerButton};
use super::render;
use super::selection::Selection;
use super::state::EditorState;
use super::types::{Cardinality, GraphData, NodeKind};

/// Shared between the DOM callbacks: the editor, the 2d context and the frame
/// scheduler, plus the signals the toolbar reads.
#[derive(Clone)]
struct Handle {
	editor: Rc<RefCell<Option<EditorState>>>,
	ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>>,
	frames: AnimationFrames,
	depth: RwSignal<HistoryDepth>,
	physics_on: RwSignal<bool>,
	grid_on: RwSignal<bool>,
	selected: RwSignal<usize>,
	status: RwSignal<Option<String>>,
}

impl Handle {
	/// Runs `f` against the editor, then redraws and refreshes the toolbar.
	fn update<R>(&self, f: impl FnOnce(&mut EditorState, &mut AnimationFrames) -> R) -> Option<R> {
		let mut frames = self.frames.clone();
		let mut editor = self.editor.borrow_mut();
		let s = editor.as_mut()?;
		let out = f(s, &mut frames);
		self.depth.set(s.history_depth());
		self.physics_on.set(s.settings.physics_enabled);
		self.grid_on.set(s.settings.grid_snapping);
		self.selected.set(s.selection().len());
		if let Some(ctx) = self.ctx.borrow().as_ref() {
			render::render(s, ctx);
		}
		Some(out)
	}

	fn report(&self, result: crate::Result<()>) {
		match result {
			Ok(()) => self.status.set(None),
			Err(err) => {
				warn!("{err}");
				self.status.set(Some(err.to_string()));
			}
		}
	}
}

fn pointer(ev: &MouseEvent, space_held: bool) -> Pointer {
	Pointer {
		screen: (ev.client_x() as f64, ev.client_y() as f64),
		button: PointerButton::from_dom(ev.button()),
		modifiers: Modifiers {
			additive: ev.shift_key() || ev.ctrl_key() || ev.meta_key(),
			pan: space_held,
		},
	}
}

fn touch_points(ev: &TouchEvent) -> Vec<(f64, f64)> {
	let touches = ev.touches();
	(0..touches.length())
		.filter_map(|i| touches.get(i))
		.map(|t| (t.client_x() as f64, t.client_y() as f64))
		.collect()
}

fn typing_into_field(ev: &KeyboardEvent) -> bool {
	ev.target()
		.and_then(|t| t.dyn_into::<Element>().ok())
		.is_some_and(|e| matches!(e.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT"))
}

/// `"*id, name, phones+, age~"`: `*` marks a key, `+` multivalued, `~` derived.
fn parse_attributes(text: &str) -> Vec<AttributeDraft> {
	text.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(|raw| {
			let mut label = raw;
			let mut draft = AttributeDraft::default();
			if let Some(rest) = label.strip_prefix('*') {
				draft.is_primary_key = true;
				label = rest;
			}
			if let Some(rest) = label.strip_suffix('+') {
				draft.is_multivalued = true;
				label = rest;
			}
			if let Some(rest) = label.strip_suffix('~') {
				draft.is_derived = true;
				label = rest;
			}
			draft.label = label.trim().to_owned();
			draft
		})
		.collect()
}

fn format_attributes(drafts: &[AttributeDraft]) -> String {
	drafts
		.iter()
		.map(|d| {
			format!(
				"{}{}{}{}",
				if d.is_primary_key { "*" } else { "" },
				d.label,
				if d.is_derived { "~" } else { "" },
				if d.is_multivalued { "+" } else { "" },
			)
		})
		.collect::<Vec<_>>()
		.join(", ")
}

/// Keeps ids of attributes whose label did not change, so an update edits them
/// in place instead of recreating them.
fn carry_ids(mut drafts: Vec<AttributeDraft>, previous: &[AttributeDraft]) -> Vec<AttributeDraft> {
	for draft in &mut drafts {
		draft.id = previous
			.iter()
			.find(|p| p.label == draft.label)
			.and_then(|p| p.id.clone());
	}
	drafts
}

/// The first two selected ids, in selection order; missing ends are empty and
/// get rejected by the relationship operations.
fn relationship_ends(selection: &Selection) -> (String, String) {
	let ends: Vec<String> = selection.iter().take(2).map(str::to_owned).collect();
	let mut ends = ends.into_iter();
	(ends.next().unwrap_or_default(), ends.next().unwrap_or_default())
}

#[component]
fn CardinalityPicker(value: RwSignal<Cardinality>) -> impl IntoView {
	view! {
		<select on:change=move |ev| {
			if let Some(c) = Cardinality::parse(&event_target_value(&ev)) {
				value.set(c);
			}
		}>
			{[Cardinality::One, Cardinality::N, Cardinality::M]
				.into_iter()
				.map(|c| {
					view! {
						<option value=c.as_str() selected=move || value.get() == c>
							{c.as_str()}
						</option>
					}
				})
				.collect_view()}
		</select>
	}
}

#[component]
pub fn ErCanvas(
	#[prop(into)] data: Signal<GraphData>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let handle = Handle {
		editor: Rc::new(RefCell::new(None)),
		ctx: Rc::new(RefCell::new(None)),
		frames: AnimationFrames::new(),
		depth: RwSignal::new(HistoryDepth::default()),
		physics_on: RwSignal::new(true),
		grid_on: RwSignal::new(false),
		selected: RwSignal::new(0),
		status: RwSignal::new(None),
	};
	let space_held = Rc::new(Cell::new(false));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let key_cb: Rc<RefCell<Option<Closure<dyn FnMut(KeyboardEvent)>>>> = Rc::new(RefCell::new(None));

	let entity_label = RwSignal::new(String::new());
	let entity_attrs = RwSignal::new(String::new());
	let entity_weak = RwSignal::new(false);
	let rel_label = RwSignal::new(String::new());
	let rel_attrs = RwSignal::new(String::new());
	let first_card = RwSignal::new(Cardinality::One);
	let second_card = RwSignal::new(Cardinality::N);
	let search = RwSignal::new(String::new());
	let results = RwSignal::new(Vec::<(String, String)>::new());
	let json_text = RwSignal::new(String::new());

	let (h_init, resize_init, key_init, space_init) =
		(handle.clone(), resize_cb.clone(), key_cb.clone(), space_held.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let graph = data.get();
		if h_init.editor.borrow().is_some() {
			h_init.update(|s, _| s.load(graph));
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let inner = |w: &Window| {
			(
				w.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
				w.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
			)
		};

		let (w, h) = if fullscreen {
			inner(&window)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok());
		let Some(ctx) = ctx else {
			warn!("canvas has no 2d context");
			return;
		};
		*h_init.ctx.borrow_mut() = Some(ctx.clone());
		let mut editor = EditorState::new(graph, w, h);
		editor.zoom_to_fit();
		*h_init.editor.borrow_mut() = Some(editor);
		info!("diagram editor mounted at {w}x{h}");

		if fullscreen {
			let (h_resize, canvas_resize) = (h_init.clone(), canvas.clone());
			*resize_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (nw, nh) = inner(&win);
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				h_resize.update(|s, _| s.resize(nw, nh));
			}));
			if let Some(ref cb) = *resize_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let h_keys = h_init.clone();
		let space_keys = space_init.clone();
		*key_init.borrow_mut() = Some(Closure::new(move |ev: KeyboardEvent| {
			if typing_into_field(&ev) {
				return;
			}
			let pressed = ev.type_() == "keydown";
			let command = ev.ctrl_key() || ev.meta_key();
			match ev.key().as_str() {
				" " => {
					ev.prevent_default();
					space_keys.set(pressed);
				}
				"Delete" | "Backspace" if pressed => {
					h_keys.update(|s, _| s.delete_selected());
				}
				"Escape" if pressed => {
					h_keys.update(|s, _| s.set_selection(Selection::new()));
				}
				"a" if pressed && command => {
					ev.prevent_default();
					h_keys.update(|s, _| s.select_all());
				}
				"z" | "Z" if pressed && command => {
					ev.prevent_default();
					let redo = ev.shift_key();
					h_keys.update(|s, _| if redo { s.redo() } else { s.undo() });
				}
				"y" if pressed && command => {
					ev.prevent_default();
					h_keys.update(|s, _| s.redo());
				}
				_ => {}
			}
		}));
		if let Some(ref cb) = *key_init.borrow() {
			for kind in ["keydown", "keyup"] {
				let _ = window.add_event_listener_with_callback(kind, cb.as_ref().unchecked_ref());
			}
		}

		let (editor_anim, mut frames_anim) = (h_init.editor.clone(), h_init.frames.clone());
		h_init.frames.set_callback(Closure::new(move || {
			if let Some(ref mut s) = *editor_anim.borrow_mut() {
				if s.on_frame(&mut frames_anim) {
					render::render(s, &ctx);
				}
			}
		}));
		h_init.update(|s, frames| s.set_physics_enabled(true, frames));
	});

	let sync_origin = move |s: &mut EditorState| {
		if let Some(canvas) = canvas_ref.get() {
			let canvas: HtmlCanvasElement = canvas.into();
			let rect = canvas.get_bounding_client_rect();
			s.set_viewport_origin((rect.left(), rect.top()));
		}
	};

	let (h_md, space_md) = (handle.clone(), space_held.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let p = pointer(&ev, space_md.get());
		h_md.update(|s, _| {
			sync_origin(s);
			s.pointer_down(p);
		});
	};

	let h_mm = handle.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let screen = (ev.client_x() as f64, ev.client_y() as f64);
		h_mm.update(|s, _| s.pointer_move(screen));
	};

	let h_mu = handle.clone();
	let on_mouseup = move |_: MouseEvent| {
		h_mu.update(|s, _| s.pointer_up());
	};

	let h_ml = handle.clone();
	let on_mouseleave = move |_: MouseEvent| {
		h_ml.update(|s, _| s.pointer_up());
	};

	let h_wh = handle.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let delta = ev.delta_y();
		h_wh.update(|s, _| s.wheel(delta));
	};

	let h_ts = handle.clone();
	let on_touchstart = move |ev: TouchEvent| {
		ev.prevent_default();
		let points = touch_points(&ev);
		h_ts.update(|s, _| {
			sync_origin(s);
			match points.as_slice() {
				[one] => {
					let mut p = Pointer::primary(one.0, one.1);
					p.modifiers.pan = true;
					s.pointer_down(p);
				}
				[a, b, ..] => {
					s.pointer_up();
					s.pinch(*a, *b);
				}
				[] => {}
			}
		});
	};

	let h_tm = handle.clone();
	let on_touchmove = move |ev: TouchEvent| {
		ev.prevent_default();
		let points = touch_points(&ev);
		h_tm.update(|s, _| match points.as_slice() {
			[one] => s.pointer_move(*one),
			[a, b, ..] => s.pinch(*a, *b),
			[] => {}
		});
	};

	let h_te = handle.clone();
	let on_touchend = move |ev: TouchEvent| {
		let remaining = ev.touches().length();
		h_te.update(|s, _| {
			if remaining < 2 {
				s.end_pinch();
			}
			if remaining == 0 {
				s.pointer_up();
			}
		});
	};

	// toolbar

	let h = handle.clone();
	let on_undo = move |_| {
		h.update(|s, _| s.undo());
	};
	let h = handle.clone();
	let on_redo = move |_| {
		h.update(|s, _| s.redo());
	};
	let h = handle.clone();
	let on_zoom_in = move |_| {
		h.update(|s, _| {
			let mut view = *s.view();
			view.zoom_in();
			s.set_view(view);
		});
	};
	let h = handle.clone();
	let on_zoom_out = move |_| {
		h.update(|s, _| {
			let mut view = *s.view();
			view.zoom_out();
			s.set_view(view);
		});
	};
	let h = handle.clone();
	let on_fit = move |_| {
		h.update(|s, _| s.zoom_to_fit());
	};
	let h = handle.clone();
	let on_physics = move |_| {
		h.update(|s, frames| s.set_physics_enabled(!s.settings.physics_enabled, frames));
	};
	let h = handle.clone();
	let on_grid = move |_| {
		h.update(|s, _| s.settings.grid_snapping = !s.settings.grid_snapping);
	};
	let h = handle.clone();
	let on_delete = move |_| {
		h.update(|s, _| s.delete_selected());
	};

	// forms

	let h = handle.clone();
	let on_load_selection = move |_| {
		h.update(|s, _| match s.editing_target() {
			Some(EditingTarget::Entity(id)) => {
				if let Some(draft) = s.entity_draft(&id) {
					entity_label.set(draft.label);
					entity_weak.set(draft.weak);
					entity_attrs.set(format_attributes(&draft.attributes));
				}
			}
			Some(EditingTarget::Relationship(id)) => {
				if let Some(draft) = s.relationship_draft(&id) {
					rel_label.set(draft.label);
					rel_attrs.set(format_attributes(&draft.attributes));
					first_card.set(draft.first_cardinality);
					second_card.set(draft.second_cardinality);
				}
			}
			None => {}
		});
	};

	let entity_form = move || EntityDraft {
		label: entity_label.get_untracked(),
		weak: entity_weak.get_untracked(),
		attributes: parse_attributes(&entity_attrs.get_untracked()),
	};

	let h = handle.clone();
	let on_add_entity = move |_| {
		let draft = entity_form();
		if let Some(result) = h.update(|s, _| s.create_entity(&draft).map(drop)) {
			h.report(result);
		}
	};

	let h = handle.clone();
	let on_update_entity = move |_| {
		let mut draft = entity_form();
		let result = h.update(|s, _| match s.editing_target() {
			Some(EditingTarget::Entity(id)) => {
				let previous = s.entity_draft(&id).map(|d| d.attributes).unwrap_or_default();
				draft.attributes = carry_ids(std::mem::take(&mut draft.attributes), &previous);
				s.update_entity(&id, &draft)
			}
			_ => Err(crate::Error::UnknownNode {
				id: s.selection().single().unwrap_or_default().to_owned(),
				expected: NodeKind::Entity,
			}),
		});
		if let Some(result) = result {
			h.report(result);
		}
	};

	let h = handle.clone();
	let on_relate = move |_| {
		let result = h.update(|s, _| {
			let (first, second) = relationship_ends(s.selection());
			let draft = RelationshipDraft {
				label: rel_label.get_untracked(),
				first,
				second,
				first_cardinality: first_card.get_untracked(),
				second_cardinality: second_card.get_untracked(),
				attributes: parse_attributes(&rel_attrs.get_untracked()),
			};
			match s.editing_target() {
				Some(EditingTarget::Relationship(id)) => {
					let Some(previous) = s.relationship_draft(&id) else {
						return Ok(());
					};
					let draft = RelationshipDraft {
						first: previous.first,
						second: previous.second,
						attributes: carry_ids(draft.attributes, &previous.attributes),
						..draft
					};
					s.update_relationship(&id, &draft)
				}
				_ => s.create_relationship(&draft).map(drop),
			}
		});
		if let Some(result) = result {
			h.report(result);
		}
	};

	let h = handle.clone();
	let on_search = move |ev| {
		search.set(event_target_value(&ev));
		let query = search.get_untracked();
		let found = h
			.update(|s, _| {
				s.graph()
					.search(&query)
					.into_iter()
					.map(|n| (n.id.clone(), n.label.clone()))
					.collect::<Vec<_>>()
			})
			.unwrap_or_default();
		results.set(found);
	};

	let h = handle.clone();
	let on_pick_result = move |ev| {
		let id = event_target_value(&ev);
		h.update(|s, _| s.set_selection(Selection::from_iter([id])));
	};

	let h = handle.clone();
	let on_export = move |_| {
		match h.update(|s, _| s.export_json()) {
			Some(Ok(text)) => json_text.set(text),
			Some(Err(err)) => h.report(Err(err)),
			None => {}
		}
	};

	let h = handle.clone();
	let on_import = move |_| {
		let text = json_text.get_untracked();
		if let Some(result) = h.update(|s, _| s.import_json(&text)) {
			h.report(result);
		}
	};

	let depth = handle.depth;
	let physics_on = handle.physics_on;
	let grid_on = handle.grid_on;
	let selected = handle.selected;
	let status = handle.status;

	view! {
		<div class="er-editor">
			<canvas
				node_ref=canvas_ref
				class="er-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				on:touchstart=on_touchstart
				on:touchmove=on_touchmove
				on:touchend=on_touchend
				on:contextmenu=|ev: MouseEvent| ev.prevent_default()
				style="display: block; touch-action: none;"
			/>
			<div class="er-toolbar">
				<button on:click=on_undo disabled=move || depth.get().past == 0>"Undo"</button>
				<button on:click=on_redo disabled=move || depth.get().future == 0>"Redo"</button>
				<button on:click=on_zoom_in>"+"</button>
				<button on:click=on_zoom_out>"-"</button>
				<button on:click=on_fit>"Fit"</button>
				<button on:click=on_physics>
					{move || if physics_on.get() { "Physics: on" } else { "Physics: off" }}
				</button>
				<button on:click=on_grid>
					{move || if grid_on.get() { "Grid: on" } else { "Grid: off" }}
				</button>
				<button on:click=on_delete disabled=move || selected.get() == 0>"Delete"</button>
				<button on:click=on_load_selection disabled=move || selected.get() != 1>
					"Edit selected"
				</button>
			</div>
			<div class="er-forms">
				<fieldset>
					<legend>"Entity"</legend>
					<input placeholder="Name" bind:value=entity_label />
					<input placeholder="*id, name, phones+, age~" bind:value=entity_attrs />
					<label>
						<input type="checkbox" bind:checked=entity_weak />
						"Weak"
					</label>
					<button on:click=on_add_entity>"Add"</button>
					<button on:click=on_update_entity>"Update"</button>
				</fieldset>
				<fieldset>
					<legend>"Relationship"</legend>
					<input placeholder="Name" bind:value=rel_label />
					<input placeholder="Attributes" bind:value=rel_attrs />
					<CardinalityPicker value=first_card />
					<CardinalityPicker value=second_card />
					<button on:click=on_relate>"Relate selected"</button>
				</fieldset>
				<fieldset>
					<legend>"Search"</legend>
					<input placeholder="Label" prop:value=search on:input=on_search />
					<select size="4" on:change=on_pick_result>
						{move || {
							results
								.get()
								.into_iter()
								.map(|(id, label)| view! { <option value=id>{label}</option> })
								.collect_view()
						}}
					</select>
				</fieldset>
				<fieldset>
					<legend>"JSON"</legend>
					<textarea rows="6" bind:value=json_text />
					<button on:click=on_export>"Export"</button>
					<button on:click=on_import>"Import"</button>
				</fieldset>
				{move || status.get().map(|msg| view! { <p class="er-status">{msg}</p> })}
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn attribute_shorthand_sets_flags() {
		let drafts = parse_attributes(" *id, phones+ ,, age~ ,name");
		let labels: Vec<_> = drafts.iter().map(|d| d.label.as_str()).collect();
		assert_eq!(labels, ["id", "phones", "age", "name"]);
		assert!(drafts[0].is_primary_key);
		assert!(drafts[1].is_multivalued);
		assert!(drafts[2].is_derived);
		assert_eq!(drafts[3], AttributeDraft::new("name"));
	}

	#[test]
	fn shorthand_survives_format_and_parse() {
		let drafts = vec![
			AttributeDraft::new("id").primary_key(),
			AttributeDraft::new("tags").multivalued().derived(),
		];
		assert_eq!(format_attributes(&drafts), "*id, tags~+");
		assert_eq!(parse_attributes(&format_attributes(&drafts)), drafts);
	}

	#[test]
	fn relationship_ends_follow_selection_order() {
		let selection = Selection::from_iter(["e_2", "e_1", "e_3"]);
		assert_eq!(relationship_ends(&selection), ("e_2".into(), "e_1".into()));
		let single = Selection::from_iter(["e_1"]);
		assert_eq!(relationship_ends(&single), ("e_1".into(), String::new()));
	}

	#[test]
	fn carry_ids_matches_by_label() {
		let mut previous = AttributeDraft::new("id");
		previous.id = Some("a_1".into());
		let drafts = carry_ids(
			vec![AttributeDraft::new("id"), AttributeDraft::new("new")],
			&[previous],
		);
		assert_eq!(drafts[0].id.as_deref(), Some("a_1"));
		assert_eq!(drafts[1].id, None);
	}
}
