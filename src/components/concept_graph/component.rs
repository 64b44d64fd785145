use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, TouchEvent, WheelEvent, Window,
};

use super::gesture::{GestureAction, LONG_PRESS_MS};
use super::render;
use super::state::ConceptGraphState;
use crate::graph::model::{ConceptGraph, NodeId};

/// Execute gesture actions against the simulation state. Click/long-press
/// are returned to the caller, which dispatches them outside the state
/// borrow.
fn apply_actions(
	s: &mut ConceptGraphState,
	actions: Vec<GestureAction>,
	timer_cb: Option<&Closure<dyn FnMut()>>,
) -> Vec<GestureAction> {
	let mut unhandled = Vec::new();
	for action in actions {
		match action {
			GestureAction::PinNode(id) => s.pin_node(id),
			GestureAction::UnpinNode(id) => s.unpin_node(id),
			GestureAction::DragTo { node, dx, dy } => s.drag_node(node, dx, dy),
			GestureAction::StartLongPressTimer => {
				if let (Some(cb), Some(window)) = (timer_cb, web_sys::window()) {
					s.long_press_timer = window
						.set_timeout_with_callback_and_timeout_and_arguments_0(
							cb.as_ref().unchecked_ref(),
							LONG_PRESS_MS,
						)
						.ok();
				}
			}
			GestureAction::CancelLongPressTimer => {
				if let (Some(handle), Some(window)) =
					(s.long_press_timer.take(), web_sys::window())
				{
					window.clear_timeout_with_handle(handle);
				}
			}
			action @ (GestureAction::Click(_) | GestureAction::LongPress(_)) => {
				unhandled.push(action);
			}
		}
	}
	unhandled
}

fn event_point(canvas: &HtmlCanvasElement, client_x: i32, client_y: i32) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		client_x as f64 - rect.left(),
		client_y as f64 - rect.top(),
	)
}

/// Fullscreen force-directed canvas over the concept graph.
///
/// Consumes the graph and the loading-node set as signals; reports node
/// clicks and long-presses (expansion requests, with the node's current
/// world position) upward. Pan, zoom and hover stay internal.
#[component]
pub fn ConceptGraphCanvas(
	#[prop(into)] data: Signal<ConceptGraph>,
	#[prop(into)] loading: Signal<HashSet<NodeId>>,
	#[prop(into)] on_node_click: Callback<NodeId>,
	#[prop(into)] on_node_expand: Callback<(NodeId, (f64, f64))>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<ConceptGraphState>>> = Rc::new(RefCell::new(None));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let long_press: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, long_press_init) = (
		state.clone(),
		animate.clone(),
		resize_cb.clone(),
		long_press.clone(),
	);

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let window: Window = web_sys::window().unwrap();

		let (w, h) = (
			window.inner_width().unwrap().as_f64().unwrap(),
			window.inner_height().unwrap().as_f64().unwrap(),
		);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.unwrap()
			.unwrap()
			.dyn_into()
			.unwrap();
		*state_init.borrow_mut() = Some(data.with_untracked(|d| ConceptGraphState::new(d, w, h)));

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let win: Window = web_sys::window().unwrap();
			let (nw, nh) = (
				win.inner_width().unwrap().as_f64().unwrap(),
				win.inner_height().unwrap().as_f64().unwrap(),
			);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		// Long-press timeout target. Created once; scheduled per press.
		let state_timer = state_init.clone();
		*long_press_init.borrow_mut() = Some(Closure::new(move || {
			let mut fired = None;
			if let Some(ref mut s) = *state_timer.borrow_mut() {
				s.long_press_timer = None;
				for action in s.gesture.timer_fired() {
					if let GestureAction::LongPress(id) = action {
						fired = s.node_position(id).map(|pos| (id, pos));
					}
				}
			}
			if let Some((id, pos)) = fired {
				on_node_expand.run((id, pos));
			}
		}));

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				if s.animation_running {
					s.tick(0.016);
				}
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = web_sys::window()
					.unwrap()
					.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// Incremental sync: a new generation rebuilds the simulation, anything
	// else appends, so settled positions survive expansion.
	let state_sync = state.clone();
	Effect::new(move |_| {
		data.with(|snapshot| {
			loading.with(|load| {
				if let Some(ref mut s) = *state_sync.borrow_mut() {
					if s.generation() != snapshot.generation() {
						let (w, h) = (s.width, s.height);
						*s = ConceptGraphState::new(snapshot, w, h);
					} else {
						s.sync(snapshot);
					}
					s.set_loading(load);
				}
			});
		});
	});

	// Shared press/move/release cores so mouse and touch drive the same
	// gesture machine.
	let press_core: Rc<dyn Fn(f64, f64)> = {
		let (state, long_press) = (state.clone(), long_press.clone());
		Rc::new(move |x, y| {
			if let Some(ref mut s) = *state.borrow_mut() {
				if let Some(id) = s.node_id_at(x, y) {
					let actions = s.gesture.press(id, x, y);
					let timer = long_press.borrow();
					apply_actions(s, actions, timer.as_ref());
				} else {
					s.pan.active = true;
					s.pan.start_x = x;
					s.pan.start_y = y;
					s.pan.transform_start_x = s.transform.x;
					s.pan.transform_start_y = s.transform.y;
				}
			}
		})
	};

	let move_core: Rc<dyn Fn(f64, f64)> = {
		let state = state.clone();
		Rc::new(move |x, y| {
			if let Some(ref mut s) = *state.borrow_mut() {
				if s.gesture.is_active() {
					let actions = s.gesture.pointer_move(x, y);
					apply_actions(s, actions, None);
				} else {
					let hovered = s.node_at_position(x, y);
					s.set_hover(hovered);
					if s.pan.active {
						s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
						s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
					}
				}
			}
		})
	};

	let release_core: Rc<dyn Fn()> = {
		let state = state.clone();
		Rc::new(move || {
			let mut clicked = None;
			if let Some(ref mut s) = *state.borrow_mut() {
				if s.gesture.is_active() {
					let actions = s.gesture.release();
					for action in apply_actions(s, actions, None) {
						if let GestureAction::Click(id) = action {
							clicked = Some(id);
						}
					}
				}
				s.pan.active = false;
			}
			if let Some(id) = clicked {
				on_node_click.run(id);
			}
		})
	};

	let cancel_core: Rc<dyn Fn()> = {
		let state = state.clone();
		Rc::new(move || {
			if let Some(ref mut s) = *state.borrow_mut() {
				let actions = s.gesture.cancel();
				apply_actions(s, actions, None);
				s.pan.active = false;
				s.set_hover(None);
			}
		})
	};

	let on_mousedown = {
		let press = press_core.clone();
		move |ev: MouseEvent| {
			let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
			let (x, y) = event_point(&canvas, ev.client_x(), ev.client_y());
			press(x, y);
		}
	};

	let on_mousemove = {
		let move_to = move_core.clone();
		move |ev: MouseEvent| {
			let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
			let (x, y) = event_point(&canvas, ev.client_x(), ev.client_y());
			move_to(x, y);
		}
	};

	let on_mouseup = {
		let release = release_core.clone();
		move |_: MouseEvent| release()
	};

	let on_mouseleave = {
		let cancel = cancel_core.clone();
		move |_: MouseEvent| cancel()
	};

	let on_touchstart = {
		let press = press_core.clone();
		move |ev: TouchEvent| {
			if let Some(touch) = ev.touches().get(0) {
				ev.prevent_default();
				let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
				let (x, y) = event_point(&canvas, touch.client_x(), touch.client_y());
				press(x, y);
			}
		}
	};

	let on_touchmove = {
		let move_to = move_core.clone();
		move |ev: TouchEvent| {
			if let Some(touch) = ev.touches().get(0) {
				ev.prevent_default();
				let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
				let (x, y) = event_point(&canvas, touch.client_x(), touch.client_y());
				move_to(x, y);
			}
		}
	};

	let on_touchend = {
		let release = release_core.clone();
		move |_: TouchEvent| release()
	};

	let on_touchcancel = {
		let cancel = cancel_core.clone();
		move |_: TouchEvent| cancel()
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let canvas: HtmlCanvasElement = canvas_ref.get().unwrap().into();
		let (x, y) = event_point(&canvas, ev.client_x(), ev.client_y());

		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="concept-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			on:touchstart=on_touchstart
			on:touchmove=on_touchmove
			on:touchend=on_touchend
			on:touchcancel=on_touchcancel
			style="display: block; cursor: grab;"
		/>
	}
}
