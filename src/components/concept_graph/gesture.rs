//! Click / drag / long-press disambiguation on a node.
//!
//! A pure state machine over the raw pointer stream: the component feeds it
//! press/move/release and the timer callback, and executes the actions it
//! returns. The component owns the browser timers and the simulation; this
//! machine only decides.
//!
//! ```text
//! Idle --press--> Pressed --move beyond threshold--> Dragging --release--> Idle
//!                    |    \--timer fires--> LongPressFired --release--> Idle
//!                    \--release--> Idle (click)
//! ```

use crate::graph::model::NodeId;

/// Hold duration that turns a press into a long-press.
pub const LONG_PRESS_MS: i32 = 1000;

/// Pointer travel (screen px) that turns a press into a drag.
pub const DRAG_THRESHOLD_PX: f64 = 4.0;

/// What the component must do in response to a gesture event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureAction {
	/// Anchor the node so the simulation stops moving it.
	PinNode(NodeId),
	/// Schedule the long-press timer for [`LONG_PRESS_MS`].
	StartLongPressTimer,
	/// Clear the pending timer. A callback that fires anyway is dropped by
	/// [`GestureState::timer_fired`].
	CancelLongPressTimer,
	/// Move the node to its press-time position offset by (dx, dy) screen px.
	DragTo { node: NodeId, dx: f64, dy: f64 },
	/// Release the anchor; the node resumes free simulation.
	UnpinNode(NodeId),
	/// The press resolved as a click.
	Click(NodeId),
	/// The press resolved as a long-press.
	LongPress(NodeId),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Phase {
	#[default]
	Idle,
	Pressed,
	Dragging,
	LongPressFired,
}

/// Per-canvas interaction state. Single-pointer input means at most one
/// node interaction is live at a time; a press while one is active is
/// ignored.
#[derive(Debug, Default)]
pub struct GestureState {
	phase: Phase,
	node: Option<NodeId>,
	start_x: f64,
	start_y: f64,
}

impl GestureState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_active(&self) -> bool {
		self.phase != Phase::Idle
	}

	pub fn press(&mut self, node: NodeId, x: f64, y: f64) -> Vec<GestureAction> {
		if self.phase != Phase::Idle {
			return Vec::new();
		}
		self.phase = Phase::Pressed;
		self.node = Some(node);
		self.start_x = x;
		self.start_y = y;
		vec![
			GestureAction::PinNode(node),
			GestureAction::StartLongPressTimer,
		]
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) -> Vec<GestureAction> {
		let Some(node) = self.node else {
			return Vec::new();
		};
		let (dx, dy) = (x - self.start_x, y - self.start_y);
		match self.phase {
			Phase::Pressed => {
				if dx.hypot(dy) <= DRAG_THRESHOLD_PX {
					return Vec::new();
				}
				self.phase = Phase::Dragging;
				vec![
					GestureAction::CancelLongPressTimer,
					GestureAction::DragTo { node, dx, dy },
				]
			}
			// A node stays draggable after the long-press fired.
			Phase::Dragging | Phase::LongPressFired => {
				vec![GestureAction::DragTo { node, dx, dy }]
			}
			Phase::Idle => Vec::new(),
		}
	}

	pub fn release(&mut self) -> Vec<GestureAction> {
		let actions = match (self.phase, self.node) {
			(Phase::Pressed, Some(node)) => vec![
				GestureAction::CancelLongPressTimer,
				GestureAction::UnpinNode(node),
				GestureAction::Click(node),
			],
			(Phase::Dragging | Phase::LongPressFired, Some(node)) => {
				vec![GestureAction::UnpinNode(node)]
			}
			_ => Vec::new(),
		};
		self.reset();
		actions
	}

	/// The long-press timer ran out. A stale callback (the machine already
	/// left `Pressed`) is a no-op.
	pub fn timer_fired(&mut self) -> Vec<GestureAction> {
		let (Phase::Pressed, Some(node)) = (self.phase, self.node) else {
			return Vec::new();
		};
		self.phase = Phase::LongPressFired;
		vec![GestureAction::LongPress(node)]
	}

	/// Abort the interaction (pointer left the canvas) without resolving it
	/// as click, drag or long-press.
	pub fn cancel(&mut self) -> Vec<GestureAction> {
		let actions = match (self.phase, self.node) {
			(Phase::Pressed, Some(node)) => vec![
				GestureAction::CancelLongPressTimer,
				GestureAction::UnpinNode(node),
			],
			(Phase::Dragging | Phase::LongPressFired, Some(node)) => {
				vec![GestureAction::UnpinNode(node)]
			}
			_ => Vec::new(),
		};
		self.reset();
		actions
	}

	fn reset(&mut self) {
		self.phase = Phase::Idle;
		self.node = None;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(n: u64) -> NodeId {
		// Allocate through a graph so test ids share the production shape.
		let mut g = crate::graph::model::ConceptGraph::new();
		let mut id = g.reset_to_root("x");
		for _ in 0..n {
			id = g.add_node("x", "#fff".into(), None, None);
		}
		id
	}

	fn clicks(actions: &[GestureAction]) -> usize {
		actions
			.iter()
			.filter(|a| matches!(a, GestureAction::Click(_)))
			.count()
	}

	fn long_presses(actions: &[GestureAction]) -> usize {
		actions
			.iter()
			.filter(|a| matches!(a, GestureAction::LongPress(_)))
			.count()
	}

	#[test]
	fn quick_release_is_a_click() {
		let mut gesture = GestureState::new();
		let n = node(0);

		let pressed = gesture.press(n, 10.0, 10.0);
		assert_eq!(
			pressed,
			vec![GestureAction::PinNode(n), GestureAction::StartLongPressTimer]
		);

		let released = gesture.release();
		assert_eq!(clicks(&released), 1);
		assert_eq!(long_presses(&released), 0);
		assert!(released.contains(&GestureAction::CancelLongPressTimer));
		assert!(released.contains(&GestureAction::UnpinNode(n)));
		assert!(!gesture.is_active());
	}

	#[test]
	fn jitter_below_the_threshold_still_clicks() {
		let mut gesture = GestureState::new();
		let n = node(0);
		gesture.press(n, 10.0, 10.0);
		assert!(gesture.pointer_move(12.0, 11.0).is_empty());
		assert_eq!(clicks(&gesture.release()), 1);
	}

	#[test]
	fn held_press_long_presses_and_suppresses_the_click() {
		let mut gesture = GestureState::new();
		let n = node(0);
		gesture.press(n, 10.0, 10.0);

		let fired = gesture.timer_fired();
		assert_eq!(fired, vec![GestureAction::LongPress(n)]);

		let released = gesture.release();
		assert_eq!(clicks(&released), 0);
		assert_eq!(long_presses(&released), 0, "long-press fires exactly once");
		assert!(released.contains(&GestureAction::UnpinNode(n)));
	}

	#[test]
	fn long_press_timer_fires_at_most_once() {
		let mut gesture = GestureState::new();
		gesture.press(node(0), 10.0, 10.0);
		assert_eq!(gesture.timer_fired().len(), 1);
		assert!(gesture.timer_fired().is_empty());
	}

	#[test]
	fn drag_cancels_the_timer_and_suppresses_both_callbacks() {
		let mut gesture = GestureState::new();
		let n = node(0);
		gesture.press(n, 10.0, 10.0);

		let moved = gesture.pointer_move(30.0, 10.0);
		assert_eq!(
			moved,
			vec![
				GestureAction::CancelLongPressTimer,
				GestureAction::DragTo { node: n, dx: 20.0, dy: 0.0 },
			]
		);

		let released = gesture.release();
		assert_eq!(clicks(&released), 0);
		assert_eq!(long_presses(&released), 0);
		assert_eq!(released, vec![GestureAction::UnpinNode(n)]);
	}

	#[test]
	fn a_stale_timer_callback_is_dropped() {
		let mut gesture = GestureState::new();
		gesture.press(node(0), 10.0, 10.0);
		gesture.pointer_move(40.0, 40.0);
		assert!(gesture.timer_fired().is_empty());

		gesture.release();
		assert!(gesture.timer_fired().is_empty());
	}

	#[test]
	fn node_stays_draggable_after_the_long_press() {
		let mut gesture = GestureState::new();
		let n = node(0);
		gesture.press(n, 10.0, 10.0);
		gesture.timer_fired();

		let moved = gesture.pointer_move(25.0, 10.0);
		assert_eq!(moved, vec![GestureAction::DragTo { node: n, dx: 15.0, dy: 0.0 }]);
	}

	#[test]
	fn a_second_press_during_an_interaction_is_ignored() {
		let mut gesture = GestureState::new();
		let first = node(0);
		let second = node(1);
		gesture.press(first, 10.0, 10.0);
		assert!(gesture.press(second, 50.0, 50.0).is_empty());

		// The original interaction still resolves normally.
		assert_eq!(gesture.release(), vec![
			GestureAction::CancelLongPressTimer,
			GestureAction::UnpinNode(first),
			GestureAction::Click(first),
		]);
	}

	#[test]
	fn cancel_resolves_nothing() {
		let mut gesture = GestureState::new();
		let n = node(0);
		gesture.press(n, 10.0, 10.0);

		let cancelled = gesture.cancel();
		assert_eq!(clicks(&cancelled), 0);
		assert_eq!(long_presses(&cancelled), 0);
		assert!(cancelled.contains(&GestureAction::CancelLongPressTimer));
		assert!(cancelled.contains(&GestureAction::UnpinNode(n)));
		assert!(!gesture.is_active());
	}

	#[test]
	fn release_when_idle_does_nothing() {
		let mut gesture = GestureState::new();
		assert!(gesture.release().is_empty());
		assert!(gesture.cancel().is_empty());
		assert!(gesture.pointer_move(5.0, 5.0).is_empty());
	}
}
