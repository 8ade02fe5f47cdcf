//! Pointer-drag state machine shared by the Kanban board and the CRA calendar.
//!
//! A gesture moves `Idle -> Armed -> Dragging -> Idle`. The controller never
//! touches UI elements; hosts feed it pointer events and receive visual
//! updates through [`Feedback`].

use std::{fmt, marker::PhantomData, time::Duration};

use shared::error::ServiceError;
use tracing::{debug, warn};

use crate::feedback::Feedback;

/// Platform minimum drag distance on desktop toolkits, per axis.
pub const DEFAULT_DRAG_DISTANCE: f64 = 4.0;
pub const DEFAULT_SUCCESS_FLASH: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragThreshold {
    pub horizontal: f64,
    pub vertical: f64,
}

impl Default for DragThreshold {
    fn default() -> Self {
        Self::uniform(DEFAULT_DRAG_DISTANCE)
    }
}

impl DragThreshold {
    pub fn new(horizontal: f64, vertical: f64) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub fn uniform(distance: f64) -> Self {
        Self::new(distance, distance)
    }

    /// Axes are checked independently; moving exactly the threshold is
    /// still a click.
    pub fn exceeded(&self, origin: Point, current: Point) -> bool {
        (current.x - origin.x).abs() > self.horizontal
            || (current.y - origin.y).abs() > self.vertical
    }
}

/// Something a user can pick up: a task card or a CRA entry.
pub trait Draggable: Clone {
    type Id: Copy + PartialEq + fmt::Debug;

    fn id(&self) -> Self::Id;
    /// Only used for traces and feedback text.
    fn label(&self) -> &str;
}

/// A container that may receive a dropped payload.
pub trait DropTarget {
    type Key: Copy + PartialEq + fmt::Debug;

    fn key(&self) -> Self::Key;
    fn accepts(&self) -> bool;
    fn label(&self) -> String;
}

/// Persists one accepted drop.
pub trait Reassign<P, T> {
    fn reassign(&mut self, payload: &P, target: &T) -> Result<(), ServiceError>;
}

impl<P, T, F> Reassign<P, T> for F
where
    F: FnMut(&P, &T) -> Result<(), ServiceError>,
{
    fn reassign(&mut self, payload: &P, target: &T) -> Result<(), ServiceError> {
        self(payload, target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Armed,
    Dragging,
}

#[derive(Debug, Clone)]
pub struct DragSession<P> {
    pub gesture: u64,
    pub origin: Point,
    pub payload: P,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No pointer is held over a draggable element.
    Ignored,
    Armed,
    /// Emitted once per gesture, on the move that crosses the threshold.
    DragStarted,
    Dragging,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerUpOutcome<P> {
    Idle,
    /// Released before the threshold: the host opens the payload's details.
    Activate(P),
    /// Released mid-drag away from any drop target.
    Cancelled(P),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Move,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TargetRefused,
    OutsideTarget,
    NotDragging,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome<I, K> {
    Reassigned { payload: I, target: K },
    Rejected(Rejection),
    Failed { payload: I, error: ServiceError },
    /// No gesture was in flight, e.g. a second drop event for a gesture
    /// that already completed.
    Ignored,
}

impl<I, K> DropOutcome<I, K> {
    pub fn is_reassigned(&self) -> bool {
        matches!(self, DropOutcome::Reassigned { .. })
    }
}

pub struct DragController<P, T> {
    threshold: DragThreshold,
    success_flash: Duration,
    session: Option<DragSession<P>>,
    gestures: u64,
    _target: PhantomData<fn(&T)>,
}

impl<P, T> DragController<P, T>
where
    P: Draggable,
    T: DropTarget,
{
    pub fn new(threshold: DragThreshold) -> Self {
        Self {
            threshold,
            success_flash: DEFAULT_SUCCESS_FLASH,
            session: None,
            gestures: 0,
            _target: PhantomData,
        }
    }

    pub fn with_success_flash(mut self, success_flash: Duration) -> Self {
        self.success_flash = success_flash;
        self
    }

    pub fn threshold(&self) -> DragThreshold {
        self.threshold
    }

    pub fn phase(&self) -> DragPhase {
        match &self.session {
            None => DragPhase::Idle,
            Some(session) if session.confirmed => DragPhase::Dragging,
            Some(_) => DragPhase::Armed,
        }
    }

    pub fn session(&self) -> Option<&DragSession<P>> {
        self.session.as_ref()
    }

    pub fn on_pointer_down<F>(&mut self, payload: P, at: Point, feedback: &mut F)
    where
        F: Feedback<P, T>,
    {
        self.reset(feedback);
        self.gestures += 1;
        debug!(
            gesture = self.gestures,
            payload_id = ?payload.id(),
            label = payload.label(),
            x = at.x,
            y = at.y,
            "drag armed"
        );
        self.session = Some(DragSession {
            gesture: self.gestures,
            origin: at,
            payload,
            confirmed: false,
        });
    }

    pub fn on_pointer_move<F>(&mut self, at: Point, feedback: &mut F) -> MoveOutcome
    where
        F: Feedback<P, T>,
    {
        let Some(session) = self.session.as_mut() else {
            return MoveOutcome::Ignored;
        };
        if session.confirmed {
            return MoveOutcome::Dragging;
        }
        if !self.threshold.exceeded(session.origin, at) {
            return MoveOutcome::Armed;
        }

        session.confirmed = true;
        debug!(
            gesture = session.gesture,
            payload_id = ?session.payload.id(),
            x = at.x,
            y = at.y,
            "drag threshold exceeded"
        );
        feedback.drag_started(&session.payload);
        MoveOutcome::DragStarted
    }

    pub fn on_pointer_up<F>(&mut self, at: Point, feedback: &mut F) -> PointerUpOutcome<P>
    where
        F: Feedback<P, T>,
    {
        let Some(session) = self.session.take() else {
            return PointerUpOutcome::Idle;
        };

        if session.confirmed {
            debug!(
                gesture = session.gesture,
                x = at.x,
                y = at.y,
                "drag released outside any target"
            );
            feedback.reverted(&session.payload);
            PointerUpOutcome::Cancelled(session.payload)
        } else {
            debug!(
                gesture = session.gesture,
                payload_id = ?session.payload.id(),
                "click"
            );
            PointerUpOutcome::Activate(session.payload)
        }
    }

    pub fn on_drop_candidate<F>(&mut self, target: &T, feedback: &mut F) -> Affordance
    where
        F: Feedback<P, T>,
    {
        if self.phase() != DragPhase::Dragging {
            return Affordance::None;
        }
        let affordance = if target.accepts() {
            Affordance::Move
        } else {
            Affordance::None
        };
        feedback.target_hovered(target, affordance);
        affordance
    }

    pub fn on_drop_leave<F>(&mut self, target: &T, feedback: &mut F)
    where
        F: Feedback<P, T>,
    {
        if self.phase() == DragPhase::Dragging {
            feedback.target_left(target);
        }
    }

    /// Ends the gesture. `target` is `None` when the pointer is over no
    /// container. The session is cleared before `reassign` runs, so a
    /// duplicated drop event for the same gesture is [`DropOutcome::Ignored`].
    pub fn on_drop<R, F>(
        &mut self,
        target: Option<&T>,
        reassign: &mut R,
        feedback: &mut F,
    ) -> DropOutcome<P::Id, T::Key>
    where
        R: Reassign<P, T>,
        F: Feedback<P, T>,
    {
        let Some(session) = self.session.take() else {
            debug!("drop without an active gesture ignored");
            return DropOutcome::Ignored;
        };
        if !session.confirmed {
            return DropOutcome::Rejected(Rejection::NotDragging);
        }

        let payload = session.payload;
        let Some(target) = target else {
            debug!(gesture = session.gesture, "dropped outside any target");
            feedback.reverted(&payload);
            return DropOutcome::Rejected(Rejection::OutsideTarget);
        };

        if !target.accepts() {
            debug!(
                gesture = session.gesture,
                target = ?target.key(),
                "drop target refused payload"
            );
            feedback.target_left(target);
            feedback.reverted(&payload);
            return DropOutcome::Rejected(Rejection::TargetRefused);
        }

        match reassign.reassign(&payload, target) {
            Ok(()) => {
                debug!(
                    gesture = session.gesture,
                    payload_id = ?payload.id(),
                    target = ?target.key(),
                    "payload reassigned"
                );
                feedback.drop_succeeded(&payload, target);
                feedback.success_flash(target, self.success_flash);
                DropOutcome::Reassigned {
                    payload: payload.id(),
                    target: target.key(),
                }
            }
            Err(error) => {
                warn!(
                    gesture = session.gesture,
                    payload_id = ?payload.id(),
                    target = ?target.key(),
                    error = %error,
                    "reassignment failed"
                );
                feedback.target_left(target);
                feedback.blocking_notice(&payload, &error);
                feedback.reverted(&payload);
                DropOutcome::Failed {
                    payload: payload.id(),
                    error,
                }
            }
        }
    }

    /// Drops any in-flight gesture, reverting its visuals if it was dragging.
    pub fn reset<F>(&mut self, feedback: &mut F)
    where
        F: Feedback<P, T>,
    {
        if let Some(stale) = self.session.take() {
            debug!(gesture = stale.gesture, "discarding stale drag session");
            if stale.confirmed {
                feedback.reverted(&stale.payload);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/drag_tests.rs"]
mod tests;
