//! Presentation hooks for the drag controller.

use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};
use shared::{error::ServiceError, protocol::Surface};

use crate::{
    drag::{Affordance, Draggable, DropTarget},
    events::{UiError, UiErrorContext, UiEvent},
};

pub const DRAGGING_OPACITY: f32 = 0.5;
pub const RESTING_OPACITY: f32 = 1.0;

/// Observer notified of every visual change. All hooks default to no-ops.
pub trait Feedback<P, T> {
    fn drag_started(&mut self, _payload: &P) {}

    fn target_hovered(&mut self, _target: &T, _affordance: Affordance) {}

    fn target_left(&mut self, _target: &T) {}

    fn drop_succeeded(&mut self, _payload: &P, _target: &T) {}

    /// Cosmetic highlight after an accepted drop. Must not block.
    fn success_flash(&mut self, _target: &T, _duration: Duration) {}

    fn reverted(&mut self, _payload: &P) {}

    /// The reassignment failed and the user has to acknowledge it.
    fn blocking_notice(&mut self, _payload: &P, _error: &ServiceError) {}

    /// Reloading the surface after a mutation failed.
    fn load_failed(&mut self, _error: &ServiceError) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl<P, T> Feedback<P, T> for NoFeedback {}

/// Keeps every event, plus the dragged element's opacity.
#[derive(Debug, Clone)]
pub struct RecordingFeedback {
    surface: Surface,
    events: Vec<UiEvent>,
    opacity: f32,
}

impl RecordingFeedback {
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            events: Vec::new(),
            opacity: RESTING_OPACITY,
        }
    }

    pub fn events(&self) -> &[UiEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn notices(&self) -> impl Iterator<Item = &UiError> {
        self.events.iter().filter_map(|event| match event {
            UiEvent::Notice(notice) => Some(notice),
            _ => None,
        })
    }

    fn record(&mut self, event: UiEvent) {
        match &event {
            UiEvent::DragStarted { .. } => self.opacity = DRAGGING_OPACITY,
            UiEvent::Dropped { .. } | UiEvent::Reverted { .. } => self.opacity = RESTING_OPACITY,
            _ => {}
        }
        self.events.push(event);
    }
}

impl<P, T> Feedback<P, T> for RecordingFeedback
where
    P: Draggable,
    T: DropTarget,
{
    fn drag_started(&mut self, payload: &P) {
        self.record(UiEvent::DragStarted {
            label: payload.label().to_string(),
        });
    }

    fn target_hovered(&mut self, target: &T, affordance: Affordance) {
        self.record(UiEvent::TargetHovered {
            target: target.label(),
            accepted: affordance == Affordance::Move,
        });
    }

    fn target_left(&mut self, target: &T) {
        self.record(UiEvent::TargetLeft {
            target: target.label(),
        });
    }

    fn drop_succeeded(&mut self, payload: &P, target: &T) {
        self.record(UiEvent::Dropped {
            label: payload.label().to_string(),
            target: target.label(),
        });
    }

    fn success_flash(&mut self, target: &T, duration: Duration) {
        self.record(UiEvent::SuccessFlash {
            target: target.label(),
            duration,
        });
    }

    fn reverted(&mut self, payload: &P) {
        self.record(UiEvent::Reverted {
            label: payload.label().to_string(),
        });
    }

    fn blocking_notice(&mut self, _payload: &P, error: &ServiceError) {
        let context = UiErrorContext::for_move(self.surface);
        self.record(UiEvent::Notice(UiError::from_service(context, error)));
    }

    fn load_failed(&mut self, error: &ServiceError) {
        let context = UiErrorContext::for_load(self.surface);
        self.record(UiEvent::Notice(UiError::from_service(context, error)));
    }
}

/// Forwards events to the UI thread's queue. A full or closed queue drops
/// the event; the gesture itself never waits on the UI.
#[derive(Debug, Clone)]
pub struct ChannelFeedback {
    surface: Surface,
    ui_tx: Sender<UiEvent>,
}

impl ChannelFeedback {
    pub fn new(surface: Surface, ui_tx: Sender<UiEvent>) -> Self {
        Self { surface, ui_tx }
    }

    fn send(&self, event: UiEvent) {
        match self.ui_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::debug!(?event, "ui event queue full; dropping feedback event");
            }
            Err(TrySendError::Disconnected(event)) => {
                tracing::debug!(?event, "ui event queue closed; dropping feedback event");
            }
        }
    }
}

impl<P, T> Feedback<P, T> for ChannelFeedback
where
    P: Draggable,
    T: DropTarget,
{
    fn drag_started(&mut self, payload: &P) {
        self.send(UiEvent::DragStarted {
            label: payload.label().to_string(),
        });
    }

    fn target_hovered(&mut self, target: &T, affordance: Affordance) {
        self.send(UiEvent::TargetHovered {
            target: target.label(),
            accepted: affordance == Affordance::Move,
        });
    }

    fn target_left(&mut self, target: &T) {
        self.send(UiEvent::TargetLeft {
            target: target.label(),
        });
    }

    fn drop_succeeded(&mut self, payload: &P, target: &T) {
        self.send(UiEvent::Dropped {
            label: payload.label().to_string(),
            target: target.label(),
        });
    }

    fn success_flash(&mut self, target: &T, duration: Duration) {
        self.send(UiEvent::SuccessFlash {
            target: target.label(),
            duration,
        });
    }

    fn reverted(&mut self, payload: &P) {
        self.send(UiEvent::Reverted {
            label: payload.label().to_string(),
        });
    }

    fn blocking_notice(&mut self, _payload: &P, error: &ServiceError) {
        let context = UiErrorContext::for_move(self.surface);
        self.send(UiEvent::Notice(UiError::from_service(context, error)));
    }

    fn load_failed(&mut self, error: &ServiceError) {
        let context = UiErrorContext::for_load(self.surface);
        self.send(UiEvent::Notice(UiError::from_service(context, error)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kanban::{StatusColumn, TaskCard};
    use crossbeam_channel::bounded;
    use shared::domain::{TaskId, TaskStatus};

    fn card() -> TaskCard {
        TaskCard {
            id: TaskId(1),
            title: "triage".into(),
            status: TaskStatus::AFaire,
        }
    }

    #[test]
    fn channel_feedback_drops_events_when_queue_is_full() {
        let (tx, rx) = bounded(1);
        let mut feedback = ChannelFeedback::new(Surface::Kanban, tx);
        let column = StatusColumn {
            status: TaskStatus::EnCours,
        };

        Feedback::<TaskCard, StatusColumn>::drag_started(&mut feedback, &card());
        Feedback::<TaskCard, StatusColumn>::target_hovered(
            &mut feedback,
            &column,
            Affordance::Move,
        );

        assert_eq!(
            rx.try_recv().expect("first event"),
            UiEvent::DragStarted {
                label: "triage".into()
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_feedback_survives_closed_queue() {
        let (tx, rx) = bounded(4);
        drop(rx);
        let mut feedback = ChannelFeedback::new(Surface::Kanban, tx);
        Feedback::<TaskCard, StatusColumn>::reverted(&mut feedback, &card());
    }

    #[test]
    fn recording_feedback_tracks_opacity() {
        let mut feedback = RecordingFeedback::new(Surface::Kanban);
        Feedback::<TaskCard, StatusColumn>::drag_started(&mut feedback, &card());
        assert_eq!(feedback.opacity(), DRAGGING_OPACITY);
        Feedback::<TaskCard, StatusColumn>::reverted(&mut feedback, &card());
        assert_eq!(feedback.opacity(), RESTING_OPACITY);
        assert_eq!(feedback.events().len(), 2);
    }
}
