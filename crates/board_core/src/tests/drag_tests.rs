use super::*;
use crate::{events::UiEvent, feedback::RecordingFeedback};
use shared::{error::ErrorCode, protocol::Surface};

#[derive(Debug, Clone, PartialEq)]
struct Card {
    id: u32,
    name: &'static str,
}

impl Draggable for Card {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }

    fn label(&self) -> &str {
        self.name
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    key: char,
    open: bool,
}

impl DropTarget for Slot {
    type Key = char;

    fn key(&self) -> char {
        self.key
    }

    fn accepts(&self) -> bool {
        self.open
    }

    fn label(&self) -> String {
        self.key.to_string()
    }
}

const OPEN: Slot = Slot {
    key: 'a',
    open: true,
};
const CLOSED: Slot = Slot {
    key: 'z',
    open: false,
};

fn card() -> Card {
    Card {
        id: 5,
        name: "card five",
    }
}

fn controller() -> DragController<Card, Slot> {
    DragController::new(DragThreshold::uniform(10.0))
}

fn feedback() -> RecordingFeedback {
    RecordingFeedback::new(Surface::Kanban)
}

#[derive(Default)]
struct CallLog {
    calls: Vec<(u32, char)>,
    fail_with: Option<ServiceError>,
}

impl Reassign<Card, Slot> for CallLog {
    fn reassign(&mut self, payload: &Card, target: &Slot) -> Result<(), ServiceError> {
        self.calls.push((payload.id, target.key));
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn start_drag(controller: &mut DragController<Card, Slot>, feedback: &mut RecordingFeedback) {
    controller.on_pointer_down(card(), Point::new(100.0, 100.0), feedback);
    assert_eq!(
        controller.on_pointer_move(Point::new(100.0, 130.0), feedback),
        MoveOutcome::DragStarted
    );
}

#[test]
fn threshold_is_strict_and_per_axis() {
    let threshold = DragThreshold::new(4.0, 10.0);
    let origin = Point::new(0.0, 0.0);
    assert!(!threshold.exceeded(origin, Point::new(4.0, 10.0)));
    assert!(!threshold.exceeded(origin, Point::new(-4.0, -10.0)));
    assert!(threshold.exceeded(origin, Point::new(4.5, 0.0)));
    assert!(threshold.exceeded(origin, Point::new(0.0, -10.5)));
    assert_eq!(DragThreshold::default(), DragThreshold::uniform(4.0));
}

#[test]
fn click_without_movement_activates_payload() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog::default();

    controller.on_pointer_down(card(), Point::new(100.0, 100.0), &mut feedback);
    assert_eq!(controller.phase(), DragPhase::Armed);

    let up = controller.on_pointer_up(Point::new(100.0, 100.0), &mut feedback);
    assert_eq!(up, PointerUpOutcome::Activate(card()));
    assert_eq!(controller.phase(), DragPhase::Idle);
    assert!(controller.session().is_none());

    assert_eq!(
        controller.on_drop(Some(&OPEN), &mut log, &mut feedback),
        DropOutcome::Ignored
    );
    assert!(log.calls.is_empty());
    assert!(feedback.events().is_empty());
}

#[test]
fn small_jitter_below_threshold_is_still_a_click() {
    let mut controller = controller();
    let mut feedback = feedback();

    controller.on_pointer_down(card(), Point::new(100.0, 100.0), &mut feedback);
    for (x, y) in [(103.0, 98.0), (110.0, 110.0), (90.0, 91.0)] {
        assert_eq!(
            controller.on_pointer_move(Point::new(x, y), &mut feedback),
            MoveOutcome::Armed
        );
    }
    assert_eq!(
        controller.on_pointer_up(Point::new(110.0, 90.0), &mut feedback),
        PointerUpOutcome::Activate(card())
    );
}

#[test]
fn drag_starts_exactly_once() {
    let mut controller = controller();
    let mut feedback = feedback();

    start_drag(&mut controller, &mut feedback);
    for step in 1..5 {
        let at = Point::new(100.0 + 20.0 * f64::from(step), 150.0);
        assert_eq!(
            controller.on_pointer_move(at, &mut feedback),
            MoveOutcome::Dragging
        );
    }

    let started = feedback
        .events()
        .iter()
        .filter(|event| matches!(event, UiEvent::DragStarted { .. }))
        .count();
    assert_eq!(started, 1);
    assert_eq!(controller.phase(), DragPhase::Dragging);
}

#[test]
fn move_without_pointer_down_is_ignored() {
    let mut controller = controller();
    let mut feedback = feedback();
    assert_eq!(
        controller.on_pointer_move(Point::new(500.0, 500.0), &mut feedback),
        MoveOutcome::Ignored
    );
    assert_eq!(
        controller.on_pointer_up(Point::new(500.0, 500.0), &mut feedback),
        PointerUpOutcome::Idle
    );
}

#[test]
fn accepted_drop_calls_reassign_once_with_ids() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog::default();

    start_drag(&mut controller, &mut feedback);
    assert_eq!(
        controller.on_drop_candidate(&OPEN, &mut feedback),
        Affordance::Move
    );

    let outcome = controller.on_drop(Some(&OPEN), &mut log, &mut feedback);
    assert_eq!(
        outcome,
        DropOutcome::Reassigned {
            payload: 5,
            target: 'a'
        }
    );
    assert_eq!(log.calls, vec![(5, 'a')]);
    assert_eq!(controller.phase(), DragPhase::Idle);
    assert_eq!(feedback.opacity(), 1.0);
    assert!(feedback.events().contains(&UiEvent::SuccessFlash {
        target: "a".into(),
        duration: DEFAULT_SUCCESS_FLASH,
    }));
}

#[test]
fn duplicate_drop_for_same_gesture_is_ignored() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog::default();

    start_drag(&mut controller, &mut feedback);
    assert!(controller
        .on_drop(Some(&OPEN), &mut log, &mut feedback)
        .is_reassigned());
    assert_eq!(
        controller.on_drop(Some(&OPEN), &mut log, &mut feedback),
        DropOutcome::Ignored
    );
    assert_eq!(log.calls.len(), 1);
}

#[test]
fn refused_target_never_reassigns() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog::default();

    start_drag(&mut controller, &mut feedback);
    assert_eq!(
        controller.on_drop_candidate(&CLOSED, &mut feedback),
        Affordance::None
    );
    assert_eq!(
        controller.on_drop(Some(&CLOSED), &mut log, &mut feedback),
        DropOutcome::Rejected(Rejection::TargetRefused)
    );
    assert!(log.calls.is_empty());
    assert_eq!(controller.phase(), DragPhase::Idle);
    assert_eq!(feedback.opacity(), 1.0);
    assert!(feedback.events().contains(&UiEvent::TargetHovered {
        target: "z".into(),
        accepted: false,
    }));
}

#[test]
fn drop_outside_any_target_reverts() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog::default();

    start_drag(&mut controller, &mut feedback);
    assert_eq!(
        controller.on_drop(None, &mut log, &mut feedback),
        DropOutcome::Rejected(Rejection::OutsideTarget)
    );
    assert!(log.calls.is_empty());
    assert_eq!(
        feedback.events().last(),
        Some(&UiEvent::Reverted {
            label: "card five".into()
        })
    );
}

#[test]
fn pointer_up_mid_drag_cancels_without_mutation() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog::default();

    start_drag(&mut controller, &mut feedback);
    assert_eq!(
        controller.on_pointer_up(Point::new(300.0, 300.0), &mut feedback),
        PointerUpOutcome::Cancelled(card())
    );
    assert_eq!(controller.phase(), DragPhase::Idle);
    assert_eq!(
        controller.on_drop(Some(&OPEN), &mut log, &mut feedback),
        DropOutcome::Ignored
    );
    assert!(log.calls.is_empty());
}

#[test]
fn drop_while_only_armed_is_rejected() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog::default();

    controller.on_pointer_down(card(), Point::new(0.0, 0.0), &mut feedback);
    assert_eq!(
        controller.on_drop_candidate(&OPEN, &mut feedback),
        Affordance::None
    );
    assert_eq!(
        controller.on_drop(Some(&OPEN), &mut log, &mut feedback),
        DropOutcome::Rejected(Rejection::NotDragging)
    );
    assert!(log.calls.is_empty());
    assert_eq!(controller.phase(), DragPhase::Idle);
}

#[test]
fn failed_reassignment_raises_notice_and_reverts() {
    let mut controller = controller();
    let mut feedback = feedback();
    let mut log = CallLog {
        fail_with: Some(ServiceError::persistence("database is locked")),
        ..CallLog::default()
    };

    start_drag(&mut controller, &mut feedback);
    let outcome = controller.on_drop(Some(&OPEN), &mut log, &mut feedback);
    match outcome {
        DropOutcome::Failed { payload, error } => {
            assert_eq!(payload, 5);
            assert_eq!(error.code, ErrorCode::Persistence);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(log.calls.len(), 1);
    assert_eq!(controller.phase(), DragPhase::Idle);
    assert_eq!(feedback.opacity(), 1.0);

    let notices: Vec<_> = feedback.notices().collect();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title(), "Could not move the task");
}

#[test]
fn new_pointer_down_resets_stale_drag() {
    let mut controller = controller();
    let mut feedback = feedback();

    start_drag(&mut controller, &mut feedback);
    let first_gesture = controller.session().expect("session").gesture;

    let other = Card {
        id: 6,
        name: "card six",
    };
    controller.on_pointer_down(other.clone(), Point::new(10.0, 10.0), &mut feedback);

    let session = controller.session().expect("fresh session");
    assert_eq!(session.payload, other);
    assert!(!session.confirmed);
    assert_eq!(session.gesture, first_gesture + 1);
    assert_eq!(controller.phase(), DragPhase::Armed);
    assert!(feedback.events().contains(&UiEvent::Reverted {
        label: "card five".into()
    }));
}

#[test]
fn closure_reassign_and_custom_flash() {
    let mut controller = controller().with_success_flash(Duration::from_millis(50));
    let mut feedback = feedback();
    let mut seen = Vec::new();
    let mut reassign = |card: &Card, slot: &Slot| -> Result<(), ServiceError> {
        seen.push((card.id, slot.key));
        Ok(())
    };

    start_drag(&mut controller, &mut feedback);
    assert!(controller
        .on_drop(Some(&OPEN), &mut reassign, &mut feedback)
        .is_reassigned());
    assert_eq!(seen, vec![(5, 'a')]);
    assert!(feedback.events().contains(&UiEvent::SuccessFlash {
        target: "a".into(),
        duration: Duration::from_millis(50),
    }));
}
