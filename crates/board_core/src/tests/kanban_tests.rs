use super::*;

use std::cell::{Cell, RefCell};

use crate::{
    drag::Rejection,
    events::{UiErrorContext, UiEvent},
    feedback::{NoFeedback, RecordingFeedback},
};
use shared::protocol::Surface;

struct FakeBoardService {
    tasks: RefCell<Vec<Task>>,
    moves: RefCell<Vec<(TaskId, TaskStatus)>>,
    fail_moves: Cell<bool>,
    fail_lists: Cell<bool>,
}

impl FakeBoardService {
    fn with_tasks(tasks: &[(i64, &str, TaskStatus)]) -> Self {
        Self {
            tasks: RefCell::new(
                tasks
                    .iter()
                    .map(|(id, title, status)| Task {
                        id: TaskId(*id),
                        project_id: None,
                        title: (*title).to_string(),
                        status: *status,
                        assignee: None,
                    })
                    .collect(),
            ),
            moves: RefCell::new(Vec::new()),
            fail_moves: Cell::new(false),
            fail_lists: Cell::new(false),
        }
    }
}

impl TaskBoardService for FakeBoardService {
    fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        if self.fail_lists.get() {
            return Err(ServiceError::persistence("disk I/O error"));
        }
        Ok(self.tasks.borrow().clone())
    }

    fn mutate_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), ServiceError> {
        self.moves.borrow_mut().push((task_id, status));
        if self.fail_moves.get() {
            return Err(ServiceError::persistence("database is locked"));
        }
        let mut tasks = self.tasks.borrow_mut();
        let task = tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| ServiceError::not_found(format!("task {task_id} not found")))?;
        task.status = status;
        Ok(())
    }
}

fn sample_service() -> FakeBoardService {
    FakeBoardService::with_tasks(&[
        (5, "Write release notes", TaskStatus::AFaire),
        (6, "Fix login bug", TaskStatus::AFaire),
        (7, "Review CRA export", TaskStatus::EnTest),
    ])
}

fn board(service: &FakeBoardService) -> KanbanBoard<&FakeBoardService, RecordingFeedback> {
    let mut board = KanbanBoard::new(
        service,
        RecordingFeedback::new(Surface::Kanban),
        DragThreshold::uniform(10.0),
    );
    board.load().expect("load");
    board
}

#[test]
fn load_builds_every_column_in_order() {
    let service = sample_service();
    let board = board(&service);

    let statuses: Vec<_> = board.columns().map(|(status, _)| status).collect();
    assert_eq!(statuses, TaskStatus::ALL.to_vec());
    assert_eq!(board.column(TaskStatus::AFaire).len(), 2);
    assert!(board.column(TaskStatus::EnCours).is_empty());
    assert_eq!(board.column(TaskStatus::EnTest)[0].title, "Review CRA export");
}

#[test]
fn click_on_card_opens_it_without_moving() {
    let service = sample_service();
    let mut board = board(&service);

    assert!(board.pointer_down(TaskId(5), Point::new(100.0, 100.0)));
    assert_eq!(board.pointer_up(Point::new(100.0, 100.0)), Some(TaskId(5)));
    assert!(service.moves.borrow().is_empty());
    assert_eq!(board.phase(), DragPhase::Idle);
}

#[test]
fn dragging_card_to_en_cours_moves_it_once() {
    let service = sample_service();
    let mut board = board(&service);

    assert!(board.pointer_down(TaskId(5), Point::new(100.0, 100.0)));
    assert_eq!(
        board.pointer_move(Point::new(100.0, 130.0)),
        MoveOutcome::DragStarted
    );
    assert_eq!(board.drag_over(TaskStatus::EnCours), Affordance::Move);

    let outcome = board.drop_on(Some(TaskStatus::EnCours));
    assert_eq!(
        outcome,
        DropOutcome::Reassigned {
            payload: TaskId(5),
            target: TaskStatus::EnCours
        }
    );
    assert_eq!(
        *service.moves.borrow(),
        vec![(TaskId(5), TaskStatus::EnCours)]
    );

    assert_eq!(board.column(TaskStatus::EnCours)[0].id, TaskId(5));
    assert_eq!(board.column(TaskStatus::AFaire).len(), 1);
    assert_eq!(board.phase(), DragPhase::Idle);

    // A host firing the drop twice must not move the card twice.
    assert_eq!(board.drop_on(Some(TaskStatus::EnCours)), DropOutcome::Ignored);
    assert_eq!(service.moves.borrow().len(), 1);
}

#[test]
fn pointer_up_after_drag_leaves_board_untouched() {
    let service = sample_service();
    let mut board = board(&service);

    board.pointer_down(TaskId(6), Point::new(0.0, 0.0));
    board.pointer_move(Point::new(40.0, 0.0));
    assert_eq!(board.pointer_up(Point::new(40.0, 0.0)), None);
    assert!(service.moves.borrow().is_empty());
    assert_eq!(board.feedback().opacity(), 1.0);
}

#[test]
fn drop_outside_columns_is_discarded() {
    let service = sample_service();
    let mut board = board(&service);

    board.pointer_down(TaskId(6), Point::new(0.0, 0.0));
    board.pointer_move(Point::new(0.0, 25.0));
    assert_eq!(
        board.drop_on(None),
        DropOutcome::Rejected(Rejection::OutsideTarget)
    );
    assert!(service.moves.borrow().is_empty());
}

#[test]
fn unknown_card_is_a_no_op() {
    let service = sample_service();
    let mut board = board(&service);

    assert!(!board.pointer_down(TaskId(999), Point::new(0.0, 0.0)));
    assert_eq!(board.phase(), DragPhase::Idle);
    assert_eq!(board.pointer_move(Point::new(50.0, 50.0)), MoveOutcome::Ignored);
}

#[test]
fn failed_move_shows_notice_and_keeps_card_in_place() {
    let service = sample_service();
    service.fail_moves.set(true);
    let mut board = board(&service);

    board.pointer_down(TaskId(5), Point::new(100.0, 100.0));
    board.pointer_move(Point::new(100.0, 130.0));
    let outcome = board.drop_on(Some(TaskStatus::Termine));
    assert!(matches!(outcome, DropOutcome::Failed { payload: TaskId(5), .. }));

    assert_eq!(board.column(TaskStatus::AFaire).len(), 2);
    assert!(board.column(TaskStatus::Termine).is_empty());
    assert_eq!(board.feedback().opacity(), 1.0);
    let notice = board.feedback().notices().next().expect("notice");
    assert_eq!(notice.context(), UiErrorContext::MoveTask);
    assert_eq!(notice.message(), "database is locked");
}

#[test]
fn reload_failure_after_move_is_reported() {
    let service = sample_service();
    let mut board = board(&service);
    service.fail_lists.set(true);

    board.pointer_down(TaskId(7), Point::new(0.0, 0.0));
    board.pointer_move(Point::new(30.0, 0.0));
    assert!(board.drop_on(Some(TaskStatus::Termine)).is_reassigned());

    let notice = board.feedback().notices().next().expect("notice");
    assert_eq!(notice.context(), UiErrorContext::LoadBoard);
    // The stale board stays on screen.
    assert_eq!(board.column(TaskStatus::EnTest)[0].id, TaskId(7));
}

#[test]
fn cancel_gesture_reverts_dragged_card() {
    let service = sample_service();
    let mut board = board(&service);

    board.pointer_down(TaskId(5), Point::new(0.0, 0.0));
    board.pointer_move(Point::new(0.0, 40.0));
    board.cancel_gesture();

    assert_eq!(board.phase(), DragPhase::Idle);
    assert_eq!(
        board.feedback().events().last(),
        Some(&UiEvent::Reverted {
            label: "Write release notes".into()
        })
    );
}

#[test]
fn works_without_feedback_observer() {
    let service = sample_service();
    let mut board = KanbanBoard::new(&service, NoFeedback, DragThreshold::default());
    board.load().expect("load");

    board.pointer_down(TaskId(6), Point::new(0.0, 0.0));
    board.pointer_move(Point::new(5.0, 0.0));
    assert!(board.drop_on(Some(TaskStatus::EnTest)).is_reassigned());
    assert_eq!(board.column(TaskStatus::EnTest).len(), 2);
}

#[test]
fn press_on_unknown_card_cancels_drag_in_flight() {
    let service = sample_service();
    let mut board = board(&service);

    board.pointer_down(TaskId(5), Point::new(100.0, 100.0));
    board.pointer_move(Point::new(100.0, 130.0));
    assert!(!board.pointer_down(TaskId(999), Point::new(0.0, 0.0)));

    assert_eq!(board.phase(), DragPhase::Idle);
    assert_eq!(board.feedback().opacity(), 1.0);
    assert_eq!(board.drop_on(Some(TaskStatus::Termine)), DropOutcome::Ignored);
    assert!(service.moves.borrow().is_empty());
}

#[test]
fn refresh_drops_gesture_whose_card_disappeared() {
    let service = sample_service();
    let mut board = board(&service);

    board.pointer_down(TaskId(5), Point::new(100.0, 100.0));
    board.pointer_move(Point::new(100.0, 130.0));
    service.tasks.borrow_mut().retain(|task| task.id != TaskId(5));
    board.refresh().expect("refresh");

    assert!(board.find_card(TaskId(5)).is_none());
    assert_eq!(board.phase(), DragPhase::Idle);
    assert_eq!(board.drop_on(Some(TaskStatus::EnCours)), DropOutcome::Ignored);
    assert!(service.moves.borrow().is_empty());
}

#[test]
fn refresh_keeps_gesture_whose_card_is_still_there() {
    let service = sample_service();
    let mut board = board(&service);

    board.pointer_down(TaskId(6), Point::new(0.0, 0.0));
    board.pointer_move(Point::new(0.0, 30.0));
    board.refresh().expect("refresh");

    assert_eq!(board.phase(), DragPhase::Dragging);
    assert!(board.drop_on(Some(TaskStatus::EnCours)).is_reassigned());
}
