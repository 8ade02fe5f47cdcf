//! Kanban board: task cards dragged between status columns.

use std::collections::BTreeMap;

use shared::{
    domain::{Task, TaskId, TaskStatus},
    error::ServiceError,
};
use tracing::{debug, warn};

use crate::{
    drag::{
        Affordance, DragController, DragPhase, DragThreshold, Draggable, DropOutcome, DropTarget,
        MoveOutcome, Point, PointerUpOutcome,
    },
    feedback::Feedback,
};

#[derive(Debug, Clone, PartialEq)]
pub struct TaskCard {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
}

impl From<Task> for TaskCard {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            status: task.status,
        }
    }
}

impl Draggable for TaskCard {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }

    fn label(&self) -> &str {
        &self.title
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusColumn {
    pub status: TaskStatus,
}

impl DropTarget for StatusColumn {
    type Key = TaskStatus;

    fn key(&self) -> TaskStatus {
        self.status
    }

    /// Any status transition is allowed.
    fn accepts(&self) -> bool {
        true
    }

    fn label(&self) -> String {
        self.status.label().to_string()
    }
}

pub trait TaskBoardService {
    fn list_tasks(&self) -> Result<Vec<Task>, ServiceError>;
    fn mutate_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), ServiceError>;
}

impl<T: TaskBoardService + ?Sized> TaskBoardService for &T {
    fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        (**self).list_tasks()
    }

    fn mutate_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), ServiceError> {
        (**self).mutate_status(task_id, status)
    }
}

pub struct KanbanBoard<S, F> {
    service: S,
    feedback: F,
    controller: DragController<TaskCard, StatusColumn>,
    columns: BTreeMap<TaskStatus, Vec<TaskCard>>,
}

impl<S, F> KanbanBoard<S, F>
where
    S: TaskBoardService,
    F: Feedback<TaskCard, StatusColumn>,
{
    pub fn new(service: S, feedback: F, threshold: DragThreshold) -> Self {
        Self::with_controller(service, feedback, DragController::new(threshold))
    }

    pub fn with_controller(
        service: S,
        feedback: F,
        controller: DragController<TaskCard, StatusColumn>,
    ) -> Self {
        Self {
            service,
            feedback,
            controller,
            columns: empty_columns(),
        }
    }

    pub fn load(&mut self) -> Result<(), ServiceError> {
        self.refresh()
    }

    /// Rebuilds every column from the service. The previous cards stay in
    /// place when loading fails.
    pub fn refresh(&mut self) -> Result<(), ServiceError> {
        let tasks = self.service.list_tasks()?;
        let mut columns = empty_columns();
        for task in tasks {
            columns.entry(task.status).or_default().push(TaskCard::from(task));
        }
        debug!(cards = columns.values().map(Vec::len).sum::<usize>(), "kanban board loaded");
        self.columns = columns;

        let vanished = self
            .controller
            .session()
            .is_some_and(|session| self.find_card(session.payload.id).is_none());
        if vanished {
            debug!("dragged card vanished on reload; gesture reset");
            self.controller.reset(&mut self.feedback);
        }
        Ok(())
    }

    pub fn column(&self, status: TaskStatus) -> &[TaskCard] {
        self.columns.get(&status).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = (TaskStatus, &[TaskCard])> {
        self.columns
            .iter()
            .map(|(status, cards)| (*status, cards.as_slice()))
    }

    pub fn find_card(&self, card_id: TaskId) -> Option<&TaskCard> {
        self.columns.values().flatten().find(|card| card.id == card_id)
    }

    pub fn phase(&self) -> DragPhase {
        self.controller.phase()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    /// Any previous gesture is reset first. Returns `false` when no card has
    /// this id, leaving the board Idle.
    pub fn pointer_down(&mut self, card_id: TaskId, at: Point) -> bool {
        self.controller.reset(&mut self.feedback);
        let Some(card) = self.find_card(card_id).cloned() else {
            debug!(%card_id, "pointer down on unknown card ignored");
            return false;
        };
        self.controller.on_pointer_down(card, at, &mut self.feedback);
        true
    }

    pub fn pointer_move(&mut self, at: Point) -> MoveOutcome {
        self.controller.on_pointer_move(at, &mut self.feedback)
    }

    /// Returns the card to open when the gesture was a click.
    pub fn pointer_up(&mut self, at: Point) -> Option<TaskId> {
        match self.controller.on_pointer_up(at, &mut self.feedback) {
            PointerUpOutcome::Activate(card) => Some(card.id),
            PointerUpOutcome::Idle | PointerUpOutcome::Cancelled(_) => None,
        }
    }

    pub fn drag_over(&mut self, status: TaskStatus) -> Affordance {
        self.controller
            .on_drop_candidate(&StatusColumn { status }, &mut self.feedback)
    }

    pub fn drag_leave(&mut self, status: TaskStatus) {
        self.controller
            .on_drop_leave(&StatusColumn { status }, &mut self.feedback);
    }

    pub fn drop_on(&mut self, status: Option<TaskStatus>) -> DropOutcome<TaskId, TaskStatus> {
        let column = status.map(|status| StatusColumn { status });
        let service = &self.service;
        let mut mutate =
            |card: &TaskCard, column: &StatusColumn| service.mutate_status(card.id, column.status);
        let outcome = self
            .controller
            .on_drop(column.as_ref(), &mut mutate, &mut self.feedback);

        if outcome.is_reassigned() {
            if let Err(err) = self.refresh() {
                warn!(error = %err, "failed to reload kanban board after move");
                self.feedback.load_failed(&err);
            }
        }
        outcome
    }

    /// Abandons any gesture in flight (window lost focus, view closed).
    pub fn cancel_gesture(&mut self) {
        self.controller.reset(&mut self.feedback);
    }
}

fn empty_columns() -> BTreeMap<TaskStatus, Vec<TaskCard>> {
    TaskStatus::ALL
        .into_iter()
        .map(|status| (status, Vec::new()))
        .collect()
}

#[cfg(test)]
#[path = "tests/kanban_tests.rs"]
mod tests;
