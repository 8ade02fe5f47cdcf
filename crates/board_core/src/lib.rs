//! Interaction layer of the backlog desktop client: drag-to-reassign on the
//! Kanban board and the CRA calendar, plus notification read state.

pub mod backend;
pub mod cra;
pub mod drag;
pub mod events;
pub mod feedback;
pub mod kanban;
pub mod notifications;

pub use backend::BlockingBackend;
pub use cra::{CalendarMonth, CraCalendar, CraService, DayCell, EntryCell};
pub use drag::{
    Affordance, DragController, DragPhase, DragThreshold, DropOutcome, MoveOutcome, Point,
    PointerUpOutcome, Rejection,
};
pub use feedback::{ChannelFeedback, Feedback, NoFeedback, RecordingFeedback};
pub use kanban::{KanbanBoard, StatusColumn, TaskBoardService, TaskCard};
pub use notifications::{NotificationCenter, NotificationFilter, NotificationService};
