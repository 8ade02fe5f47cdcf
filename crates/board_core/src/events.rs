//! Feedback events emitted towards the host UI, and the blocking-notice
//! error model.

use std::time::Duration;

use shared::{
    error::{ErrorCode, ServiceError},
    protocol::Surface,
};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// The card is lifted; hosts dim it.
    DragStarted {
        label: String,
    },
    TargetHovered {
        target: String,
        accepted: bool,
    },
    TargetLeft {
        target: String,
    },
    Dropped {
        label: String,
        target: String,
    },
    SuccessFlash {
        target: String,
        duration: Duration,
    },
    /// Visuals go back to their pre-drag appearance.
    Reverted {
        label: String,
    },
    Notice(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    NotFound,
    Validation,
    Persistence,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    MoveTask,
    MoveTimeEntry,
    LoadBoard,
    LoadCalendar,
    Notifications,
}

impl UiErrorContext {
    pub fn for_move(surface: Surface) -> Self {
        match surface {
            Surface::Kanban => UiErrorContext::MoveTask,
            Surface::Cra => UiErrorContext::MoveTimeEntry,
        }
    }

    pub fn for_load(surface: Surface) -> Self {
        match surface {
            Surface::Kanban => UiErrorContext::LoadBoard,
            Surface::Cra => UiErrorContext::LoadCalendar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("not found")
            || message_lower.contains("no such")
            || message_lower.contains("missing")
        {
            UiErrorCategory::NotFound
        } else if message_lower.contains("invalid")
            || message_lower.contains("unknown")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("sqlite")
            || message_lower.contains("database")
            || message_lower.contains("locked")
            || message_lower.contains("constraint")
            || message_lower.contains("disk")
        {
            UiErrorCategory::Persistence
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn from_service(context: UiErrorContext, error: &ServiceError) -> Self {
        let category = match error.code {
            ErrorCode::NotFound => UiErrorCategory::NotFound,
            ErrorCode::Validation => UiErrorCategory::Validation,
            ErrorCode::Persistence => UiErrorCategory::Persistence,
            ErrorCode::Internal => return Self::from_message(context, error.message.clone()),
        };
        Self {
            category,
            context,
            message: error.message.clone(),
        }
    }

    /// The item vanished underneath the view; hosts reload before retrying.
    pub fn requires_reload(&self) -> bool {
        self.category == UiErrorCategory::NotFound
    }

    pub fn title(&self) -> &'static str {
        match self.context {
            UiErrorContext::MoveTask => "Could not move the task",
            UiErrorContext::MoveTimeEntry => "Could not move the time entry",
            UiErrorContext::LoadBoard => "Could not load the board",
            UiErrorContext::LoadCalendar => "Could not load the calendar",
            UiErrorContext::Notifications => "Could not update notifications",
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
