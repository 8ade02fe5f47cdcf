use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, ServiceError};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProjectId);
id_newtype!(TaskId);
id_newtype!(TimeEntryId);
id_newtype!(NotificationId);

/// Kanban column a task sits in. Declaration order is the column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    AFaire,
    EnCours,
    EnTest,
    Termine,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::AFaire,
        TaskStatus::EnCours,
        TaskStatus::EnTest,
        TaskStatus::Termine,
    ];

    /// Value written to the `tasks.status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::AFaire => "a_faire",
            TaskStatus::EnCours => "en_cours",
            TaskStatus::EnTest => "en_test",
            TaskStatus::Termine => "termine",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::AFaire => "À faire",
            TaskStatus::EnCours => "En cours",
            TaskStatus::EnTest => "En test",
            TaskStatus::Termine => "Terminé",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = ServiceError;

    /// Accepts the storage form, the display label, or the variant name
    /// (`en_cours`, `En cours`, `EnCours`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let folded: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .map(|c| match c {
                'à' | 'À' => 'a',
                'é' | 'É' => 'e',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        match folded.as_str() {
            "afaire" | "todo" => Ok(TaskStatus::AFaire),
            "encours" | "doing" => Ok(TaskStatus::EnCours),
            "entest" => Ok(TaskStatus::EnTest),
            "termine" | "done" => Ok(TaskStatus::Termine),
            _ => Err(ServiceError::new(
                ErrorCode::Validation,
                format!("unknown task status '{raw}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserId>,
}

/// One CRA line: time booked against a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    pub label: String,
    pub day: NaiveDate,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}
