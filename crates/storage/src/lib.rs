use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;

use shared::domain::{
    Notification, NotificationId, ProjectId, Task, TaskId, TaskStatus, TimeEntry, TimeEntryId,
    UserId,
};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Returned (inside `anyhow::Error`) when an update targets a row that does
/// not exist. Callers downcast to tell it apart from I/O failures.
#[derive(Debug, Error)]
#[error("{entity} {id} not found")]
pub struct RecordNotFound {
    pub entity: &'static str,
    pub id: i64,
}

#[derive(Debug, Clone)]
pub struct NewTask<'a> {
    pub project_id: Option<ProjectId>,
    pub title: &'a str,
    pub status: TaskStatus,
    pub assignee: Option<UserId>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        // Each in-memory connection is its own database; keep exactly one alive.
        let pool_options = if is_memory_url(database_url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sqlite database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run backlog migrations")?;
        tracing::debug!(database_url, "storage ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_task(&self, task: NewTask<'_>) -> Result<TaskId> {
        let rec = sqlx::query(
            "INSERT INTO tasks (project_id, title, status, assignee_id) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(task.project_id.map(|p| p.0))
        .bind(task.title)
        .bind(task.status.as_str())
        .bind(task.assignee.map(|u| u.0))
        .fetch_one(&self.pool)
        .await
        .context("failed to insert task")?;
        Ok(TaskId(rec.get::<i64, _>(0)))
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query(
            "SELECT id, project_id, title, status, assignee_id FROM tasks ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .context("failed to list tasks")?;
        rows.iter().map(task_from_row).collect()
    }

    pub async fn task(&self, task_id: TaskId) -> Result<Option<Task>> {
        let row = sqlx::query(
            "SELECT id, project_id, title, status, assignee_id FROM tasks WHERE id = ?",
        )
        .bind(task_id.0)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load task")?;
        row.as_ref().map(task_from_row).transpose()
    }

    /// Moves a task to another Kanban column. Writing the status it already
    /// has succeeds without side effects beyond `updated_at`.
    pub async fn set_task_status(&self, task_id: TaskId, status: TaskStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE tasks SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(task_id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update status of task {task_id}"))?;

        if result.rows_affected() == 0 {
            return Err(RecordNotFound {
                entity: "task",
                id: task_id.0,
            }
            .into());
        }
        Ok(())
    }

    pub async fn create_time_entry(
        &self,
        task_id: Option<TaskId>,
        label: &str,
        day: NaiveDate,
        hours: f64,
    ) -> Result<TimeEntryId> {
        let rec = sqlx::query(
            "INSERT INTO time_entries (task_id, label, day, hours) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(task_id.map(|t| t.0))
        .bind(label)
        .bind(day)
        .bind(hours)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert time entry")?;
        Ok(TimeEntryId(rec.get::<i64, _>(0)))
    }

    /// Entries whose day falls in `from..=to`, ordered by day then id.
    pub async fn list_time_entries_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TimeEntry>> {
        let rows = sqlx::query(
            "SELECT id, task_id, label, day, hours
             FROM time_entries
             WHERE day >= ? AND day <= ?
             ORDER BY day ASC, id ASC",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .context("failed to list time entries")?;

        Ok(rows
            .into_iter()
            .map(|r| TimeEntry {
                id: TimeEntryId(r.get::<i64, _>("id")),
                task_id: r.get::<Option<i64>, _>("task_id").map(TaskId),
                label: r.get::<String, _>("label"),
                day: r.get::<NaiveDate, _>("day"),
                hours: r.get::<f64, _>("hours"),
            })
            .collect())
    }

    pub async fn set_time_entry_day(&self, entry_id: TimeEntryId, day: NaiveDate) -> Result<()> {
        let result = sqlx::query(
            "UPDATE time_entries SET day = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(day)
        .bind(entry_id.0)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to reschedule time entry {entry_id}"))?;

        if result.rows_affected() == 0 {
            return Err(RecordNotFound {
                entity: "time entry",
                id: entry_id.0,
            }
            .into());
        }
        Ok(())
    }

    pub async fn create_notification(
        &self,
        user_id: UserId,
        message: &str,
        created_at: DateTime<Utc>,
    ) -> Result<NotificationId> {
        let rec = sqlx::query(
            "INSERT INTO notifications (user_id, message, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(user_id.0)
        .bind(message)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert notification")?;
        Ok(NotificationId(rec.get::<i64, _>(0)))
    }

    /// Newest first.
    pub async fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>> {
        let rows = sqlx::query(
            "SELECT id, user_id, message, created_at, is_read
             FROM notifications
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await
        .context("failed to list notifications")?;

        Ok(rows
            .into_iter()
            .map(|r| Notification {
                id: NotificationId(r.get::<i64, _>("id")),
                user_id: UserId(r.get::<i64, _>("user_id")),
                message: r.get::<String, _>("message"),
                created_at: r.get::<DateTime<Utc>, _>("created_at"),
                read: r.get::<bool, _>("is_read"),
            })
            .collect())
    }

    pub async fn mark_notification_read(&self, notification_id: NotificationId) -> Result<()> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
            .bind(notification_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to mark notification {notification_id} read"))?;

        if result.rows_affected() == 0 {
            return Err(RecordNotFound {
                entity: "notification",
                id: notification_id.0,
            }
            .into());
        }
        Ok(())
    }

    /// Returns how many notifications flipped from unread to read.
    pub async fn mark_all_notifications_read(&self, user_id: UserId) -> Result<u64> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id.0)
                .execute(&self.pool)
                .await
                .context("failed to mark notifications read")?;
        Ok(result.rows_affected())
    }
}

fn task_from_row(row: &SqliteRow) -> Result<Task> {
    let raw_status: String = row.try_get("status")?;
    let status = TaskStatus::from_str(&raw_status)
        .with_context(|| format!("corrupt status column '{raw_status}'"))?;
    Ok(Task {
        id: TaskId(row.try_get::<i64, _>("id")?),
        project_id: row.try_get::<Option<i64>, _>("project_id")?.map(ProjectId),
        title: row.try_get::<String, _>("title")?,
        status,
        assignee: row.try_get::<Option<i64>, _>("assignee_id")?.map(UserId),
    })
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

/// Creates the directory holding a file-backed SQLite database. In-memory
/// and non-SQLite urls are left alone.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
