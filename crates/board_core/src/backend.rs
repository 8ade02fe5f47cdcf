//! Synchronous service handles over the async SQLite storage, for hosts
//! whose event loop runs on a single UI thread.

use std::future::Future;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use shared::{
    domain::{
        Notification, NotificationId, Task, TaskId, TaskStatus, TimeEntry, TimeEntryId, UserId,
    },
    error::ServiceError,
};
use storage::{RecordNotFound, Storage};
use tokio::runtime::{Builder, Runtime};

use crate::{
    cra::{CalendarMonth, CraService},
    kanban::TaskBoardService,
    notifications::NotificationService,
};

pub struct BlockingBackend {
    runtime: Runtime,
    storage: Storage,
}

impl BlockingBackend {
    pub fn open(database_url: &str) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build backend runtime")?;
        let storage = runtime
            .block_on(Storage::new(database_url))
            .context("failed to initialize backlog storage")?;
        Ok(Self { runtime, storage })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Must not be called from inside another Tokio runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn service_error(err: anyhow::Error) -> ServiceError {
    match err.downcast_ref::<RecordNotFound>() {
        Some(not_found) => ServiceError::not_found(not_found.to_string()),
        None => ServiceError::persistence(format!("{err:#}")),
    }
}

impl TaskBoardService for BlockingBackend {
    fn list_tasks(&self) -> Result<Vec<Task>, ServiceError> {
        self.block_on(self.storage.list_tasks())
            .map_err(service_error)
    }

    fn mutate_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), ServiceError> {
        self.block_on(self.storage.set_task_status(task_id, status))
            .map_err(service_error)
    }
}

impl CraService for BlockingBackend {
    fn list_entries(&self, month: CalendarMonth) -> Result<Vec<TimeEntry>, ServiceError> {
        self.block_on(
            self.storage
                .list_time_entries_between(month.first_day(), month.last_day()),
        )
        .map_err(service_error)
    }

    fn mutate_scheduled_day(
        &self,
        entry_id: TimeEntryId,
        day: NaiveDate,
    ) -> Result<(), ServiceError> {
        self.block_on(self.storage.set_time_entry_day(entry_id, day))
            .map_err(service_error)
    }
}

impl NotificationService for BlockingBackend {
    fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, ServiceError> {
        self.block_on(self.storage.list_notifications(user_id))
            .map_err(service_error)
    }

    fn mark_read(&self, notification_id: NotificationId) -> Result<(), ServiceError> {
        self.block_on(self.storage.mark_notification_read(notification_id))
            .map_err(service_error)
    }

    fn mark_all_read(&self, user_id: UserId) -> Result<u64, ServiceError> {
        self.block_on(self.storage.mark_all_notifications_read(user_id))
            .map_err(service_error)
    }
}
