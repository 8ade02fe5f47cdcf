//! Notification list with read-state filtering.

use std::{fmt, str::FromStr};

use shared::{
    domain::{Notification, NotificationId, UserId},
    error::{ErrorCode, ServiceError},
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationFilter {
    #[default]
    All,
    Unread,
    Read,
}

impl NotificationFilter {
    pub fn matches(self, notification: &Notification) -> bool {
        match self {
            NotificationFilter::All => true,
            NotificationFilter::Unread => !notification.read,
            NotificationFilter::Read => notification.read,
        }
    }
}

impl fmt::Display for NotificationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotificationFilter::All => "all",
            NotificationFilter::Unread => "unread",
            NotificationFilter::Read => "read",
        })
    }
}

impl FromStr for NotificationFilter {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" | "toutes" => Ok(NotificationFilter::All),
            "unread" | "non-lues" | "non_lues" => Ok(NotificationFilter::Unread),
            "read" | "lues" => Ok(NotificationFilter::Read),
            _ => Err(ServiceError::new(
                ErrorCode::Validation,
                format!("unknown notification filter '{raw}'"),
            )),
        }
    }
}

pub trait NotificationService {
    fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, ServiceError>;
    fn mark_read(&self, notification_id: NotificationId) -> Result<(), ServiceError>;
    fn mark_all_read(&self, user_id: UserId) -> Result<u64, ServiceError>;
}

impl<T: NotificationService + ?Sized> NotificationService for &T {
    fn list_notifications(&self, user_id: UserId) -> Result<Vec<Notification>, ServiceError> {
        (**self).list_notifications(user_id)
    }

    fn mark_read(&self, notification_id: NotificationId) -> Result<(), ServiceError> {
        (**self).mark_read(notification_id)
    }

    fn mark_all_read(&self, user_id: UserId) -> Result<u64, ServiceError> {
        (**self).mark_all_read(user_id)
    }
}

pub struct NotificationCenter<S> {
    service: S,
    user_id: UserId,
    filter: NotificationFilter,
    items: Vec<Notification>,
}

impl<S: NotificationService> NotificationCenter<S> {
    pub fn new(service: S, user_id: UserId) -> Self {
        Self {
            service,
            user_id,
            filter: NotificationFilter::default(),
            items: Vec::new(),
        }
    }

    pub fn load(&mut self) -> Result<(), ServiceError> {
        let mut items = self.service.list_notifications(self.user_id)?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        self.items = items;
        Ok(())
    }

    pub fn filter(&self) -> NotificationFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: NotificationFilter) {
        self.filter = filter;
    }

    /// Newest first, restricted to the current filter.
    pub fn visible(&self) -> Vec<&Notification> {
        self.items
            .iter()
            .filter(|item| self.filter.matches(item))
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    /// Returns `false` when it was already read; the service is not called
    /// again in that case.
    pub fn mark_read(&mut self, notification_id: NotificationId) -> Result<bool, ServiceError> {
        let Some(item) = self.items.iter_mut().find(|item| item.id == notification_id) else {
            return Err(ServiceError::not_found(format!(
                "notification {notification_id} not found"
            )));
        };
        if item.read {
            return Ok(false);
        }
        self.service.mark_read(notification_id)?;
        item.read = true;
        debug!(%notification_id, "notification marked read");
        Ok(true)
    }

    pub fn mark_all_read(&mut self) -> Result<usize, ServiceError> {
        let unread = self.unread_count();
        if unread == 0 {
            return Ok(0);
        }
        self.service.mark_all_read(self.user_id)?;
        for item in &mut self.items {
            item.read = true;
        }
        debug!(user_id = %self.user_id, unread, "all notifications marked read");
        Ok(unread)
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

#[cfg(test)]
#[path = "tests/notifications_tests.rs"]
mod tests;
