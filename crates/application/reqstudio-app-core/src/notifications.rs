//! Non-blocking notification area. Collaborator outcomes end up here rather
//! than in modal dialogs.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::ports::{FailureKind, Operation, PortError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NotificationCenter {
    entries: VecDeque<Notification>,
    capacity: usize,
    next_id: u64,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::with_capacity(reqstudio_config::NOTIFICATION_HISTORY)
    }
}

impl NotificationCenter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_id: 1,
        }
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Notification {
            id,
            severity,
            message: message.into(),
            raised_at: Utc::now(),
        });
        id
    }

    /// Turns a collaborator failure into a notification. Cancellations are
    /// silent; unexpected failures are logged with full detail.
    pub fn report_failure(&mut self, op: Operation, err: &PortError) -> Option<u64> {
        match err.kind() {
            FailureKind::Cancelled => {
                info!(operation = op.as_str(), "operation cancelled");
                None
            }
            FailureKind::Transient => {
                warn!(operation = op.as_str(), "{err}");
                Some(self.push(Severity::Warning, err.user_message(op)))
            }
            FailureKind::Unexpected => {
                error!(operation = op.as_str(), error = ?err, "collaborator failure");
                Some(self.push(Severity::Error, err.user_message(op)))
            }
        }
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.back()
    }

    pub fn all(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_entries_are_dropped() {
        let mut center = NotificationCenter::with_capacity(2);
        center.push(Severity::Info, "a");
        center.push(Severity::Info, "b");
        center.push(Severity::Success, "c");

        let messages: Vec<_> = center.all().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, ["b", "c"]);
    }

    #[test]
    fn cancellation_is_not_reported() {
        let mut center = NotificationCenter::default();
        assert_eq!(center.report_failure(Operation::Analyze, &PortError::Cancelled), None);
        assert!(center.is_empty());
    }

    #[test]
    fn dismiss_removes_by_id() {
        let mut center = NotificationCenter::default();
        let id = center.push(Severity::Warning, "w");
        assert!(center.dismiss(id));
        assert!(!center.dismiss(id));
    }

    #[test]
    fn failures_map_to_severity() {
        let mut center = NotificationCenter::default();
        center.report_failure(Operation::Analyze, &PortError::Timeout(30));
        assert_eq!(center.latest().map(|n| n.severity), Some(Severity::Warning));
        center.report_failure(Operation::Import, &PortError::Import("boom".into()));
        assert_eq!(center.latest().map(|n| n.severity), Some(Severity::Error));
    }
}
