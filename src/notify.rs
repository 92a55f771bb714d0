//! Notification records and best-effort realtime delivery.
//!
//! Every state-machine transition that a recipient must learn about is
//! persisted as a notification record first; pushing it over a live
//! connection is at-most-once with no queue or retry. The persisted record is
//! the durable source of truth a reconnecting actor polls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::NotificationsConfig;
use crate::error::{Error, Result};
use crate::id;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::Storage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SubtaskConfirmed,
    SubtaskRejected,
    SubtaskCompleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub user_id: String,
    pub action_by_user_id: String,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Outbound push transport. The realtime wire protocol lives outside this
/// crate; implementations report whether the payload was handed off.
pub trait PushChannel: Send + Sync {
    fn push(&self, connection_id: &str, event: &str, payload: &Notification) -> bool;
}

/// Channel that drops every push. Used where no realtime transport is wired
/// up (the CLI) and in tests asserting the persisted record alone.
#[derive(Debug, Default)]
pub struct NoopChannel;

impl PushChannel for NoopChannel {
    fn push(&self, _connection_id: &str, _event: &str, _payload: &Notification) -> bool {
        false
    }
}

/// Process-wide actor-to-connection directory.
///
/// A second connection from the same actor replaces the first so pushes
/// always target the most recent connection.
#[derive(Debug, Default)]
pub struct ConnectionDirectory {
    by_actor: Mutex<HashMap<String, String>>,
}

impl ConnectionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection, returning the connection it replaced, if any
    pub fn add(&self, actor_id: &str, connection_id: &str) -> Option<String> {
        let mut map = self.by_actor.lock().expect("directory poisoned");
        map.insert(actor_id.to_string(), connection_id.to_string())
    }

    /// Drop a connection by its id (disconnect path)
    pub fn remove(&self, connection_id: &str) {
        let mut map = self.by_actor.lock().expect("directory poisoned");
        map.retain(|_, conn| conn != connection_id);
    }

    pub fn find(&self, actor_id: &str) -> Option<String> {
        let map = self.by_actor.lock().expect("directory poisoned");
        map.get(actor_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_actor.lock().expect("directory poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Persists notification records and attempts best-effort delivery
#[derive(Clone)]
pub struct NotificationRelay {
    storage: Storage,
    directory: Arc<ConnectionDirectory>,
    channel: Arc<dyn PushChannel>,
    config: NotificationsConfig,
}

impl NotificationRelay {
    pub fn new(
        storage: Storage,
        directory: Arc<ConnectionDirectory>,
        channel: Arc<dyn PushChannel>,
        config: NotificationsConfig,
    ) -> Self {
        Self {
            storage,
            directory,
            channel,
            config,
        }
    }

    pub fn directory(&self) -> &ConnectionDirectory {
        &self.directory
    }

    /// Persist a notification and attempt to push it to the recipient.
    ///
    /// Returns the stored record; delivery failure is not an error.
    pub fn notify(
        &self,
        recipient_id: &str,
        action_by: &str,
        kind: NotificationKind,
        subtask_id: Option<&str>,
    ) -> Result<Notification> {
        let notification = Notification {
            id: id::new_id("notif"),
            user_id: recipient_id.to_string(),
            action_by_user_id: action_by.to_string(),
            kind,
            subtask_id: subtask_id.map(|id| id.to_string()),
            is_read: false,
            created_at: Utc::now(),
        };

        let path = self.storage.notifications_file();
        {
            let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;
            self.storage.append_jsonl(&path, &notification)?;
        }

        self.deliver(&notification);
        Ok(notification)
    }

    /// Push to the recipient's live connection if one exists.
    ///
    /// Returns whether a connection was found and the payload handed off;
    /// offline recipients are silently dropped.
    pub fn deliver(&self, notification: &Notification) -> bool {
        let Some(connection_id) = self.directory.find(&notification.user_id) else {
            debug!(recipient = %notification.user_id, "recipient offline, push dropped");
            return false;
        };
        self.channel
            .push(&connection_id, &self.config.push_event, notification)
    }

    /// Notifications addressed to a user, newest first
    pub fn list_for_user(&self, user_id: &str, unread_only: bool) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .storage
            .read_jsonl(&self.storage.notifications_file())?;
        notifications.retain(|notification| {
            notification.user_id == user_id && (!unread_only || !notification.is_read)
        });
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    /// Mark one of the recipient's notifications as read
    pub fn mark_read(&self, actor_id: &str, notification_id: &str) -> Result<Notification> {
        let path = self.storage.notifications_file();
        let _lock = FileLock::acquire(lock::lock_path_for(&path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut notifications: Vec<Notification> = self.storage.read_jsonl(&path)?;
        let record = notifications
            .iter_mut()
            .find(|notification| {
                notification.id == notification_id && notification.user_id == actor_id
            })
            .ok_or_else(|| {
                Error::NotFound(format!("notification not found: {notification_id}"))
            })?;
        record.is_read = true;
        let updated = record.clone();

        let mut buffer = Vec::new();
        for notification in &notifications {
            buffer.extend_from_slice(serde_json::to_string(notification)?.as_bytes());
            buffer.push(b'\n');
        }
        lock::write_atomic(&path, &buffer)?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Channel that records every push for assertions
    #[derive(Default)]
    struct RecordingChannel {
        pushes: Mutex<Vec<(String, String)>>,
    }

    impl PushChannel for RecordingChannel {
        fn push(&self, connection_id: &str, _event: &str, payload: &Notification) -> bool {
            self.pushes
                .lock()
                .unwrap()
                .push((connection_id.to_string(), payload.id.clone()));
            true
        }
    }

    fn relay(channel: Arc<dyn PushChannel>) -> (tempfile::TempDir, NotificationRelay) {
        let dir = tempdir().expect("tempdir");
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init_all().expect("init");
        let relay = NotificationRelay::new(
            storage,
            Arc::new(ConnectionDirectory::new()),
            channel,
            NotificationsConfig::default(),
        );
        (dir, relay)
    }

    #[test]
    fn second_connection_replaces_first() {
        let directory = ConnectionDirectory::new();
        assert_eq!(directory.add("user_a", "conn_1"), None);
        assert_eq!(
            directory.add("user_a", "conn_2"),
            Some("conn_1".to_string())
        );
        assert_eq!(directory.find("user_a"), Some("conn_2".to_string()));
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn remove_by_connection_id() {
        let directory = ConnectionDirectory::new();
        directory.add("user_a", "conn_1");
        directory.add("user_b", "conn_2");
        directory.remove("conn_1");
        assert_eq!(directory.find("user_a"), None);
        assert_eq!(directory.find("user_b"), Some("conn_2".to_string()));
    }

    #[test]
    fn notify_persists_and_pushes_to_connected_recipient() {
        let channel = Arc::new(RecordingChannel::default());
        let (_dir, relay) = relay(channel.clone());
        relay.directory().add("user_owner", "conn_9");

        let notification = relay
            .notify(
                "user_owner",
                "user_assignee",
                NotificationKind::SubtaskCompleted,
                Some("subtask_1"),
            )
            .unwrap();

        let pushes = channel.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0], ("conn_9".to_string(), notification.id.clone()));

        let stored = relay.list_for_user("user_owner", false).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, NotificationKind::SubtaskCompleted);
        assert!(!stored[0].is_read);
    }

    #[test]
    fn offline_recipient_still_gets_a_record() {
        let channel = Arc::new(RecordingChannel::default());
        let (_dir, relay) = relay(channel.clone());

        relay
            .notify(
                "user_owner",
                "user_assignee",
                NotificationKind::SubtaskRejected,
                Some("subtask_1"),
            )
            .unwrap();

        assert!(channel.pushes.lock().unwrap().is_empty());
        assert_eq!(relay.list_for_user("user_owner", true).unwrap().len(), 1);
    }

    #[test]
    fn mark_read_is_recipient_scoped() {
        let (_dir, relay) = relay(Arc::new(NoopChannel));
        let notification = relay
            .notify(
                "user_owner",
                "user_assignee",
                NotificationKind::SubtaskConfirmed,
                None,
            )
            .unwrap();

        let err = relay.mark_read("user_other", &notification.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let updated = relay.mark_read("user_owner", &notification.id).unwrap();
        assert!(updated.is_read);
        assert!(relay.list_for_user("user_owner", true).unwrap().is_empty());
    }
}
