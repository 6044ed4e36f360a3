//! Durable per-recipient append-then-read queues. One JSON file per
//! `(namespace, recipient)` under `mailbox/<ns>/<sanitizedName>.json`,
//! mutated under the recipient's own lock file.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use console_persist::atomic::{atomic_write_json, read_json_opt};
use serde::{Deserialize, Serialize};
use teamctl_lock::{LockOpts, with_lock};

#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("lock error: {0}")]
    Lock(#[from] teamctl_lock::LockError),
    #[error("persistence error: {0}")]
    Persist(#[from] console_persist::SessionError),
}

pub type Result<T> = std::result::Result<T, MailboxError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxMessage {
    pub from: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Replaces every character outside `[A-Za-z0-9_-]` with `-`, matching the
/// member-name sanitization rule in the data model.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

fn inbox_path(team_dir: &Path, ns: &str, recipient: &str) -> PathBuf {
    team_dir
        .join("mailbox")
        .join(ns)
        .join(format!("{}.json", sanitize_name(recipient)))
}

fn inbox_lock_path(team_dir: &Path, ns: &str, recipient: &str) -> PathBuf {
    team_dir
        .join("mailbox")
        .join(ns)
        .join(format!("{}.json.lock", sanitize_name(recipient)))
}

/// Appends `msg` (forced to `read = false`) to the recipient's inbox.
pub fn write_to_mailbox(
    team_dir: &Path,
    ns: &str,
    recipient: &str,
    mut msg: MailboxMessage,
) -> Result<()> {
    msg.read = false;
    let path = inbox_path(team_dir, ns, recipient);
    let lock_path = inbox_lock_path(team_dir, ns, recipient);

    with_lock(&lock_path, LockOpts::default(), || {
        let mut messages: Vec<MailboxMessage> = read_json_opt(&path)?.unwrap_or_default();
        messages.push(msg);
        atomic_write_json(&path, &messages)?;
        Ok(())
    })
}

/// Reads the recipient's inbox without mutating it. FIFO by append order.
pub fn read_inbox(
    team_dir: &Path,
    ns: &str,
    recipient: &str,
    unread_only: bool,
) -> Result<Vec<MailboxMessage>> {
    let path = inbox_path(team_dir, ns, recipient);
    let messages: Vec<MailboxMessage> = read_json_opt(&path)?.unwrap_or_default();
    if unread_only {
        Ok(messages.into_iter().filter(|m| !m.read).collect())
    } else {
        Ok(messages)
    }
}

/// Flips `read = true` on every message matching `predicate`.
pub fn mark_read(
    team_dir: &Path,
    ns: &str,
    recipient: &str,
    predicate: impl Fn(&MailboxMessage) -> bool,
) -> Result<usize> {
    let path = inbox_path(team_dir, ns, recipient);
    let lock_path = inbox_lock_path(team_dir, ns, recipient);

    with_lock(&lock_path, LockOpts::default(), || {
        let mut messages: Vec<MailboxMessage> = read_json_opt(&path)?.unwrap_or_default();
        let mut changed = 0usize;
        for m in messages.iter_mut() {
            if !m.read && predicate(m) {
                m.read = true;
                changed += 1;
            }
        }
        if changed > 0 {
            atomic_write_json(&path, &messages)?;
        }
        Ok(changed)
    })
}

/// A bounded set of recently seen dedup keys, for receivers that want to
/// drop duplicate at-least-once deliveries instead of relying on the
/// `read` flag alone. Not required by the mailbox itself.
pub struct Dedup {
    capacity: usize,
    seen: VecDeque<String>,
}

impl Dedup {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            seen: VecDeque::new(),
        }
    }

    /// Returns `true` if `key` was not seen before (and records it now).
    pub fn observe(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.seen.iter().any(|k| k == &key) {
            return false;
        }
        if self.seen.len() >= self.capacity {
            self.seen.pop_front();
        }
        self.seen.push_back(key);
        true
    }
}
