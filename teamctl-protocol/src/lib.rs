//! Typed message envelopes flowing through mailboxes and the teammate RPC
//! wire. Every envelope is a variant of [`Envelope`], tagged by `type` in
//! its JSON encoding. Parsing is total: [`try_parse`] never panics and
//! returns `None` for unrecognized or malformed input instead of erroring.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    // leader -> worker
    TaskAssignment {
        task_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subject: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assigned_by: Option<String>,
    },
    ShutdownRequest {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<String>,
    },
    PlanApproved {
        request_id: String,
        from: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },
    PlanRejected {
        request_id: String,
        from: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feedback: Option<String>,
    },
    AbortRequest {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    SetSessionName {
        name: String,
    },

    // worker -> leader
    IdleNotification {
        from: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed_task_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        completed_status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure_reason: Option<String>,
    },
    ShutdownApproved {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ShutdownRejected {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    PlanApprovalRequest {
        request_id: String,
        from: String,
        plan: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
    },
    PeerDmSent {
        from: String,
        to: String,
        summary: String,
    },
}

impl Envelope {
    /// Serializes to the exact string stored as a `MailboxMessage.text`.
    pub fn encode(&self) -> String {
        // Only ever fails on non-serializable types; every variant here is
        // plain data, so this cannot fail in practice.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Parses `text` as an [`Envelope`]. Returns `None` for plain prose, empty
/// strings, or JSON that doesn't match a known envelope shape — never
/// panics.
pub fn try_parse(text: &str) -> Option<Envelope> {
    serde_json::from_str(text).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_task_assignment() {
        let env = Envelope::TaskAssignment {
            task_id: "t1".into(),
            subject: Some("Write docs".into()),
            description: None,
            assigned_by: Some("lead".into()),
        };
        let text = env.encode();
        let parsed = try_parse(&text).expect("should parse");
        assert_eq!(parsed, env);
    }

    #[test]
    fn rejects_plain_prose_without_panicking() {
        assert_eq!(try_parse("hey, how's the task going?"), None);
        assert_eq!(try_parse(""), None);
    }

    #[test]
    fn rejects_unknown_tag() {
        assert_eq!(try_parse(r#"{"type":"not_a_real_envelope"}"#), None);
    }

    #[test]
    fn rejects_json_missing_required_fields() {
        // task_assignment requires task_id.
        assert_eq!(try_parse(r#"{"type":"task_assignment"}"#), None);
    }

    #[test]
    fn idle_notification_round_trips_with_all_optionals() {
        let env = Envelope::IdleNotification {
            from: "w1".into(),
            completed_task_id: Some("t1".into()),
            completed_status: Some("completed".into()),
            failure_reason: None,
        };
        let text = env.encode();
        assert_eq!(try_parse(&text), Some(env));
    }
}
