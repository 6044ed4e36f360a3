use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

/// Open string→value extension point, matching the data model's
/// `metadata: mapping string→any`.
pub type Metadata = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub subject: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Task {
    /// First line of `description`, truncated to 120 chars, matching the
    /// data model's `subject` derivation rule.
    pub fn derive_subject(description: &str) -> String {
        let first_line = description.lines().next().unwrap_or("");
        if first_line.chars().count() > 120 {
            first_line.chars().take(120).collect()
        } else {
            first_line.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberRole {
    Lead,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub role: MemberRole,
    pub status: MemberStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub meta: Metadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureAction {
    Warn,
    Followup,
    Reopen,
    ReopenFollowup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupOwner {
    Member,
    Lead,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HooksPolicy {
    pub failure_action: FailureAction,
    pub max_reopens_per_task: u32,
    pub followup_owner: FollowupOwner,
}

impl Default for HooksPolicy {
    fn default() -> Self {
        Self {
            failure_action: FailureAction::Warn,
            max_reopens_per_task: 1,
            followup_owner: FollowupOwner::Lead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team_id: String,
    pub task_list_id: String,
    pub lead_name: String,
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<HooksPolicy>,
    #[serde(default)]
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Defaults supplied to `ensure_team_config` for a never-before-seen team.
#[derive(Debug, Clone)]
pub struct TeamConfigDefaults {
    pub lead_name: String,
    pub style: String,
    pub members: Vec<Member>,
}

/// Sanitizes a member/team name to `[A-Za-z0-9_-]`, replacing every other
/// character with `-`.
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
