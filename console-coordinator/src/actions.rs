//! The `teams` tool's action enum and flat parameter object (§4.I). Kept
//! in lockstep with `console_team::tool_specs::TEAM_TOOL_ACTIONS` — a new
//! string there needs a new variant here, and vice versa.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Delegate,
    TaskAssign,
    TaskUnassign,
    TaskSetStatus,
    TaskDepAdd,
    TaskDepRm,
    TaskDepLs,
    MessageDm,
    MessageBroadcast,
    MessageSteer,
    MemberSpawn,
    MemberShutdown,
    MemberKill,
    MemberPrune,
    PlanApprove,
    PlanReject,
    HooksPolicyGet,
    HooksPolicySet,
}

impl Action {
    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "delegate" => Action::Delegate,
            "task_assign" => Action::TaskAssign,
            "task_unassign" => Action::TaskUnassign,
            "task_set_status" => Action::TaskSetStatus,
            "task_dep_add" => Action::TaskDepAdd,
            "task_dep_rm" => Action::TaskDepRm,
            "task_dep_ls" => Action::TaskDepLs,
            "message_dm" => Action::MessageDm,
            "message_broadcast" => Action::MessageBroadcast,
            "message_steer" => Action::MessageSteer,
            "member_spawn" => Action::MemberSpawn,
            "member_shutdown" => Action::MemberShutdown,
            "member_kill" => Action::MemberKill,
            "member_prune" => Action::MemberPrune,
            "plan_approve" => Action::PlanApprove,
            "plan_reject" => Action::PlanReject,
            "hooks_policy_get" => Action::HooksPolicyGet,
            "hooks_policy_set" => Action::HooksPolicySet,
            _ => return None,
        })
    }
}

/// The `teams` tool's single flat parameter object (§4.I: "every action
/// shares one flat parameter object"). Every field is optional at the
/// wire level; each action validates which ones it actually needs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ActionParams {
    pub name: Option<String>,
    pub task_id: Option<String>,
    pub dep_id: Option<String>,
    pub status: Option<String>,
    pub text: Option<String>,
    pub tasks: Option<Vec<String>>,
    pub assignee: Option<String>,
    pub request_id: Option<String>,
    pub reason: Option<String>,
    pub feedback: Option<String>,
    pub mode: Option<String>,
    pub workspace_mode: Option<String>,
    pub plan_required: Option<bool>,
    pub model: Option<String>,
    pub thinking: Option<String>,
    pub all: Option<bool>,
    pub max_reopens_per_task: Option<u32>,
    pub failure_action: Option<String>,
    pub followup_owner: Option<String>,
    pub reset: Option<bool>,
    /// Upper bound on auto-spawned workers for `delegate` when the caller
    /// doesn't already have teammates running.
    pub max_teammates: Option<u32>,
}

/// What every `teams` tool action returns (§4.I: `{content, details}`).
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub content: String,
    pub details: serde_json::Value,
}

impl ToolResult {
    pub fn new(content: impl Into<String>, details: impl Serialize) -> Self {
        Self {
            content: content.into(),
            details: serde_json::to_value(details).unwrap_or(serde_json::Value::Null),
        }
    }
}
