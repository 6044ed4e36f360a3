//! Snapshots the §6.5 environment variables once at process start. Env
//! vars are not JSON, so this is hand-parsed rather than routed through
//! `serde` the way on-disk state is.

use std::path::PathBuf;

use console_team::{FailureAction, FollowupOwner};

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_string(key) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"),
        None => default,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_string(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_string(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn parse_failure_action(raw: &str) -> Option<FailureAction> {
    match raw {
        "warn" => Some(FailureAction::Warn),
        "followup" => Some(FailureAction::Followup),
        "reopen" => Some(FailureAction::Reopen),
        "reopen_followup" => Some(FailureAction::ReopenFollowup),
        _ => None,
    }
}

fn parse_followup_owner(raw: &str) -> Option<FollowupOwner> {
    match raw {
        "member" => Some(FollowupOwner::Member),
        "lead" => Some(FollowupOwner::Lead),
        "none" => Some(FollowupOwner::None),
        _ => None,
    }
}

/// Process-wide configuration, read once from the environment at
/// startup (Design Note: "environment variables are read once at startup
/// and snapshotted").
#[derive(Debug, Clone)]
pub struct TeamctlEnv {
    pub root_dir: PathBuf,
    pub worker: bool,
    pub team_id: Option<String>,
    pub agent_name: Option<String>,
    pub task_list_id: Option<String>,
    pub lead_name: Option<String>,
    pub auto_claim: bool,
    pub hooks_enabled: bool,
    pub hook_timeout_ms: u64,
    pub default_failure_action: FailureAction,
    pub default_followup_owner: FollowupOwner,
    pub default_max_reopens_per_task: u32,
}

impl TeamctlEnv {
    pub fn from_env() -> Self {
        Self {
            root_dir: env_string("PI_TEAMS_ROOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".teams")),
            worker: env_bool("PI_TEAMS_WORKER", false),
            team_id: env_string("PI_TEAMS_TEAM_ID"),
            agent_name: env_string("PI_TEAMS_AGENT_NAME"),
            task_list_id: env_string("PI_TEAMS_TASK_LIST_ID"),
            lead_name: env_string("PI_TEAMS_LEAD_NAME"),
            auto_claim: env_bool("PI_TEAMS_AUTO_CLAIM", false),
            hooks_enabled: env_bool("PI_TEAMS_HOOKS_ENABLED", true),
            hook_timeout_ms: env_u64("PI_TEAMS_HOOK_TIMEOUT_MS", 5_000),
            default_failure_action: env_string("PI_TEAMS_FAILURE_ACTION")
                .as_deref()
                .and_then(parse_failure_action)
                .unwrap_or(FailureAction::Warn),
            default_followup_owner: env_string("PI_TEAMS_FOLLOWUP_OWNER")
                .as_deref()
                .and_then(parse_followup_owner)
                .unwrap_or(FollowupOwner::Lead),
            default_max_reopens_per_task: env_u32("PI_TEAMS_MAX_REOPENS_PER_TASK", 1),
        }
    }

    pub fn is_leader(&self) -> bool {
        !self.worker
    }
}
