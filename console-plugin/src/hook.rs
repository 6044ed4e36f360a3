use std::process::Stdio;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::Duration;

/// Events that can trigger hooks. The quality-gate subprocess contract only
/// fires on task completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    TaskCompleted,
}

/// Specification for a registered hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookSpec {
    pub name: String,
    pub event: HookEvent,
    pub command: String,
    pub timeout_ms: u64,
    pub enabled: bool,
}

impl HookSpec {
    pub fn new(name: &str, event: HookEvent, command: &str) -> Self {
        Self {
            name: name.into(),
            event,
            command: command.into(),
            timeout_ms: 5000,
            enabled: true,
        }
    }
}

/// Result of a hook execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookResult {
    pub hook_name: String,
    pub event: HookEvent,
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Identifies the task a post-completion hook runs against (§9 Open
/// Question (c)). Carries exactly the fields the formalized subprocess
/// contract exposes as environment variables.
#[derive(Debug, Clone)]
pub struct TaskHookContext {
    pub task_id: String,
    pub team_id: String,
    pub task_list_id: String,
    pub team_dir: std::path::PathBuf,
}

/// Runs `spec.command` as a subprocess against `ctx`, applying the hook
/// subprocess contract: args `[task_id]`, env
/// `TEAMCTL_TASK_ID`/`TEAMCTL_TEAM_ID`/`TEAMCTL_TASK_LIST_ID`, cwd = the
/// team directory, exit code 0 means the quality gate passed. Never
/// propagates process-spawn failure as an `Err` — a hook that can't even
/// start is reported as a failed `HookResult` so the remediation loop can
/// still act on it.
pub async fn run_hook(spec: &HookSpec, ctx: &TaskHookContext) -> HookResult {
    let started = Instant::now();
    let mut command = Command::new(&spec.command);
    command
        .arg(&ctx.task_id)
        .current_dir(&ctx.team_dir)
        .env("TEAMCTL_TASK_ID", &ctx.task_id)
        .env("TEAMCTL_TEAM_ID", &ctx.team_id)
        .env("TEAMCTL_TASK_LIST_ID", &ctx.task_list_id)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let timeout = Duration::from_millis(spec.timeout_ms);
    let run = async {
        let child = command.spawn()?;
        child.wait_with_output().await
    };

    match tokio::time::timeout(timeout, run).await {
        Ok(Ok(output)) => HookResult {
            hook_name: spec.name.clone(),
            event: spec.event,
            success: output.status.success(),
            output: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
            error: if output.status.success() {
                None
            } else {
                Some(String::from_utf8_lossy(&output.stderr).into_owned())
            },
            duration_ms: started.elapsed().as_millis() as u64,
        },
        Ok(Err(io_err)) => HookResult {
            hook_name: spec.name.clone(),
            event: spec.event,
            success: false,
            output: None,
            error: Some(format!("failed to run hook {}: {io_err}", spec.command)),
            duration_ms: started.elapsed().as_millis() as u64,
        },
        Err(_elapsed) => HookResult {
            hook_name: spec.name.clone(),
            event: spec.event,
            success: false,
            output: None,
            error: Some(format!(
                "hook {} timed out after {}ms",
                spec.command, spec.timeout_ms
            )),
            duration_ms: started.elapsed().as_millis() as u64,
        },
    }
}
