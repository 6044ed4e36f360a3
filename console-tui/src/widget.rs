//! Pure widget projection (§4.L). Turns the coordinator's live state into an
//! ordered sequence of display lines; has no knowledge of a terminal, a
//! renderer, or ANSI output beyond what `task_view`'s glyphs already encode.
//! Deliberately decoupled from `console-rpc`'s concrete `TeammateRpc` type
//! so this crate never depends on the RPC crate — callers project a
//! `TeammateSnapshot` from whatever live handle they hold.

use console_team::{DelegateMode, Task, TaskStatus, TeamConfig};
use serde::{Deserialize, Serialize};

use crate::task_view::{TaskDisplayItem, TaskDisplayStatus, format_task_checklist};

/// The subset of `TeammateRpc` lifecycle state (§4.G) the widget needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RpcLifecycleState {
    Starting,
    Idle,
    Streaming,
    Stopped,
    Error,
}

/// One live teammate handle, as the widget needs to see it.
#[derive(Debug, Clone)]
pub struct TeammateSnapshot {
    pub name: String,
    pub state: RpcLifecycleState,
}

/// One line of the projected display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayLine {
    pub text: String,
    pub kind: DisplayLineKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLineKind {
    Header,
    Agent,
    Task,
}

/// True iff any task in `task`'s transitive `blockedBy` closure is not
/// `completed` (§3.2 invariant 4). Local to the widget: it only needs a
/// read-only snapshot of the current task list, not the task store's
/// locking/mutation machinery.
fn is_blocked(task: &Task, tasks: &[Task]) -> bool {
    let mut stack: Vec<&str> = task.blocked_by.iter().map(String::as_str).collect();
    let mut seen = std::collections::HashSet::new();
    while let Some(dep_id) = stack.pop() {
        if !seen.insert(dep_id) {
            continue;
        }
        let Some(dep) = tasks.iter().find(|t| t.id == dep_id) else {
            continue;
        };
        if dep.status != TaskStatus::Completed {
            return true;
        }
        stack.extend(dep.blocked_by.iter().map(String::as_str));
    }
    false
}

fn task_display_status(task: &Task, tasks: &[Task]) -> TaskDisplayStatus {
    if task.status == TaskStatus::Completed {
        return TaskDisplayStatus::Completed;
    }
    if is_blocked(task, tasks) {
        return TaskDisplayStatus::Blocked;
    }
    match task.status {
        TaskStatus::InProgress => TaskDisplayStatus::InProgress,
        _ => TaskDisplayStatus::Pending,
    }
}

/// A worker is `working` if its RPC reports `streaming`, or it reports
/// `idle` but owns a task the task store still has as `in_progress` (the
/// disambiguation §4.L calls out explicitly).
fn agent_status_label(snapshot: &TeammateSnapshot, tasks: &[Task]) -> &'static str {
    let owns_in_progress = tasks
        .iter()
        .any(|t| t.owner.as_deref() == Some(snapshot.name.as_str()) && t.status == TaskStatus::InProgress);

    match snapshot.state {
        RpcLifecycleState::Streaming => "working",
        RpcLifecycleState::Idle if owns_in_progress => "working",
        RpcLifecycleState::Idle => "idle",
        RpcLifecycleState::Starting => "starting",
        RpcLifecycleState::Stopped => "stopped",
        RpcLifecycleState::Error => "error",
    }
}

/// Projects `(teammates, tasks, team config, delegate mode)` into an ordered
/// sequence of display lines. Returns an empty sequence when there is
/// nothing to show: no live teammates, no tasks, and no online member in
/// `config`.
pub fn project(
    teammates: &[TeammateSnapshot],
    tasks: &[Task],
    config: &TeamConfig,
    delegate_mode: DelegateMode,
) -> Vec<DisplayLine> {
    let any_online_member = config
        .members
        .iter()
        .any(|m| m.status == console_team::MemberStatus::Online);

    if teammates.is_empty() && tasks.is_empty() && !any_online_member {
        return Vec::new();
    }

    let mut lines = Vec::new();

    let mode_label = match delegate_mode {
        DelegateMode::Full => "full",
        DelegateMode::PlanApproval => "plan-approval",
        DelegateMode::Manual => "manual",
    };
    lines.push(DisplayLine {
        text: format!("{} ({} mode)", config.team_id, mode_label),
        kind: DisplayLineKind::Header,
    });

    for snapshot in teammates {
        let label = agent_status_label(snapshot, tasks);
        lines.push(DisplayLine {
            text: format!("@{} — {}", snapshot.name, label),
            kind: DisplayLineKind::Agent,
        });
    }

    if !tasks.is_empty() {
        let items: Vec<TaskDisplayItem> = tasks
            .iter()
            .map(|t| TaskDisplayItem {
                title: t.subject.clone(),
                status: task_display_status(t, tasks),
                assignee: t.owner.clone(),
            })
            .collect();
        for line in format_task_checklist(&items).lines() {
            lines.push(DisplayLine {
                text: line.to_string(),
                kind: DisplayLineKind::Task,
            });
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use console_team::{Task, TaskStatus, TeamConfig};

    fn base_config() -> TeamConfig {
        let now = chrono::Utc::now();
        TeamConfig {
            team_id: "team-a".into(),
            task_list_id: "team-a".into(),
            lead_name: "lead".into(),
            style: "default".into(),
            hooks: None,
            members: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn task(id: &str, status: TaskStatus, owner: Option<&str>) -> Task {
        Task {
            id: id.into(),
            subject: format!("Task {id}"),
            description: format!("Task {id}"),
            status,
            owner: owner.map(|s| s.to_string()),
            blocked_by: Vec::new(),
            blocks: Vec::new(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn hides_itself_when_nothing_to_show() {
        let lines = project(&[], &[], &base_config(), DelegateMode::Full);
        assert!(lines.is_empty());
    }

    #[test]
    fn idle_worker_owning_in_progress_task_shows_as_working() {
        let teammates = vec![TeammateSnapshot {
            name: "nova".into(),
            state: RpcLifecycleState::Idle,
        }];
        let tasks = vec![task("t1", TaskStatus::InProgress, Some("nova"))];
        let lines = project(&teammates, &tasks, &base_config(), DelegateMode::Full);
        let agent_line = lines
            .iter()
            .find(|l| l.kind == DisplayLineKind::Agent)
            .expect("agent line");
        assert!(agent_line.text.contains("working"), "{}", agent_line.text);
    }

    #[test]
    fn truly_idle_worker_shows_as_idle() {
        let teammates = vec![TeammateSnapshot {
            name: "nova".into(),
            state: RpcLifecycleState::Idle,
        }];
        let tasks = vec![task("t1", TaskStatus::Pending, None)];
        let lines = project(&teammates, &tasks, &base_config(), DelegateMode::Full);
        let agent_line = lines
            .iter()
            .find(|l| l.kind == DisplayLineKind::Agent)
            .expect("agent line");
        assert!(agent_line.text.contains("idle"), "{}", agent_line.text);
    }

    #[test]
    fn includes_task_checklist_lines() {
        let tasks = vec![
            task("t1", TaskStatus::Completed, None),
            task("t2", TaskStatus::Pending, None),
        ];
        let lines = project(&[], &tasks, &base_config(), DelegateMode::Full);
        let task_lines: Vec<_> = lines.iter().filter(|l| l.kind == DisplayLineKind::Task).collect();
        assert_eq!(task_lines.len(), 2);
    }
}
