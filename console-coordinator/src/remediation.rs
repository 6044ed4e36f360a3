//! Quality-gate remediation loop (§4.I): what happens to a just-completed
//! task once its post-completion hooks have run.

use chrono::Utc;
use console_team::{FailureAction, FollowupOwner, HooksPolicy, Task, TaskStatus, TaskStore};
use teamctl_mailbox::{MailboxMessage, write_to_mailbox};
use teamctl_protocol::Envelope;

use crate::error::Result;

/// The exact sentinel phrase the remediation nudge must contain (§4.I).
pub const REMEDIATION_NUDGE: &str =
    "Please remediate automatically and continue without waiting for user intervention.";

#[derive(Debug, Clone)]
pub struct RemediationOutcome {
    pub task: Task,
    pub follow_up: Option<Task>,
}

fn reopen_count(task: &Task) -> u64 {
    task.metadata
        .get("reopenedByQualityGateCount")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0)
}

fn truncate80(s: &str) -> String {
    if s.chars().count() > 80 {
        s.chars().take(80).collect()
    } else {
        s.to_string()
    }
}

fn mark_quality_gate_failed(task_store: &TaskStore, task_id: &str) -> Result<Task> {
    Ok(task_store.update_task(task_id, |mut t| {
        t.metadata
            .insert("qualityGateStatus".into(), serde_json::json!("failed"));
        t
    })?)
}

fn reopen_task(task_store: &TaskStore, task_id: &str) -> Result<Task> {
    Ok(task_store.update_task(task_id, |mut t| {
        t.status = TaskStatus::Pending;
        let count = reopen_count(&t) + 1;
        t.metadata
            .insert("reopenedByQualityGateCount".into(), serde_json::json!(count));
        t.metadata
            .insert("reopenedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
        t.metadata
            .insert("qualityGateStatus".into(), serde_json::json!("failed"));
        t
    })?)
}

fn followup_owner_name(owner: FollowupOwner, original: &Task, lead_name: &str) -> Option<String> {
    match owner {
        FollowupOwner::Member => original.owner.clone(),
        FollowupOwner::Lead => Some(lead_name.to_string()),
        FollowupOwner::None => None,
    }
}

fn create_followup(
    task_store: &TaskStore,
    original: &Task,
    owner: Option<&str>,
) -> Result<Task> {
    let subject = format!(
        "Quality gate failed: {} (task #{})",
        truncate80(&original.subject),
        original.id
    );
    let task = task_store.create_task(Some(&subject), &subject, owner)?;
    let task = task_store.add_task_dependency(&task.id, &original.id)?;
    Ok(task)
}

fn notify_owner(team_dir: &std::path::Path, task_list_id: &str, owner: &str, task: &Task) -> Result<()> {
    let assignment = Envelope::TaskAssignment {
        task_id: task.id.clone(),
        subject: Some(task.subject.clone()),
        description: Some(task.description.clone()),
        assigned_by: Some("coordinator".into()),
    };
    write_to_mailbox(
        team_dir,
        task_list_id,
        owner,
        MailboxMessage {
            from: "coordinator".into(),
            text: assignment.encode(),
            timestamp: Utc::now(),
            read: false,
            color: None,
        },
    )?;
    write_to_mailbox(
        team_dir,
        task_list_id,
        owner,
        MailboxMessage {
            from: "coordinator".into(),
            text: REMEDIATION_NUDGE.to_string(),
            timestamp: Utc::now(),
            read: false,
            color: None,
        },
    )?;
    Ok(())
}

/// Runs the remediation state machine on `original_task_id` once its hooks
/// have reported `hook_ok`. No-op when `hook_ok` is true.
pub fn apply_remediation(
    team_dir: &std::path::Path,
    task_store: &TaskStore,
    task_list_id: &str,
    original_task_id: &str,
    lead_name: &str,
    hook_ok: bool,
    policy: &HooksPolicy,
) -> Result<RemediationOutcome> {
    let original = task_store.get_task(original_task_id)?;

    if hook_ok {
        return Ok(RemediationOutcome {
            task: original,
            follow_up: None,
        });
    }

    match policy.failure_action {
        FailureAction::Warn => {
            let task = mark_quality_gate_failed(task_store, original_task_id)?;
            Ok(RemediationOutcome {
                task,
                follow_up: None,
            })
        }
        FailureAction::Followup => {
            let owner = followup_owner_name(policy.followup_owner, &original, lead_name);
            let follow_up = create_followup(task_store, &original, owner.as_deref())?;
            if let Some(owner) = &owner {
                notify_owner(team_dir, task_list_id, owner, &follow_up)?;
            }
            Ok(RemediationOutcome {
                task: original,
                follow_up: Some(follow_up),
            })
        }
        FailureAction::Reopen => {
            if reopen_count(&original) < u64::from(policy.max_reopens_per_task) {
                let task = reopen_task(task_store, original_task_id)?;
                Ok(RemediationOutcome {
                    task,
                    follow_up: None,
                })
            } else {
                let task = mark_quality_gate_failed(task_store, original_task_id)?;
                Ok(RemediationOutcome {
                    task,
                    follow_up: None,
                })
            }
        }
        FailureAction::ReopenFollowup => {
            let task = if reopen_count(&original) < u64::from(policy.max_reopens_per_task) {
                reopen_task(task_store, original_task_id)?
            } else {
                mark_quality_gate_failed(task_store, original_task_id)?
            };

            let owner = followup_owner_name(policy.followup_owner, &original, lead_name);
            let follow_up = create_followup(task_store, &original, owner.as_deref())?;
            if let Some(owner) = &owner {
                notify_owner(team_dir, task_list_id, owner, &follow_up)?;
            }
            Ok(RemediationOutcome {
                task,
                follow_up: Some(follow_up),
            })
        }
    }
}
