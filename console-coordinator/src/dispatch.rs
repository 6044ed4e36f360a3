//! Wires the `teams` tool action enum (§4.I) to the task store, team
//! config store, teammate registry, mailbox, and plan-approval gate. One
//! `dispatch` call handles one action end to end and returns the structured
//! `{content, details}` result every action promises.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use console_plugin::hook::{HookSpec, TaskHookContext, run_hook};
use console_provider::WorktreeProvisioner;
use console_rpc::{RpcCommand, SpawnContext, SpawnOpts, TeammateRegistry};
use console_security::ActivityTracker;
use console_team::{
    AssignmentStrategy, DelegatePolicy, FailureAction, FollowupOwner, HooksPolicy, MemberRole,
    MemberStatus, Metadata, PlanApprovalState, TaskAssigner, TaskStatus, TaskStore,
    TeamConfigStore, sanitize_name,
};
use teamctl_mailbox::{MailboxMessage, write_to_mailbox};
use teamctl_protocol::Envelope;

use crate::actions::{Action, ActionParams, ToolResult};
use crate::error::{CoordinatorError, Result};
use crate::remediation::{RemediationOutcome, apply_remediation};

const TEAM_NS: &str = "team";
const PRUNE_CUTOFF_SECS: i64 = 3600;

/// Everything one running coordinator needs to dispatch `teams` tool
/// actions for a single team directory. One struct of collaborators
/// instead of free functions threading state through parameters by hand.
pub struct CoordinatorServices {
    pub team_dir: PathBuf,
    pub task_list_id: String,
    pub lead_name: String,
    pub task_store: TaskStore,
    pub config_store: TeamConfigStore,
    pub teammates: Arc<TeammateRegistry>,
    pub spawn_ctx: SpawnContext,
    pub activity: Mutex<ActivityTracker>,
    pub pending_plans: Mutex<PlanApprovalState>,
}

impl CoordinatorServices {
    pub fn new(
        team_dir: PathBuf,
        task_list_id: impl Into<String>,
        lead_name: impl Into<String>,
        provisioner: Arc<dyn WorktreeProvisioner>,
        workspace_mode: impl Into<String>,
        spawn_ctx: SpawnContext,
    ) -> Self {
        let task_list_id = task_list_id.into();
        Self {
            task_store: TaskStore::new(team_dir.clone(), task_list_id.clone()),
            config_store: TeamConfigStore::new(team_dir.clone()),
            teammates: Arc::new(TeammateRegistry::new(
                team_dir.clone(),
                provisioner,
                workspace_mode,
            )),
            team_dir,
            task_list_id,
            lead_name: lead_name.into(),
            spawn_ctx,
            activity: Mutex::new(ActivityTracker::new()),
            pending_plans: Mutex::new(PlanApprovalState::new()),
        }
    }

    fn hooks_policy(&self) -> Result<HooksPolicy> {
        Ok(self.config_store.load()?.and_then(|c| c.hooks).unwrap_or_default())
    }

    /// Runs a task's post-completion hook (if given) and feeds the result
    /// into the quality-gate remediation loop. `hook` is `None` when a team
    /// has no post-completion hook configured, which the remediation loop
    /// treats the same as a passing hook.
    pub async fn run_quality_gate(
        &self,
        task_id: &str,
        hook: Option<&HookSpec>,
    ) -> Result<RemediationOutcome> {
        let hook_ok = match hook {
            Some(spec) => {
                let ctx = TaskHookContext {
                    task_id: task_id.to_string(),
                    team_id: self.team_id().to_string(),
                    task_list_id: self.task_list_id.clone(),
                    team_dir: self.team_dir.clone(),
                };
                run_hook(spec, &ctx).await.success
            }
            None => true,
        };

        let policy = self.hooks_policy()?;
        apply_remediation(
            &self.team_dir,
            &self.task_store,
            &self.task_list_id,
            task_id,
            &self.lead_name,
            hook_ok,
            &policy,
        )
    }

    fn team_id(&self) -> &str {
        self.team_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.task_list_id)
    }

    /// Records an inbound plan submission (from a `plan_approval_request`
    /// envelope) so `plan_approve`/`plan_reject` can later look it up by
    /// worker name.
    pub fn record_plan_submission(
        &self,
        agent_name: &str,
        task_id: Option<&str>,
        plan_text: &str,
        policy: &DelegatePolicy,
    ) -> Result<String> {
        let mut pending = lock(&self.pending_plans)?;
        let plan = pending
            .submit_plan(agent_name, task_id, plan_text, policy)
            .map_err(CoordinatorError::Conflict)?;
        Ok(plan.id.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| CoordinatorError::Conflict("coordinator state lock poisoned".into()))
}

fn require<T>(value: Option<T>, what: &str) -> Result<T> {
    value.ok_or_else(|| CoordinatorError::InvalidInput(format!("missing required parameter '{what}'")))
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    match raw {
        "pending" => Ok(TaskStatus::Pending),
        "in_progress" => Ok(TaskStatus::InProgress),
        "completed" => Ok(TaskStatus::Completed),
        other => Err(CoordinatorError::InvalidInput(format!("unknown status '{other}'"))),
    }
}

fn parse_failure_action(raw: &str) -> Result<FailureAction> {
    match raw {
        "warn" => Ok(FailureAction::Warn),
        "followup" => Ok(FailureAction::Followup),
        "reopen" => Ok(FailureAction::Reopen),
        "reopen_followup" => Ok(FailureAction::ReopenFollowup),
        other => Err(CoordinatorError::InvalidInput(format!("unknown failure_action '{other}'"))),
    }
}

fn parse_followup_owner(raw: &str) -> Result<FollowupOwner> {
    match raw {
        "member" => Ok(FollowupOwner::Member),
        "lead" => Ok(FollowupOwner::Lead),
        "none" => Ok(FollowupOwner::None),
        other => Err(CoordinatorError::InvalidInput(format!("unknown followup_owner '{other}'"))),
    }
}

fn assignment_envelope(services: &CoordinatorServices, task: &console_team::Task) -> Envelope {
    Envelope::TaskAssignment {
        task_id: task.id.clone(),
        subject: Some(task.subject.clone()),
        description: Some(task.description.clone()),
        assigned_by: Some(services.lead_name.clone()),
    }
}

fn send_to(services: &CoordinatorServices, ns: &str, recipient: &str, text: String) -> Result<()> {
    write_to_mailbox(
        &services.team_dir,
        ns,
        recipient,
        MailboxMessage {
            from: services.lead_name.clone(),
            text,
            timestamp: Utc::now(),
            read: false,
            color: None,
        },
    )?;
    Ok(())
}

pub async fn dispatch(
    services: &CoordinatorServices,
    action: Action,
    params: ActionParams,
) -> Result<ToolResult> {
    match action {
        Action::Delegate => delegate(services, params).await,
        Action::TaskAssign => task_assign(services, params),
        Action::TaskUnassign => task_unassign(services, params),
        Action::TaskSetStatus => task_set_status(services, params),
        Action::TaskDepAdd => task_dep_add(services, params),
        Action::TaskDepRm => task_dep_rm(services, params),
        Action::TaskDepLs => task_dep_ls(services, params),
        Action::MessageDm => message_dm(services, params),
        Action::MessageBroadcast => message_broadcast(services, params),
        Action::MessageSteer => message_steer(services, params).await,
        Action::MemberSpawn => member_spawn(services, params).await,
        Action::MemberShutdown => member_shutdown(services, params),
        Action::MemberKill => member_kill(services, params).await,
        Action::MemberPrune => member_prune(services, params),
        Action::PlanApprove => plan_approve(services, params),
        Action::PlanReject => plan_reject(services, params),
        Action::HooksPolicyGet => hooks_policy_get(services),
        Action::HooksPolicySet => hooks_policy_set(services, params),
    }
}

async fn delegate(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let texts = require(params.tasks, "tasks")?;
    if texts.is_empty() {
        return Err(CoordinatorError::InvalidInput("tasks must be non-empty".into()));
    }

    let mut names = services.teammates.names();
    if names.is_empty() {
        let max_teammates = params.max_teammates.unwrap_or(texts.len() as u32) as usize;
        let wanted = max_teammates.min(texts.len()).max(1);
        let requests = (0..wanted).map(|_| SpawnOpts::default()).collect();
        let outcomes = services.teammates.spawn_many(&services.spawn_ctx, requests).await?;
        names = outcomes.into_iter().map(|o| o.name).collect();
    }

    let mut assigner = TaskAssigner::new(AssignmentStrategy::RoundRobin);
    let counts: HashMap<String, usize> = HashMap::new();
    let mut created = Vec::new();
    for text in &texts {
        let assignee = assigner.pick_assignee(&names, &counts);
        let task = services.task_store.create_task(None, text, assignee.as_deref())?;
        if let Some(owner) = &assignee {
            send_to(
                services,
                &services.task_list_id,
                owner,
                assignment_envelope(services, &task).encode(),
            )?;
        }
        created.push(task);
    }

    let content = format!("delegated {} task(s) across {} worker(s)", created.len(), names.len());
    Ok(ToolResult::new(content, &created))
}

fn task_assign(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let task_id = require(params.task_id, "task_id")?;
    let assignee = sanitize_name(&require(params.assignee, "assignee")?);

    let current = services.task_store.get_task(&task_id)?;
    if current.owner.as_deref() == Some(assignee.as_str()) {
        return Ok(ToolResult::new(
            format!("task '{task_id}' is already assigned to {assignee}"),
            &current,
        ));
    }

    let task = services.task_store.update_task(&task_id, |mut t| {
        t.owner = Some(assignee.clone());
        if t.status != TaskStatus::Completed {
            t.status = TaskStatus::Pending;
        }
        t.metadata.insert("reassignedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
        t.metadata.insert("reassignedTo".into(), serde_json::json!(assignee));
        t
    })?;

    send_to(
        services,
        &services.task_list_id,
        &assignee,
        assignment_envelope(services, &task).encode(),
    )?;

    Ok(ToolResult::new(format!("assigned task '{task_id}' to {assignee}"), &task))
}

fn task_unassign(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let task_id = require(params.task_id, "task_id")?;
    let reason = params.reason.unwrap_or_else(|| "manual".into());
    let task = services.task_store.update_task(&task_id, |mut t| {
        if t.status != TaskStatus::Completed {
            t.owner = None;
            t.status = TaskStatus::Pending;
            t.metadata.insert("unassignedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
            t.metadata.insert("unassignedBy".into(), serde_json::json!("teams-tool"));
            t.metadata.insert("unassignedReason".into(), serde_json::json!(reason));
        }
        t
    })?;
    Ok(ToolResult::new(format!("unassigned task '{task_id}'"), &task))
}

fn task_set_status(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let task_id = require(params.task_id, "task_id")?;
    let status = parse_status(&require(params.status, "status")?)?;
    let task = services.task_store.update_task(&task_id, |mut t| {
        let was_completed = t.status == TaskStatus::Completed;
        t.status = status;
        if status == TaskStatus::Completed && !was_completed {
            t.metadata.insert("completedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
        }
        if was_completed && status != TaskStatus::Completed {
            t.metadata.insert("reopenedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
        }
        t
    })?;
    Ok(ToolResult::new(format!("task '{task_id}' set to {status:?}"), &task))
}

fn task_dep_add(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let task_id = require(params.task_id, "task_id")?;
    let dep_id = require(params.dep_id, "dep_id")?;
    let task = services.task_store.add_task_dependency(&task_id, &dep_id)?;
    Ok(ToolResult::new(format!("task '{task_id}' now depends on '{dep_id}'"), &task))
}

fn task_dep_rm(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let task_id = require(params.task_id, "task_id")?;
    let dep_id = require(params.dep_id, "dep_id")?;
    let task = services.task_store.remove_task_dependency(&task_id, &dep_id)?;
    Ok(ToolResult::new(format!("removed dependency '{dep_id}' from '{task_id}'"), &task))
}

fn task_dep_ls(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let task_id = require(params.task_id, "task_id")?;
    let task = services.task_store.get_task(&task_id)?;
    let blocked = services.task_store.is_task_blocked(&task)?;
    let label = if blocked { "blocked" } else { "unblocked" };
    let content = format!(
        "task '{task_id}' is {label}; blocked_by={:?}, blocks={:?}",
        task.blocked_by, task.blocks
    );
    Ok(ToolResult::new(
        content,
        serde_json::json!({
            "task_id": task_id,
            "blocked": blocked,
            "blocked_by": task.blocked_by,
            "blocks": task.blocks,
        }),
    ))
}

fn message_dm(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let name = sanitize_name(&require(params.name, "name")?);
    let text = require(params.text, "text")?;
    send_to(services, TEAM_NS, &name, text.clone())?;
    Ok(ToolResult::new(format!("sent DM to {name}"), serde_json::json!({"name": name, "text": text})))
}

fn message_broadcast(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let text = require(params.text, "text")?;
    let mut recipients: BTreeSet<String> = BTreeSet::new();

    if let Some(config) = services.config_store.load()? {
        for member in &config.members {
            if member.role == MemberRole::Worker {
                recipients.insert(member.name.clone());
            }
        }
    }
    for name in services.teammates.names() {
        recipients.insert(name);
    }
    for task in services.task_store.list_tasks()? {
        if let Some(owner) = task.owner {
            if owner != services.lead_name {
                recipients.insert(owner);
            }
        }
    }

    for recipient in &recipients {
        send_to(services, TEAM_NS, recipient, text.clone())?;
    }

    Ok(ToolResult::new(
        format!("broadcast to {} worker(s)", recipients.len()),
        serde_json::json!({"recipients": recipients, "text": text}),
    ))
}

async fn message_steer(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let name = require(params.name, "name")?;
    let text = require(params.text, "text")?;
    let rpc = services
        .teammates
        .get(&name)
        .ok_or_else(|| CoordinatorError::NotFound(format!("teammate '{name}' is not running")))?;
    rpc.send(RpcCommand::Steer { text: text.clone() }).await?;
    Ok(ToolResult::new(format!("steered {name}"), serde_json::json!({"name": name, "text": text})))
}

async fn member_spawn(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let outcome = services
        .teammates
        .spawn(
            &services.spawn_ctx,
            SpawnOpts { name: params.name, model_override: params.model },
        )
        .await?;
    Ok(ToolResult::new(format!("spawned {}", outcome.name), &outcome))
}

fn member_shutdown(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let config = services
        .config_store
        .load()?
        .ok_or_else(|| CoordinatorError::NotFound("team config".into()))?;

    let targets: Vec<String> = match &params.name {
        Some(name) => vec![sanitize_name(name)],
        None => config
            .members
            .iter()
            .filter(|m| m.role == MemberRole::Worker && m.status == MemberStatus::Online)
            .map(|m| m.name.clone())
            .collect(),
    };

    let mut notified = Vec::new();
    for target in &targets {
        let request_id = uuid::Uuid::new_v4().to_string();
        send_to(
            services,
            TEAM_NS,
            target,
            Envelope::ShutdownRequest {
                request_id,
                from: Some(services.lead_name.clone()),
                reason: params.reason.clone(),
                timestamp: Some(Utc::now().to_rfc3339()),
            }
            .encode(),
        )?;
        let mut meta = Metadata::new();
        meta.insert("shutdownRequestedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
        services.config_store.set_member_status(target, MemberStatus::Online, meta)?;
        notified.push(target.clone());
    }

    Ok(ToolResult::new(
        format!("requested shutdown for {} worker(s)", notified.len()),
        serde_json::json!({"notified": notified}),
    ))
}

async fn member_kill(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let name = sanitize_name(&require(params.name, "name")?);
    services.teammates.remove(&name).await;
    services.task_store.unassign_tasks_for_agent(&name, "killed")?;
    let mut meta = Metadata::new();
    meta.insert("killedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
    services.config_store.set_member_status(&name, MemberStatus::Offline, meta)?;
    if let Ok(mut activity) = services.activity.lock() {
        activity.reset(&name);
    }
    Ok(ToolResult::new(format!("killed {name}"), serde_json::json!({"name": name})))
}

fn member_prune(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let config = services
        .config_store
        .load()?
        .ok_or_else(|| CoordinatorError::NotFound("team config".into()))?;
    let all = params.all.unwrap_or(false);
    let running = services.teammates.names();
    let tasks = services.task_store.list_tasks()?;
    let now = Utc::now();

    let mut pruned = Vec::new();
    for member in config.members.iter().filter(|m| m.role == MemberRole::Worker) {
        if running.contains(&member.name) {
            continue;
        }
        let owns_in_progress = tasks.iter().any(|t| {
            t.owner.as_deref() == Some(member.name.as_str()) && t.status == TaskStatus::InProgress
        });
        if owns_in_progress {
            continue;
        }
        if !all {
            let stale = member
                .last_seen_at
                .map(|seen| (now - seen).num_seconds() > PRUNE_CUTOFF_SECS)
                .unwrap_or(true);
            if !stale {
                continue;
            }
        }
        let mut meta = Metadata::new();
        meta.insert("prunedAt".into(), serde_json::json!(now.to_rfc3339()));
        meta.insert("prunedBy".into(), serde_json::json!("teams-tool"));
        services.config_store.set_member_status(&member.name, MemberStatus::Offline, meta)?;
        pruned.push(member.name.clone());
    }

    Ok(ToolResult::new(
        format!("pruned {} worker(s)", pruned.len()),
        serde_json::json!({"pruned": pruned}),
    ))
}

fn plan_approve(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let name = require(params.name, "name")?;
    let plan_id = {
        let pending = lock(&services.pending_plans)?;
        let plans = pending.pending_plans_for(&name);
        let plan = plans
            .first()
            .ok_or_else(|| CoordinatorError::NotFound(format!("no pending plan for '{name}'")))?;
        plan.id.clone()
    };
    {
        let mut pending = lock(&services.pending_plans)?;
        pending.approve_plan(&plan_id).map_err(CoordinatorError::Conflict)?;
    }

    send_to(
        services,
        TEAM_NS,
        &name,
        Envelope::PlanApproved {
            request_id: plan_id.clone(),
            from: services.lead_name.clone(),
            feedback: params.feedback.clone(),
        }
        .encode(),
    )?;

    Ok(ToolResult::new(format!("approved plan for {name}"), serde_json::json!({"plan_id": plan_id})))
}

fn plan_reject(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    let name = require(params.name, "name")?;
    let feedback = params.feedback.clone().unwrap_or_default();
    let plan_id = {
        let pending = lock(&services.pending_plans)?;
        let plans = pending.pending_plans_for(&name);
        let plan = plans
            .first()
            .ok_or_else(|| CoordinatorError::NotFound(format!("no pending plan for '{name}'")))?;
        plan.id.clone()
    };
    {
        let mut pending = lock(&services.pending_plans)?;
        pending.reject_plan(&plan_id, &feedback).map_err(CoordinatorError::Conflict)?;
    }

    send_to(
        services,
        TEAM_NS,
        &name,
        Envelope::PlanRejected {
            request_id: plan_id.clone(),
            from: services.lead_name.clone(),
            feedback: Some(feedback.clone()),
        }
        .encode(),
    )?;

    Ok(ToolResult::new(
        format!("rejected plan for {name}"),
        serde_json::json!({"plan_id": plan_id, "feedback": feedback}),
    ))
}

fn hooks_policy_get(services: &CoordinatorServices) -> Result<ToolResult> {
    let policy = services.hooks_policy()?;
    Ok(ToolResult::new("current hooks policy", &policy))
}

fn hooks_policy_set(services: &CoordinatorServices, params: ActionParams) -> Result<ToolResult> {
    if params.reset.unwrap_or(false) {
        let policy = services.config_store.update_hooks_policy(|_| HooksPolicy::default())?;
        return Ok(ToolResult::new("reset hooks policy to defaults", &policy));
    }

    let failure_action = params.failure_action.as_deref().map(parse_failure_action).transpose()?;
    let followup_owner = params.followup_owner.as_deref().map(parse_followup_owner).transpose()?;
    let max_reopens = params.max_reopens_per_task;

    let policy = services.config_store.update_hooks_policy(|current| {
        let mut policy = current.unwrap_or_default();
        if let Some(action) = failure_action {
            policy.failure_action = action;
        }
        if let Some(max) = max_reopens {
            policy.max_reopens_per_task = max;
        }
        if let Some(owner) = followup_owner {
            policy.followup_owner = owner;
        }
        policy
    })?;

    Ok(ToolResult::new("updated hooks policy", &policy))
}
