//! Task store (§4.E) and team config store (§4.F): one JSON file per
//! `(team_id, task_list_id)` for tasks, one `config.json` per team
//! directory, both mutated under a per-file lock with a pure
//! read-modify-write discipline.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use chrono::Utc;
use console_persist::atomic::{atomic_write_json, read_json_opt};
use rand::Rng;
use teamctl_lock::{LockOpts, with_lock};

use crate::error::{Result, TeamError};
use crate::types::{
    Member, MemberStatus, Metadata, Task, TaskStatus, TeamConfig, TeamConfigDefaults,
};

fn tasklist_path(team_dir: &Path, task_list_id: &str) -> PathBuf {
    team_dir.join("tasklists").join(format!("{task_list_id}.json"))
}

fn tasklist_lock_path(team_dir: &Path, task_list_id: &str) -> PathBuf {
    team_dir
        .join("tasklists")
        .join(format!("{task_list_id}.json.lock"))
}

fn config_path(team_dir: &Path) -> PathBuf {
    team_dir.join("config.json")
}

fn config_lock_path(team_dir: &Path) -> PathBuf {
    team_dir.join("config.json.lock")
}

/// Generates a short random task id; no central counter to persist across
/// process restarts.
fn generate_task_id() -> String {
    let n: u32 = rand::rng().random_range(0..0xFFFF_FFFFu32);
    format!("task-{n:08x}")
}

/// Persists the task list for one `(team_id, task_list_id)`.
pub struct TaskStore {
    team_dir: PathBuf,
    task_list_id: String,
}

impl TaskStore {
    pub fn new(team_dir: impl Into<PathBuf>, task_list_id: impl Into<String>) -> Self {
        Self {
            team_dir: team_dir.into(),
            task_list_id: task_list_id.into(),
        }
    }

    fn path(&self) -> PathBuf {
        tasklist_path(&self.team_dir, &self.task_list_id)
    }

    fn lock_path(&self) -> PathBuf {
        tasklist_lock_path(&self.team_dir, &self.task_list_id)
    }

    fn load(&self) -> Result<Vec<Task>> {
        Ok(read_json_opt(&self.path())?.unwrap_or_default())
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        atomic_write_json(&self.path(), &tasks.to_vec())?;
        Ok(())
    }

    /// Runs `f` with exclusive access to the whole task list, persisting
    /// whatever `f` returns alongside its own result value.
    fn with_tasks<T>(&self, f: impl FnOnce(&mut Vec<Task>) -> Result<T>) -> Result<T> {
        with_lock(&self.lock_path(), LockOpts::default(), || {
            let mut tasks = self.load().map_err(to_lock_err)?;
            let value = f(&mut tasks).map_err(to_lock_err)?;
            self.save(&tasks).map_err(to_lock_err)?;
            Ok(value)
        })
        .map_err(|e| match e {
            teamctl_lock::LockError::Io { .. } => TeamError::Lock(e),
            teamctl_lock::LockError::Contended(_) => TeamError::Lock(e),
        })
    }

    pub fn create_task(
        &self,
        subject: Option<&str>,
        description: &str,
        owner: Option<&str>,
    ) -> Result<Task> {
        self.with_tasks(|tasks| {
            let id = loop {
                let candidate = generate_task_id();
                if !tasks.iter().any(|t| t.id == candidate) {
                    break candidate;
                }
            };
            let task = Task {
                id,
                subject: subject
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| Task::derive_subject(description)),
                description: description.to_string(),
                status: TaskStatus::Pending,
                owner: owner.map(|s| s.to_string()),
                blocked_by: Vec::new(),
                blocks: Vec::new(),
                metadata: Metadata::new(),
            };
            tasks.push(task.clone());
            Ok(task)
        })
    }

    pub fn get_task(&self, id: &str) -> Result<Task> {
        let tasks = self.load()?;
        tasks
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| TeamError::NotFound(format!("task '{id}'")))
    }

    /// Insertion order, matching the data model's `listTasks` contract.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.load()
    }

    /// Read-modify-write with a caller-supplied pure transform. Rejects a
    /// transform that would introduce a dependency cycle (defensive; the
    /// transform should not touch `blocked_by`/`blocks` directly — use
    /// `add_task_dependency`/`remove_task_dependency` for that).
    pub fn update_task(&self, id: &str, f: impl FnOnce(Task) -> Task) -> Result<Task> {
        self.with_tasks(|tasks| {
            let idx = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| TeamError::NotFound(format!("task '{id}'")))?;
            let updated = f(tasks[idx].clone());
            if has_cycle_from(tasks, &updated) {
                return Err(TeamError::Conflict(format!(
                    "update to task '{id}' would introduce a dependency cycle"
                )));
            }
            tasks[idx] = updated.clone();
            Ok(updated)
        })
    }

    pub fn add_task_dependency(&self, task_id: &str, dep_id: &str) -> Result<Task> {
        if task_id == dep_id {
            return Err(TeamError::Conflict(format!(
                "task '{task_id}' cannot depend on itself"
            )));
        }
        self.with_tasks(|tasks| {
            if !tasks.iter().any(|t| t.id == dep_id) {
                return Err(TeamError::NotFound(format!("task '{dep_id}'")));
            }
            let idx = tasks
                .iter()
                .position(|t| t.id == task_id)
                .ok_or_else(|| TeamError::NotFound(format!("task '{task_id}'")))?;

            if tasks[idx].blocked_by.iter().any(|d| d == dep_id) {
                return Ok(tasks[idx].clone());
            }

            let mut candidate = tasks[idx].clone();
            candidate.blocked_by.push(dep_id.to_string());
            if would_cycle(tasks, task_id, &candidate.blocked_by) {
                return Err(TeamError::Conflict(format!(
                    "adding dependency '{dep_id}' to '{task_id}' would create a cycle"
                )));
            }
            tasks[idx] = candidate.clone();

            let dep_idx = tasks.iter().position(|t| t.id == dep_id).expect("checked above");
            if !tasks[dep_idx].blocks.iter().any(|b| b == task_id) {
                tasks[dep_idx].blocks.push(task_id.to_string());
            }
            Ok(candidate)
        })
    }

    pub fn remove_task_dependency(&self, task_id: &str, dep_id: &str) -> Result<Task> {
        self.with_tasks(|tasks| {
            let idx = tasks
                .iter()
                .position(|t| t.id == task_id)
                .ok_or_else(|| TeamError::NotFound(format!("task '{task_id}'")))?;
            tasks[idx].blocked_by.retain(|d| d != dep_id);
            let updated = tasks[idx].clone();

            if let Some(dep_idx) = tasks.iter().position(|t| t.id == dep_id) {
                tasks[dep_idx].blocks.retain(|b| b != task_id);
            }
            Ok(updated)
        })
    }

    /// True iff any transitive `blocked_by` dependency is not `completed`.
    pub fn is_task_blocked(&self, task: &Task) -> Result<bool> {
        let tasks = self.load()?;
        Ok(is_blocked(&tasks, task))
    }

    /// Clears ownership and reopens every non-completed task owned by
    /// `agent_name`, stamping the unassignment metadata.
    pub fn unassign_tasks_for_agent(&self, agent_name: &str, reason: &str) -> Result<Vec<Task>> {
        self.with_tasks(|tasks| {
            let mut touched = Vec::new();
            for t in tasks.iter_mut() {
                if t.owner.as_deref() == Some(agent_name) && t.status != TaskStatus::Completed {
                    t.owner = None;
                    t.status = TaskStatus::Pending;
                    t.metadata
                        .insert("unassignedAt".into(), serde_json::json!(Utc::now().to_rfc3339()));
                    t.metadata
                        .insert("unassignedBy".into(), serde_json::json!("teams-tool"));
                    t.metadata
                        .insert("unassignedReason".into(), serde_json::json!(reason));
                    touched.push(t.clone());
                }
            }
            Ok(touched)
        })
    }
}

fn to_lock_err(e: TeamError) -> teamctl_lock::LockError {
    teamctl_lock::LockError::Io {
        path: PathBuf::new(),
        source: std::io::Error::other(e.to_string()),
    }
}

fn is_blocked(tasks: &[Task], task: &Task) -> bool {
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = task.blocked_by.iter().cloned().collect();
    while let Some(dep_id) = queue.pop_front() {
        if !seen.insert(dep_id.clone()) {
            continue;
        }
        let Some(dep) = tasks.iter().find(|t| t.id == dep_id) else {
            continue;
        };
        if dep.status != TaskStatus::Completed {
            return true;
        }
        queue.extend(dep.blocked_by.iter().cloned());
    }
    false
}

/// Would adding `new_blocked_by` as `task_id`'s dependency set create a
/// cycle in the graph described by `tasks` (with `task_id`'s own edges
/// overridden by `new_blocked_by`)?
fn would_cycle(tasks: &[Task], task_id: &str, new_blocked_by: &[String]) -> bool {
    let mut seen: HashSet<String> = HashSet::new();
    let mut stack: Vec<String> = new_blocked_by.to_vec();
    while let Some(dep_id) = stack.pop() {
        if dep_id == task_id {
            return true;
        }
        if !seen.insert(dep_id.clone()) {
            continue;
        }
        if let Some(dep) = tasks.iter().find(|t| t.id == dep_id) {
            stack.extend(dep.blocked_by.iter().cloned());
        }
    }
    false
}

fn has_cycle_from(tasks: &[Task], updated: &Task) -> bool {
    would_cycle(tasks, &updated.id, &updated.blocked_by)
}

/// Persists `config.json`: membership, policy, style.
pub struct TeamConfigStore {
    team_dir: PathBuf,
}

impl TeamConfigStore {
    pub fn new(team_dir: impl Into<PathBuf>) -> Self {
        Self {
            team_dir: team_dir.into(),
        }
    }

    fn path(&self) -> PathBuf {
        config_path(&self.team_dir)
    }

    fn lock_path(&self) -> PathBuf {
        config_lock_path(&self.team_dir)
    }

    pub fn load(&self) -> Result<Option<TeamConfig>> {
        Ok(read_json_opt(&self.path())?)
    }

    /// Upsert semantics: if a config exists, only `updated_at` is
    /// refreshed and missing members/lead_name/style are filled from
    /// `defaults`; existing fields are preserved. If none exists, a fresh
    /// config is created from `defaults`.
    pub fn ensure_team_config(
        &self,
        team_id: &str,
        task_list_id: &str,
        defaults: &TeamConfigDefaults,
    ) -> Result<TeamConfig> {
        with_lock(&self.lock_path(), LockOpts::default(), || {
            let existing: Option<TeamConfig> = read_json_opt(&self.path()).map_err(to_lock_err)?;
            let now = Utc::now();
            let config = match existing {
                None => TeamConfig {
                    team_id: team_id.to_string(),
                    task_list_id: task_list_id.to_string(),
                    lead_name: defaults.lead_name.clone(),
                    style: defaults.style.clone(),
                    hooks: None,
                    members: defaults.members.clone(),
                    created_at: now,
                    updated_at: now,
                },
                Some(mut current) => {
                    if current.members.is_empty() {
                        current.members = defaults.members.clone();
                    }
                    current.updated_at = now;
                    current
                }
            };
            atomic_write_json(&self.path(), &config).map_err(to_lock_err)?;
            Ok(config)
        })
        .map_err(TeamError::Lock)
    }

    pub fn set_member_status(
        &self,
        name: &str,
        status: MemberStatus,
        extra_meta: Metadata,
    ) -> Result<Member> {
        with_lock(&self.lock_path(), LockOpts::default(), || {
            let mut config: TeamConfig = read_json_opt(&self.path())
                .map_err(to_lock_err)?
                .ok_or_else(|| {
                    to_lock_err(TeamError::NotFound("team config".into()))
                })?;

            let idx = config.members.iter().position(|m| m.name == name);
            let idx = match idx {
                Some(idx) => idx,
                None => {
                    config.members.push(Member {
                        name: name.to_string(),
                        role: crate::types::MemberRole::Worker,
                        status,
                        last_seen_at: Some(Utc::now()),
                        meta: Metadata::new(),
                    });
                    config.members.len() - 1
                }
            };
            config.members[idx].status = status;
            config.members[idx].last_seen_at = Some(Utc::now());
            for (k, v) in extra_meta {
                config.members[idx].meta.insert(k, v);
            }
            config.updated_at = Utc::now();
            let member = config.members[idx].clone();
            atomic_write_json(&self.path(), &config).map_err(to_lock_err)?;
            Ok(member)
        })
        .map_err(TeamError::Lock)
    }

    pub fn update_hooks_policy(
        &self,
        f: impl FnOnce(Option<crate::types::HooksPolicy>) -> crate::types::HooksPolicy,
    ) -> Result<crate::types::HooksPolicy> {
        with_lock(&self.lock_path(), LockOpts::default(), || {
            let mut config: TeamConfig = read_json_opt(&self.path())
                .map_err(to_lock_err)?
                .ok_or_else(|| to_lock_err(TeamError::NotFound("team config".into())))?;
            let updated = f(config.hooks.clone());
            config.hooks = Some(updated.clone());
            config.updated_at = Utc::now();
            atomic_write_json(&self.path(), &config).map_err(to_lock_err)?;
            Ok(updated)
        })
        .map_err(TeamError::Lock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureAction, FollowupOwner, HooksPolicy, MemberRole};

    fn store() -> (tempfile::TempDir, TaskStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TaskStore::new(dir.path(), "tl1");
        (dir, store)
    }

    #[test]
    fn create_and_list_preserve_insertion_order() {
        let (_dir, store) = store();
        store.create_task(None, "A", None).expect("create a");
        store.create_task(None, "B", None).expect("create b");
        store.create_task(None, "C", None).expect("create c");

        let listed = store.list_tasks().expect("list");
        let subjects: Vec<&str> = listed.iter().map(|t| t.subject.as_str()).collect();
        assert_eq!(subjects, vec!["A", "B", "C"]);
    }

    // Testable property 2: acyclicity.
    #[test]
    fn property_2_dependency_cycle_rejected() {
        let (_dir, store) = store();
        let t1 = store.create_task(None, "T1", None).expect("t1");
        let t2 = store.create_task(None, "T2", None).expect("t2");

        store.add_task_dependency(&t1.id, &t2.id).expect("t1 depends on t2");
        let err = store.add_task_dependency(&t2.id, &t1.id).unwrap_err();
        assert!(matches!(err, TeamError::Conflict(_)));

        // Store unchanged: t2 still has no blocked_by.
        let t2_after = store.get_task(&t2.id).expect("get t2");
        assert!(t2_after.blocked_by.is_empty());
    }

    // Testable property 3: symmetry.
    #[test]
    fn property_3_blocked_by_blocks_symmetry() {
        let (_dir, store) = store();
        let t1 = store.create_task(None, "T1", None).expect("t1");
        let t2 = store.create_task(None, "T2", None).expect("t2");
        store.add_task_dependency(&t1.id, &t2.id).expect("dep");

        let t1_after = store.get_task(&t1.id).expect("t1");
        let t2_after = store.get_task(&t2.id).expect("t2");
        assert!(t1_after.blocked_by.contains(&t2.id));
        assert!(t2_after.blocks.contains(&t1.id));

        store.remove_task_dependency(&t1.id, &t2.id).expect("rm");
        let t1_after = store.get_task(&t1.id).expect("t1");
        let t2_after = store.get_task(&t2.id).expect("t2");
        assert!(!t1_after.blocked_by.contains(&t2.id));
        assert!(!t2_after.blocks.contains(&t1.id));
    }

    #[test]
    fn is_task_blocked_follows_transitive_closure() {
        let (_dir, store) = store();
        let t1 = store.create_task(None, "T1", None).expect("t1");
        let t2 = store.create_task(None, "T2", None).expect("t2");
        let t3 = store.create_task(None, "T3", None).expect("t3");
        store.add_task_dependency(&t1.id, &t2.id).expect("dep1");
        store.add_task_dependency(&t2.id, &t3.id).expect("dep2");

        let t1 = store.get_task(&t1.id).expect("t1 reload");
        assert!(store.is_task_blocked(&t1).expect("blocked check"));

        store
            .update_task(&t3.id, |mut t| {
                t.status = TaskStatus::Completed;
                t
            })
            .expect("complete t3");
        let t2 = store.get_task(&t2.id).expect("t2 reload");
        assert!(!store.is_task_blocked(&t2).expect("t2 unblocked"));
        let t1 = store.get_task(&t1.id).expect("t1 reload 2");
        assert!(
            store.is_task_blocked(&t1).expect("t1 still blocked"),
            "t1 depends on t2 which is not completed"
        );
    }

    // Testable property 4: idempotent set-status.
    #[test]
    fn property_4_idempotent_set_status() {
        let (dir, store) = store();
        let t = store.create_task(None, "T", None).expect("create");
        store
            .update_task(&t.id, |mut t| {
                t.status = TaskStatus::InProgress;
                t
            })
            .expect("start once");
        let bytes_once = std::fs::read(tasklist_path(dir.path(), "tl1")).expect("read once");

        store
            .update_task(&t.id, |mut t| {
                t.status = TaskStatus::InProgress;
                t
            })
            .expect("start twice");
        let bytes_twice = std::fs::read(tasklist_path(dir.path(), "tl1")).expect("read twice");

        assert_eq!(bytes_once, bytes_twice);
    }

    #[test]
    fn unassign_tasks_for_agent_skips_completed() {
        let (_dir, store) = store();
        let t1 = store.create_task(None, "T1", Some("w1")).expect("t1");
        let t2 = store.create_task(None, "T2", Some("w1")).expect("t2");
        store
            .update_task(&t2.id, |mut t| {
                t.status = TaskStatus::Completed;
                t
            })
            .expect("complete t2");

        let touched = store
            .unassign_tasks_for_agent("w1", "teammate offline")
            .expect("unassign");
        assert_eq!(touched.len(), 1);
        assert_eq!(touched[0].id, t1.id);

        let t2_after = store.get_task(&t2.id).expect("t2");
        assert_eq!(t2_after.owner.as_deref(), Some("w1"));
    }

    #[test]
    fn ensure_team_config_upserts_and_preserves_existing_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TeamConfigStore::new(dir.path());
        let defaults = TeamConfigDefaults {
            lead_name: "lead".into(),
            style: "comrades".into(),
            members: vec![Member {
                name: "lead".into(),
                role: MemberRole::Lead,
                status: MemberStatus::Online,
                last_seen_at: None,
                meta: Metadata::new(),
            }],
        };
        let created = store
            .ensure_team_config("team1", "tl1", &defaults)
            .expect("create");
        assert_eq!(created.lead_name, "lead");

        store
            .set_member_status("lead", MemberStatus::Offline, Metadata::new())
            .expect("set offline");

        let refreshed = store
            .ensure_team_config("team1", "tl1", &defaults)
            .expect("ensure again");
        // Existing member status is preserved by the upsert, not reset to
        // defaults.
        let lead = refreshed.members.iter().find(|m| m.name == "lead").expect("lead");
        assert_eq!(lead.status, MemberStatus::Offline);
        assert!(refreshed.updated_at >= created.updated_at);
    }

    #[test]
    fn update_hooks_policy_supports_partial_updates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = TeamConfigStore::new(dir.path());
        store
            .ensure_team_config(
                "team1",
                "tl1",
                &TeamConfigDefaults {
                    lead_name: "lead".into(),
                    style: "comrades".into(),
                    members: vec![],
                },
            )
            .expect("create");

        let policy = store
            .update_hooks_policy(|_| HooksPolicy {
                failure_action: FailureAction::ReopenFollowup,
                max_reopens_per_task: 2,
                followup_owner: FollowupOwner::Member,
            })
            .expect("set policy");
        assert_eq!(policy.max_reopens_per_task, 2);

        let policy2 = store
            .update_hooks_policy(|current| {
                let mut p = current.expect("policy exists");
                p.max_reopens_per_task = 5;
                p
            })
            .expect("partial update");
        assert_eq!(policy2.max_reopens_per_task, 5);
        assert_eq!(policy2.failure_action, FailureAction::ReopenFollowup);
    }
}
