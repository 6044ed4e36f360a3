//! Heartbeated exclusive lease on a team directory (`.attach-claim.json`).
//! At most one leader session may hold the claim at a time; a stale claim
//! (no heartbeat within `stale_ms`) may be taken over by another session.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use console_persist::atomic::{atomic_write_json, read_json_opt};
use serde::{Deserialize, Serialize};
use teamctl_lock::{LockOpts, with_lock};

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("lock error: {0}")]
    Lock(#[from] teamctl_lock::LockError),
    #[error("persistence error: {0}")]
    Persist(#[from] console_persist::SessionError),
}

pub type Result<T> = std::result::Result<T, ClaimError>;

pub const DEFAULT_STALE_MS: i64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachClaim {
    pub holder_session_id: String,
    pub claimed_at: DateTime<Utc>,
    pub heartbeat_at: DateTime<Utc>,
    pub pid: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct AcquireOpts {
    pub force: bool,
    pub stale_ms: i64,
    /// Overridable clock for tests; `None` uses `Utc::now()`.
    pub now: Option<DateTime<Utc>>,
}

impl Default for AcquireOpts {
    fn default() -> Self {
        Self {
            force: false,
            stale_ms: DEFAULT_STALE_MS,
            now: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AcquireOutcome {
    /// Acquired cleanly: no claim existed, or the same holder refreshed it.
    Acquired { claim: AttachClaim },
    /// Acquired by displacing a stale claim, or by `force`.
    Replaced {
        claim: AttachClaim,
        replaced: AttachClaim,
    },
    /// Refused: a live claim belongs to another session.
    ClaimedByOther { claim: AttachClaim },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Updated,
    NotOwner,
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    NotOwner,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    pub is_stale: bool,
    pub age_ms: i64,
}

/// Pure function: is `claim` stale as of `now`, given `stale_ms`?
pub fn assess(claim: &AttachClaim, now: DateTime<Utc>, stale_ms: i64) -> Freshness {
    let age_ms = (now - claim.heartbeat_at).num_milliseconds();
    Freshness {
        is_stale: age_ms > stale_ms,
        age_ms,
    }
}

fn claim_path(team_dir: &Path) -> PathBuf {
    team_dir.join(".attach-claim.json")
}

fn claim_lock_path(team_dir: &Path) -> PathBuf {
    team_dir.join(".attach-claim.json.lock")
}

pub fn acquire(
    team_dir: &Path,
    holder_session_id: &str,
    opts: AcquireOpts,
) -> Result<AcquireOutcome> {
    let now = opts.now.unwrap_or_else(Utc::now);
    let path = claim_path(team_dir);
    let lock_path = claim_lock_path(team_dir);

    with_lock(&lock_path, LockOpts::default(), || {
        let existing: Option<AttachClaim> = read_json_opt(&path)?;

        let outcome = match existing {
            None => {
                let claim = AttachClaim {
                    holder_session_id: holder_session_id.to_string(),
                    claimed_at: now,
                    heartbeat_at: now,
                    pid: std::process::id(),
                };
                atomic_write_json(&path, &claim)?;
                AcquireOutcome::Acquired { claim }
            }
            Some(current) if current.holder_session_id == holder_session_id => {
                let claim = AttachClaim {
                    heartbeat_at: now,
                    ..current
                };
                atomic_write_json(&path, &claim)?;
                AcquireOutcome::Acquired { claim }
            }
            Some(current) => {
                let fresh = assess(&current, now, opts.stale_ms);
                if opts.force || fresh.is_stale {
                    let claim = AttachClaim {
                        holder_session_id: holder_session_id.to_string(),
                        claimed_at: now,
                        heartbeat_at: now,
                        pid: std::process::id(),
                    };
                    atomic_write_json(&path, &claim)?;
                    AcquireOutcome::Replaced {
                        claim,
                        replaced: current,
                    }
                } else {
                    AcquireOutcome::ClaimedByOther { claim: current }
                }
            }
        };
        Ok(outcome)
    })
}

pub fn heartbeat(team_dir: &Path, holder_session_id: &str) -> Result<HeartbeatOutcome> {
    let path = claim_path(team_dir);
    let lock_path = claim_lock_path(team_dir);

    with_lock(&lock_path, LockOpts::default(), || {
        let existing: Option<AttachClaim> = read_json_opt(&path)?;
        match existing {
            None => Ok(HeartbeatOutcome::Missing),
            Some(current) if current.holder_session_id != holder_session_id => {
                Ok(HeartbeatOutcome::NotOwner)
            }
            Some(current) => {
                let claim = AttachClaim {
                    heartbeat_at: Utc::now(),
                    ..current
                };
                atomic_write_json(&path, &claim)?;
                Ok(HeartbeatOutcome::Updated)
            }
        }
    })
}

pub fn release(team_dir: &Path, holder_session_id: &str, force: bool) -> Result<ReleaseOutcome> {
    let path = claim_path(team_dir);
    let lock_path = claim_lock_path(team_dir);

    with_lock(&lock_path, LockOpts::default(), || {
        let existing: Option<AttachClaim> = read_json_opt(&path)?;
        match existing {
            None => Ok(ReleaseOutcome::None),
            Some(current) if !force && current.holder_session_id != holder_session_id => {
                Ok(ReleaseOutcome::NotOwner)
            }
            Some(_) => {
                if path.exists() {
                    std::fs::remove_file(&path)
                        .map_err(|e| console_persist::SessionError::Io(e.to_string()))?;
                }
                Ok(ReleaseOutcome::Released)
            }
        }
    })
}
