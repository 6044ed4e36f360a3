//! Enumerates teams already on disk under a root directory (§4.J), for the
//! `/team attach list` slash command.

use std::path::Path;

use console_team::TeamConfigStore;
use serde::Serialize;
use teamctl_claim::{AttachClaim, DEFAULT_STALE_MS, assess};

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredTeam {
    pub team_id: String,
    pub config: console_team::TeamConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<AttachClaim>,
    pub is_stale: bool,
}

/// Lists every team directory under `root`, ignoring `_`-prefixed names
/// (reserved for internal bookkeeping directories like `_logs`), sorted by
/// `updated_at` descending.
pub fn list_discovered_teams(root: &Path) -> std::io::Result<Vec<DiscoveredTeam>> {
    let mut discovered = Vec::new();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if name.starts_with('_') {
            continue;
        }

        let team_dir = entry.path();
        let Ok(Some(config)) = TeamConfigStore::new(&team_dir).load() else {
            continue;
        };

        let claim_path = team_dir.join(".attach-claim.json");
        let claim: Option<AttachClaim> = console_persist::atomic::read_json_opt(&claim_path)
            .ok()
            .flatten();
        let is_stale = match &claim {
            Some(claim) => assess(claim, chrono::Utc::now(), DEFAULT_STALE_MS).is_stale,
            None => true,
        };

        discovered.push(DiscoveredTeam {
            team_id: name.to_string(),
            config,
            claim,
            is_stale,
        });
    }

    discovered.sort_by(|a, b| b.config.updated_at.cmp(&a.config.updated_at));
    Ok(discovered)
}
