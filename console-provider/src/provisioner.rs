//! Workspace isolation for a freshly spawned teammate (§4.H step 3). The
//! actual git-worktree mechanics are out of scope (§1: "the git worktree
//! implementation" is an external collaborator) — this module only defines
//! the seam the spawner calls through and the trivial non-isolating default.

use std::path::{Path, PathBuf};

use crate::error::{ProviderError, Result};

/// Produces the working directory a teammate should run in.
pub trait WorktreeProvisioner: Send + Sync {
    /// Returns the directory the teammate's process should be launched with
    /// as its `cwd`. `team_dir` is the team's directory on disk; `name` is
    /// the (already-sanitized) teammate name.
    fn provision(&self, team_dir: &Path, name: &str) -> Result<PathBuf>;
}

/// `workspaceMode = "shared"`: every teammate runs in the leader's own
/// working directory, unmodified.
#[derive(Debug, Clone)]
pub struct SharedCwdProvisioner {
    leader_cwd: PathBuf,
}

impl SharedCwdProvisioner {
    pub fn new(leader_cwd: PathBuf) -> Self {
        Self { leader_cwd }
    }
}

impl WorktreeProvisioner for SharedCwdProvisioner {
    fn provision(&self, _team_dir: &Path, _name: &str) -> Result<PathBuf> {
        Ok(self.leader_cwd.clone())
    }
}

/// `workspaceMode = "worktree"`: each teammate gets its own directory under
/// the team directory. The real implementation would `git worktree add` a
/// branch here; since the worktree mechanics themselves are an external
/// collaborator, this provisioner only guarantees the directory exists and
/// is unique per name, which is enough for callers that don't depend on the
/// contents being a real worktree.
#[derive(Debug, Clone)]
pub struct DirectoryPerTeammateProvisioner;

impl WorktreeProvisioner for DirectoryPerTeammateProvisioner {
    fn provision(&self, team_dir: &Path, name: &str) -> Result<PathBuf> {
        let dir = team_dir.join("worktrees").join(name);
        std::fs::create_dir_all(&dir)
            .map_err(|e| ProviderError::Other(format!("provision {name}: {e}")))?;
        Ok(dir)
    }
}
