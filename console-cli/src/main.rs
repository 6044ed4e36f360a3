//! Leader process entry point: reads the §6.5 environment surface, wires
//! the coordinator crates into a running `CoordinatorServices`, and reads
//! the §6.4 slash-command surface from stdin until EOF.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use console_cli::{SlashCommand, TeamctlEnv, init_tracing, parse_slash};
use console_coordinator::{CoordinatorServices, discovery};
use console_provider::{DirectoryPerTeammateProvisioner, SharedCwdProvisioner, WorktreeProvisioner};
use console_rpc::SpawnContext;
use console_team::TeamConfigDefaults;
use teamctl_claim::{AcquireOpts, AcquireOutcome, ReleaseOutcome};

#[derive(Parser, Debug)]
#[command(name = "teamctl", about = "Leader process for a teamctl coding team")]
struct Cli {
    /// Worker subprocess program launched by `/team spawn`.
    #[arg(long, default_value = "teamctl-worker")]
    worker_program: String,

    /// `shared` (one cwd for every teammate) or `worktree` (one directory per teammate).
    #[arg(long, default_value = "shared")]
    workspace_mode: String,

    /// Run a single slash command and exit, instead of reading stdin.
    #[arg(long)]
    command: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env = TeamctlEnv::from_env();
    let _logging = init_tracing(&env);

    let session_id = uuid::Uuid::new_v4().to_string();
    let team_id = env.team_id.clone().unwrap_or_else(|| "default".to_string());
    let task_list_id = env.task_list_id.clone().unwrap_or_else(|| "main".to_string());
    let lead_name = env.lead_name.clone().unwrap_or_else(|| "lead".to_string());
    let team_dir = env.root_dir.join(&team_id);

    let provisioner: Arc<dyn WorktreeProvisioner> = if cli.workspace_mode == "worktree" {
        Arc::new(DirectoryPerTeammateProvisioner)
    } else {
        Arc::new(SharedCwdProvisioner::new(team_dir.clone()))
    };

    let spawn_ctx = SpawnContext {
        leader_provider: None,
        leader_model_id: None,
        program: cli.worker_program,
        base_args: Vec::new(),
        base_env: HashMap::new(),
    };

    let services = CoordinatorServices::new(
        team_dir,
        task_list_id.clone(),
        lead_name.clone(),
        provisioner,
        cli.workspace_mode,
        spawn_ctx,
    );

    services.config_store.ensure_team_config(
        &team_id,
        &task_list_id,
        &TeamConfigDefaults { lead_name, style: "default".into(), members: Vec::new() },
    )?;

    if env.auto_claim {
        match teamctl_claim::acquire(&services.team_dir, &session_id, AcquireOpts::default()) {
            Ok(outcome) => report_acquire(&outcome),
            Err(e) => eprintln!("error: auto-claim failed: {e}"),
        }
    }

    if let Some(command) = cli.command {
        run_line(&services, &env, &session_id, &command).await;
        return Ok(());
    }

    let stdin = io::stdin();
    prompt();
    for line in stdin.lock().lines() {
        let line = line?;
        if !line.trim().is_empty() {
            run_line(&services, &env, &session_id, &line).await;
        }
        prompt();
    }

    if env.auto_claim {
        let _ = teamctl_claim::release(&services.team_dir, &session_id, false);
    }

    Ok(())
}

fn report_acquire(outcome: &AcquireOutcome) {
    match outcome {
        AcquireOutcome::Acquired { claim } => {
            println!("claimed team directory as {}", claim.holder_session_id)
        }
        AcquireOutcome::Replaced { claim, replaced } => println!(
            "took over a stale claim held by {} (now held by {})",
            replaced.holder_session_id, claim.holder_session_id
        ),
        AcquireOutcome::ClaimedByOther { claim } => println!(
            "team directory is already claimed by {}; pass --claim to force",
            claim.holder_session_id
        ),
    }
}

fn prompt() {
    print!("teamctl> ");
    io::stdout().flush().ok();
}

async fn run_line(services: &CoordinatorServices, env: &TeamctlEnv, session_id: &str, line: &str) {
    match parse_slash(line) {
        Ok(SlashCommand::TaskList) => match services.task_store.list_tasks() {
            Ok(tasks) => {
                for task in tasks {
                    println!("{} [{:?}] {}", task.id, task.status, task.subject);
                }
            }
            Err(e) => eprintln!("error: {e}"),
        },
        Ok(SlashCommand::AttachList) => match discovery::list_discovered_teams(&env.root_dir) {
            Ok(teams) => {
                for team in teams {
                    let claimed_by = team
                        .claim
                        .as_ref()
                        .map(|c| c.holder_session_id.as_str())
                        .unwrap_or("none");
                    println!(
                        "{} lead={} claimed_by={} stale={}",
                        team.team_id, team.config.lead_name, claimed_by, team.is_stale
                    );
                }
            }
            Err(e) => eprintln!("error: {e}"),
        },
        Ok(SlashCommand::Attach { team_id, claim }) => {
            let target_dir = env.root_dir.join(&team_id);
            if !claim {
                println!("attached '{team_id}' read-only (pass --claim to take the lease)");
                return;
            }
            match teamctl_claim::acquire(&target_dir, session_id, AcquireOpts::default()) {
                Ok(outcome) => report_acquire(&outcome),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        Ok(SlashCommand::Detach) => match teamctl_claim::release(&services.team_dir, session_id, false) {
            Ok(ReleaseOutcome::Released) => println!("detached"),
            Ok(ReleaseOutcome::NotOwner) => println!("not the claim holder; nothing released"),
            Ok(ReleaseOutcome::None) => println!("no claim was held"),
            Err(e) => eprintln!("error: {e}"),
        },
        Ok(other) => match other.into_dispatch() {
            Some((action, params)) => match console_coordinator::dispatch(services, action, params).await {
                Ok(result) => println!("{}", result.content),
                Err(e) => eprintln!("error: {e}"),
            },
            None => eprintln!("command has no teams tool dispatch"),
        },
        Err(e) => eprintln!("error: {e}"),
    }
}
