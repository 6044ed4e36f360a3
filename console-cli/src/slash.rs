//! Parses the `/team ...` slash-command surface (§6.4) into a typed
//! command, then (for the subset that is a `teams` tool action) into the
//! `Action`/`ActionParams` pair `console_coordinator::dispatch` expects.
//! `/team attach`/`/team detach`/`/team task list` aren't coordinator
//! actions — they touch the attach-claim lease or just read the task
//! store — so they stay outside the `Action` enum and are handled by the
//! caller directly.

use console_coordinator::{Action, ActionParams};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlashError {
    #[error("not a /team command")]
    NotATeamCommand,
    #[error("unknown /team verb '{0}'")]
    UnknownVerb(String),
    #[error("missing required argument '{0}'")]
    MissingArgument(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Spawn {
        name: Option<String>,
        mode: Option<String>,
        workspace_mode: Option<String>,
        plan_required: bool,
        model: Option<String>,
        thinking: Option<String>,
    },
    AttachList,
    Attach { team_id: String, claim: bool },
    Detach,
    Dm { name: String, text: String },
    Send { name: String, text: String },
    Broadcast { text: String },
    Steer { name: String, text: String },
    TaskAdd { text: String },
    TaskList,
    Kill { name: String },
    Shutdown { name: Option<String> },
}

impl SlashCommand {
    /// Converts to the coordinator's action dispatch pair, or `None` for
    /// the commands that don't go through `Action` at all.
    pub fn into_dispatch(self) -> Option<(Action, ActionParams)> {
        match self {
            SlashCommand::Spawn { name, model, .. } => Some((
                Action::MemberSpawn,
                ActionParams { name, model, ..Default::default() },
            )),
            SlashCommand::Dm { name, text } | SlashCommand::Send { name, text } => Some((
                Action::MessageDm,
                ActionParams { name: Some(name), text: Some(text), ..Default::default() },
            )),
            SlashCommand::Broadcast { text } => Some((
                Action::MessageBroadcast,
                ActionParams { text: Some(text), ..Default::default() },
            )),
            SlashCommand::Steer { name, text } => Some((
                Action::MessageSteer,
                ActionParams { name: Some(name), text: Some(text), ..Default::default() },
            )),
            SlashCommand::TaskAdd { text } => Some((
                Action::Delegate,
                ActionParams { tasks: Some(vec![text]), ..Default::default() },
            )),
            SlashCommand::Kill { name } => Some((
                Action::MemberKill,
                ActionParams { name: Some(name), ..Default::default() },
            )),
            SlashCommand::Shutdown { name } => {
                Some((Action::MemberShutdown, ActionParams { name, ..Default::default() }))
            }
            SlashCommand::AttachList
            | SlashCommand::Attach { .. }
            | SlashCommand::Detach
            | SlashCommand::TaskList => None,
        }
    }
}

pub fn parse_slash(line: &str) -> Result<SlashCommand, SlashError> {
    let rest = line.trim().strip_prefix("/team").ok_or(SlashError::NotATeamCommand)?;
    let rest = rest.trim();
    let mut parts = rest.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or("");
    let remainder = parts.next().unwrap_or("").trim();

    match verb {
        "spawn" => Ok(parse_spawn(remainder)),
        "attach" => parse_attach(remainder),
        "detach" => Ok(SlashCommand::Detach),
        "dm" => parse_name_and_text(remainder).map(|(name, text)| SlashCommand::Dm { name, text }),
        "send" => parse_name_and_text(remainder).map(|(name, text)| SlashCommand::Send { name, text }),
        "steer" => parse_name_and_text(remainder).map(|(name, text)| SlashCommand::Steer { name, text }),
        "broadcast" => {
            if remainder.is_empty() {
                return Err(SlashError::MissingArgument("message"));
            }
            Ok(SlashCommand::Broadcast { text: remainder.to_string() })
        }
        "task" => parse_task(remainder),
        "kill" => {
            if remainder.is_empty() {
                return Err(SlashError::MissingArgument("name"));
            }
            Ok(SlashCommand::Kill { name: remainder.to_string() })
        }
        "shutdown" => {
            if remainder.is_empty() || remainder.eq_ignore_ascii_case("all") {
                Ok(SlashCommand::Shutdown { name: None })
            } else {
                Ok(SlashCommand::Shutdown { name: Some(remainder.to_string()) })
            }
        }
        other => Err(SlashError::UnknownVerb(other.to_string())),
    }
}

fn parse_name_and_text(remainder: &str) -> Result<(String, String), SlashError> {
    let mut parts = remainder.splitn(2, char::is_whitespace);
    let name = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(SlashError::MissingArgument("name"))?;
    let text = parts.next().unwrap_or("").trim();
    if text.is_empty() {
        return Err(SlashError::MissingArgument("message"));
    }
    Ok((name.to_string(), text.to_string()))
}

fn parse_task(remainder: &str) -> Result<SlashCommand, SlashError> {
    let mut parts = remainder.splitn(2, char::is_whitespace);
    match parts.next().unwrap_or("") {
        "add" => {
            let text = parts.next().unwrap_or("").trim();
            if text.is_empty() {
                return Err(SlashError::MissingArgument("text"));
            }
            Ok(SlashCommand::TaskAdd { text: text.to_string() })
        }
        "list" => Ok(SlashCommand::TaskList),
        other => Err(SlashError::UnknownVerb(format!("task {other}"))),
    }
}

fn parse_attach(remainder: &str) -> Result<SlashCommand, SlashError> {
    if remainder.trim() == "list" {
        return Ok(SlashCommand::AttachList);
    }
    let mut claim = false;
    let mut team_id = None;
    for token in remainder.split_whitespace() {
        if token == "--claim" {
            claim = true;
        } else if team_id.is_none() {
            team_id = Some(token.to_string());
        }
    }
    let team_id = team_id.ok_or(SlashError::MissingArgument("teamId"))?;
    Ok(SlashCommand::Attach { team_id, claim })
}

fn parse_spawn(remainder: &str) -> SlashCommand {
    let mut name = None;
    let mut mode = None;
    let mut workspace_mode = None;
    let mut plan_required = false;
    let mut model = None;
    let mut thinking = None;

    let tokens: Vec<&str> = remainder.split_whitespace().collect();
    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "--model" => {
                i += 1;
                model = tokens.get(i).map(|s| s.to_string());
            }
            "--thinking" => {
                i += 1;
                thinking = tokens.get(i).map(|s| s.to_string());
            }
            "fresh" | "branch" => mode = Some(tokens[i].to_string()),
            "shared" | "worktree" => workspace_mode = Some(tokens[i].to_string()),
            "plan" => plan_required = true,
            other if name.is_none() && !other.starts_with("--") => name = Some(other.to_string()),
            _ => {}
        }
        i += 1;
    }

    SlashCommand::Spawn { name, mode, workspace_mode, plan_required, model, thinking }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dm() {
        let cmd = parse_slash("/team dm nova hello there").expect("parse");
        assert_eq!(cmd, SlashCommand::Dm { name: "nova".into(), text: "hello there".into() });
    }

    #[test]
    fn parses_task_add() {
        let cmd = parse_slash("/team task add fix the flaky test").expect("parse");
        assert_eq!(cmd, SlashCommand::TaskAdd { text: "fix the flaky test".into() });
    }

    #[test]
    fn parses_task_list() {
        assert_eq!(parse_slash("/team task list").expect("parse"), SlashCommand::TaskList);
    }

    #[test]
    fn parses_shutdown_all_on_empty_or_literal_all() {
        assert_eq!(parse_slash("/team shutdown").expect("parse"), SlashCommand::Shutdown { name: None });
        assert_eq!(parse_slash("/team shutdown all").expect("parse"), SlashCommand::Shutdown { name: None });
        assert_eq!(
            parse_slash("/team shutdown nova").expect("parse"),
            SlashCommand::Shutdown { name: Some("nova".into()) }
        );
    }

    #[test]
    fn parses_spawn_with_flags() {
        let cmd = parse_slash("/team spawn nova branch worktree plan --model opus --thinking high")
            .expect("parse");
        assert_eq!(
            cmd,
            SlashCommand::Spawn {
                name: Some("nova".into()),
                mode: Some("branch".into()),
                workspace_mode: Some("worktree".into()),
                plan_required: true,
                model: Some("opus".into()),
                thinking: Some("high".into()),
            }
        );
    }

    #[test]
    fn parses_attach_variants() {
        assert_eq!(parse_slash("/team attach list").expect("parse"), SlashCommand::AttachList);
        assert_eq!(
            parse_slash("/team attach team-123 --claim").expect("parse"),
            SlashCommand::Attach { team_id: "team-123".into(), claim: true }
        );
    }

    #[test]
    fn rejects_dm_without_message() {
        assert_eq!(parse_slash("/team dm nova"), Err(SlashError::MissingArgument("message")));
    }

    #[test]
    fn non_team_command_is_rejected() {
        assert_eq!(parse_slash("/help"), Err(SlashError::NotATeamCommand));
    }

    #[test]
    fn task_add_dispatches_as_delegate() {
        let (action, params) = SlashCommand::TaskAdd { text: "do it".into() }.into_dispatch().expect("some");
        assert_eq!(action, Action::Delegate);
        assert_eq!(params.tasks, Some(vec!["do it".to_string()]));
    }

    #[test]
    fn attach_has_no_action_dispatch() {
        assert!(SlashCommand::AttachList.into_dispatch().is_none());
    }
}
