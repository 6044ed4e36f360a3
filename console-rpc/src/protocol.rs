//! The NDJSON line protocol spoken over a teammate child process's stdio
//! (§6.3). Distinct from `teamctl_protocol::Envelope`, which describes
//! mailbox-delivered messages between persisted workers, not the live
//! wire format of a running RPC child.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One outbound request. Serializes as `{"id": .., "type": "prompt", ...}`
/// per §6.3 — the command name itself is the `type` tag.
#[derive(Debug, Clone, Serialize)]
pub struct RequestLine {
    pub id: u64,
    #[serde(flatten)]
    pub command: RpcCommand,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RpcCommand {
    Prompt { text: String },
    Steer { text: String },
    FollowUp { text: String },
    Abort,
    GetState,
    SetSessionName { name: String },
}

impl RpcCommand {
    pub fn name(&self) -> &'static str {
        match self {
            RpcCommand::Prompt { .. } => "prompt",
            RpcCommand::Steer { .. } => "steer",
            RpcCommand::FollowUp { .. } => "follow_up",
            RpcCommand::Abort => "abort",
            RpcCommand::GetState => "get_state",
            RpcCommand::SetSessionName { .. } => "set_session_name",
        }
    }
}

/// One inbound response: `{"id": .., "type": "response", "command": ..,
/// "success": bool, "data"?: .., "error"?: ..}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseLine {
    pub id: u64,
    pub command: String,
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One inbound event: any object carrying a string `type` that isn't
/// `"response"`. Events carry whatever shape the teammate process chooses;
/// this crate only interprets the handful listed in §4.G
/// (`agent_start`, `agent_end`, `message_update`) and passes the rest
/// through untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, Value>,
}

impl RpcEvent {
    pub fn text_delta(&self) -> Option<&str> {
        self.fields.get("text").and_then(Value::as_str)
    }
}

/// One parsed inbound line. Lines that are not valid JSON, or are JSON but
/// carry neither a response envelope nor a string `type`, parse to `None`
/// and are discarded silently per §6.3.
#[derive(Debug, Clone)]
pub enum InboundLine {
    Response(ResponseLine),
    Event(RpcEvent),
}

pub fn parse_inbound_line(line: &str) -> Option<InboundLine> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let obj = value.as_object()?;
    let ty = obj.get("type").and_then(Value::as_str)?;

    if ty == "response" {
        let response: ResponseLine = serde_json::from_value(value).ok()?;
        return Some(InboundLine::Response(response));
    }

    let event: RpcEvent = serde_json::from_value(value).ok()?;
    Some(InboundLine::Event(event))
}
