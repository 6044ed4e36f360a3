//! JSON-schema builder for the single `teams` tool (§4.I) exposed to the
//! leader's LLM turn. Mirrors the host runtime's `ToolSpec::Function`
//! shape so the coordinator can hand the result straight to the tool
//! registry without depending on the runtime crate.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Subset of JSON Schema used by the Responses API tool definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonSchema {
    Boolean {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    String {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
        enum_values: Option<Vec<String>>,
    },
    #[serde(alias = "integer")]
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Array {
        items: Box<JsonSchema>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Object {
        properties: BTreeMap<String, JsonSchema>,
        #[serde(skip_serializing_if = "Option::is_none")]
        required: Option<Vec<String>>,
        #[serde(
            rename = "additionalProperties",
            skip_serializing_if = "Option::is_none"
        )]
        additional_properties: Option<AdditionalProperties>,
    },
}

/// Whether additional properties are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Boolean(bool),
    Schema(Box<JsonSchema>),
}

impl From<bool> for AdditionalProperties {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

/// A single function-type tool definition (Responses API shape).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponsesApiTool {
    pub name: String,
    pub description: String,
    pub strict: bool,
    pub parameters: JsonSchema,
}

/// Tool specification wrapper tagged with `"type": "function"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ToolSpec {
    #[serde(rename = "function")]
    Function(ResponsesApiTool),
}

fn string_param(desc: &str) -> JsonSchema {
    JsonSchema::String {
        description: Some(desc.to_string()),
        enum_values: None,
    }
}

fn enum_param(desc: &str, values: &[&str]) -> JsonSchema {
    JsonSchema::String {
        description: Some(desc.to_string()),
        enum_values: Some(values.iter().map(|s| s.to_string()).collect()),
    }
}

fn string_array_param(desc: &str) -> JsonSchema {
    JsonSchema::Array {
        items: Box::new(string_param("")),
        description: Some(desc.to_string()),
    }
}

fn number_param(desc: &str) -> JsonSchema {
    JsonSchema::Number {
        description: Some(desc.to_string()),
    }
}

fn make_tool(
    name: &str,
    description: &str,
    properties: BTreeMap<String, JsonSchema>,
    required: Vec<&str>,
) -> ToolSpec {
    ToolSpec::Function(ResponsesApiTool {
        name: name.to_string(),
        description: description.to_string(),
        strict: false,
        parameters: JsonSchema::Object {
            properties,
            required: Some(required.into_iter().map(|s| s.to_string()).collect()),
            additional_properties: Some(false.into()),
        },
    })
}

/// Every action the `teams` tool dispatches on (§4.I). Kept in one place
/// so the schema, the coordinator's switch, and tests can't drift apart.
pub const TEAM_TOOL_ACTIONS: &[&str] = &[
    "delegate",
    "task_assign",
    "task_unassign",
    "task_set_status",
    "task_dep_add",
    "task_dep_rm",
    "task_dep_ls",
    "message_dm",
    "message_broadcast",
    "message_steer",
    "member_spawn",
    "member_shutdown",
    "member_kill",
    "member_prune",
    "plan_approve",
    "plan_reject",
    "hooks_policy_get",
    "hooks_policy_set",
];

/// Builds the single `teams` function tool. Every action shares one flat
/// parameter object; the coordinator validates which fields an action
/// actually requires (the schema can't express "required iff action=X"
/// without a `oneOf`, which the host runtime's subset doesn't model).
pub fn build_teams_tool() -> ToolSpec {
    let mut props = BTreeMap::new();
    props.insert(
        "action".to_string(),
        enum_param("Which team operation to perform.", TEAM_TOOL_ACTIONS),
    );
    props.insert("name".to_string(), string_param("Member name."));
    props.insert("task_id".to_string(), string_param("Task id."));
    props.insert("dep_id".to_string(), string_param("Dependency task id."));
    props.insert(
        "status".to_string(),
        enum_param("Target task status.", &["pending", "in_progress", "completed"]),
    );
    props.insert("text".to_string(), string_param("Message body or task text."));
    props.insert(
        "tasks".to_string(),
        string_array_param("Task descriptions for a `delegate` call, one per new task."),
    );
    props.insert("assignee".to_string(), string_param("Task owner name."));
    props.insert(
        "request_id".to_string(),
        string_param("Pending request id being resolved (shutdown/plan approval)."),
    );
    props.insert("reason".to_string(), string_param("Reason, surfaced to the affected member."));
    props.insert("feedback".to_string(), string_param("Plan rejection feedback."));
    props.insert(
        "mode".to_string(),
        enum_param("Teammate context initialization.", &["fresh", "branch"]),
    );
    props.insert(
        "workspace_mode".to_string(),
        enum_param("Teammate workspace isolation.", &["shared", "worktree"]),
    );
    props.insert("plan_required".to_string(), JsonSchema::Boolean { description: None });
    props.insert("model".to_string(), string_param("Model override, `provider/model-id` or bare model id."));
    props.insert("thinking".to_string(), string_param("Thinking-level override."));
    props.insert("all".to_string(), JsonSchema::Boolean { description: None });
    props.insert(
        "max_reopens_per_task".to_string(),
        number_param("New `maxReopensPerTask` for `hooks_policy_set`."),
    );
    props.insert(
        "failure_action".to_string(),
        enum_param(
            "New `failureAction` for `hooks_policy_set`.",
            &["warn", "followup", "reopen", "reopen_followup"],
        ),
    );
    props.insert(
        "followup_owner".to_string(),
        enum_param("New `followupOwner` for `hooks_policy_set`.", &["member", "lead", "none"]),
    );
    props.insert("reset".to_string(), JsonSchema::Boolean { description: None });

    make_tool(
        "teams",
        "Coordinate the team of autonomous coding agents: delegate work, manage task dependencies, message teammates, spawn/shutdown/kill workers, resolve plan approvals, and read/write the hook failure policy.",
        props,
        vec!["action"],
    )
}

/// All tool specs the coordinator registers. A single-element vec today,
/// kept plural so the registration call site doesn't need to special-case
/// a lone tool versus a future second one.
pub fn all_team_tool_specs() -> Vec<ToolSpec> {
    vec![build_teams_tool()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teams_tool_requires_action_only() {
        let ToolSpec::Function(tool) = build_teams_tool();
        assert_eq!(tool.name, "teams");
        match tool.parameters {
            JsonSchema::Object { required, .. } => {
                assert_eq!(required, Some(vec!["action".to_string()]));
            }
            other => panic!("expected object schema, got {other:?}"),
        }
    }

    #[test]
    fn action_enum_covers_every_dispatch_variant() {
        let ToolSpec::Function(tool) = build_teams_tool();
        let JsonSchema::Object { properties, .. } = tool.parameters else {
            panic!("expected object schema");
        };
        let JsonSchema::String { enum_values, .. } =
            properties.get("action").expect("action property")
        else {
            panic!("expected string schema for action");
        };
        assert_eq!(enum_values.as_deref(), Some(TEAM_TOOL_ACTIONS));
    }

    #[test]
    fn all_team_tool_specs_returns_one_tool() {
        assert_eq!(all_team_tool_specs().len(), 1);
    }
}
