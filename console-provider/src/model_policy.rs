//! Pure model/thinking policy resolver (§4.H). Given an optional override
//! and the leader's current provider/model, decides what a freshly
//! spawned teammate should run with — never touches the network or the
//! filesystem, so it is exhaustively unit-testable.

use serde::{Deserialize, Serialize};

/// Deprecated model id markers. A marker matches iff it appears in the
/// lowercased id and is not immediately followed by an allow-listed
/// extension suffix (e.g. `claude-sonnet-4` is deprecated unless followed
/// by `-5` or `.5`).
const DEPRECATED_MARKERS: &[(&str, &[&str])] = &[
    ("claude-sonnet-4", &["-5", ".5"]),
    ("claude-3-opus", &[]),
    ("gpt-4-", &["turbo"]),
];

fn is_deprecated(model_id: &str) -> bool {
    let lower = model_id.to_lowercase();
    for (marker, allowed_suffixes) in DEPRECATED_MARKERS {
        let Some(pos) = lower.find(marker) else {
            continue;
        };
        let after = &lower[pos + marker.len()..];
        let allowed = allowed_suffixes.iter().any(|suffix| after.starts_with(suffix));
        if !allowed {
            return true;
        }
    }
    false
}

#[derive(Debug, Clone, Default)]
pub struct ModelPolicyInput {
    pub model_override: Option<String>,
    pub leader_provider: Option<String>,
    pub leader_model_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Override,
    InheritLeader,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResolution {
    pub source: ModelSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPolicyErrorReason {
    InvalidOverride,
    DeprecatedOverride,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("model policy rejected override: {reason:?}")]
pub struct ModelPolicyError {
    pub reason: ModelPolicyErrorReason,
}

/// The concrete runtime defaults used when neither an override nor a
/// usable leader model is available.
pub const DEFAULT_PROVIDER: &str = "anthropic";
pub const DEFAULT_MODEL_ID: &str = "claude-sonnet-4-6";

/// Resolves what model a freshly spawned teammate should run with.
///
/// Rules (§4.H):
/// - `override` containing `/`: split once into provider/model id; both
///   halves must be non-empty; a deprecated model id fails.
/// - `override` with no `/`: a deprecated id fails; otherwise inherit the
///   leader's provider if known, else warn and leave it unset.
/// - No override, leader has a non-deprecated model id: inherit leader's
///   provider + model id.
/// - Otherwise: runtime defaults.
pub fn resolve_model_policy(
    input: &ModelPolicyInput,
) -> Result<ModelResolution, ModelPolicyError> {
    if let Some(raw) = input.model_override.as_deref().filter(|s| !s.is_empty()) {
        return resolve_override(raw, input.leader_provider.as_deref());
    }

    if let Some(model_id) = input.leader_model_id.as_deref() {
        if !is_deprecated(model_id) {
            return Ok(ModelResolution {
                source: ModelSource::InheritLeader,
                provider: input.leader_provider.clone(),
                model_id: Some(model_id.to_string()),
                warnings: Vec::new(),
            });
        }
    }

    Ok(ModelResolution {
        source: ModelSource::Default,
        provider: Some(DEFAULT_PROVIDER.to_string()),
        model_id: Some(DEFAULT_MODEL_ID.to_string()),
        warnings: Vec::new(),
    })
}

fn resolve_override(
    raw: &str,
    leader_provider: Option<&str>,
) -> Result<ModelResolution, ModelPolicyError> {
    if let Some((provider, model_id)) = raw.split_once('/') {
        if provider.is_empty() || model_id.is_empty() {
            return Err(ModelPolicyError {
                reason: ModelPolicyErrorReason::InvalidOverride,
            });
        }
        if is_deprecated(model_id) {
            return Err(ModelPolicyError {
                reason: ModelPolicyErrorReason::DeprecatedOverride,
            });
        }
        return Ok(ModelResolution {
            source: ModelSource::Override,
            provider: Some(provider.to_string()),
            model_id: Some(model_id.to_string()),
            warnings: Vec::new(),
        });
    }

    if is_deprecated(raw) {
        return Err(ModelPolicyError {
            reason: ModelPolicyErrorReason::DeprecatedOverride,
        });
    }

    let mut warnings = Vec::new();
    let provider = match leader_provider {
        Some(p) => Some(p.to_string()),
        None => {
            warnings.push(format!(
                "model override '{raw}' has no '/'; leader provider is unknown, leaving provider unset"
            ));
            None
        }
    };

    Ok(ModelResolution {
        source: ModelSource::Override,
        provider,
        model_id: Some(raw.to_string()),
        warnings,
    })
}
