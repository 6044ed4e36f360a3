pub mod error;
pub mod model_policy;
pub mod provisioner;

pub use error::{ProviderError, Result};
pub use model_policy::{
    DEFAULT_MODEL_ID, DEFAULT_PROVIDER, ModelPolicyError, ModelPolicyErrorReason,
    ModelPolicyInput, ModelResolution, ModelSource, resolve_model_policy,
};
pub use provisioner::{DirectoryPerTeammateProvisioner, SharedCwdProvisioner, WorktreeProvisioner};
