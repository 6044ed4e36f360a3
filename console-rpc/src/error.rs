use console_team::error::{Classify, ErrorKind};

/// Errors produced by the teammate RPC layer (§6.3, §4.G, §4.H).
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("teammate '{0}' is already running")]
    AlreadyRunning(String),

    #[error("invalid teammate name: {0}")]
    InvalidName(String),

    #[error("model policy rejected override: {0}")]
    ModelPolicy(#[from] console_provider::ModelPolicyError),

    #[error("workspace provisioning failed: {0}")]
    Provision(#[from] console_provider::ProviderError),

    #[error("teammate process exited before responding")]
    ProcessExit,

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("teammate rejected request: {0}")]
    CommandFailed(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RpcError>;

impl Classify for RpcError {
    fn kind(&self) -> ErrorKind {
        match self {
            RpcError::AlreadyRunning(_) => ErrorKind::Conflict,
            RpcError::InvalidName(_) => ErrorKind::InvalidInput,
            RpcError::ModelPolicy(_) => ErrorKind::InvalidInput,
            RpcError::Provision(_) => ErrorKind::IoFault,
            RpcError::ProcessExit => ErrorKind::ProcessExit,
            RpcError::Timeout(_) => ErrorKind::Timeout,
            RpcError::CommandFailed(_) => ErrorKind::Conflict,
            RpcError::Io(_) => ErrorKind::IoFault,
        }
    }
}
