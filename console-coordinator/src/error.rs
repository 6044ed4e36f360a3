use console_team::error::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Team(#[from] console_team::TeamError),

    #[error(transparent)]
    Rpc(#[from] console_rpc::RpcError),

    #[error(transparent)]
    Mailbox(#[from] teamctl_mailbox::MailboxError),

    #[error(transparent)]
    Claim(#[from] teamctl_claim::ClaimError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;

impl Classify for CoordinatorError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoordinatorError::NotFound(_) => ErrorKind::NotFound,
            CoordinatorError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoordinatorError::Conflict(_) => ErrorKind::Conflict,
            CoordinatorError::Team(e) => e.kind(),
            CoordinatorError::Rpc(e) => e.kind(),
            CoordinatorError::Mailbox(_) => ErrorKind::IoFault,
            CoordinatorError::Claim(_) => ErrorKind::IoFault,
            CoordinatorError::Io(_) => ErrorKind::IoFault,
        }
    }
}
