/// The shared §7 error taxonomy. Every crate's local error type implements
/// [`Classify`] so the coordinator can collapse heterogeneous errors into
/// one structured `{ok:false, kind, message}` result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    Timeout,
    ProcessExit,
    IoFault,
}

pub trait Classify {
    fn kind(&self) -> ErrorKind;
}

#[derive(Debug, thiserror::Error)]
pub enum TeamError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("lock error: {0}")]
    Lock(#[from] teamctl_lock::LockError),
    #[error("persistence error: {0}")]
    Persist(#[from] console_persist::SessionError),
}

pub type Result<T> = std::result::Result<T, TeamError>;

impl Classify for TeamError {
    fn kind(&self) -> ErrorKind {
        match self {
            TeamError::NotFound(_) => ErrorKind::NotFound,
            TeamError::InvalidInput(_) => ErrorKind::InvalidInput,
            TeamError::Conflict(_) => ErrorKind::Conflict,
            TeamError::Lock(_) => ErrorKind::Conflict,
            TeamError::Persist(_) => ErrorKind::IoFault,
        }
    }
}
