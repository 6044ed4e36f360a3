/// Shared persistence error. Every crate that reads or writes JSON under a
/// team directory folds its filesystem/serde failures into this type so the
/// `§7` error taxonomy has one `IoFault`-adjacent source instead of N.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for SessionError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            SessionError::NotFound(e.to_string())
        } else {
            SessionError::Io(e.to_string())
        }
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        SessionError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_io_error_maps_to_not_found_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(SessionError::from(io_err), SessionError::NotFound(_)));
    }

    #[test]
    fn other_io_error_maps_to_io_variant() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(SessionError::from(io_err), SessionError::Io(_)));
    }
}
