//! Write-to-temp-then-rename JSON persistence, shared by every crate that
//! owns an on-disk file mutated under a lock (the attach claim, the task
//! store, the team config store). Centralizing this avoids four copies of
//! the same atomicity trick.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SessionError;

/// Serializes `value` and writes it to `path` atomically: write to
/// `path.tmp`, fsync, then `rename` over the destination. A reader racing
/// this write observes either the old file in full or the new one, never a
/// torn write.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| SessionError::Io(e.to_string()))?;
    }
    let tmp_path = path.with_extension(match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{ext}.tmp"),
        None => "tmp".to_string(),
    });
    let json =
        serde_json::to_string_pretty(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
    {
        let file = std::fs::File::create(&tmp_path).map_err(|e| SessionError::Io(e.to_string()))?;
        use std::io::Write;
        let mut file = file;
        file.write_all(json.as_bytes())
            .map_err(|e| SessionError::Io(e.to_string()))?;
        file.sync_all().map_err(|e| SessionError::Io(e.to_string()))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| SessionError::Io(e.to_string()))?;
    Ok(())
}

/// Reads and deserializes `path`, or returns `Ok(None)` if it doesn't
/// exist. Any other I/O or parse error is propagated.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, SessionError> {
    match std::fs::read_to_string(path) {
        Ok(data) => {
            let value =
                serde_json::from_str(&data).map_err(|e| SessionError::Serialization(e.to_string()))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SessionError::Io(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn round_trips_through_rename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("sample.json");

        atomic_write_json(&path, &Sample { value: 1 }).expect("write");
        let loaded: Option<Sample> = read_json_opt(&path).expect("read");
        assert_eq!(loaded, Some(Sample { value: 1 }));

        atomic_write_json(&path, &Sample { value: 2 }).expect("overwrite");
        let loaded: Option<Sample> = read_json_opt(&path).expect("read again");
        assert_eq!(loaded, Some(Sample { value: 2 }));

        // No leftover temp file.
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.json");
        let loaded: Option<Sample> = read_json_opt(&path).expect("read missing");
        assert_eq!(loaded, None);
    }
}
