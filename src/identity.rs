/// Identity file: records the supervisor's PID as `zerotier.pid` under the home directory.
///
/// The record exists only for external introspection (e.g. `kill $(cat zerotier.pid)`),
/// so every failure here is logged and absorbed instead of interrupting startup or shutdown.
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the identity record, relative to the home directory.
pub const IDENTITY_FILE_NAME: &str = "zerotier.pid";

/// A `{ process_id, path }` pair describing the on-disk record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub process_id: u32,
    pub path: PathBuf,
}

/// Writes and removes the identity record for one home directory.
#[derive(Debug, Clone)]
pub struct IdentityFile {
    path: PathBuf,
}

impl IdentityFile {
    /// Identity file living directly under `base_path`.
    pub fn new(base_path: &Path) -> Self {
        Self {
            path: base_path.join(IDENTITY_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record `process_id`, overwriting any previous record. Never fails.
    pub fn write(&self, process_id: u32) -> Option<ProcessIdentity> {
        match self.try_write(process_id) {
            Ok(identity) => {
                tracing::debug!(pid = process_id, path = %self.path.display(), "identity recorded");
                Some(identity)
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to record process identity");
                None
            }
        }
    }

    /// Atomically write the decimal PID.
    ///
    /// The content goes to a temp file in the same directory first, then is persisted
    /// over the target so readers never see a half-written id. The temp file is created
    /// owner read/write only and keeps those permissions after the rename.
    pub fn try_write(&self, process_id: u32) -> Result<ProcessIdentity, IdentityError> {
        let dir = self.path.parent().unwrap_or(Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| IdentityError::Write {
            path: dir.to_path_buf(),
            source: e,
        })?;
        tmp.write_all(process_id.to_string().as_bytes())
            .map_err(|e| IdentityError::Write {
                path: tmp.path().to_path_buf(),
                source: e,
            })?;

        tmp.persist(&self.path).map_err(|e| IdentityError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        Ok(ProcessIdentity {
            process_id,
            path: self.path.clone(),
        })
    }

    /// Delete the record. A missing file is fine; anything else is only logged.
    pub fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "identity removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::debug!(error = %e, path = %self.path.display(), "failed to remove identity")
            }
        }
    }
}

/// Errors from identity file operations.
#[derive(Debug)]
pub enum IdentityError {
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::Write { path, source } => {
                write!(f, "failed to write identity file in {}: {source}", path.display())
            }
            IdentityError::Persist { path, source } => {
                write!(f, "failed to persist identity file {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for IdentityError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IdentityError::Write { source, .. } => Some(source),
            IdentityError::Persist { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    #[test]
    fn test_identity_path_is_under_base() {
        let file = IdentityFile::new(Path::new("/tmp/svc"));
        assert_eq!(file.path(), Path::new("/tmp/svc/zerotier.pid"));
    }

    #[test]
    fn test_write_records_decimal_pid() {
        let dir = tempdir().unwrap();
        let file = IdentityFile::new(dir.path());

        let identity = file.write(4242).unwrap();
        assert_eq!(identity.process_id, 4242);
        assert_eq!(identity.path, dir.path().join("zerotier.pid"));

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(contents, "4242");
    }

    #[test]
    fn test_write_truncates_previous_record() {
        let dir = tempdir().unwrap();
        let file = IdentityFile::new(dir.path());
        std::fs::write(file.path(), "123456789 stale junk").unwrap();

        file.write(7).unwrap();
        assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "7");
    }

    #[test]
    fn test_write_is_owner_read_write() {
        let dir = tempdir().unwrap();
        let file = IdentityFile::new(dir.path());
        file.write(1).unwrap();

        let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o600, 0o600);
        assert_eq!(mode & 0o077, 0);
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let file = IdentityFile::new(dir.path());
        file.write(99).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_to_missing_dir_is_swallowed() {
        let file = IdentityFile::new(Path::new("/nonexistent/dir/for/identity"));
        assert!(file.write(1).is_none());
        assert!(matches!(file.try_write(1), Err(IdentityError::Write { .. })));
    }

    #[test]
    fn test_remove_deletes_record() {
        let dir = tempdir().unwrap();
        let file = IdentityFile::new(dir.path());
        file.write(5).unwrap();
        assert!(file.path().exists());

        file.remove();
        assert!(!file.path().exists());
    }

    #[test]
    fn test_remove_absent_record_is_idempotent() {
        let dir = tempdir().unwrap();
        let file = IdentityFile::new(dir.path());
        file.remove();
        file.remove();
        assert!(!file.path().exists());
    }

    #[test]
    fn test_identity_error_display() {
        let err = IdentityError::Persist {
            path: PathBuf::from("/tmp/svc/zerotier.pid"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no perms"),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to persist identity file"));
        assert!(msg.contains("no perms"));
    }
}
