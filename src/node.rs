/// The node collaborator: anything the supervisor can start once and shut down once.
use std::path::{Path, PathBuf};

/// Lifecycle contract the supervisor drives.
///
/// `initialize` is called at most once; `shutdown` is called exactly once for every
/// handle `initialize` returned, and is expected to always return.
pub trait Node {
    type Handle;

    fn initialize(&mut self, base_path: &Path) -> Result<Self::Handle, NodeError>;

    fn shutdown(&mut self, handle: Self::Handle);
}

/// Why a node failed to start.
#[derive(Debug)]
pub struct NodeError {
    message: String,
    source: Option<std::io::Error>,
}

impl NodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Peer state directory under the home directory.
pub const PEERS_DIR: &str = "peers.d";

/// In-process node owning a home directory.
///
/// Initialization prepares the home directory and its peer state directory; the
/// networking stack itself lives outside this crate.
#[derive(Debug, Default)]
pub struct LocalNode;

/// Handle to a started [`LocalNode`].
#[derive(Debug)]
pub struct LocalNodeHandle {
    home: PathBuf,
}

impl LocalNodeHandle {
    pub fn home(&self) -> &Path {
        &self.home
    }
}

impl Node for LocalNode {
    type Handle = LocalNodeHandle;

    fn initialize(&mut self, base_path: &Path) -> Result<LocalNodeHandle, NodeError> {
        std::fs::create_dir_all(base_path).map_err(|e| {
            NodeError::io(
                format!("cannot create home directory {}", base_path.display()),
                e,
            )
        })?;

        let metadata = std::fs::metadata(base_path).map_err(|e| {
            NodeError::io(format!("cannot stat home directory {}", base_path.display()), e)
        })?;
        if metadata.permissions().readonly() {
            return Err(NodeError::new(format!(
                "home directory {} is read-only",
                base_path.display()
            )));
        }

        let peers = base_path.join(PEERS_DIR);
        std::fs::create_dir_all(&peers).map_err(|e| {
            NodeError::io(format!("cannot create peer state directory {}", peers.display()), e)
        })?;

        tracing::info!(home = %base_path.display(), "node initialized");
        Ok(LocalNodeHandle {
            home: base_path.to_path_buf(),
        })
    }

    fn shutdown(&mut self, handle: LocalNodeHandle) {
        tracing::info!(home = %handle.home.display(), "node shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_initialize_creates_home_and_peers_dir() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("svc");

        let mut node = LocalNode;
        let handle = node.initialize(&home).unwrap();

        assert_eq!(handle.home(), home.as_path());
        assert!(home.is_dir());
        assert!(home.join(PEERS_DIR).is_dir());

        node.shutdown(handle);
    }

    #[test]
    fn test_initialize_existing_home_is_ok() {
        let tmp = tempdir().unwrap();
        let mut node = LocalNode;
        let first = node.initialize(tmp.path()).unwrap();
        node.shutdown(first);
        let second = node.initialize(tmp.path()).unwrap();
        node.shutdown(second);
    }

    #[test]
    fn test_initialize_home_under_regular_file_fails() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let err = LocalNode.initialize(&blocker.join("svc")).unwrap_err();
        assert!(err.to_string().contains("cannot create home directory"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_initialize_home_that_is_a_file_fails() {
        let tmp = tempdir().unwrap();
        let file = tmp.path().join("home");
        std::fs::write(&file, "x").unwrap();

        let err = LocalNode.initialize(&file).unwrap_err();
        let expected = format!("cannot create home directory {}: ", file.display());
        assert!(err.to_string().starts_with(&expected), "{err}");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_initialize_read_only_home_fails() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempdir().unwrap();
        let home = tmp.path().join("ro");
        std::fs::create_dir(&home).unwrap();
        std::fs::set_permissions(&home, std::fs::Permissions::from_mode(0o555)).unwrap();

        let err = LocalNode.initialize(&home).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("home directory {} is read-only", home.display())
        );
        assert!(!home.join(PEERS_DIR).exists());

        std::fs::set_permissions(&home, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_node_error_display_without_source() {
        let err = NodeError::new("disk full");
        assert_eq!(err.to_string(), "disk full");
        assert!(std::error::Error::source(&err).is_none());
    }
}
