//! Node lifecycle: start the node, wait for a termination signal, shut it down.
//!
//! ```text
//! Created ──initialize ok──▶ Running ──signal──▶ ShuttingDown ──▶ Terminated
//!    └──────initialize failed──────────────────────────────────────▲
//! ```
//!
//! The identity record is written before the node starts and removed on every exit
//! path. Identity I/O is best-effort and never changes the sequence.
use crate::identity::IdentityFile;
use crate::node::{Node, NodeError};
use crate::signals::{SignalError, SignalSet, SignalWaiter};
use nix::sys::signal::Signal;
use std::path::{Path, PathBuf};

/// Status the process exits with on every path: usage error, failed start, and
/// shutdown after a signal alike.
pub const EXIT_STATUS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Created,
    Running,
    ShuttingDown,
    Terminated,
}

/// The supervisor takes no positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageError {
    pub unexpected: Vec<String>,
}

impl std::fmt::Display for UsageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unexpected argument(s): {}",
            self.unexpected.join(" ")
        )
    }
}

impl std::error::Error for UsageError {}

pub fn validate_arguments(args: &[String]) -> Result<(), UsageError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(UsageError {
            unexpected: args.to_vec(),
        })
    }
}

/// Per-run state that would otherwise be process-global: the home directory and the
/// identity record inside it.
#[derive(Debug, Clone)]
pub struct ServiceContext {
    base_path: PathBuf,
    identity: IdentityFile,
}

impl ServiceContext {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        let identity = IdentityFile::new(&base_path);
        Self {
            base_path,
            identity,
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn identity(&self) -> &IdentityFile {
        &self.identity
    }

    /// Record this process in the home directory, creating the directory if needed.
    ///
    /// Best-effort: failures are logged and the sequence carries on.
    pub fn record_identity(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.base_path) {
            tracing::warn!(error = %e, home = %self.base_path.display(), "cannot create home directory");
        }
        self.identity.write(std::process::id());
    }

    /// Remove everything this run left on disk. Idempotent.
    pub fn teardown(&self) {
        self.identity.remove();
    }
}

/// How a run ended. Every variant maps to [`EXIT_STATUS`].
#[derive(Debug)]
pub enum RunOutcome {
    /// The node never started; nothing was waited on or shut down.
    InitFailed(NodeError),
    /// No terminating signal could be registered; the node was shut down right away.
    SignalsUnavailable(SignalError),
    /// A terminating signal arrived and the node was shut down.
    Stopped { signal: Option<Signal> },
}

/// Drives one node through its lifecycle.
pub struct Controller<N: Node> {
    node: N,
    context: ServiceContext,
    state: ServiceState,
}

impl<N: Node> Controller<N> {
    pub fn new(node: N, context: ServiceContext) -> Self {
        Self {
            node,
            context,
            state: ServiceState::Created,
        }
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    pub fn context(&self) -> &ServiceContext {
        &self.context
    }

    fn transition(&mut self, next: ServiceState) {
        tracing::debug!(from = ?self.state, to = ?next, "service state change");
        self.state = next;
    }

    /// Created → Running: record the identity, then initialize the node.
    ///
    /// On failure the identity is cleared and the controller goes straight to
    /// `Terminated`. There is no retry.
    fn start(&mut self) -> Result<N::Handle, NodeError> {
        debug_assert_eq!(self.state, ServiceState::Created);

        self.context.record_identity();
        match self.node.initialize(&self.context.base_path) {
            Ok(handle) => {
                self.transition(ServiceState::Running);
                Ok(handle)
            }
            Err(e) => {
                tracing::error!(error = %e, "node initialization failed");
                self.context.teardown();
                self.transition(ServiceState::Terminated);
                Err(e)
            }
        }
    }

    /// Running → ShuttingDown → Terminated: shut the node down, then drop the identity.
    fn stop(&mut self, handle: N::Handle) {
        debug_assert_eq!(self.state, ServiceState::Running);

        self.transition(ServiceState::ShuttingDown);
        self.node.shutdown(handle);
        self.context.teardown();
        self.transition(ServiceState::Terminated);
    }

    /// Full run: start, block until a terminating signal, stop.
    pub async fn run(mut self, signals: &SignalSet) -> RunOutcome {
        let handle = match self.start() {
            Ok(handle) => handle,
            Err(e) => return RunOutcome::InitFailed(e),
        };

        let mut waiter = match SignalWaiter::configure(signals) {
            Ok(waiter) => waiter,
            Err(e) => {
                tracing::error!(error = %e, "cannot wait for termination signals");
                self.stop(handle);
                return RunOutcome::SignalsUnavailable(e);
            }
        };

        tracing::info!(
            home = %self.context.base_path.display(),
            pid = std::process::id(),
            "awaiting termination signal"
        );
        let signal = waiter.block().await;
        waiter.teardown();

        tracing::info!(signal = ?signal, "shutting down node");
        self.stop(handle);
        RunOutcome::Stopped { signal }
    }
}
