/// Signal handling for orderly shutdown.
///
/// Terminating signals (SIGINT, SIGQUIT, SIGTERM, SIGSTOP) are forwarded into a bounded
/// queue and wake the waiter. Ignored signals (SIGUSR1, SIGUSR2, SIGPIPE, SIGHUP) get the
/// ignore disposition so they neither surface nor kill the process.
use nix::sys::signal::{self, SigHandler, Signal};
use tokio::signal::unix::SignalKind;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the delivery queue. Only the first terminating signal matters; the second
/// slot keeps a duplicate from blocking the forwarder.
pub const QUEUE_CAPACITY: usize = 2;

/// How a signal is treated by a [`SignalSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    Terminating,
    Ignored,
    Unhandled,
}

/// Two disjoint sets of signals: those that drive shutdown and those that are swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSet {
    terminating: Vec<Signal>,
    ignored: Vec<Signal>,
}

impl SignalSet {
    /// Build a set, rejecting any signal that appears on both sides.
    pub fn new(terminating: Vec<Signal>, ignored: Vec<Signal>) -> Result<Self, SignalError> {
        if let Some(&overlap) = terminating.iter().find(|s| ignored.contains(s)) {
            return Err(SignalError::Overlap { signal: overlap });
        }
        Ok(Self {
            terminating,
            ignored,
        })
    }

    /// The service's signal policy.
    pub fn service() -> Self {
        Self {
            terminating: vec![
                Signal::SIGINT,
                Signal::SIGQUIT,
                Signal::SIGTERM,
                Signal::SIGSTOP,
            ],
            ignored: vec![
                Signal::SIGUSR1,
                Signal::SIGUSR2,
                Signal::SIGPIPE,
                Signal::SIGHUP,
            ],
        }
    }

    pub fn classify(&self, sig: Signal) -> SignalClass {
        if self.terminating.contains(&sig) {
            SignalClass::Terminating
        } else if self.ignored.contains(&sig) {
            SignalClass::Ignored
        } else {
            SignalClass::Unhandled
        }
    }

    pub fn terminating(&self) -> &[Signal] {
        &self.terminating
    }

    pub fn ignored(&self) -> &[Signal] {
        &self.ignored
    }
}

/// Blocks the supervisor until a terminating signal arrives.
///
/// Each terminating signal gets its own forwarding task, the only producers into the
/// queue; [`SignalWaiter::block`] is the only consumer.
pub struct SignalWaiter {
    rx: mpsc::Receiver<Signal>,
    forwarders: Vec<JoinHandle<()>>,
}

impl SignalWaiter {
    /// Register the set with the OS. Must be called from within a tokio runtime.
    ///
    /// Registration is best-effort per signal: SIGSTOP, for one, can never be caught, so
    /// it is logged and skipped. Fails only if not a single terminating signal could be
    /// registered, since the wait would then never end.
    pub fn configure(set: &SignalSet) -> Result<Self, SignalError> {
        for &sig in set.ignored() {
            // SAFETY: SigIgn installs no handler code, so nothing can run in signal context.
            if let Err(e) = unsafe { signal::signal(sig, SigHandler::SigIgn) } {
                tracing::warn!(signal = %sig, error = %e, "failed to ignore signal");
            }
        }

        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let mut forwarders = Vec::with_capacity(set.terminating().len());

        for &sig in set.terminating() {
            let mut stream = match tokio::signal::unix::signal(SignalKind::from_raw(sig as i32)) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(signal = %sig, error = %e, "cannot listen for signal, skipping");
                    continue;
                }
            };
            let tx = tx.clone();
            forwarders.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    tracing::info!(signal = %sig, "termination signal received");
                    if tx.try_send(sig).is_err() {
                        tracing::debug!(signal = %sig, "termination already pending, dropping");
                    }
                }
            }));
        }

        if forwarders.is_empty() {
            return Err(SignalError::NothingToWaitFor);
        }

        Ok(Self { rx, forwarders })
    }

    /// Wait for the next terminating signal. No timeout.
    ///
    /// Returns `None` only if every forwarder has gone away, which happens after
    /// [`SignalWaiter::teardown`].
    pub async fn block(&mut self) -> Option<Signal> {
        self.rx.recv().await
    }

    /// Stop forwarding signals. Safe to call more than once.
    pub fn teardown(&mut self) {
        for forwarder in self.forwarders.drain(..) {
            forwarder.abort();
        }
    }
}

impl Drop for SignalWaiter {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Errors from signal registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// A signal was listed as both terminating and ignored.
    Overlap { signal: Signal },
    /// None of the terminating signals could be registered.
    NothingToWaitFor,
}

impl std::fmt::Display for SignalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalError::Overlap { signal } => {
                write!(f, "signal {signal} is both terminating and ignored")
            }
            SignalError::NothingToWaitFor => {
                write!(f, "no terminating signal could be registered")
            }
        }
    }
}

impl std::error::Error for SignalError {}
