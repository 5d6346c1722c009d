use std::error::Error;
use std::fmt;
use std::sync::Weak;

use limn_types::{DumpRow, ElementHandle};

use crate::watcher::TreeWatcher;

/// Failure surfaced by the host binding while subscribing to the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The host rejected the feed subscription call.
    AdviseRejected { detail: String },
    /// The host process went away before or during subscription.
    HostDetached,
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdviseRejected { detail } => {
                write!(f, "host rejected tree-change subscription: {detail}")
            }
            Self::HostDetached => write!(f, "host process detached"),
        }
    }
}

impl Error for BindingError {}

/// The foreign binding that connects a watcher to its host process.
///
/// All methods are called from watcher code with no locks held; an
/// implementation may call straight into the host.
pub trait TreeBinding: Send + Sync + 'static {
    /// Performs the host-side subscription call that starts the mutation
    /// feed toward `events`. Invoked exactly once, from a dedicated worker
    /// thread: subscribing synchronously on certain host dispatch threads
    /// deadlocks the host's own callback-delivery loop.
    ///
    /// Implementations deliver feed callbacks by upgrading `events`; a
    /// failed upgrade means the watcher is gone and the callback must be
    /// discarded.
    fn advise(&self, events: Weak<TreeWatcher>) -> Result<(), BindingError>;

    /// True when the host can materialize a concrete element behind
    /// `handle`. Hosts report elements they cannot materialize; adds for
    /// those are ignored.
    fn can_materialize(&self, handle: ElementHandle) -> bool;

    /// Arms a size-change observer for `handle`, or `None` when the element
    /// vanished since it was reported. Dropping the returned watch disarms
    /// the observer.
    fn watch_size(&self, handle: ElementHandle) -> Option<SizeWatch>;
}

/// An armed size-change observer. Dropping it revokes the host-side
/// subscription.
pub struct SizeWatch {
    revoke: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl SizeWatch {
    pub fn new(revoke: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            revoke: Some(Box::new(revoke)),
        }
    }

    /// A watch with nothing to revoke, for hosts that disarm implicitly
    /// when the element is destroyed.
    pub fn untracked() -> Self {
        Self { revoke: None }
    }
}

impl Drop for SizeWatch {
    fn drop(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke();
        }
    }
}

impl fmt::Debug for SizeWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeWatch")
            .field("armed", &self.revoke.is_some())
            .finish()
    }
}

/// The watcher's registration with the host's unhandled-fault hook.
/// Released when the watcher tears down.
pub struct FaultSubscription {
    revoke: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl FaultSubscription {
    pub fn new(revoke: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            revoke: Some(Box::new(revoke)),
        }
    }

    /// A subscription with nothing to release.
    pub fn detached() -> Self {
        Self { revoke: None }
    }

    /// Releases the host-side hook now. Idempotent.
    pub(crate) fn release(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke();
        }
    }
}

impl Drop for FaultSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for FaultSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultSubscription")
            .field("held", &self.revoke.is_some())
            .finish()
    }
}

/// Receives fault dump snapshots. Implementations own persistence; the
/// watcher calls this with no locks held, from a host callback thread, so
/// a sink should not block for long.
pub trait DumpSink: Send + Sync + 'static {
    fn write_dump(&self, rows: &[DumpRow]);
}
