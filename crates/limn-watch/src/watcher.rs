use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::thread;

use parking_lot::RwLock;
use tracing::{debug, info, trace, warn};

use limn_types::{
    AliasTable, DumpRow, ElementDescriptor, ElementHandle, ElementRecord, FaultCode, HistoryEntry,
    MutationKind, ParentChildRelation, PreviousSize,
};

use crate::binding::{DumpSink, FaultSubscription, SizeWatch, TreeBinding};
use crate::history::HistoryLog;
use crate::mirror::ElementMirror;
use crate::path;

/// Watcher configuration, injected at attach time.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// The one fault code that triggers a history dump; every other code is
    /// ignored by the watcher.
    pub dump_trigger: FaultCode,
    /// Alias table applied to paths at dump time.
    pub aliases: AliasTable,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            dump_trigger: FaultCode::LAYOUT_CYCLE,
            aliases: AliasTable::default(),
        }
    }
}

/// Internal classification of ingestion failures. Boundary adapters swallow
/// these (see `on_tree_mutation`); tests assert on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestError {
    /// The host reported an element it cannot materialize; the add was
    /// ignored entirely.
    UnresolvableDescriptor { handle: ElementHandle },
    /// The element vanished between the materialization check and observer
    /// arming; its record stays, but no observer is armed.
    VanishedBeforeArming { handle: ElementHandle },
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvableDescriptor { handle } => {
                write!(f, "element 0x{handle:x} has no resolvable backing element")
            }
            Self::VanishedBeforeArming { handle } => {
                write!(f, "element 0x{handle:x} vanished before observer arming")
            }
        }
    }
}

impl Error for IngestError {}

/// Everything the host callbacks mutate, under one exclusive-write lock.
struct WatcherShared {
    mirror: ElementMirror,
    history: HistoryLog,
    watches: HashMap<ElementHandle, SizeWatch>,
}

/// Mirrors the host's element tree and records resize history for fault
/// dumps.
///
/// One watcher per attached target. Feed callbacks, size-change signals,
/// and fault notifications may arrive concurrently on host threads;
/// everything shared sits behind `shared`. Critical sections cover map and
/// deque work only — calls out to the binding or the sink always happen
/// with the lock released.
pub struct TreeWatcher {
    shared: RwLock<WatcherShared>,
    binding: Arc<dyn TreeBinding>,
    sink: Arc<dyn DumpSink>,
    fault_subscription: FaultSubscription,
    config: WatcherConfig,
}

impl TreeWatcher {
    /// Attaches a watcher to the host behind `binding`.
    ///
    /// Mutation ingestion begins asynchronously: the feed subscription runs
    /// on its own worker thread, and nothing orders its completion against
    /// this constructor returning. Mutations delivered before the
    /// subscription lands are missed.
    pub fn attach(
        binding: Arc<dyn TreeBinding>,
        sink: Arc<dyn DumpSink>,
        fault_subscription: FaultSubscription,
        config: WatcherConfig,
    ) -> Arc<Self> {
        let watcher = Arc::new(Self {
            shared: RwLock::new(WatcherShared {
                mirror: ElementMirror::new(),
                history: HistoryLog::new(),
                watches: HashMap::new(),
            }),
            binding: Arc::clone(&binding),
            sink,
            fault_subscription,
            config,
        });

        let events = Arc::downgrade(&watcher);
        let spawned = thread::Builder::new()
            .name("limn-advise".to_string())
            .spawn(move || match binding.advise(events) {
                Ok(()) => info!("tree mutation feed subscribed"),
                Err(err) => warn!(%err, "tree mutation feed subscription failed"),
            });
        if let Err(err) = spawned {
            warn!(%err, "could not spawn feed subscription worker");
        }

        watcher
    }

    // ── Feed boundary ────────────────────────────────────────
    //
    // The host stops delivering mutations to a callback that reports
    // failure, so these adapters never do: internal errors are logged and
    // dropped.

    /// Feed callback for add/remove mutations.
    pub fn on_tree_mutation(
        &self,
        relation: ParentChildRelation,
        kind: MutationKind,
        descriptor: &ElementDescriptor,
    ) {
        trace!(
            parent = ?relation.parent.map(|p| p.get()),
            child = relation.child.get(),
            child_index = relation.child_index,
            ?kind,
            type_name = %descriptor.type_name,
            "tree mutation"
        );

        match kind {
            MutationKind::Add => {
                if let Err(err) = self.ingest_add(relation, descriptor) {
                    debug!(%err, "add mutation ignored");
                }
            }
            MutationKind::Remove => self.ingest_remove(descriptor.handle),
        }
    }

    /// Feed callback for element state changes. The combined feed carries
    /// them; the watcher has no use for them.
    pub fn on_element_state_changed(&self, handle: ElementHandle) {
        trace!(handle = handle.get(), "element state change ignored");
    }

    /// Size-change signal for an element whose observer is armed.
    pub fn on_size_changed(&self, handle: ElementHandle, previous: PreviousSize) {
        if previous.is_initial_layout() {
            return;
        }

        let mut shared = self.shared.write();
        let resolved = path::resolve(&shared.mirror, handle);
        shared.history.record(handle, resolved);
    }

    /// Host fault notification. Reacts only to the configured trigger code.
    pub fn on_fault(&self, code: FaultCode) {
        if code != self.config.dump_trigger {
            return;
        }

        let rows = self.snapshot_history();
        info!(rows = rows.len(), "layout fault 0x{code:x}, dumping history");
        self.sink.write_dump(&rows);
    }

    // ── Outbound interface ───────────────────────────────────

    /// Resolves the current root-to-leaf path for `handle`; empty for
    /// handles the mirror does not know.
    pub fn resolve_path(&self, handle: ElementHandle) -> String {
        let shared = self.shared.read();
        path::resolve(&shared.mirror, handle)
    }

    /// Snapshots the history in order, with alias compression applied.
    ///
    /// Best-effort with respect to concurrent writers: the copy is taken
    /// under the shared lock, aliasing happens outside it.
    pub fn snapshot_history(&self) -> Vec<DumpRow> {
        let entries: Vec<HistoryEntry> = {
            let shared = self.shared.read();
            shared.history.iter().cloned().collect()
        };

        entries
            .into_iter()
            .map(|entry| DumpRow {
                path: self.config.aliases.apply(&entry.path),
                handle: entry.handle,
            })
            .collect()
    }

    // ── Ingestion ────────────────────────────────────────────

    pub(crate) fn ingest_add(
        &self,
        relation: ParentChildRelation,
        descriptor: &ElementDescriptor,
    ) -> Result<(), IngestError> {
        // Materialization probe is a host call; no locks here.
        if !self.binding.can_materialize(descriptor.handle) {
            return Err(IngestError::UnresolvableDescriptor {
                handle: descriptor.handle,
            });
        }

        let record = ElementRecord {
            parent: relation.parent,
            display: descriptor.display_token(),
            child_count: descriptor.child_count,
            child_index: relation.child_index,
        };

        {
            let mut shared = self.shared.write();
            shared.mirror.upsert(descriptor.handle, record);
        }

        // Roots are not watched for resize.
        if relation.parent.is_none() {
            return Ok(());
        }

        // Arming calls into the host; do it with the lock released, then
        // store the guard.
        let Some(watch) = self.binding.watch_size(descriptor.handle) else {
            return Err(IngestError::VanishedBeforeArming {
                handle: descriptor.handle,
            });
        };

        let stale = {
            let mut shared = self.shared.write();
            if shared.mirror.contains(descriptor.handle) {
                shared.watches.insert(descriptor.handle, watch)
            } else {
                // A concurrent remove won the race while we were arming.
                Some(watch)
            }
        };
        // Disarming also calls into the host; the lock is released here.
        drop(stale);

        Ok(())
    }

    fn ingest_remove(&self, handle: ElementHandle) {
        let watch = {
            let mut shared = self.shared.write();
            shared.mirror.remove(handle);
            shared.watches.remove(&handle)
        };
        // No-op when nothing was armed; otherwise disarms outside the lock.
        drop(watch);
    }
}

impl Drop for TreeWatcher {
    fn drop(&mut self) {
        // Take the exclusive section mutation handlers use, so teardown
        // cannot overlap an in-flight callback.
        let watches = {
            let mut shared = self.shared.write();
            std::mem::take(&mut shared.watches)
        };
        drop(watches);
        self.fault_subscription.release();
    }
}
