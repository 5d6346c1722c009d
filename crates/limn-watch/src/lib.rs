//! Mirrors the visual tree of an instrumented host process.
//!
//! The host delivers add/remove mutations, per-element size-change signals,
//! and fault notifications on threads it owns; this crate keeps a shadow of
//! the parent/child relationships, resolves root-to-leaf display paths on
//! demand, and retains a bounded history of recent resizes. When the host
//! raises the configured layout fault, the history is snapshotted and handed
//! to a dump sink for postmortem inspection.

mod binding;
mod history;
mod mirror;
mod path;
mod watcher;

pub use binding::{BindingError, DumpSink, FaultSubscription, SizeWatch, TreeBinding};
pub use history::{HistoryLog, HISTORY_CAPACITY};
pub use mirror::ElementMirror;
pub use path::{resolve, MAX_ANCESTOR_DEPTH};
pub use watcher::{IngestError, TreeWatcher, WatcherConfig};
