//! Canonical filesystem event stream.
//!
//! The platform backend (inotify, FSEvents, ReadDirectoryChangesW, whatever
//! `notify` selects) produces raw notifications; this module reduces them to
//! three canonical event kinds dispatched against the set of explicitly
//! watched paths:
//!
//! - a watched *file* reports `Modified` on content change and `Deleted` on
//!   unlink or rename-away;
//! - a watched *directory* reports `Created` for each new direct child and
//!   `Deleted` for the directory itself;
//! - `Modified` is never reported for a directory, renames are normalized to
//!   `Deleted` + `Created`, and events for paths nobody watches are dropped.

mod backend;

use std::path::PathBuf;

pub use backend::FilesystemWatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// For `Created`, the new child's full path; otherwise the watched path.
    pub path: PathBuf,
    pub is_directory: bool,
}
