//! `notify`-backed watcher with canonical event translation.
//!
//! The backend's callback thread pushes raw results into a channel; the
//! single consumer drains it in batches from [`FilesystemWatcher::poll`] and
//! translates each raw event through the registry of watched paths. The
//! registry plays the role of the descriptor table in a hand-rolled inotify
//! loop: an event whose path no longer has (or never had) an entry is
//! silently dropped.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{recommended_watcher, RecommendedWatcher, RecursiveMode, Watcher};

use super::{Event, EventKind};
use crate::error::{init_reason, IndexerError, Result};

/// Upper bound on how long `poll` blocks waiting for the first event.
const POLL_TIMEOUT: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchKind {
    File,
    Directory,
}

struct Inner {
    backend: RecommendedWatcher,
    watched: HashMap<PathBuf, WatchKind>,
}

pub struct FilesystemWatcher {
    inner: Mutex<Inner>,
    raw_rx: Receiver<notify::Result<notify::Event>>,
    // Keeps the channel connected even if the backend drops its sender.
    _raw_tx: Sender<notify::Result<notify::Event>>,
}

impl FilesystemWatcher {
    pub fn new() -> Result<Self> {
        let (raw_tx, raw_rx) = unbounded();
        let callback_tx = raw_tx.clone();
        let backend = recommended_watcher(move |event: notify::Result<notify::Event>| {
            let _ = callback_tx.send(event);
        })
        .map_err(|error| IndexerError::WatcherInit {
            reason: init_reason(&error),
            source: error,
        })?;

        Ok(Self {
            inner: Mutex::new(Inner {
                backend,
                watched: HashMap::new(),
            }),
            raw_rx,
            _raw_tx: raw_tx,
        })
    }

    /// Watches a file for modification and deletion.
    pub fn add_file(&self, path: &Path) -> Result<()> {
        self.add_watch(path, WatchKind::File)
    }

    /// Watches a directory for new children and its own deletion.
    pub fn add_directory(&self, path: &Path) -> Result<()> {
        self.add_watch(path, WatchKind::Directory)
    }

    fn add_watch(&self, path: &Path, kind: WatchKind) -> Result<()> {
        let mut inner = lock(&self.inner);
        if inner.watched.contains_key(path) {
            return Ok(());
        }
        inner
            .backend
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|error| watch_error(path, error))?;
        inner.watched.insert(path.to_path_buf(), kind);
        Ok(())
    }

    /// Stops watching `path`; unknown paths are a no-op.
    pub fn remove_path(&self, path: &Path) {
        let mut inner = lock(&self.inner);
        if inner.watched.remove(path).is_some() {
            // the kernel watch usually died with the path; a failure here
            // means exactly that
            let _ = inner.backend.unwatch(path);
        }
    }

    /// Returns all canonical events accumulated since the previous call,
    /// blocking a few milliseconds at most for the first one.
    pub fn poll(&self) -> Result<Vec<Event>> {
        let mut raw = Vec::new();
        match self.raw_rx.recv_timeout(POLL_TIMEOUT) {
            Ok(event) => raw.push(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return Ok(Vec::new())
            }
        }
        while let Ok(event) = self.raw_rx.try_recv() {
            raw.push(event);
        }

        let mut inner = lock(&self.inner);
        let mut events = Vec::new();
        for result in raw {
            let event = result.map_err(|error| IndexerError::WatcherRead {
                message: error.to_string(),
            })?;
            inner.translate(event, &mut events);
        }
        // overlapping file and parent-directory watches can double-report
        events.dedup();
        Ok(events)
    }
}

impl Inner {
    fn translate(&mut self, raw: notify::Event, out: &mut Vec<Event>) {
        match raw.kind {
            notify::EventKind::Create(kind) => {
                for path in &raw.paths {
                    self.child_created(path, kind == CreateKind::Folder, out);
                }
            }
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                for path in &raw.paths {
                    self.path_gone(path, out);
                }
            }
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                for path in &raw.paths {
                    self.child_created(path, false, out);
                }
            }
            notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                // paths arrive as [from, to]
                let mut paths = raw.paths.iter();
                if let Some(from) = paths.next() {
                    self.path_gone(from, out);
                }
                if let Some(to) = paths.next() {
                    self.child_created(to, false, out);
                }
            }
            notify::EventKind::Modify(ModifyKind::Name(_)) => {
                // a watched path moved away without a visible target
                for path in &raw.paths {
                    self.path_gone(path, out);
                }
            }
            notify::EventKind::Modify(ModifyKind::Metadata(_)) => {}
            notify::EventKind::Modify(_) => {
                for path in &raw.paths {
                    self.content_modified(path, out);
                }
            }
            notify::EventKind::Remove(_) => {
                for path in &raw.paths {
                    self.path_gone(path, out);
                }
            }
            notify::EventKind::Access(_) | notify::EventKind::Any | notify::EventKind::Other => {}
        }
    }

    fn child_created(&mut self, path: &Path, folder_hint: bool, out: &mut Vec<Event>) {
        let Some(parent) = path.parent() else {
            return;
        };
        if self.watched.get(parent) != Some(&WatchKind::Directory) {
            return;
        }
        out.push(Event {
            kind: EventKind::Created,
            path: path.to_path_buf(),
            is_directory: folder_hint || path.is_dir(),
        });
    }

    fn content_modified(&mut self, path: &Path, out: &mut Vec<Event>) {
        if self.watched.get(path) == Some(&WatchKind::File) {
            out.push(Event {
                kind: EventKind::Modified,
                path: path.to_path_buf(),
                is_directory: false,
            });
        }
    }

    fn path_gone(&mut self, path: &Path, out: &mut Vec<Event>) {
        let Some(kind) = self.watched.remove(path) else {
            return;
        };
        let _ = self.backend.unwatch(path);
        out.push(Event {
            kind: EventKind::Deleted,
            path: path.to_path_buf(),
            is_directory: kind == WatchKind::Directory,
        });
    }
}

fn watch_error(path: &Path, error: notify::Error) -> IndexerError {
    let source = match error {
        notify::Error {
            kind: notify::ErrorKind::Io(io_error),
            ..
        } => io_error,
        other => std::io::Error::other(other),
    };
    IndexerError::PathInaccessible {
        path: path.to_path_buf(),
        source,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
