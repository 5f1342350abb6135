//! The indexer controller.
//!
//! One owning container wires the pieces together: the token store and the
//! registration bookkeeping live behind a single mutex, the platform watcher
//! carries its own interior synchronization, and exactly one background
//! thread drains the event stream. Registration calls and the watcher thread
//! funnel every mutation through the same lock, so a query observes each
//! file's token set either entirely before or entirely after any change.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::error::{IndexerError, Result};
use crate::paths;
use crate::pending::CreationWatches;
use crate::store::TokenStore;
use crate::tokenize::{file_tokens, Tokenizer, WordTokenizer};
use crate::watcher::{Event, EventKind, FilesystemWatcher};
use crate::workers::WorkerGate;

/// Whether registering a directory follows its subdirectories.
///
/// Recursion only gates descending into subdirectories: new *files* appearing
/// directly inside any registered directory are always picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recursive {
    No,
    Yes,
}

#[derive(Default)]
struct IndexState {
    store: TokenStore,
    /// Paths the user explicitly registered; deletions of these re-arm a
    /// creation watch so they come back when recreated.
    added_paths: HashSet<PathBuf>,
    /// Directories whose contents are followed, with their recursion mode.
    indexed_directories: HashMap<PathBuf, Recursive>,
    creation_watches: CreationWatches,
}

struct Shared {
    state: Mutex<IndexState>,
    watcher: FilesystemWatcher,
    gate: WorkerGate,
    tokenizer: Box<dyn Tokenizer>,
    stop: AtomicBool,
    watcher_error: Mutex<Option<IndexerError>>,
}

/// Live token-to-file index over a registered set of paths.
///
/// ```no_run
/// use tokendex::{Indexer, Recursive};
///
/// let mut indexer = Indexer::new()?;
/// indexer.add_path("/var/log/syslog", Recursive::No)?;
/// for path in indexer.search("error") {
///     println!("{}", path.display());
/// }
/// indexer.close()?;
/// # Ok::<(), tokendex::IndexerError>(())
/// ```
pub struct Indexer {
    shared: Arc<Shared>,
    watcher_thread: Option<JoinHandle<()>>,
}

impl Indexer {
    /// Creates an indexer with the default word tokenizer.
    pub fn new() -> Result<Self> {
        Self::with_tokenizer(Box::new(WordTokenizer::default()))
    }

    /// Creates an indexer with a custom tokenization strategy.
    pub fn with_tokenizer(tokenizer: Box<dyn Tokenizer>) -> Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(IndexState::default()),
            watcher: FilesystemWatcher::new()?,
            gate: WorkerGate::new(default_parallelism()),
            tokenizer,
            stop: AtomicBool::new(false),
            watcher_error: Mutex::new(None),
        });

        let thread_shared = Arc::clone(&shared);
        let watcher_thread = thread::Builder::new()
            .name("tokendex-watcher".to_string())
            .spawn(move || watch_filesystem(&thread_shared))?;

        Ok(Self {
            shared,
            watcher_thread: Some(watcher_thread),
        })
    }

    /// Registers a path for indexing.
    ///
    /// The path does not have to exist yet: a missing path is parked and
    /// indexed as soon as it (and any missing ancestors) appear. Returns
    /// after every file read triggered by this call has landed in the index.
    pub fn add_path(&self, path: impl AsRef<Path>, recursive: Recursive) -> Result<()> {
        let path = path.as_ref();
        if paths::contains_nul(path) {
            return Err(IndexerError::InvalidPath {
                path: path.to_path_buf(),
            });
        }
        let canonical = paths::canonicalize_lenient(path);
        add_path_inner(&self.shared, canonical, recursive);
        Ok(())
    }

    /// Returns the canonical paths of all indexed files containing `token`.
    pub fn search(&self, token: &str) -> HashSet<PathBuf> {
        lock(&self.shared.state).store.lookup(token)
    }

    /// Stops the watcher thread and releases the OS notification handles.
    ///
    /// Idempotent. Reports an error the watcher thread died on, if any.
    pub fn close(&mut self) -> Result<()> {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.watcher_thread.take() {
            let _ = handle.join();
        }
        match lock(&self.shared.watcher_error).take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Drop for Indexer {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            tracing::warn!("indexer shutdown error={}", error);
        }
    }
}

fn default_parallelism() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Registration entry point shared by the public API and event dispatch.
/// `path` must already be canonical.
fn add_path_inner(shared: &Arc<Shared>, path: PathBuf, recursive: Recursive) {
    lock(&shared.state).added_paths.insert(path.clone());

    if !path.exists() {
        if recursive == Recursive::Yes {
            // remember the mode so the eventual creation registers recursively
            lock(&shared.state)
                .indexed_directories
                .insert(path.clone(), Recursive::Yes);
        }
        await_creation(shared, &path);
    } else if path.is_dir() {
        add_directory(shared, &path, recursive);
    } else {
        add_file(shared, &path);
    }

    shared.gate.wait_idle(thread::current().id());
}

fn add_directory(shared: &Arc<Shared>, path: &Path, recursive: Recursive) {
    {
        let mut state = lock(&shared.state);
        if let Err(error) = shared.watcher.add_directory(path) {
            tracing::warn!("directory watch failed path={} error={}", path.display(), error);
        }
        // a directory once registered recursive stays recursive
        let mode = match state.indexed_directories.get(path) {
            Some(Recursive::Yes) => Recursive::Yes,
            _ => recursive,
        };
        state.indexed_directories.insert(path.to_path_buf(), mode);
    }

    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!("directory scan failed path={} error={}", path.display(), error);
            return;
        }
    };
    for entry in entries {
        let Ok(entry) = entry else { continue };
        let child = entry.path();
        if child.is_dir() {
            if recursive == Recursive::Yes {
                add_directory(shared, &child, recursive);
            }
        } else {
            add_file(shared, &child);
        }
    }
}

/// Watches `path` and hands its tokenization to a worker. The caller's
/// eventual `wait_idle` picks the worker up.
fn add_file(shared: &Arc<Shared>, path: &Path) {
    if !path.exists() {
        // deleted while we weren't looking
        return;
    }

    if let Err(error) = shared.watcher.add_file(path) {
        tracing::warn!("file watch failed path={} error={}", path.display(), error);
    }

    let parent = thread::current().id();
    shared.gate.acquire(parent);
    let worker_shared = Arc::clone(shared);
    let worker_path = path.to_path_buf();
    thread::spawn(move || {
        index_file(&worker_shared, &worker_path);
        worker_shared.gate.finish(parent);
    });
}

/// Worker body: id assignment and posting insertion run under the index
/// lock, the file read itself does not.
fn index_file(shared: &Shared, path: &Path) {
    let id = lock(&shared.state).store.file_id(path);
    let tokens = file_tokens(path, shared.tokenizer.clone_box());
    lock(&shared.state).store.insert_tokens(id, tokens);
}

fn reindex_file(shared: &Shared, path: &Path) {
    if !path.exists() {
        // deleted while we weren't looking; the deletion event follows
        return;
    }

    let mut state = lock(&shared.state);
    let Some(id) = state.store.lookup_id(path) else {
        return;
    };
    if !state.store.is_indexed(id) {
        return;
    }
    // tokenize under the lock: the swap must be atomic with respect to lookup
    let tokens = file_tokens(path, shared.tokenizer.clone_box());
    state.store.replace_tokens(id, tokens);
}

// ---------------------------------------------------------------------------
// Await-creation protocol
// ---------------------------------------------------------------------------

/// Parks a missing path: a directory watch goes on its deepest existing
/// ancestor and the remainder is recorded as pending. Each ancestor that
/// materializes re-roots the entry one level deeper until the path itself
/// appears.
fn await_creation(shared: &Arc<Shared>, path: &Path) {
    loop {
        if path.exists() {
            register_pending(shared, path);
            return;
        }

        let Some(anchor) = deepest_existing_ancestor(path) else {
            return;
        };
        let rel = paths::relative_to(&anchor, path);

        {
            let mut state = lock(&shared.state);
            let anchor_watched = state.creation_watches.is_anchor(&anchor)
                || state.indexed_directories.contains_key(&anchor);
            if !anchor_watched {
                if let Err(error) = shared.watcher.add_directory(&anchor) {
                    if !anchor.exists() {
                        // the ancestor vanished between the walk and the
                        // watch install; walk again
                        drop(state);
                        continue;
                    }
                    tracing::warn!(
                        "creation watch failed path={} error={}",
                        anchor.display(),
                        error
                    );
                }
            }
            state.creation_watches.arm(anchor.clone(), rel.clone());
        }

        // the path may have appeared before the watch landed, in which case
        // its creation event was never observable
        if path.exists() {
            let mut state = lock(&shared.state);
            let released = state.creation_watches.disarm(&anchor, &rel);
            if released && !state.indexed_directories.contains_key(&anchor) {
                shared.watcher.remove_path(&anchor);
            }
            drop(state);
            register_pending(shared, path);
        }
        return;
    }
}

/// Registers a formerly pending path, restoring its remembered recursion.
fn register_pending(shared: &Arc<Shared>, path: &Path) {
    let recursive = lock(&shared.state)
        .indexed_directories
        .get(path)
        .copied()
        .unwrap_or(Recursive::No);
    add_path_inner(shared, path.to_path_buf(), recursive);
}

fn deepest_existing_ancestor(path: &Path) -> Option<PathBuf> {
    let mut ancestor = path.parent()?;
    loop {
        if ancestor.exists() {
            return Some(ancestor.to_path_buf());
        }
        ancestor = ancestor.parent()?;
    }
}

// ---------------------------------------------------------------------------
// Watcher thread
// ---------------------------------------------------------------------------

fn watch_filesystem(shared: &Arc<Shared>) {
    while !shared.stop.load(Ordering::Relaxed) {
        let events = match shared.watcher.poll() {
            Ok(events) => events,
            Err(error) => {
                tracing::error!("filesystem watcher stopped: {error}");
                *lock(&shared.watcher_error) = Some(error);
                return;
            }
        };
        for event in events {
            handle_event(shared, event);
        }
    }
}

fn handle_event(shared: &Arc<Shared>, event: Event) {
    tracing::trace!(
        "filesystem event kind={:?} path={} dir={}",
        event.kind,
        event.path.display(),
        event.is_directory
    );
    match event.kind {
        EventKind::Modified => reindex_file(shared, &event.path),
        EventKind::Created => on_created(shared, event.path, event.is_directory),
        EventKind::Deleted => on_deleted(shared, event.path),
    }
}

/// Work queued while the state lock is held, run after it is released;
/// registration re-enters the lock and may block on tokenizer workers.
enum Followup {
    AddFile(PathBuf),
    AddDirectory(PathBuf),
    Register(PathBuf, Recursive),
    Await(PathBuf),
}

fn on_created(shared: &Arc<Shared>, path: PathBuf, is_directory: bool) {
    let Some(parent) = path.parent().map(Path::to_path_buf) else {
        return;
    };
    let Some(name) = path.file_name().map(OsStr::to_os_string) else {
        return;
    };

    let mut followups = Vec::new();
    {
        let mut state = lock(&shared.state);

        if !is_directory {
            if state.indexed_directories.contains_key(&parent) || state.added_paths.contains(&path)
            {
                followups.push(Followup::AddFile(path.clone()));
            }
        } else if state.indexed_directories.get(&parent) == Some(&Recursive::Yes) {
            followups.push(Followup::AddDirectory(path.clone()));
        }

        let dispatch = state.creation_watches.on_child_created(&parent, &name);
        if dispatch.matched {
            let recursive = state
                .indexed_directories
                .get(&path)
                .copied()
                .unwrap_or(Recursive::No);
            followups.push(Followup::Register(path.clone(), recursive));
        }
        for rel in dispatch.reroot {
            followups.push(Followup::Await(parent.join(rel)));
        }
        if dispatch.released && !state.indexed_directories.contains_key(&parent) {
            shared.watcher.remove_path(&parent);
        }
    }

    for followup in followups {
        match followup {
            Followup::AddFile(path) => add_file(shared, &path),
            Followup::AddDirectory(path) => add_directory(shared, &path, Recursive::Yes),
            Followup::Register(path, recursive) => add_path_inner(shared, path, recursive),
            Followup::Await(path) => await_creation(shared, &path),
        }
    }
}

fn on_deleted(shared: &Arc<Shared>, path: PathBuf) {
    let mut awaits = Vec::new();
    {
        let mut state = lock(&shared.state);
        state.store.remove_file(&path);

        if state.added_paths.contains(&path) {
            awaits.push(path.clone());
        }
        if let Some(rels) = state.creation_watches.take(&path) {
            // the anchor directory itself disappeared; re-root its pending
            // entries further up
            shared.watcher.remove_path(&path);
            for rel in rels {
                awaits.push(path.join(rel));
            }
        }
    }
    for pending in awaits {
        await_creation(shared, &pending);
    }
}
