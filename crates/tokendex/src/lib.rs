//! Live in-memory token-to-file inverted index.
//!
//! Callers register files and directories; the index tokenizes their
//! contents and answers "which registered files contain token T?" while a
//! background thread keeps it consistent with the filesystem: modifications
//! re-index, deletions withdraw, creations add, and registrations of
//! not-yet-existing paths take effect the moment the path materializes,
//! even when arbitrarily many of its ancestors are still missing.
//!
//! ## Architecture
//!
//! - `paths` - canonical path identity (defined for nonexistent paths)
//! - `tokenize` - pluggable line-fed tokenizers; ASCII-alphanumeric default
//! - `watcher` - canonical Created/Modified/Deleted stream over `notify`
//! - `store` - the forward/inverted map pair behind one exclusive lock
//! - `indexer` - the controller: registration, queries, the watcher thread,
//!   and the await-creation protocol for pending paths
//!
//! All mutation funnels through a single index lock; per-file tokenization
//! on registration runs on capped worker threads outside it, and each
//! registration call waits for the workers it spawned before returning.

pub mod error;
pub mod indexer;
pub mod paths;
pub mod store;
pub mod tokenize;
pub mod watcher;

mod pending;
mod workers;

// Re-export main types
pub use error::{IndexerError, Result, WatcherInitReason};
pub use indexer::{Indexer, Recursive};
pub use store::{FileId, TokenStore};
pub use tokenize::{Tokenizer, WordTokenizer};
pub use watcher::{Event, EventKind, FilesystemWatcher};
