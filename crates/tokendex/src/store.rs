//! The dual-map index store.
//!
//! `forward` (file → tokens) exists so a file's postings can be withdrawn or
//! diffed without re-reading the file; `inverted` (token → files) answers
//! queries. The two maps are kept mutually consistent by construction: every
//! mutation goes through [`TokenStore::insert_tokens`],
//! [`TokenStore::replace_tokens`] or [`TokenStore::remove_file`], each of
//! which updates both sides before returning.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Dense identity of a canonical path. Assigned once, never reused; a file
/// keeps its id across removal and recreation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u32);

impl FileId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct TokenStore {
    next_id: u32,
    id_of: HashMap<PathBuf, FileId>,
    path_of: HashMap<FileId, PathBuf>,
    forward: HashMap<FileId, HashSet<String>>,
    inverted: HashMap<String, HashSet<FileId>>,
}

impl TokenStore {
    /// Returns the id for `path`, allocating one on first sight.
    pub fn file_id(&mut self, path: &Path) -> FileId {
        if let Some(&id) = self.id_of.get(path) {
            return id;
        }
        let id = FileId(self.next_id);
        self.next_id += 1;
        self.id_of.insert(path.to_path_buf(), id);
        self.path_of.insert(id, path.to_path_buf());
        id
    }

    /// Returns the id for `path` if one was ever allocated.
    pub fn lookup_id(&self, path: &Path) -> Option<FileId> {
        self.id_of.get(path).copied()
    }

    /// True when the file currently has postings in the index.
    pub fn is_indexed(&self, id: FileId) -> bool {
        self.forward.contains_key(&id)
    }

    /// Installs the token set for a newly indexed file.
    ///
    /// Falls back to the reindex diff when postings already exist, so a
    /// repeated add cannot leak stale inverted entries.
    pub fn insert_tokens(&mut self, id: FileId, tokens: HashSet<String>) {
        if self.forward.contains_key(&id) {
            return self.replace_tokens(id, tokens);
        }
        for token in &tokens {
            self.inverted.entry(token.clone()).or_default().insert(id);
        }
        self.forward.insert(id, tokens);
    }

    /// Swaps the file's token set for `new`, touching only the difference.
    pub fn replace_tokens(&mut self, id: FileId, new: HashSet<String>) {
        let old = self.forward.remove(&id).unwrap_or_default();
        for token in old.difference(&new) {
            Self::drop_posting(&mut self.inverted, token, id);
        }
        for token in new.iter() {
            if !old.contains(token) {
                self.inverted.entry(token.clone()).or_default().insert(id);
            }
        }
        self.forward.insert(id, new);
    }

    /// Withdraws the file's postings. The id and path mapping survive so a
    /// recreated file resolves to the same identity.
    pub fn remove_file(&mut self, path: &Path) {
        let Some(&id) = self.id_of.get(path) else {
            return;
        };
        let Some(tokens) = self.forward.remove(&id) else {
            return;
        };
        for token in &tokens {
            Self::drop_posting(&mut self.inverted, token, id);
        }
    }

    /// Returns the set of files containing `token`.
    pub fn lookup(&self, token: &str) -> HashSet<PathBuf> {
        let Some(ids) = self.inverted.get(token) else {
            return HashSet::new();
        };
        ids.iter()
            .filter_map(|id| {
                debug_assert!(self.path_of.contains_key(id));
                self.path_of.get(id).cloned()
            })
            .collect()
    }

    /// Number of files that currently have postings.
    pub fn indexed_files(&self) -> usize {
        self.forward.len()
    }

    fn drop_posting(inverted: &mut HashMap<String, HashSet<FileId>>, token: &str, id: FileId) {
        if let Some(ids) = inverted.get_mut(token) {
            ids.remove(&id);
            if ids.is_empty() {
                inverted.remove(token);
            }
        }
    }
}
