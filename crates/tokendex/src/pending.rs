//! Tracker for registered paths that do not exist yet.
//!
//! Each entry maps an *anchor* (the deepest existing ancestor that carries a
//! directory watch) to the still-missing descendants below it, stored as
//! relative paths. As ancestors materialize one by one, pending entries are
//! re-rooted one level deeper until the registered path itself appears.

use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::paths;

/// Outcome of applying a child-creation event to the tracker.
#[derive(Debug, Default)]
pub(crate) struct CreatedDispatch {
    /// The created child was itself a pending path and should be registered.
    pub matched: bool,
    /// Deeper pending paths (relative to the anchor) whose first component
    /// just materialized; each must be re-armed under the new directory.
    pub reroot: Vec<PathBuf>,
    /// The anchor has no pending entries left and was dropped.
    pub released: bool,
}

#[derive(Debug, Default)]
pub(crate) struct CreationWatches {
    watches: HashMap<PathBuf, HashSet<PathBuf>>,
}

impl CreationWatches {
    pub fn is_anchor(&self, path: &Path) -> bool {
        self.watches.contains_key(path)
    }

    /// Records `rel` as pending below `anchor`. Returns true when this is the
    /// anchor's first pending entry.
    pub fn arm(&mut self, anchor: PathBuf, rel: PathBuf) -> bool {
        match self.watches.entry(anchor) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                entry.get_mut().insert(rel);
                false
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(HashSet::from([rel]));
                true
            }
        }
    }

    /// Withdraws one pending entry. Returns true when the anchor became empty
    /// and was dropped.
    pub fn disarm(&mut self, anchor: &Path, rel: &Path) -> bool {
        let Some(rels) = self.watches.get_mut(anchor) else {
            return false;
        };
        rels.remove(rel);
        if rels.is_empty() {
            self.watches.remove(anchor);
            true
        } else {
            false
        }
    }

    /// Applies a `Created` event for `parent/name` to the anchor `parent`.
    pub fn on_child_created(&mut self, parent: &Path, name: &OsStr) -> CreatedDispatch {
        let mut dispatch = CreatedDispatch::default();
        let Some(rels) = self.watches.get_mut(parent) else {
            return dispatch;
        };

        dispatch.matched = rels.remove(Path::new(name));

        dispatch.reroot = rels
            .iter()
            .filter(|rel| rel.components().nth(1).is_some() && paths::head(rel) == Some(name))
            .cloned()
            .collect();
        for rel in &dispatch.reroot {
            rels.remove(rel.as_path());
        }

        if rels.is_empty() {
            self.watches.remove(parent);
            dispatch.released = true;
        }
        dispatch
    }

    /// Drops the anchor entirely (its directory disappeared), returning the
    /// pending entries so they can be re-rooted further up.
    pub fn take(&mut self, anchor: &Path) -> Option<HashSet<PathBuf>> {
        self.watches.remove(anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_reports_new_anchors() {
        let mut watches = CreationWatches::default();
        assert!(watches.arm(PathBuf::from("/a"), PathBuf::from("x")));
        assert!(!watches.arm(PathBuf::from("/a"), PathBuf::from("y/z")));
        assert!(watches.is_anchor(Path::new("/a")));
    }

    #[test]
    fn exact_match_is_dispatched_and_released() {
        let mut watches = CreationWatches::default();
        watches.arm(PathBuf::from("/a"), PathBuf::from("x"));

        let dispatch = watches.on_child_created(Path::new("/a"), OsStr::new("x"));
        assert!(dispatch.matched);
        assert!(dispatch.reroot.is_empty());
        assert!(dispatch.released);
        assert!(!watches.is_anchor(Path::new("/a")));
    }

    #[test]
    fn deeper_entries_are_rerooted_not_matched() {
        let mut watches = CreationWatches::default();
        watches.arm(PathBuf::from("/a"), PathBuf::from("sub/file"));

        let dispatch = watches.on_child_created(Path::new("/a"), OsStr::new("sub"));
        assert!(!dispatch.matched);
        assert_eq!(dispatch.reroot, vec![PathBuf::from("sub/file")]);
        assert!(dispatch.released);
    }

    #[test]
    fn unrelated_children_leave_entries_in_place() {
        let mut watches = CreationWatches::default();
        watches.arm(PathBuf::from("/a"), PathBuf::from("sub/file"));

        let dispatch = watches.on_child_created(Path::new("/a"), OsStr::new("other"));
        assert!(!dispatch.matched);
        assert!(dispatch.reroot.is_empty());
        assert!(!dispatch.released);
        assert!(watches.is_anchor(Path::new("/a")));
    }

    #[test]
    fn mixed_entries_release_only_when_empty() {
        let mut watches = CreationWatches::default();
        watches.arm(PathBuf::from("/a"), PathBuf::from("x"));
        watches.arm(PathBuf::from("/a"), PathBuf::from("x/deep"));
        watches.arm(PathBuf::from("/a"), PathBuf::from("y"));

        let dispatch = watches.on_child_created(Path::new("/a"), OsStr::new("x"));
        assert!(dispatch.matched);
        assert_eq!(dispatch.reroot, vec![PathBuf::from("x/deep")]);
        assert!(!dispatch.released);

        let dispatch = watches.on_child_created(Path::new("/a"), OsStr::new("y"));
        assert!(dispatch.matched);
        assert!(dispatch.released);
    }

    #[test]
    fn take_returns_all_pending_entries() {
        let mut watches = CreationWatches::default();
        watches.arm(PathBuf::from("/a"), PathBuf::from("x"));
        watches.arm(PathBuf::from("/a"), PathBuf::from("y/z"));

        let rels = watches.take(Path::new("/a")).expect("anchor present");
        assert_eq!(rels, HashSet::from([PathBuf::from("x"), PathBuf::from("y/z")]));
        assert!(watches.take(Path::new("/a")).is_none());
    }

    #[test]
    fn disarm_drops_empty_anchors() {
        let mut watches = CreationWatches::default();
        watches.arm(PathBuf::from("/a"), PathBuf::from("x"));
        watches.arm(PathBuf::from("/a"), PathBuf::from("y"));

        assert!(!watches.disarm(Path::new("/a"), Path::new("x")));
        assert!(watches.disarm(Path::new("/a"), Path::new("y")));
        assert!(!watches.is_anchor(Path::new("/a")));
    }
}
