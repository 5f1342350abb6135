//! Shared helpers for the integration suites.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::TempDir;

/// Creates a scratch directory and returns it with its canonical path
/// (queries report canonical paths, so expectations must be canonical too).
pub fn scratch() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create tempdir");
    let canonical = fs::canonicalize(dir.path()).expect("canonicalize tempdir");
    (dir, canonical)
}

pub fn write(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write file");
}

/// Lets the watcher finish servicing the current event batch, so a re-armed
/// creation watch is in place before the test recreates the path.
pub fn settle() {
    thread::sleep(Duration::from_millis(50));
}

/// Polls `condition` until it holds or a generous deadline passes. The index
/// is expected to converge within tens of milliseconds; the deadline only
/// bounds a failing test.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}
