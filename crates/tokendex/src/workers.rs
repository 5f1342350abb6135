//! Throttle for the tokenizer worker pool.
//!
//! Registration calls spawn one short-lived worker per file so tokenization
//! happens outside the index lock. The gate caps concurrent workers at the
//! hardware parallelism and counts workers per *parent* thread, so a
//! registration call can wait for exactly the workers it spawned and no
//! others.

use std::collections::HashMap;
use std::sync::{Condvar, Mutex};
use std::thread::ThreadId;

#[derive(Debug, Default)]
struct GateState {
    active: usize,
    per_parent: HashMap<ThreadId, usize>,
}

#[derive(Debug)]
pub(crate) struct WorkerGate {
    state: Mutex<GateState>,
    sync: Condvar,
    max_workers: usize,
}

impl WorkerGate {
    pub fn new(max_workers: usize) -> Self {
        Self {
            state: Mutex::new(GateState::default()),
            sync: Condvar::new(),
            max_workers: max_workers.max(1),
        }
    }

    /// Blocks until a worker slot is free, then claims it for `parent`.
    pub fn acquire(&self, parent: ThreadId) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        while state.active >= self.max_workers {
            state = match self.sync.wait(state) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
        state.active += 1;
        *state.per_parent.entry(parent).or_insert(0) += 1;
    }

    /// Releases a slot claimed on behalf of `parent`.
    pub fn finish(&self, parent: ThreadId) {
        {
            let Ok(mut state) = self.state.lock() else {
                return;
            };
            state.active = state.active.saturating_sub(1);
            if let Some(count) = state.per_parent.get_mut(&parent) {
                *count = count.saturating_sub(1);
            }
        }
        self.sync.notify_all();
    }

    /// Blocks until every worker spawned by `parent` has finished. Returns
    /// immediately when `parent` never spawned one.
    pub fn wait_idle(&self, parent: ThreadId) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        if !state.per_parent.contains_key(&parent) {
            return;
        }
        while state.per_parent.get(&parent).copied().unwrap_or(0) > 0 {
            state = match self.sync.wait(state) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
        state.per_parent.remove(&parent);
    }
}
