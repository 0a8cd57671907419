//! Ordered queue of termination hooks, executed at most once.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

pub(crate) type Hook = Box<dyn FnOnce() + Send + 'static>;

/// FIFO queue of cleanup actions with head insertion.
///
/// `append` places a hook at the tail, `prepend` at the head; `fire` drains
/// head-to-tail. The once-guard makes re-entry through an idempotent shutdown
/// path safe: only the first `fire` call runs anything.
pub(crate) struct HookQueue {
    queue: Mutex<VecDeque<Hook>>,
    fired: AtomicBool,
}

impl HookQueue {
    pub(crate) fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fired: AtomicBool::new(false),
        }
    }

    pub(crate) fn append(&self, hook: Hook) {
        self.queue.lock().push_back(hook);
    }

    pub(crate) fn prepend(&self, hook: Hook) {
        self.queue.lock().push_front(hook);
    }

    /// Runs every queued hook sequentially, in queue order.
    ///
    /// Hooks are isolated from each other: a panicking hook is logged and the
    /// remaining hooks still run. The queue is drained before execution so no
    /// lock is held while user code runs.
    pub(crate) fn fire(&self, scope_id: u64) {
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        let hooks = std::mem::take(&mut *self.queue.lock());
        for hook in hooks {
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                warn!(scope = scope_id, "termination hook panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn push(log: &Arc<StdMutex<Vec<&'static str>>>, name: &'static str) -> Hook {
        let log = Arc::clone(log);
        Box::new(move || log.lock().unwrap().push(name))
    }

    #[test]
    fn append_is_fifo_and_prepend_inserts_at_head() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = HookQueue::new();
        queue.append(push(&log, "first"));
        queue.append(push(&log, "second"));
        queue.prepend(push(&log, "urgent"));
        queue.fire(0);
        assert_eq!(*log.lock().unwrap(), vec!["urgent", "first", "second"]);
    }

    #[test]
    fn fire_runs_at_most_once() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = HookQueue::new();
        queue.append(push(&log, "once"));
        queue.fire(0);
        queue.append(push(&log, "late"));
        queue.fire(0);
        assert_eq!(*log.lock().unwrap(), vec!["once"]);
    }

    #[test]
    fn panicking_hook_does_not_stop_the_rest() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let queue = HookQueue::new();
        queue.append(Box::new(|| panic!("boom")));
        queue.append(push(&log, "survivor"));
        queue.fire(0);
        assert_eq!(*log.lock().unwrap(), vec!["survivor"]);
    }
}
