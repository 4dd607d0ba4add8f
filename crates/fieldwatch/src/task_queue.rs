#![forbid(unsafe_code)]

//! Single-threaded FIFO queue of deferred tasks.
//!
//! Stands in for a host event loop's macro-task queue. Work handed to
//! [`TaskQueue::defer`] never runs synchronously; it runs on a later turn,
//! in the order it was scheduled.
//!
//! # Turns
//!
//! [`run_pending`](TaskQueue::run_pending) runs one turn: exactly the tasks
//! that were queued when the call started. Tasks scheduled while the turn is
//! running wait for the next turn.
//!
//! ```text
//! defer(A) defer(B)        run_pending()          run_pending()
//! ┌─────────────┐   A runs, schedules C   ┌──────┐   C runs   ┌──┐
//! │ [A, B]      │ ──────────────────────► │ [C]  │ ─────────► │[]│
//! └─────────────┘   B runs                └──────┘            └──┘
//! ```
//!
//! # Failure Modes
//!
//! - **Panicking task**: the panic propagates out of `run_pending`; tasks
//!   behind it stay queued.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

/// Shared handle to a FIFO task queue.
///
/// Cloning creates a new handle to the **same** queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `task` to run on a later turn.
    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run one turn. Returns the number of tasks executed.
    pub fn run_pending(&self) -> usize {
        let due = self.pending();
        let mut ran = 0;
        while ran < due {
            // The queue borrow ends before the task runs so it can defer more work.
            let Some(task) = self.tasks.borrow_mut().pop_front() else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    /// Run turns until nothing is queued. Returns the number of tasks executed.
    ///
    /// Does not return if tasks keep rescheduling themselves.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while !self.is_idle() {
            ran += self.run_pending();
        }
        ran
    }

    /// Drop every queued task without running it.
    pub fn clear(&self) -> usize {
        // Tasks are dropped after the borrow ends; their drop may defer more work.
        let dropped = std::mem::take(&mut *self.tasks.borrow_mut());
        dropped.len()
    }
}
