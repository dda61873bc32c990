use log::trace;
use std::{
    fmt,
    sync::{Condvar, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

/// An access class of a `PriorityMutex` acquirer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Served before every low-priority acquirer, which is not yet holding the mutex.
    High,

    /// Waits behind the current holder, and behind every pending high-priority acquirer.
    Low,
}

/// Synchronization state of the mutex.
#[derive(Debug, Default)]
struct State {
    /// The class of the thread, which currently holds the mutex
    holder: Option<Priority>,

    /// Amount of high-priority acquirers, which are blocked on the mutex
    waiting_high: usize,

    /// Amount of low-priority acquirers, which are blocked on the mutex
    waiting_low: usize,
}

impl State {
    fn admits(&self, priority: Priority) -> bool {
        match priority {
            Priority::High => self.holder.is_none(),
            Priority::Low => self.holder.is_none() && self.waiting_high == 0,
        }
    }

    fn waiting(&mut self, priority: Priority) -> &mut usize {
        match priority {
            Priority::High => &mut self.waiting_high,
            Priority::Low => &mut self.waiting_low,
        }
    }
}

/// A mutex, which lets high-priority callers overtake low-priority callers.
///
/// The mutex carries no payload: it only arbitrates an exclusive access
/// to some resource, which is guarded elsewhere
/// (see [`PriorityLock`](super::PriorityLock) for a version owning its value).
///
/// Guarantees:
/// - At most one thread (of either class) holds the mutex at any time.
/// - Once a high-priority acquirer starts waiting, no low-priority acquirer
///   is admitted until every waiting high-priority acquirer has been served.
///   The high-priority caller therefore gets the mutex no later than at the end
///   of the currently running critical section.
///
/// The order between several high-priority waiters (as well as between several
/// low-priority waiters) is whatever order the OS wakes them in.
///
/// There are two interfaces:
/// - scoped: [`lock_high`](Self::lock_high) and [`lock_low`](Self::lock_low),
///   which return a [`PriorityGuard`];
/// - raw: `acquire_*_priority` and `release_*_priority` pairs,
///   for callers that cannot express their critical section as a scope.
///
/// ```
/// # use ge_kernel::sync::PriorityMutex;
/// let mutex = PriorityMutex::new();
/// {
///     let _render = mutex.lock_high();
///     assert!(mutex.try_lock_low().is_none());
/// }
/// assert!(mutex.try_lock_low().is_some());
/// ```
pub struct PriorityMutex {
    state: Mutex<State>,
    released: Condvar,
}

/// A scoped ownership of a `PriorityMutex`.
///
/// The mutex is released with the priority it was acquired with,
/// when the guard is dropped.
#[must_use = "the mutex is released as soon as the guard is dropped"]
pub struct PriorityGuard<'a> {
    mutex: &'a PriorityMutex,
    priority: Priority,
}

impl PriorityMutex {
    /// Creates an unlocked mutex.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            released: Condvar::new(),
        }
    }

    /// Blocks until the mutex is acquired with high priority.
    ///
    /// While the caller is blocked, every new low-priority acquirer is held back.
    /// Must be paired with [`release_high_priority`](Self::release_high_priority).
    pub fn acquire_high_priority(&self) {
        self.acquire(Priority::High)
    }

    /// Releases the mutex, previously acquired with high priority.
    ///
    /// # Panics
    /// In debug builds, panics if the mutex is not held with high priority.
    pub fn release_high_priority(&self) {
        self.release(Priority::High)
    }

    /// Blocks until the mutex is acquired with low priority.
    ///
    /// The caller is admitted only when the mutex is free,
    /// and no high-priority acquirer is waiting for it.
    /// Must be paired with [`release_low_priority`](Self::release_low_priority).
    pub fn acquire_low_priority(&self) {
        self.acquire(Priority::Low)
    }

    /// Releases the mutex, previously acquired with low priority.
    ///
    /// # Panics
    /// In debug builds, panics if the mutex is not held with low priority.
    pub fn release_low_priority(&self) {
        self.release(Priority::Low)
    }

    /// Acquires the mutex with high priority for the lifetime of the returned guard.
    pub fn lock_high(&self) -> PriorityGuard<'_> {
        self.lock(Priority::High)
    }

    /// Acquires the mutex with low priority for the lifetime of the returned guard.
    pub fn lock_low(&self) -> PriorityGuard<'_> {
        self.lock(Priority::Low)
    }

    /// Acquires the mutex for the lifetime of the returned guard.
    pub fn lock(&self, priority: Priority) -> PriorityGuard<'_> {
        self.acquire(priority);
        PriorityGuard {
            mutex: self,
            priority,
        }
    }

    /// Acquires the mutex with high priority, if it is free right now.
    pub fn try_lock_high(&self) -> Option<PriorityGuard<'_>> {
        self.try_lock(Priority::High)
    }

    /// Acquires the mutex with low priority, if it is free,
    /// and no high-priority acquirer is waiting.
    pub fn try_lock_low(&self) -> Option<PriorityGuard<'_>> {
        self.try_lock(Priority::Low)
    }

    /// Acquires the mutex without blocking, if the priority class is admitted right now.
    pub fn try_lock(&self, priority: Priority) -> Option<PriorityGuard<'_>> {
        let mut state = self.state();
        if !state.admits(priority) {
            return None;
        }
        state.holder = Some(priority);
        Some(PriorityGuard {
            mutex: self,
            priority,
        })
    }

    /// Waits at most `timeout` for a high-priority acquisition.
    ///
    /// While waiting, the caller holds back low-priority acquirers
    /// exactly as [`lock_high`](Self::lock_high) does.
    pub fn try_lock_high_for(&self, timeout: Duration) -> Option<PriorityGuard<'_>> {
        self.try_lock_for(Priority::High, timeout)
    }

    /// Waits at most `timeout` for a low-priority acquisition.
    pub fn try_lock_low_for(&self, timeout: Duration) -> Option<PriorityGuard<'_>> {
        self.try_lock_for(Priority::Low, timeout)
    }

    /// Waits at most `timeout` for an acquisition with the given priority.
    pub fn try_lock_for(
        &self,
        priority: Priority,
        timeout: Duration,
    ) -> Option<PriorityGuard<'_>> {
        let mut state = self.state();
        *state.waiting(priority) += 1;

        let (mut state, wait) = self
            .released
            .wait_timeout_while(state, timeout, |state| !state.admits(priority))
            .unwrap_or_else(PoisonError::into_inner);
        *state.waiting(priority) -= 1;

        if wait.timed_out() {
            trace!("{:?} priority acquisition timed out after {:?}", priority, timeout);
            let unblocks_low = priority == Priority::High && state.waiting_high == 0;
            drop(state);
            if unblocks_low {
                self.released.notify_all();
            }
            return None;
        }

        state.holder = Some(priority);
        Some(PriorityGuard {
            mutex: self,
            priority,
        })
    }

    /// Checks whether some thread currently holds the mutex.
    pub fn is_locked(&self) -> bool {
        self.state().holder.is_some()
    }

    /// Gets the priority class of the current holder.
    pub fn holder(&self) -> Option<Priority> {
        self.state().holder
    }

    /// Gets the amount of high-priority acquirers, which are currently blocked.
    pub fn waiting_high_priority(&self) -> usize {
        self.state().waiting_high
    }

    /// Gets the amount of low-priority acquirers, which are currently blocked.
    pub fn waiting_low_priority(&self) -> usize {
        self.state().waiting_low
    }
}

impl PriorityMutex {
    fn acquire(&self, priority: Priority) {
        let mut state = self.state();
        if state.admits(priority) {
            state.holder = Some(priority);
            return;
        }

        trace!("Waiting for {:?} priority access", priority);
        *state.waiting(priority) += 1;

        let mut state = self
            .released
            .wait_while(state, |state| !state.admits(priority))
            .unwrap_or_else(PoisonError::into_inner);
        *state.waiting(priority) -= 1;
        state.holder = Some(priority);
    }

    fn release(&self, priority: Priority) {
        let mut state = self.state();
        debug_assert_eq!(
            state.holder,
            Some(priority),
            "Released a priority mutex with {:?} priority, which is not held with this priority",
            priority,
        );
        state.holder = None;
        drop(state);
        self.released.notify_all();
    }

    /// The state is consistent between any two statements,
    /// so a panic of another holder does not invalidate it.
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PriorityMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PriorityMutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("PriorityMutex")
            .field("holder", &state.holder)
            .field("waiting_high", &state.waiting_high)
            .field("waiting_low", &state.waiting_low)
            .finish()
    }
}

impl PriorityGuard<'_> {
    /// Gets the priority, with which the mutex has been acquired.
    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl Drop for PriorityGuard<'_> {
    fn drop(&mut self) {
        self.mutex.release(self.priority)
    }
}

impl fmt::Debug for PriorityGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityGuard")
            .field("priority", &self.priority)
            .finish()
    }
}
