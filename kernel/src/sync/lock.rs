#[cfg(debug_assertions)]
use no_deadlocks::{Mutex, MutexGuard};
#[cfg(not(debug_assertions))]
use std::sync::{Mutex, MutexGuard};

use super::{Priority, PriorityGuard, PriorityMutex};
use std::{
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicUsize, Ordering::Relaxed},
        Arc, PoisonError,
    },
    time::Duration,
};

static GLOBAL_LOCK_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A shared value, whose accessors are split into two priority classes.
///
/// Typical usage is a resource, which is shared by a render thread (high priority)
/// and a background thread (low priority): the render thread never waits behind
/// a queue of background accesses.
pub struct PriorityLock<T>(usize, Arc<Shared<T>>);

/// An exclusive access to the value of a `PriorityLock`.
pub struct Guard<'a, T> {
    // Dropped first: the value is unlocked before the priority mutex is released
    value: MutexGuard<'a, T>,
    access: PriorityGuard<'a>,
}

struct Shared<T> {
    access: PriorityMutex,
    value: Mutex<T>,
}

impl<T> From<T> for PriorityLock<T> {
    fn from(x: T) -> Self {
        Self(
            GLOBAL_LOCK_COUNTER.fetch_add(1, Relaxed),
            Arc::new(Shared {
                access: PriorityMutex::new(),
                value: Mutex::new(x),
            }),
        )
    }
}

impl<T> Clone for PriorityLock<T> {
    fn clone(&self) -> Self {
        let Self(id, shared) = self;
        Self(*id, shared.clone())
    }
}

impl<T> PriorityLock<T> {
    /// A process-wide unique identifier, shared by all clones of the lock.
    pub fn id(&self) -> usize {
        let Self(id, _) = self;
        *id
    }

    /// Gets the underlying priority mutex (e.g. to inspect its state).
    pub fn mutex(&self) -> &PriorityMutex {
        let Self(_, shared) = self;
        &shared.access
    }

    pub fn lock_high(&self) -> Guard<'_, T> {
        self.lock(Priority::High)
    }

    pub fn lock_low(&self) -> Guard<'_, T> {
        self.lock(Priority::Low)
    }

    pub fn lock(&self, priority: Priority) -> Guard<'_, T> {
        let Self(_, shared) = self;
        Self::enter(shared, shared.access.lock(priority))
    }

    pub fn try_lock_high(&self) -> Option<Guard<'_, T>> {
        let Self(_, shared) = self;
        shared
            .access
            .try_lock_high()
            .map(|access| Self::enter(shared, access))
    }

    pub fn try_lock_low(&self) -> Option<Guard<'_, T>> {
        let Self(_, shared) = self;
        shared
            .access
            .try_lock_low()
            .map(|access| Self::enter(shared, access))
    }

    /// Waits at most `timeout` for the value.
    pub fn try_lock_for(&self, priority: Priority, timeout: Duration) -> Option<Guard<'_, T>> {
        let Self(_, shared) = self;
        shared
            .access
            .try_lock_for(priority, timeout)
            .map(|access| Self::enter(shared, access))
    }

    /// The inner mutex is only ever taken by the holder of the priority mutex,
    /// so this never blocks.
    fn enter<'a>(shared: &'a Shared<T>, access: PriorityGuard<'a>) -> Guard<'a, T> {
        Guard {
            value: shared.value.lock().unwrap_or_else(PoisonError::into_inner),
            access,
        }
    }
}

impl<T> Guard<'_, T> {
    /// Gets the priority, with which the value has been locked.
    pub fn priority(&self) -> Priority {
        self.access.priority()
    }
}

impl<T> Deref for Guard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &*self.value
    }
}

impl<T> DerefMut for Guard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.value
    }
}
