//! Low-level synchronization primitives shared by the queues and workers.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use crossbeam::utils::Backoff;

/// A test-and-test-and-set spinlock.
///
/// Queue critical sections are O(1) (one deque push/pop plus a counter
/// update), so spinning with `crossbeam`'s bounded [`Backoff`] is cheaper
/// than parking the thread.
pub(crate) struct SpinLock<T> {
    locked: AtomicBool,
    data: UnsafeCell<T>,
}

// Safety: the guard hands out at most one &mut T at a time.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub fn new(data: T) -> Self {
        SpinLock {
            locked: AtomicBool::new(false),
            data: UnsafeCell::new(data),
        }
    }

    /// Acquires the lock, spinning until it is available.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let backoff = Backoff::new();
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return SpinLockGuard { lock: self };
            }
            while self.locked.load(Ordering::Relaxed) {
                backoff.snooze();
            }
        }
    }

    /// Attempts to acquire the lock without spinning.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(SpinLockGuard { lock: self })
        } else {
            None
        }
    }
}

pub(crate) struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.locked.store(false, Ordering::Release);
    }
}

/// The condition a blocking worker parks on while its queues are empty.
///
/// Producers flip the flag to non-empty and notify on the 0 -> 1 element
/// transition; the worker flips it back when a fetch round comes up empty.
/// The flag is a conservative lag of true queue emptiness. Because producers
/// never touch a queue spinlock while holding this mutex (and vice versa),
/// the flag alone cannot be trusted at the moment of going to sleep, so
/// [`EmptySignal::wait_while_empty`] re-checks ground truth under the mutex
/// before parking.
pub(crate) struct EmptySignal {
    empty: Mutex<bool>,
    not_empty: Condvar,
}

impl EmptySignal {
    pub fn new() -> Self {
        EmptySignal {
            empty: Mutex::new(true),
            not_empty: Condvar::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self.empty.lock().unwrap()
    }

    /// Updates the flag; notifies waiters only on the transition to
    /// non-empty.
    pub fn set_empty(&self, value: bool) {
        *self.empty.lock().unwrap() = value;
        if !value {
            self.not_empty.notify_all();
        }
    }

    /// Parks until a producer reports the queue non-empty or `interrupted`
    /// is raised.
    ///
    /// `confirm_empty` is evaluated under the signal mutex and must read
    /// queue state without taking any spinlock (lock-free length counters).
    /// An enqueue that raced with the caller's empty observation is caught
    /// here: either its length update is visible to `confirm_empty`, or its
    /// `set_empty(false)` serializes after this mutex section and wakes the
    /// wait.
    pub fn wait_while_empty<F>(&self, interrupted: &AtomicBool, confirm_empty: F)
    where
        F: Fn() -> bool,
    {
        let mut empty = self.empty.lock().unwrap();
        if !confirm_empty() {
            *empty = false;
            return;
        }
        *empty = true;
        while *empty && !interrupted.load(Ordering::Acquire) {
            empty = self.not_empty.wait(empty).unwrap();
        }
    }

    /// Raises `interrupted` under the signal mutex so a concurrent
    /// `wait_while_empty` cannot miss it between its predicate check and the
    /// condition wait.
    pub fn interrupt(&self, interrupted: &AtomicBool) {
        let _guard = self.empty.lock().unwrap();
        interrupted.store(true, Ordering::Release);
    }

    pub fn notify_all(&self) {
        self.not_empty.notify_all();
    }
}
