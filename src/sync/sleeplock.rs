//! Yielding sleep-lock, grounded in the teacher's `sync/sleeplock.rs`.
//! `spec.md` section 4.1: "a contender that finds the lock held calls
//! sleep on the lock address ... holder calls wakeup on release. Fair
//! only in the sense that all sleepers become RUNNABLE and race."

use crate::proc::process::Channel;
use crate::proc::scheduler::{sleep_without_spin, wakeup};
use core::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct Sleeplock {
    locked: AtomicBool,
}

impl Sleeplock {
    pub const fn new() -> Sleeplock {
        Sleeplock {
            locked: AtomicBool::new(false),
        }
    }

    pub fn lock_unguarded(&self) {
        while self.locked.swap(true, Ordering::Acquire) {
            sleep_without_spin(Channel::of(self));
        }
    }

    pub fn lock(&self) -> SleeplockGuard<'_> {
        self.lock_unguarded();
        SleeplockGuard { lock: self }
    }

    /// # Safety
    /// Caller must actually hold the lock.
    pub unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
        wakeup(Channel::of(self));
    }
}

pub struct SleeplockGuard<'l> {
    lock: &'l Sleeplock,
}

impl<'l> Drop for SleeplockGuard<'l> {
    fn drop(&mut self) {
        unsafe { self.lock.unlock() }
    }
}
