//! A data-owning spinlock, grounded in the teacher's `sync/spinmutex.rs`.
//! Unlike `Spinlock`, which only tracks who holds it, `SpinMutex<T>` owns
//! the protected value and only ever hands it out through a guard —
//! matching how `ProcessTable` and `shm::ShmTable` must be structurally
//! impossible to touch without the lock (`spec.md` section 5).

use super::spinlock::Spinlock;
use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

pub struct SpinMutex<T> {
    lock: Spinlock,
    inner: UnsafeCell<T>,
}

impl<T> SpinMutex<T> {
    pub const fn new(name: &'static str, value: T) -> SpinMutex<T> {
        SpinMutex {
            lock: Spinlock::new(name),
            inner: UnsafeCell::new(value),
        }
    }

    pub fn lock(&self) -> SpinMutexGuard<'_, T> {
        self.lock.lock_unguarded();
        SpinMutexGuard { mutex: self }
    }
}

// Safety: access to `inner` is only ever granted through `SpinMutexGuard`,
// which exists only while `lock` is held by the current CPU.
unsafe impl<T: Send> Sync for SpinMutex<T> {}

pub struct SpinMutexGuard<'m, T> {
    mutex: &'m SpinMutex<T>,
}

impl<'m, T> Deref for SpinMutexGuard<'m, T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { &*self.mutex.inner.get() }
    }
}

impl<'m, T> DerefMut for SpinMutexGuard<'m, T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.mutex.inner.get() }
    }
}

impl<'m, T> Drop for SpinMutexGuard<'m, T> {
    fn drop(&mut self) {
        unsafe { self.mutex.lock.unlock() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_gives_exclusive_access() {
        let m = SpinMutex::new("counter", 0u32);
        {
            let mut g = m.lock();
            *g += 1;
        }
        assert_eq!(*m.lock(), 1);
    }
}
