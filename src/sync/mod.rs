//! Low-level locking primitives (`spec.md` section 4.1), consumed by
//! every other component: a spinlock with interrupt-disable nesting, a
//! sleep-lock, a ticket lock, a counting semaphore, and two
//! reader/writer-lock variants.

pub mod rwlock;
pub mod semaphore;
pub mod sleeplock;
pub mod spinlock;
pub mod spinmutex;
pub mod ticketlock;
