//! Per-CPU state, grounded in the teacher's `proc/cpu.rs`.
//!
//! The teacher reads a hardware thread-pointer register (`r_tp`) to find
//! `cpus[cpuid()]`. This crate has no hardware thread pointer to read, so
//! each simulated CPU is instead bound to one OS thread via
//! `Cpu::bind_current_thread`, and `Cpu::current()` recovers that
//! thread's `Cpu` from thread-local storage — the same "whichever
//! execution context asks, answer for the core currently running it"
//! contract, just keyed by `std::thread::ThreadId` instead of `tp`.

use super::context::Context;
use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Per-CPU scheduling state. `spec.md` section 4.1: "a spinlock with
/// interrupt-disable nesting counter per CPU".
///
/// The teacher's `Cpu` tracks the running process as `*mut Process`, a raw
/// pointer stable because the process table is a `'static` C array. This
/// crate's process table lives behind a `SpinMutex`, so every field access
/// already goes through a guard; caching a slot *index* here instead of a
/// raw pointer lets `proc::scheduler` resolve "the current process" without
/// a second, lock-free path to its fields.
pub struct Cpu {
    pub id: usize,
    /// Index into the process table of the slot RUNNING on this CPU, or
    /// `None`.
    pub current: Option<usize>,
    /// `swtch()` target: the CPU's own scheduler context.
    pub context: Context,
    /// Depth of `push_intr_off()` nesting.
    pub interrupt_disable_layers: i32,
    /// Were interrupts enabled before the outermost `push_intr_off()`?
    pub previous_interrupts_enabled: bool,
}

impl Cpu {
    const fn new(id: usize) -> Cpu {
        Cpu {
            id,
            current: None,
            context: Context::new(),
            interrupt_disable_layers: 0,
            previous_interrupts_enabled: true,
        }
    }
}

thread_local! {
    static CPU_SLOT: UnsafeCell<Cpu> = UnsafeCell::new(Cpu::new(usize::MAX));
}

static NEXT_CPU_ID: AtomicUsize = AtomicUsize::new(0);

impl Cpu {
    /// Assign this OS thread the next available simulated CPU id. Call
    /// once per thread before it enters a scheduler loop. Panics if this
    /// thread is already bound, or if `NCPU` simulated CPUs are already
    /// in use.
    pub fn bind_current_thread() -> usize {
        let id = NEXT_CPU_ID.fetch_add(1, Ordering::SeqCst);
        assert!(id < crate::param::NCPU, "bind_current_thread: out of simulated CPUs");
        CPU_SLOT.with(|slot| {
            let cpu = unsafe { &mut *slot.get() };
            assert_eq!(cpu.id, usize::MAX, "this thread is already bound to a CPU");
            cpu.id = id;
        });
        id
    }

    /// Return this CPU's mutable state. Panics if the current thread has
    /// not called `bind_current_thread` (mirrors the teacher's
    /// requirement that `mycpu()` only be called with interrupts
    /// disabled on a hart that's part of the system).
    pub fn current() -> &'static mut Cpu {
        CPU_SLOT.with(|slot| {
            let cpu = unsafe { &mut *slot.get() };
            assert_ne!(cpu.id, usize::MAX, "current thread is not bound to a simulated CPU");
            // Safety: the thread-local cell outlives every borrow taken
            // from within the thread that owns it.
            unsafe { &mut *(cpu as *mut Cpu) }
        })
    }

    pub fn id() -> usize {
        CPU_SLOT.with(|slot| unsafe { &*slot.get() }.id)
    }

    /// Push one layer of "interrupts disabled". First call saves whether
    /// interrupts were enabled so `pop_intr_off` can restore it.
    pub fn push_intr_off() {
        let cpu = Cpu::current();
        let was_enabled = cpu.interrupt_disable_layers == 0 && cpu.previous_interrupts_enabled;
        if cpu.interrupt_disable_layers == 0 {
            cpu.previous_interrupts_enabled = was_enabled;
        }
        cpu.interrupt_disable_layers += 1;
    }

    /// Pop one layer of "interrupts disabled", restoring the saved
    /// enable state only once the nesting count reaches zero.
    pub fn pop_intr_off() {
        let cpu = Cpu::current();
        assert!(cpu.interrupt_disable_layers > 0, "pop_intr_off: not nested");
        cpu.interrupt_disable_layers -= 1;
    }

    pub fn interrupts_enabled() -> bool {
        let cpu = Cpu::current();
        cpu.interrupt_disable_layers == 0 && cpu.previous_interrupts_enabled
    }
}
