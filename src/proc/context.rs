//! Saved kernel context, and the `swtch` seam.
//!
//! `spec.md` section 9 asks to keep the context switch primitive
//! "isolated" behind "a documented register-save contract": the only
//! operation the core needs is "switch from caller to target context,
//! return when someone switches back to me". On real hardware that means
//! saving/restoring callee-saved registers and the stack pointer, which
//! is exactly what the teacher's `Context` struct records.
//!
//! This core never runs on real hardware or spawns a second hardware
//! thread per process — the trap path and the actual execution of a
//! process's instructions are out of scope (`spec.md` section 1). So the
//! register fields are kept (for structural fidelity and so
//! `Process::alloc` can still stamp a "resume at fork-return" entry
//! point the way the teacher does), but `ContextSwitch::switch` is a
//! synchronous bookkeeping swap rather than a real stack switch: the
//! scheduler "runs" a process by returning control to whatever test
//! harness or `kernelsim` workload represents that process's next trap,
//! and that caller "returns" control by calling back into `sched`,
//! `yield_cpu`, `sleep`, or `exit`. See DESIGN.md for the open-question
//! resolution.

#[repr(C)]
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub struct Context {
    pub ra: u64,
    pub sp: u64,

    // callee-saved
    pub s0: u64,
    pub s1: u64,
    pub s2: u64,
    pub s3: u64,
    pub s4: u64,
    pub s5: u64,
    pub s6: u64,
    pub s7: u64,
    pub s8: u64,
    pub s9: u64,
    pub s10: u64,
    pub s11: u64,
}

impl Context {
    pub const fn new() -> Context {
        Context {
            ra: 0,
            sp: 0,
            s0: 0,
            s1: 0,
            s2: 0,
            s3: 0,
            s4: 0,
            s5: 0,
            s6: 0,
            s7: 0,
            s8: 0,
            s9: 0,
            s10: 0,
            s11: 0,
        }
    }
}

/// The `swtch()` seam. A real implementation for hosted hardware would
/// save the current register file into `from` and restore `to`'s; this
/// core only needs the call to be a synchronization point, which
/// `SimulatedSwitch` provides without pretending to move a stack pointer
/// it does not own.
pub trait ContextSwitch {
    fn switch(&mut self, from: &mut Context, to: &mut Context);
}

#[derive(Default)]
pub struct SimulatedSwitch;

impl ContextSwitch for SimulatedSwitch {
    fn switch(&mut self, from: &mut Context, to: &mut Context) {
        core::mem::swap(from, to);
    }
}
