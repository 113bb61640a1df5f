//! A simulated core of a teaching multiprogramming kernel: process
//! lifecycle and scheduling, inter-process shared memory, and
//! per-process system-call tracing. Hardware-specific layers the
//! original kernel owns — the page-table walker, the trap/interrupt
//! vector, the file system, and the register-level context switch — are
//! out of scope and exposed only through the seams this core needs
//! (`proc::address_space::AddressSpace`, `proc::context::ContextSwitch`).
//!
//! `mfq_scheduler` (on by default) selects the three-level
//! lottery/FIFO/priority feedback queue; disabling it falls back to a
//! single round-robin level.

#![allow(clippy::missing_safety_doc)]

pub mod clock;
pub mod error;
pub mod introspect;
pub mod param;
pub mod proc;
pub mod queue;
pub mod shm;
pub mod sync;
pub mod syscall;

pub use error::{DispatchError, ProcessError, ShmError};
pub use proc::process::Pid;
