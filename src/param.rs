//! Fixed-capacity limits for the process table, shared-memory table, and
//! per-process telemetry. Mirrors xv6's `param.h`: compile-time constants
//! rather than a runtime-configurable allocator.

/// Maximum number of processes.
pub const NPROC: usize = 64;
/// Maximum number of CPUs.
pub const NCPU: usize = 8;
/// Maximum number of open files per process.
pub const NOFILE: usize = 16;
/// Number of syscall numbers the dispatcher and telemetry table cover.
pub const N_SYSCALLS: usize = 34;
/// Per-process, per-syscall-number history depth kept in the telemetry
/// ring buffer. The original source chains one page-sized list node per
/// invocation; `spec.md` section 9 calls that out as a leak waiting to
/// happen and asks for a bounded per-process arena instead.
pub const SYSCALL_HISTORY: usize = 32;
/// Maximum number of shared-memory blocks live at once.
pub const MAXSHM: usize = 10;
/// Maximum number of physical pages a single shared-memory block owns.
pub const MAXSHMPBLOCK: usize = 4;
/// Maximum number of shared-memory mappings a single process can hold
/// attached at once (bounds `Process::shm_mapping`).
pub const MAX_SHM_MAPPINGS: usize = MAXSHM * MAXSHMPBLOCK;
/// Maximum number of processes attached to one shared-memory block.
pub const MAXSHM_MEMBERS: usize = NPROC;
/// Size, in bytes, of a simulated kernel stack.
pub const KSTACK_SIZE: usize = 4096;
/// Default scheduling priority for level-3 (strict priority) processes.
pub const DEFAULT_PRIORITY: i32 = 10;
/// Default lottery ticket count for level-1 processes.
pub const DEFAULT_TICKETS: u32 = 100;
