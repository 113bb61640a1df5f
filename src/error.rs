//! Error categories per `spec.md` section 7.
//!
//! Programming errors (lock misuse, invalid sleeper state, rescheduling a
//! running process) are never expressed as one of these types — they
//! panic, because they are not recoverable and indicate a kernel bug.
//! These types cover resource exhaustion and validation errors, which are
//! reported to the caller as a typed `Err`.

use crate::proc::process::Pid;
use thiserror::Error;

/// Errors returned by process-lifecycle operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error("no free process slot")]
    MaxProcesses,
    #[error("resource allocation failed")]
    Allocation,
    #[error("no children to wait for")]
    NoChildren,
    #[error("process was killed while waiting")]
    Killed,
    #[error("bad user pointer or address")]
    PageError,
    #[error("no such process {0:?}")]
    NoSuchProcess(Pid),
}

/// Errors returned by shared-memory operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ShmError {
    #[error("shared-memory id already open")]
    AlreadyOpen,
    #[error("shared-memory table is full")]
    TableFull,
    #[error("no shared-memory block with that id")]
    NotFound,
    #[error("invalid flag value, expected 0 or 1")]
    InvalidFlag,
    #[error("requested page_count exceeds MAXSHMPBLOCK")]
    TooManyPages,
    #[error("caller does not hold write permission on this block")]
    AccessDenied,
}

/// Errors returned by the syscall dispatcher.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("syscall number {0} is out of range")]
    UnknownSyscall(u32),
    #[error("syscall not implemented by this core (file/exec layer is out of scope)")]
    Unimplemented,
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Shm(#[from] ShmError),
}
