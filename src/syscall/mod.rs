//! System-call numbering, dispatch, and telemetry (`spec.md` section 4.6).

pub mod dispatch;
pub mod telemetry;

pub use dispatch::{dispatch, Syscall};
