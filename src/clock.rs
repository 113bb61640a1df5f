//! Logical wall clock used to stamp syscall telemetry and process
//! creation time. A real kernel reads an RTC (see
//! `original_source/proc.c`'s `struct date`); that is a hardware
//! collaborator this core does not own, so the clock here is a
//! monotonically increasing counter with an xv6-lab5-shaped `Display`
//! impl rather than a real calendar.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

/// A single tick of the kernel clock. `ProcessTable` ticks this on every
/// timer interrupt in a real kernel; in this simulation, tests and the
/// `kernelsim` binary tick it explicitly to advance time.
#[derive(Debug, Default)]
pub struct KernelClock {
    ticks: AtomicU64,
}

impl KernelClock {
    pub const fn new() -> KernelClock {
        KernelClock {
            ticks: AtomicU64::new(0),
        }
    }

    /// Advance the clock by one tick and return the new reading.
    pub fn tick(&self) -> Ticks {
        Ticks(self.ticks.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Current tick count without advancing it.
    pub fn now(&self) -> Ticks {
        Ticks(self.ticks.load(Ordering::SeqCst))
    }

    /// Take a wall-clock-shaped timestamp for telemetry.
    pub fn timestamp(&self) -> Timestamp {
        Timestamp(self.ticks.load(Ordering::SeqCst))
    }
}

/// Tick count at which a process was allocated, or the current time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticks(pub u64);

/// A syscall-invocation timestamp. Distinct type from `Ticks` because the
/// spec treats "time since boot" (`ctime`, `uptime`) and "the moment this
/// syscall happened" (`datelist`) as separate concepts even though both
/// are backed by the same logical clock here.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl fmt::Display for Timestamp {
    /// Render in the `HH:MM:SS YYYY-MM-DD`-shaped format the original
    /// `invocation_log` used, synthesized from the logical tick count
    /// instead of a real RTC read.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.0;
        let second = t % 60;
        let minute = (t / 60) % 60;
        let hour = (t / 3600) % 24;
        let day = 1 + (t / 86400) % 28;
        let month = 1 + (t / (86400 * 28)) % 12;
        let year = 1970 + t / (86400 * 28 * 12);
        write!(
            f,
            "{hour:02}:{minute:02}:{second:02} {year:04}-{month:02}-{day:02}"
        )
    }
}
