//! Debug/introspection surface: `ps`, the three `ch*` scheduling-knob
//! setters, and the syscall-telemetry readers. Grounded in the teacher's
//! `proc/process.rs::procdump` ("No lock to avoid wedging a stuck machine
//! further" — this simulation can afford to take the lock since there is
//! no real hardware to wedge) and `spec.md` section 6's syscall table.

use crate::error::ProcessError;
use crate::proc::process::{MfqLevel, Pid};
use crate::proc::table::ProcessTableInner;

/// `spec.md` section 6: `ps` — print process table. The teacher's
/// `procdump` prints pid and state only; this kernel's process table
/// carries scheduling attributes `procdump` never had reason to show, so
/// the listing is widened to match.
pub fn ps(procs: &ProcessTableInner) {
    log::info!("procdump:");
    for p in procs.slots.iter().filter(|p| !p.is_unused()) {
        log::info!(
            "  {pid}: {state:?} {name:?} mfq={level:?} tickets={tickets} priority={priority}",
            pid = p.pid.0,
            state = p.state,
            name = p.name,
            level = p.mfq_level,
            tickets = p.tickets,
            priority = p.priority,
        );
    }
}

/// `spec.md` section 6: `chtickets(pid, n)` — set lottery tickets.
pub fn chtickets(procs: &mut ProcessTableInner, pid: Pid, n: u32) -> Result<(), ProcessError> {
    let index = procs.index_of(pid).ok_or(ProcessError::NoSuchProcess(pid))?;
    procs.slots[index].tickets = n;
    Ok(())
}

/// `spec.md` section 6: `chpr(pid, p)` — set level-3 priority.
pub fn chpr(procs: &mut ProcessTableInner, pid: Pid, priority: i32) -> Result<(), ProcessError> {
    let index = procs.index_of(pid).ok_or(ProcessError::NoSuchProcess(pid))?;
    procs.slots[index].priority = priority;
    Ok(())
}

/// `spec.md` section 6: `chmfq(pid, lvl)` — move a process to an MFQ
/// level directly, bypassing the scheduler's own level-cycling.
pub fn chmfq(procs: &mut ProcessTableInner, pid: Pid, level: MfqLevel) -> Result<(), ProcessError> {
    let index = procs.index_of(pid).ok_or(ProcessError::NoSuchProcess(pid))?;
    procs.slots[index].mfq_level = level;
    Ok(())
}

/// `spec.md` section 6: `invoked_syscalls(pid)` — dump a process's
/// per-call history (`spec.md` section 4.6: "pretty-prints each
/// invocation with timestamp and decoded arguments").
pub fn invoked_syscalls(procs: &ProcessTableInner, pid: Pid) -> Result<(), ProcessError> {
    let index = procs.index_of(pid).ok_or(ProcessError::NoSuchProcess(pid))?;
    for record in procs.slots[index].syscalls.iter() {
        if record.count > 0 {
            print!("{}", record.format_invocations(pid));
        }
    }
    Ok(())
}

/// `spec.md` section 6: `get_count(pid, n)` — per-process count of
/// syscall number `n`.
pub fn get_count(procs: &ProcessTableInner, pid: Pid, sysnum: usize) -> Result<u64, ProcessError> {
    let index = procs.index_of(pid).ok_or(ProcessError::NoSuchProcess(pid))?;
    let record = procs
        .slots[index]
        .syscalls
        .get(sysnum.wrapping_sub(1))
        .ok_or(ProcessError::PageError)?;
    Ok(record.count)
}

/// `spec.md` section 6: `log_syscalls()` — dump the global invocation
/// log (`original_source/proc.c`'s `log_syscalls`, walking the list in
/// insertion order).
pub fn log_syscalls(procs: &ProcessTableInner) {
    print!("{}", procs.invocation_log().format_all());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chtickets_chpr_chmfq_update_the_named_slot() {
        let mut t = ProcessTableInner::new();
        let pid = t.userinit();
        chtickets(&mut t, pid, 500).unwrap();
        chpr(&mut t, pid, 3).unwrap();
        chmfq(&mut t, pid, MfqLevel::L3).unwrap();
        let index = t.index_of(pid).unwrap();
        assert_eq!(t.slots[index].tickets, 500);
        assert_eq!(t.slots[index].priority, 3);
        assert_eq!(t.slots[index].mfq_level, MfqLevel::L3);
    }

    #[test]
    fn chtickets_on_unknown_pid_is_an_error() {
        let mut t = ProcessTableInner::new();
        assert_eq!(chtickets(&mut t, Pid(999), 1), Err(ProcessError::NoSuchProcess(Pid(999))));
    }

    #[test]
    fn get_count_tracks_syscall_trace_scenario() {
        let mut t = ProcessTableInner::new();
        let pid = t.userinit();
        t.record_syscall(pid, 15, "write", Default::default());
        t.record_syscall(pid, 15, "write", Default::default());
        t.record_syscall(pid, 15, "write", Default::default());
        t.record_syscall(pid, 10, "getpid", Default::default());
        assert_eq!(get_count(&t, pid, 16).unwrap(), 3);
        assert_eq!(get_count(&t, pid, 11).unwrap(), 1);
    }
}
