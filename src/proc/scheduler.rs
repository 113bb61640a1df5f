//! Scheduler core: two selectable policies (`spec.md` section 4.3) plus
//! the sleep/wakeup/kill primitives (`spec.md` section 4.4) that operate
//! on whichever process is RUNNING on the calling simulated CPU.
//!
//! Grounded in the teacher's `proc/scheduler.rs` `sched`/`r#yield`/`sleep`
//! for the control-flow shape, and in `original_source/proc.c`'s
//! `MFQscheduler`/`random`/`totalTickets` for the MFQ policy, with the
//! lottery-selection fix from `spec.md` section 9 (explicit two-pass
//! "compute total, draw, then find the slot the draw lands on" instead of
//! reusing a loop variable as the selection).

use super::cpu::Cpu;
use super::process::{Channel, MfqLevel, Process, ProcessState};
use super::rand::Tausworthe;
use super::table::{process_table, ProcessTableInner};
use crate::proc::context::{ContextSwitch, SimulatedSwitch};

/// `spec.md` section 4.3: "exactly one is active for the life of the
/// system (compile-time choice)". The `mfq_scheduler` Cargo feature picks
/// `Scheduler::default_policy`'s variant; either is constructible
/// directly for tests that want to exercise the other.
pub enum Scheduler {
    RoundRobin { next: usize },
    Mfq(MfqState),
}

pub struct MfqState {
    effective_level: MfqLevel,
    rng: Tausworthe,
}

impl Scheduler {
    pub fn default_policy() -> Scheduler {
        if cfg!(feature = "mfq_scheduler") {
            Scheduler::mfq()
        } else {
            Scheduler::round_robin()
        }
    }

    pub fn round_robin() -> Scheduler {
        Scheduler::RoundRobin { next: 0 }
    }

    pub fn mfq() -> Scheduler {
        Scheduler::Mfq(MfqState { effective_level: MfqLevel::L1, rng: Tausworthe::new() })
    }

    /// Select the next slot to run, without yet marking it RUNNING.
    /// Caller holds the table lock.
    pub fn pick(&mut self, slots: &[Process]) -> Option<usize> {
        match self {
            Scheduler::RoundRobin { next } => pick_round_robin(slots, next),
            Scheduler::Mfq(state) => pick_mfq(slots, state),
        }
    }
}

/// `spec.md` section 4.3: "each CPU loops forever... scan slots linearly;
/// for each RUNNABLE slot... on return resume scanning from the next
/// slot." One call to `pick_round_robin` is one step of that scan.
fn pick_round_robin(slots: &[Process], next: &mut usize) -> Option<usize> {
    let n = slots.len();
    for offset in 0..n {
        let i = (*next + offset) % n;
        if slots[i].is_runnable() {
            *next = (i + 1) % n;
            return Some(i);
        }
    }
    None
}

/// `spec.md` section 4.3's three-level feedback queue, with the
/// lottery-selection fix from section 9: compute the total ticket weight
/// first, draw once, then scan to find the slot the draw lands on —
/// never reusing the scan variable as the result the way
/// `original_source/proc.c`'s `MFQscheduler` does.
fn pick_mfq(slots: &[Process], state: &mut MfqState) -> Option<usize> {
    for _ in 0..3 {
        let level = state.effective_level;
        let found = match level {
            MfqLevel::L1 => pick_lottery(slots, &mut state.rng),
            MfqLevel::L2 => pick_fifo(slots),
            MfqLevel::L3 => pick_priority(slots),
        };
        if let Some(index) = found {
            return Some(index);
        }
        state.effective_level = level.next();
    }
    None
}

fn pick_lottery(slots: &[Process], rng: &mut Tausworthe) -> Option<usize> {
    let total: u32 = slots
        .iter()
        .filter(|p| p.is_runnable() && p.mfq_level == MfqLevel::L1)
        .map(|p| p.tickets)
        .sum();
    if total == 0 {
        return None;
    }
    let draw = rng.next(total as i32) as u32;
    let mut cumulative: u32 = 0;
    for (i, p) in slots.iter().enumerate() {
        if p.is_runnable() && p.mfq_level == MfqLevel::L1 {
            cumulative += p.tickets;
            if cumulative > draw {
                return Some(i);
            }
        }
    }
    None
}

fn pick_fifo(slots: &[Process]) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_runnable() && p.mfq_level == MfqLevel::L2)
        .min_by_key(|(_, p)| p.ctime)
        .map(|(i, _)| i)
}

fn pick_priority(slots: &[Process]) -> Option<usize> {
    slots
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_runnable() && p.mfq_level == MfqLevel::L3)
        .min_by_key(|(_, p)| p.priority)
        .map(|(i, _)| i)
}

/// Select a RUNNABLE slot and install it as RUNNING on the calling
/// simulated CPU. `spec.md` section 4.3: "install its address space, mark
/// it RUNNING, context-switch to it." There is no real address space to
/// install on a host CPU, so that step is a no-op here; the rest is
/// exactly what the teacher's round-robin loop does before `swtch`.
pub fn pick_and_run() -> Option<super::process::Pid> {
    let mut guard = process_table().lock();
    let index = {
        let ProcessTableInner { slots, scheduler, .. } = &mut *guard;
        scheduler.pick(slots)?
    };
    guard.slots[index].state = ProcessState::Running;
    let pid = guard.slots[index].pid;
    Cpu::current().current = Some(index);
    SimulatedSwitch.switch(&mut guard.slots[index].context, &mut Cpu::current().context);
    Some(pid)
}

/// `spec.md` section 4.3: "the entry gate back to the per-CPU scheduler.
/// Preconditions: caller holds the table lock, CPU's ncli = 1, current
/// state != RUNNING... All violations panic."
fn sched(guard: &mut ProcessTableInner, index: usize) {
    let cpu = Cpu::current();
    assert_eq!(cpu.interrupt_disable_layers, 1, "sched: locks");
    assert_ne!(guard.slots[index].state, ProcessState::Running, "sched: running");
    SimulatedSwitch.switch(&mut guard.slots[index].context, &mut cpu.context);
}

fn current_index() -> usize {
    Cpu::current().current.expect("no process is current on this simulated CPU")
}

/// `spec.md` section 4.3: "yield() acquires the lock, sets self RUNNABLE,
/// calls sched, releases on resume."
pub fn yield_cpu() {
    let mut guard = process_table().lock();
    let index = current_index();
    guard.slots[index].state = ProcessState::Runnable;
    sched(&mut guard, index);
}

/// `spec.md` section 4.4: the no-partner-lock sleep variant, used by
/// every sync primitive above the bare spinlock. Sets `chan`, transitions
/// to SLEEPING, and calls `sched` while still holding the table lock —
/// the same ordering that makes missed wakeups impossible (section 5: "a
/// wakeup occurring after the sleeper has set chan and before sched is
/// observed").
///
/// `sched` only returns once this slot has been resumed. In the teacher,
/// that return happens *inside* the real per-CPU scheduler loop, after it
/// has already set `p.state = Running` and switched back in — `sleep`
/// never has to do it itself. This simulation's `swtch` is a synchronous
/// register swap rather than a real suspend/resume, so there is no second
/// loop iteration to set that precondition; `sleep_without_spin` has to
/// re-establish it itself immediately on return, before clearing `chan`.
pub fn sleep_without_spin(chan: Channel) {
    let mut guard = process_table().lock();
    let index = current_index();
    guard.slots[index].chan = Some(chan);
    guard.slots[index].state = ProcessState::Sleeping;
    sched(&mut guard, index);
    guard.slots[index].state = ProcessState::Running;
    guard.slots[index].chan = None;
}

/// `spec.md` section 4.4: "wakeup1(chan): assumes the table lock is held;
/// marks every SLEEPING slot with matching chan as RUNNABLE."
pub fn wakeup1(inner: &mut ProcessTableInner, chan: Channel) {
    for p in inner.slots.iter_mut() {
        if p.state == ProcessState::Sleeping && p.chan == Some(chan) {
            p.state = ProcessState::Runnable;
        }
    }
}

/// `spec.md` section 4.4: "wakeup(chan) acquires the lock and delegates."
pub fn wakeup(chan: Channel) {
    let mut guard = process_table().lock();
    wakeup1(&mut guard, chan);
}

/// `spec.md` section 4.4: locate the slot with this pid; set `killed`,
/// and if SLEEPING transition it to RUNNABLE so it observes `killed` on
/// its next return to user mode.
pub fn kill(pid: super::process::Pid) -> bool {
    let mut guard = process_table().lock();
    let Some(index) = guard.index_of(pid) else { return false };
    guard.slots[index].killed = true;
    if guard.slots[index].state == ProcessState::Sleeping {
        guard.slots[index].state = ProcessState::Runnable;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::process::Pid;

    fn test_process(runnable: bool, level: MfqLevel, tickets: u32, priority: i32, ctime: u64) -> Process {
        let mut p = Process::new();
        p.state = if runnable { ProcessState::Runnable } else { ProcessState::Unused };
        p.pid = Pid(1);
        p.mfq_level = level;
        p.tickets = tickets;
        p.priority = priority;
        p.ctime = crate::clock::Ticks(ctime);
        p
    }

    #[test]
    fn round_robin_scans_from_last_position() {
        let slots = vec![
            test_process(true, MfqLevel::L1, 0, 0, 0),
            test_process(false, MfqLevel::L1, 0, 0, 0),
            test_process(true, MfqLevel::L1, 0, 0, 0),
        ];
        let mut next = 1;
        assert_eq!(pick_round_robin(&slots, &mut next), Some(2));
        assert_eq!(next, 0);
    }

    #[test]
    fn fifo_picks_smallest_ctime() {
        let slots = vec![
            test_process(true, MfqLevel::L2, 0, 0, 50),
            test_process(true, MfqLevel::L2, 0, 0, 10),
            test_process(true, MfqLevel::L2, 0, 0, 30),
        ];
        assert_eq!(pick_fifo(&slots), Some(1));
    }

    #[test]
    fn priority_picks_smallest_value_ties_broken_by_scan_order() {
        let slots = vec![
            test_process(true, MfqLevel::L3, 0, 10, 0),
            test_process(true, MfqLevel::L3, 0, 5, 0),
            test_process(true, MfqLevel::L3, 0, 5, 0),
        ];
        assert_eq!(pick_priority(&slots), Some(1));
    }

    #[test]
    fn lottery_fairness_statistical_bound() {
        let slots = vec![
            test_process(true, MfqLevel::L1, 100, 0, 0),
            test_process(true, MfqLevel::L1, 300, 0, 0),
        ];
        let mut rng = Tausworthe::new();
        let mut second_wins = 0;
        for _ in 0..10_000 {
            if pick_lottery(&slots, &mut rng) == Some(1) {
                second_wins += 1;
            }
        }
        assert!((6800..=8200).contains(&second_wins), "second process won {second_wins}/10000 times");
    }

    #[test]
    fn mfq_skips_empty_level_and_remembers_level() {
        let slots = vec![
            test_process(true, MfqLevel::L2, 0, 0, 5),
            test_process(true, MfqLevel::L3, 0, 1, 0),
        ];
        let mut state = MfqState { effective_level: MfqLevel::L1, rng: Tausworthe::new() };
        let picked = pick_mfq(&slots, &mut state);
        assert_eq!(picked, Some(0));
        assert_eq!(state.effective_level, MfqLevel::L2);
    }
}
