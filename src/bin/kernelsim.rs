//! Developer-facing harness around the syscall table: boots a process
//! table and scheduler, drives a small scripted workload through
//! `kernelcore::syscall::dispatch`, and prints the resulting process dump
//! and invocation log. Not a new syscall surface itself — everything here
//! goes through the same `dispatch` entry point a real trap handler would
//! use.
//!
//! Grounded in the pack's `mkfs` tool (a `clap`-derived binary shipped
//! alongside a kernel crate) for the CLI shape, and in `log`/`env_logger`
//! for the ambient logging stack the crate already depends on.

use clap::{Parser, ValueEnum};
use kernelcore::proc::rand::Tausworthe;
use kernelcore::proc::scheduler::{self, Scheduler};
use kernelcore::proc::table::{boot, process_table};
use kernelcore::shm;
use kernelcore::syscall::dispatch::{dispatch, Syscall};
use kernelcore::syscall::telemetry::ArgValue;
use kernelcore::Pid;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Policy {
    RoundRobin,
    Mfq,
}

/// `spec.md` section 6, "CLI/user surface": a shell harness for the
/// syscall table, not a new syscall.
#[derive(Parser, Debug)]
struct Args {
    /// Scheduler policy to install after boot, overriding the
    /// compile-time `mfq_scheduler` feature default.
    #[arg(long)]
    policy: Option<Policy>,

    /// Seed for the workload driver's own random choices (how many
    /// children to fork, which one to kill). Does not affect the
    /// scheduler's lottery draw, which `spec.md` section 4.3 fixes.
    #[arg(long, default_value_t = 12345)]
    seed: i32,

    /// Number of children `init` forks before the demo shared-memory and
    /// kill scenarios run.
    #[arg(long, default_value_t = 3)]
    workload: usize,
}

fn call(caller: Pid, syscall: Syscall, args: &[ArgValue]) -> i64 {
    match dispatch(caller, syscall as u32, args) {
        Ok(value) => value,
        Err(e) => {
            log::error!("pid {}: {} failed: {e}", caller.0, syscall.name());
            -1
        }
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    let mut workload_rng = Tausworthe::with_seed(args.seed);

    let init = boot();
    log::info!("booted: init pid {}", init.0);

    if let Some(policy) = args.policy {
        process_table().lock().scheduler = match policy {
            Policy::RoundRobin => Scheduler::round_robin(),
            Policy::Mfq => Scheduler::mfq(),
        };
        log::info!("scheduler policy overridden to {policy:?}");
    }

    let mut children = Vec::with_capacity(args.workload);
    for _ in 0..args.workload {
        let child_pid = call(init, Syscall::Fork, &[]);
        if child_pid < 0 {
            log::warn!("fork failed, stopping workload early");
            break;
        }
        let child = Pid(child_pid as u32);
        let tickets = 50 + workload_rng.next(400) as u32;
        call(init, Syscall::ChTickets, &[ArgValue::Int(child.0 as i32), ArgValue::Int(tickets as i32)]);
        children.push(child);
    }
    log::info!("forked {} children: {:?}", children.len(), children.iter().map(|p| p.0).collect::<Vec<_>>());

    // The per-CPU scheduler loop (`spec.md` section 4.3): scan for a
    // RUNNABLE slot, mark it RUNNING, "context-switch" to it. Driven here
    // once per forked child purely to exercise the pick — there is no
    // instruction stream to actually run once picked, so each pass just
    // reports who would have gotten the CPU next.
    for _ in 0..children.len() {
        match scheduler::pick_and_run() {
            Some(pid) => log::info!("scheduler picked pid {}", pid.0),
            None => break,
        }
    }

    // Shared-memory visibility demo (`spec.md` section 8 scenario 5):
    // init opens a family-writable block, the first child writes to it,
    // init reads the write back.
    if let Some(&writer) = children.first() {
        call(init, Syscall::ShmOpen, &[ArgValue::Int(1), ArgValue::Int(1), ArgValue::Int(1)]);
        let init_base = call(init, Syscall::ShmAttach, &[ArgValue::Int(1)]);
        let child_base = call(writer, Syscall::ShmAttach, &[ArgValue::Int(1)]);
        {
            let mut guard = process_table().lock();
            shm::shm_write(&mut guard, writer, child_base as u64, b"hello from child");
            let seen = shm::shm_read(&guard, init, init_base as u64, "hello from child".len());
            log::info!("init observed shared write: {:?}", std::string::String::from_utf8_lossy(&seen));
        }
        call(init, Syscall::ShmClose, &[ArgValue::Int(1)]);
    }

    // Kill demo: mark the last child killed, let it notice cooperatively
    // and exit, then reap it (`spec.md` section 4.4/8 scenario 6).
    if let Some(&victim) = children.last() {
        let killed = call(init, Syscall::Kill, &[ArgValue::Int(victim.0 as i32)]);
        log::info!("kill({}) returned {killed}", victim.0);
        call(victim, Syscall::Exit, &[ArgValue::Int(-1)]);
    }

    for &child in &children {
        if child == *children.last().unwrap() {
            continue;
        }
        call(child, Syscall::Exit, &[ArgValue::Int(0)]);
    }
    loop {
        match dispatch(init, Syscall::Wait as u32, &[]) {
            Ok(pid) if pid >= 0 => log::info!("init reaped pid {pid}"),
            _ => break,
        }
    }

    call(init, Syscall::Ps, &[]);
    call(init, Syscall::LogSyscalls, &[]);
}
