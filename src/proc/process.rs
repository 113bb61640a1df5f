//! The process slot, grounded in the teacher's `proc/process.rs`
//! `Process` struct and `spec.md` section 3's data model.

use super::address_space::AddressSpace;
use super::context::Context;
use crate::clock::Ticks;
use crate::param::{KSTACK_SIZE, MAX_SHM_MAPPINGS, NOFILE, N_SYSCALLS};
use crate::syscall::telemetry::SyscallRecord;
use arrayvec::{ArrayString, ArrayVec};

/// Process identifier. `0` is reserved for "no pid" / `UNUSED` slots
/// (`spec.md` section 3 invariant: "pid = 0 iff state = UNUSED").
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

/// An opaque sleep channel. `spec.md` glossary: "usually the address of a
/// kernel object, on which sleepers wait and wakers fire". Here it is a
/// plain token rather than a real pointer, since there is no hardware
/// memory to take the address of.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Channel(pub usize);

impl Channel {
    /// Derive a channel token from any value's address-like identity.
    /// Callers pass something they own for the lifetime of the sleep
    /// (e.g. `Channel::of(&some_shared_object)`), mirroring how xv6
    /// sleeps on the address of a lock or a process struct.
    pub fn of<T>(value: &T) -> Channel {
        Channel(value as *const T as usize)
    }
}

/// Opaque handle into the (out-of-scope) open-file table. The core only
/// moves these around on `fork`/`exit`; it never interprets them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FileHandle(pub u32);

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ProcessState {
    #[default]
    Unused,
    Embryo,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

/// MFQ level a process is scheduled at. `spec.md` section 3: "mfq_level:
/// integer in {1, 2, 3}, default 1".
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MfqLevel {
    L1 = 1,
    L2 = 2,
    L3 = 3,
}

impl Default for MfqLevel {
    fn default() -> Self {
        MfqLevel::L1
    }
}

impl MfqLevel {
    pub fn next(self) -> MfqLevel {
        match self {
            MfqLevel::L1 => MfqLevel::L2,
            MfqLevel::L2 => MfqLevel::L3,
            MfqLevel::L3 => MfqLevel::L1,
        }
    }
}

/// One attached shared-memory page. `spec.md` section 3: "shm_mapping[]:
/// bounded list of attached (va, pa) pairs" — here the "pa" side is the
/// actual shared page (`crate::shm::table::Page`, an `Arc<Mutex<..>>`)
/// rather than a bare address, since this simulation has no MMU to
/// resolve a physical address back into bytes.
#[derive(Clone, Debug)]
pub struct ShmMapping {
    pub va: u64,
    pub page: crate::shm::table::Page,
    pub writable: bool,
}

/// A process-table slot.
pub struct Process {
    pub state: ProcessState,
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub killed: bool,
    pub exit_status: i32,
    pub ctime: Ticks,
    pub priority: i32,
    pub mfq_level: MfqLevel,
    pub tickets: u32,
    pub address_space: Option<Box<dyn AddressSpace>>,
    pub sz: u64,
    pub kstack: Option<Box<[u8; KSTACK_SIZE]>>,
    pub context: Context,
    pub chan: Option<Channel>,
    pub ofile: [Option<FileHandle>; NOFILE],
    pub cwd: Option<FileHandle>,
    pub name: ArrayString<16>,
    pub syscalls: [SyscallRecord; N_SYSCALLS],
    pub shm_mapping: ArrayVec<ShmMapping, MAX_SHM_MAPPINGS>,
}

impl Process {
    pub fn new() -> Process {
        Process {
            state: ProcessState::Unused,
            pid: Pid(0),
            parent: None,
            killed: false,
            exit_status: 0,
            ctime: Ticks::default(),
            priority: 0,
            mfq_level: MfqLevel::L1,
            tickets: 0,
            address_space: None,
            sz: 0,
            kstack: None,
            context: Context::new(),
            chan: None,
            ofile: [None; NOFILE],
            cwd: None,
            name: ArrayString::new(),
            syscalls: std::array::from_fn(|_| SyscallRecord::new("")),
            shm_mapping: ArrayVec::new(),
        }
    }

    pub fn is_unused(&self) -> bool {
        self.state == ProcessState::Unused
    }

    pub fn is_runnable(&self) -> bool {
        self.state == ProcessState::Runnable
    }

    /// Reset a slot back to `UNUSED`, clearing every field `spec.md`
    /// section 3's invariants say must go back to zero/none. Caller must
    /// hold the process-table lock.
    pub fn reset(&mut self) {
        self.state = ProcessState::Unused;
        self.pid = Pid(0);
        self.parent = None;
        self.killed = false;
        self.exit_status = 0;
        self.ctime = Ticks::default();
        self.priority = 0;
        self.mfq_level = MfqLevel::L1;
        self.tickets = 0;
        self.address_space = None;
        self.sz = 0;
        self.kstack = None;
        self.chan = None;
        self.ofile = [None; NOFILE];
        self.cwd = None;
        self.name = ArrayString::new();
        self.shm_mapping.clear();
    }
}

impl Default for Process {
    fn default() -> Self {
        Process::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_process_is_unused_with_pid_zero() {
        let p = Process::new();
        assert!(p.is_unused());
        assert_eq!(p.pid, Pid(0));
    }

    #[test]
    fn reset_clears_scheduling_attributes() {
        let mut p = Process::new();
        p.priority = 3;
        p.tickets = 999;
        p.mfq_level = MfqLevel::L3;
        p.state = ProcessState::Zombie;
        p.pid = Pid(7);
        p.reset();
        assert_eq!(p.priority, 0);
        assert_eq!(p.tickets, 0);
        assert_eq!(p.mfq_level, MfqLevel::L1);
        assert_eq!(p.pid, Pid(0));
        assert!(p.is_unused());
    }
}
