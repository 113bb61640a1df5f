//! Per-process syscall telemetry and the global invocation log.
//!
//! Grounded in `original_source/proc.c`'s `invocation_log` and the
//! `struct syscallarg`/`struct date` telemetry fields it walks, redesigned
//! per `spec.md` section 9: the per-call argument snapshot's type-tag
//! strings become a tagged `ArgValue` variant instead of a `type[3]`
//! array of strings paired with separate `int_argv`/`ptr_argv`/`str_argv`
//! arrays, and the per-process history lists are a bounded ring buffer
//! (`crate::queue::Queue`) instead of one heap node per invocation.

use crate::clock::Timestamp;
use crate::param::SYSCALL_HISTORY;
use crate::proc::process::Pid;
use crate::queue::Queue;
use arrayvec::{ArrayString, ArrayVec};
use std::fmt;

/// A single typed syscall argument, replacing the original's type-tag
/// string plus separate typed-value arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    Int(i32),
    Ptr(u64),
    Str(ArrayString<64>),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Int(n) => write!(f, "{n}"),
            ArgValue::Ptr(p) => write!(f, "{p:#x}"),
            ArgValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Up to three typed arguments captured at the moment a syscall was
/// entered. `spec.md` section 3: "Each snapshot carries up to three type
/// tags ... and a union of typed argument values".
pub type ArgSnapshot = ArrayVec<ArgValue, 3>;

/// Per-process, per-syscall-number telemetry.
#[derive(Clone, Debug)]
pub struct SyscallRecord {
    pub name: &'static str,
    pub count: u64,
    pub datelist: Queue<Timestamp, SYSCALL_HISTORY>,
    pub arglist: Queue<ArgSnapshot, SYSCALL_HISTORY>,
}

impl SyscallRecord {
    pub fn new(name: &'static str) -> SyscallRecord {
        SyscallRecord {
            name,
            count: 0,
            datelist: Queue::new(),
            arglist: Queue::new(),
        }
    }

    /// Record one invocation. Called once per valid dispatch, in
    /// lock-step with the global invocation log (`spec.md` section 4.6).
    pub fn record(&mut self, at: Timestamp, args: ArgSnapshot) {
        self.count += 1;
        self.datelist.push_back_overwrite(at);
        self.arglist.push_back_overwrite(args);
    }

    /// Pretty-print every retained invocation of this call, newest
    /// history entries only (older ones have scrolled out of the bounded
    /// ring buffer — see `param::SYSCALL_HISTORY`).
    pub fn format_invocations(&self, pid: Pid) -> std::string::String {
        use std::fmt::Write;
        let mut out = std::string::String::new();
        for (date, args) in self.datelist.iter().zip(self.arglist.iter()) {
            let _ = write!(out, "{} syscall: {} pid={} at {}", self.count, self.name, pid.0, date);
            if !args.is_empty() {
                let _ = write!(out, " (");
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        let _ = write!(out, ", ");
                    }
                    let _ = write!(out, "{a}");
                }
                let _ = write!(out, ")");
            }
            out.push('\n');
        }
        out
    }
}

struct LogNode {
    name: &'static str,
    timestamp: Timestamp,
    pid: Pid,
    next: Option<Box<LogNode>>,
}

/// Singly-linked list of every syscall ever dispatched, never pruned.
/// `spec.md` section 3: "Global invocation log: singly-linked list of
/// (syscall-name, timestamp, pid), appended once per system-call entry".
///
/// Protected transitively by the process-table lock held during dispatch
/// (`spec.md` section 5), so `InvocationLog` itself does no locking — it
/// is only ever touched from inside `ProcessTable`'s guarded operations.
#[derive(Default)]
pub struct InvocationLog {
    head: Option<Box<LogNode>>,
    tail: *mut LogNode,
    len: usize,
}

// Safety: `InvocationLog` is only ever reached through `ProcessTable`,
// whose single spinlock already serializes access across threads.
unsafe impl Send for InvocationLog {}
unsafe impl Sync for InvocationLog {}

impl InvocationLog {
    pub const fn new() -> InvocationLog {
        InvocationLog {
            head: None,
            tail: core::ptr::null_mut(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append one node at the tail.
    pub fn push(&mut self, name: &'static str, timestamp: Timestamp, pid: Pid) {
        let mut node = Box::new(LogNode {
            name,
            timestamp,
            pid,
            next: None,
        });
        let node_ptr: *mut LogNode = &mut *node;

        if self.tail.is_null() {
            self.head = Some(node);
        } else {
            // Safety: `self.tail` always points at the current last node
            // owned by `self.head`'s chain, or is null when the list is
            // empty (handled above).
            unsafe {
                (*self.tail).next = Some(node);
            }
        }
        self.tail = node_ptr;
        self.len += 1;
    }

    /// Walk the whole log in insertion order, formatting each entry.
    /// Grounded in `original_source/proc.c`'s `log_syscalls`.
    pub fn format_all(&self) -> std::string::String {
        use std::fmt::Write;
        let mut out = std::string::String::new();
        let mut cur = self.head.as_deref();
        while let Some(node) = cur {
            let _ = writeln!(out, "{} pid={} at {}", node.name, node.pid.0, node.timestamp);
            cur = node.next.as_deref();
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_log_preserves_order() {
        let mut log = InvocationLog::new();
        log.push("getpid", Timestamp(1), Pid(1));
        log.push("write", Timestamp(2), Pid(1));
        log.push("write", Timestamp(3), Pid(1));
        assert_eq!(log.len(), 3);
        let text = log.format_all();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("getpid"));
        assert!(lines[2].contains("at "));
    }

    #[test]
    fn record_tracks_count_and_history() {
        let mut rec = SyscallRecord::new("write");
        let mut args: ArgSnapshot = ArrayVec::new();
        args.push(ArgValue::Int(3));
        rec.record(Timestamp(5), args);
        assert_eq!(rec.count, 1);
        assert_eq!(rec.datelist.len(), 1);
    }
}
