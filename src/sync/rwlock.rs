//! Reader/writer locks. `spec.md` section 4.1: "maintains reader count
//! and writer-present flag. Two variants: reader-preferring (RW) and
//! writer-preferring-blocking (WR). Each exposes four operations with the
//! standard semantics. Implementations must prevent the excluded class
//! from progressing while the preferred class is active/waiting."
//!
//! Built in the teacher's `SpinMutex`-plus-sleep-channel style: state
//! lives behind a `SpinMutex`, contenders spin-check-then-sleep on a
//! dedicated channel rather than busy-waiting on the state lock itself.

use super::spinmutex::SpinMutex;
use crate::proc::process::Channel;
use crate::proc::scheduler::{sleep_without_spin, wakeup};

/// Reader-preferring reader/writer lock: readers never wait behind a
/// writer that is merely waiting, only behind one that is active.
pub struct RwLock {
    state: SpinMutex<RwState>,
    reader_chan: u8,
    writer_chan: u8,
}

#[derive(Default)]
struct RwState {
    readers: u32,
    writer: bool,
}

impl RwLock {
    pub const fn new(name: &'static str) -> RwLock {
        RwLock {
            state: SpinMutex::new(name, RwState { readers: 0, writer: false }),
            reader_chan: 0,
            writer_chan: 0,
        }
    }

    pub fn read_lock(&self) {
        loop {
            {
                let mut s = self.state.lock();
                if !s.writer {
                    s.readers += 1;
                    return;
                }
            }
            sleep_without_spin(Channel::of(&self.reader_chan));
        }
    }

    pub fn read_unlock(&self) {
        let readers_left = {
            let mut s = self.state.lock();
            s.readers -= 1;
            s.readers
        };
        if readers_left == 0 {
            wakeup(Channel::of(&self.writer_chan));
        }
    }

    pub fn write_lock(&self) {
        loop {
            {
                let mut s = self.state.lock();
                if !s.writer && s.readers == 0 {
                    s.writer = true;
                    return;
                }
            }
            sleep_without_spin(Channel::of(&self.writer_chan));
        }
    }

    pub fn write_unlock(&self) {
        {
            let mut s = self.state.lock();
            s.writer = false;
        }
        wakeup(Channel::of(&self.writer_chan));
        wakeup(Channel::of(&self.reader_chan));
    }
}

/// Writer-preferring reader/writer lock: a waiting writer blocks new
/// readers from starting, so writers cannot starve under a steady stream
/// of readers.
pub struct WrLock {
    state: SpinMutex<WrState>,
    reader_chan: u8,
    writer_chan: u8,
}

#[derive(Default)]
struct WrState {
    readers: u32,
    writer: bool,
    waiting_writers: u32,
}

impl WrLock {
    pub const fn new(name: &'static str) -> WrLock {
        WrLock {
            state: SpinMutex::new(
                name,
                WrState { readers: 0, writer: false, waiting_writers: 0 },
            ),
            reader_chan: 0,
            writer_chan: 0,
        }
    }

    pub fn read_lock(&self) {
        loop {
            {
                let mut s = self.state.lock();
                if !s.writer && s.waiting_writers == 0 {
                    s.readers += 1;
                    return;
                }
            }
            sleep_without_spin(Channel::of(&self.reader_chan));
        }
    }

    pub fn read_unlock(&self) {
        let readers_left = {
            let mut s = self.state.lock();
            s.readers -= 1;
            s.readers
        };
        if readers_left == 0 {
            wakeup(Channel::of(&self.writer_chan));
        }
    }

    pub fn write_lock(&self) {
        {
            let mut s = self.state.lock();
            s.waiting_writers += 1;
        }
        loop {
            {
                let mut s = self.state.lock();
                if !s.writer && s.readers == 0 {
                    s.writer = true;
                    s.waiting_writers -= 1;
                    return;
                }
            }
            sleep_without_spin(Channel::of(&self.writer_chan));
        }
    }

    pub fn write_unlock(&self) {
        {
            let mut s = self.state.lock();
            s.writer = false;
        }
        wakeup(Channel::of(&self.writer_chan));
        wakeup(Channel::of(&self.reader_chan));
    }
}
