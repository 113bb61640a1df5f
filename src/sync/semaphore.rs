//! Counting semaphore, grounded in `spec.md` section 4.1: "non-negative
//! counter with internal spinlock and sleep channel. `wait` decrements,
//! sleeping while zero; `signal` increments and wakes one sleeper."

use super::spinmutex::SpinMutex;
use crate::proc::process::Channel;
use crate::proc::scheduler::{sleep_without_spin, wakeup};

pub struct Semaphore {
    count: SpinMutex<u32>,
}

impl Semaphore {
    pub const fn new(name: &'static str, initial: u32) -> Semaphore {
        Semaphore {
            count: SpinMutex::new(name, initial),
        }
    }

    pub fn wait(&self) {
        loop {
            {
                let mut count = self.count.lock();
                if *count > 0 {
                    *count -= 1;
                    return;
                }
            }
            sleep_without_spin(Channel::of(self));
        }
    }

    pub fn signal(&self) {
        {
            let mut count = self.count.lock();
            *count += 1;
        }
        wakeup(Channel::of(self));
    }

    pub fn available(&self) -> u32 {
        *self.count.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_decrements_and_signal_restores() {
        let sem = Semaphore::new("test", 1);
        sem.wait();
        assert_eq!(sem.available(), 0);
        sem.signal();
        assert_eq!(sem.available(), 1);
    }
}
