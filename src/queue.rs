//! Fixed-capacity ring buffer.
//!
//! Generalized from the teacher's single `QUEUE_SIZE`-sized `Queue<T>`
//! into a const-generic buffer so it can back both small queues and the
//! per-syscall telemetry history (`param::SYSCALL_HISTORY` entries),
//! without each call site recompiling a different monomorphic constant
//! module. Used to replace the page-per-node linked lists `spec.md`
//! section 9 flags as a leak: telemetry lists are indexed arenas bounded
//! per process instead.

use core::iter::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueueError {
    NoSpace,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Queue<T, const N: usize> {
    inner: [Option<T>; N],
    /// The index of the first item in the queue.
    queue_start: usize,
    /// The length of the queue.
    queue_len: usize,
}

impl<T, const N: usize> Queue<T, N> {
    /// Not `const` (unlike the rest of this crate's `new` constructors):
    /// building an array of a non-`Copy` element without `unsafe` needs
    /// `core::array::from_fn`, which is not yet usable in a `const fn`.
    pub fn new() -> Queue<T, N> {
        Queue {
            inner: std::array::from_fn(|_| None),
            queue_start: 0,
            queue_len: 0,
        }
    }
}

impl<T, const N: usize> Default for Queue<T, N> {
    fn default() -> Self {
        Queue::new()
    }
}

impl<T, const N: usize> Queue<T, N> {
    /// Accessor method for the length of the queue.
    pub fn len(&self) -> usize {
        self.queue_len
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn capacity(&self) -> usize {
        N
    }
    /// Returns how many items can currently be added to the queue.
    pub fn space_remaining(&self) -> usize {
        self.inner.len() - self.len()
    }
    /// Returns the index of the last item in the queue.
    fn queue_end(&self) -> usize {
        (self.queue_start + self.queue_len - 1) % self.inner.len()
    }

    /// Removes an item from the front of the queue.
    pub fn pop_front(&mut self) -> Option<T> {
        let item = self.inner[self.queue_start].take();
        if item.is_some() {
            self.queue_start += 1;
            self.queue_start %= self.inner.len();
            self.queue_len -= 1;
        }
        item
    }
    /// Adds an item to the end of the queue.
    pub fn push_back(&mut self, value: T) -> Result<(), QueueError> {
        if self.space_remaining() == 0 {
            return Err(QueueError::NoSpace);
        }

        self.queue_len += 1;
        self.inner[self.queue_end()] = Some(value);
        Ok(())
    }
    /// Adds an item to the end of the queue, discarding the oldest entry
    /// if the queue is already at capacity. Used for telemetry history,
    /// which tracks only the most recent `N` invocations per syscall
    /// number rather than growing without bound.
    pub fn push_back_overwrite(&mut self, value: T) {
        if self.space_remaining() == 0 {
            self.pop_front();
        }
        let _ = self.push_back(value);
    }
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.queue_len).map(move |i| {
            self.inner[(self.queue_start + i) % self.inner.len()]
                .as_ref()
                .expect("queue slot within len must be occupied")
        })
    }
}

impl<T, const N: usize> Iterator for Queue<T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop_front()
    }
}
impl<T, const N: usize> ExactSizeIterator for Queue<T, N> {
    fn len(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_back_overwrite_drops_oldest() {
        let mut q: Queue<u32, 3> = Queue::new();
        q.push_back_overwrite(1);
        q.push_back_overwrite(2);
        q.push_back_overwrite(3);
        q.push_back_overwrite(4);
        assert_eq!(q.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
    }

    #[test]
    fn fifo_order() {
        let mut q: Queue<u32, 4> = Queue::new();
        q.push_back(10).unwrap();
        q.push_back(20).unwrap();
        assert_eq!(q.pop_front(), Some(10));
        assert_eq!(q.pop_front(), Some(20));
        assert_eq!(q.pop_front(), None);
    }
}
