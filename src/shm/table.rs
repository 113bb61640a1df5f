//! Fixed-capacity shared-memory table, grounded in
//! `original_source/sharedm.c`'s `shmtable`/`shmblock` layout (`id`,
//! `owner`, `flags`, `ref_count`, `size`, fixed-size `pages[]`). The
//! original's `ref_count == -1` sentinel for "slot free" becomes a
//! separate `in_use: bool` here — an idiomatic Rust table does not
//! overload a signed counter with a free/used flag.
//!
//! Physical pages are `Arc<Mutex<[u8; PAGE_SIZE]>>`: attaching a block
//! clones the `Arc`, so a page stays alive as long as any attacher (or
//! the block itself) still references it. `spec.md` section 9's known
//! limitation — `shm_close` drops the block's own `ref_count` but never
//! unmaps the pages from processes that attached earlier — falls out of
//! this directly: those processes' `Process::shm_mapping` entries keep
//! their `Arc` clones alive and readable/writable after the owning block
//! is gone from the table.

use super::SharedBlock;
use crate::error::ShmError;
use crate::param::MAXSHM;
use crate::proc::address_space::PAGE_SIZE;
use crate::proc::process::Pid;
use std::sync::{Arc, Mutex};

pub type Page = Arc<Mutex<[u8; PAGE_SIZE as usize]>>;

pub struct ShmTable {
    blocks: [Option<SharedBlock>; MAXSHM],
}

impl ShmTable {
    pub fn new() -> ShmTable {
        ShmTable {
            blocks: std::array::from_fn(|_| None),
        }
    }

    fn find(&self, id: i32) -> Option<usize> {
        self.blocks.iter().position(|b| matches!(b, Some(block) if block.id == id))
    }

    /// `spec.md` section 4.5: create a block. Reopening a live `id` fails
    /// rather than panicking (`original_source/sharedm.c`'s `sys_shm_open`
    /// panics on "reopen shared mem", but a caller-supplied duplicate id is
    /// a validation failure, not a kernel invariant violation — see
    /// `DESIGN.md`).
    pub fn open(&mut self, id: i32, owner: Pid, page_count: usize, flags: u8) -> Result<(), ShmError> {
        if self.find(id).is_some() {
            return Err(ShmError::AlreadyOpen);
        }
        if page_count == 0 || page_count > crate::param::MAXSHMPBLOCK {
            return Err(ShmError::TooManyPages);
        }
        if flags > 1 {
            return Err(ShmError::InvalidFlag);
        }
        let slot = self.blocks.iter().position(|b| b.is_none()).ok_or(ShmError::TableFull)?;
        let pages = (0..page_count)
            .map(|_| Arc::new(Mutex::new([0u8; PAGE_SIZE as usize])))
            .collect();
        self.blocks[slot] = Some(SharedBlock {
            id,
            owner,
            flags,
            ref_count: 0,
            size: page_count,
            pages,
            members: arrayvec::ArrayVec::new(),
        });
        Ok(())
    }

    /// `spec.md` section 4.5: decide read/write permission for `caller`,
    /// then hand back the block's pages (for the caller's address space to
    /// map) plus the base virtual address it reserved. `is_child_of_owner`
    /// is computed by the caller from the process table, since the shared-
    /// memory table has no notion of the parent/child relationship.
    pub fn attach(
        &mut self,
        id: i32,
        caller: Pid,
        is_child_of_owner: bool,
        address_space: &mut dyn crate::proc::address_space::AddressSpace,
        above: u64,
    ) -> Result<(u64, std::vec::Vec<Page>, bool), ShmError> {
        let slot = self.find(id).ok_or(ShmError::NotFound)?;
        let block = self.blocks[slot].as_mut().unwrap();
        let is_owner = block.owner == caller;
        let writable = match block.flags {
            0 => is_owner,
            1 => is_owner || is_child_of_owner,
            _ => unreachable!("shm_open already rejects flags > 1"),
        };
        if block.flags == 1 && !writable {
            return Err(ShmError::AccessDenied);
        }
        let base = address_space.reserve_above(above, block.pages.len());
        block.ref_count += 1;
        if !block.members.contains(&caller) {
            let _ = block.members.try_push(caller);
        }
        Ok((base, block.pages.clone(), writable))
    }

    /// `spec.md` section 4.5: decrement `ref_count`; free the slot once it
    /// reaches zero. Deliberately does not reach into any attacher's
    /// address space to unmap — see the module doc comment.
    pub fn close(&mut self, id: i32, caller: Pid) -> Result<(), ShmError> {
        let slot = self.find(id).ok_or(ShmError::NotFound)?;
        let block = self.blocks[slot].as_mut().unwrap();
        if block.owner != caller && !block.members.contains(&caller) {
            return Err(ShmError::AccessDenied);
        }
        block.ref_count = block.ref_count.saturating_sub(1);
        if block.ref_count == 0 {
            self.blocks[slot] = None;
        }
        Ok(())
    }

    pub fn get(&self, id: i32) -> Option<&SharedBlock> {
        self.find(id).and_then(|i| self.blocks[i].as_ref())
    }
}

impl Default for ShmTable {
    fn default() -> Self {
        ShmTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::address_space::{AddressSpace, SimulatedAddressSpace};

    #[test]
    fn open_then_reopen_same_id_fails() {
        let mut t = ShmTable::new();
        t.open(7, Pid(1), 2, 0).unwrap();
        assert_eq!(t.open(7, Pid(1), 2, 0), Err(ShmError::AlreadyOpen));
    }

    #[test]
    fn attach_owner_with_flag_zero_succeeds_and_bumps_ref_count() {
        let mut t = ShmTable::new();
        t.open(7, Pid(1), 2, 0).unwrap();
        let mut space = SimulatedAddressSpace::create();
        let (_base, pages, writable) = t.attach(7, Pid(1), false, &mut space, 0).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(writable);
        assert_eq!(t.get(7).unwrap().ref_count, 1);
    }

    #[test]
    fn attach_non_owner_with_flag_zero_is_read_only_not_denied() {
        let mut t = ShmTable::new();
        t.open(7, Pid(1), 2, 0).unwrap();
        let mut space = SimulatedAddressSpace::create();
        let (_base, _pages, writable) = t.attach(7, Pid(2), false, &mut space, 0).unwrap();
        assert!(!writable);
    }

    #[test]
    fn attach_non_owner_with_flag_one_and_not_child_is_denied() {
        let mut t = ShmTable::new();
        t.open(7, Pid(1), 2, 1).unwrap();
        let mut space = SimulatedAddressSpace::create();
        assert_eq!(
            t.attach(7, Pid(2), false, &mut space, 0).unwrap_err(),
            ShmError::AccessDenied
        );
    }

    #[test]
    fn close_frees_slot_once_ref_count_reaches_zero() {
        let mut t = ShmTable::new();
        t.open(7, Pid(1), 1, 0).unwrap();
        let mut space = SimulatedAddressSpace::create();
        t.attach(7, Pid(1), false, &mut space, 0).unwrap();
        t.close(7, Pid(1)).unwrap();
        assert!(t.get(7).is_none());
    }
}
