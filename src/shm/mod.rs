//! Shared-memory manager (`spec.md` section 4.5), grounded in
//! `original_source/sharedm.c`'s `shmblock`/`shmtable`.
//!
//! The table itself (`open`/`attach`/`close`) only knows about pages and
//! ids; it has no notion of "the calling process's address space" or
//! "is this caller a child of the owner". Those require the process
//! table, so the free functions here sit one layer up, taking the
//! already-locked `ProcessTableInner` the same way `proc::scheduler`'s
//! `wakeup1` does, and additionally locking `shm_table()` — a second,
//! independently named lock per `spec.md` section 5 ("shared-memory
//! open/attach/close are serialized by the shared-memory lock").

pub mod table;

use crate::error::ShmError;
use crate::param::{MAXSHMPBLOCK, MAXSHM_MEMBERS};
use crate::proc::address_space::PAGE_SIZE;
use crate::proc::process::{Pid, ShmMapping};
use crate::proc::table::ProcessTableInner;
use crate::sync::spinmutex::SpinMutex;
use arrayvec::ArrayVec;
use std::sync::OnceLock;
use table::{Page, ShmTable};

/// One shared-memory block. `original_source/sharedm.c`'s `struct
/// shmblock` plus a `members` list the original never finished (its
/// `sys_shm_attach`/`sys_shm_close` are empty stubs); `members` is needed
/// here so `shm_close` can tell a non-owner attacher apart from a
/// stranger.
pub struct SharedBlock {
    pub id: i32,
    pub owner: Pid,
    pub flags: u8,
    pub ref_count: u32,
    pub size: usize,
    pub pages: std::vec::Vec<Page>,
    pub members: ArrayVec<Pid, MAXSHM_MEMBERS>,
}

static SHM_TABLE: OnceLock<SpinMutex<ShmTable>> = OnceLock::new();

pub fn shm_table() -> &'static SpinMutex<ShmTable> {
    SHM_TABLE.get_or_init(|| SpinMutex::new("shmtable", ShmTable::new()))
}

/// `spec.md` section 4.5: `shm_open(id, page_count, flag)`.
pub fn shm_open(owner: Pid, id: i32, page_count: usize, flags: u8) -> Result<(), ShmError> {
    if page_count > MAXSHMPBLOCK {
        return Err(ShmError::TooManyPages);
    }
    shm_table().lock().open(id, owner, page_count, flags)
}

/// `spec.md` section 4.5: `shm_attach(id)`. Maps the block's pages into
/// `caller`'s (simulated) address space above its current `sz`, records
/// the mappings in `Process::shm_mapping`, and returns the base virtual
/// address.
pub fn shm_attach(procs: &mut ProcessTableInner, caller: Pid, id: i32) -> Result<u64, ShmError> {
    let caller_index = procs.index_of(caller).expect("shm_attach: caller process does not exist");
    let mut shm = shm_table().lock();
    let owner = shm.get(id).ok_or(ShmError::NotFound)?.owner;
    let is_child_of_owner = procs.slots[caller_index].parent == Some(owner);
    let above = procs.slots[caller_index].sz;

    let address_space = procs.slots[caller_index]
        .address_space
        .as_mut()
        .expect("shm_attach: process has no address space")
        .as_mut();
    let (base, pages, writable) = shm.attach(id, caller, is_child_of_owner, address_space, above)?;
    drop(shm);

    for (i, page) in pages.into_iter().enumerate() {
        let mapping = ShmMapping {
            va: base + i as u64 * PAGE_SIZE,
            page,
            writable,
        };
        procs.slots[caller_index]
            .shm_mapping
            .try_push(mapping)
            .expect("shm_attach: Process::shm_mapping capacity exceeded");
    }
    Ok(base)
}

/// `spec.md` section 4.5: `shm_close(id)`. Does not unmap from any
/// process still holding the mapping in its `shm_mapping` list — see the
/// module doc comment and `spec.md` section 9.
pub fn shm_close(caller: Pid, id: i32) -> Result<(), ShmError> {
    shm_table().lock().close(id, caller)
}

fn find_mapping(proc_slot: &crate::proc::process::Process, va: u64) -> Option<&ShmMapping> {
    proc_slot.shm_mapping.iter().find(|m| va >= m.va && va < m.va + PAGE_SIZE)
}

/// Write `data` into a shared page this process has attached. Panics if
/// `va` is not a shared mapping, or if the mapping is read-only —
/// `spec.md` section 8 scenario 5: "with flag=0, child writes panic/
/// faults", the same access-violation-panics-the-process-family as a
/// faulting user memory access.
pub fn shm_write(procs: &mut ProcessTableInner, caller: Pid, va: u64, data: &[u8]) {
    let index = procs.index_of(caller).expect("shm_write: caller process does not exist");
    let mapping = find_mapping(&procs.slots[index], va).expect("shm_write: va is not a shared mapping");
    assert!(mapping.writable, "shm_write: write to a read-only shared mapping");
    let offset = (va - mapping.va) as usize;
    let mut page = mapping.page.lock().expect("shared page mutex poisoned");
    page[offset..offset + data.len()].copy_from_slice(data);
}

/// Read `len` bytes from a shared page this process has attached. Reads
/// are always permitted once attached, regardless of `writable`.
pub fn shm_read(procs: &ProcessTableInner, caller: Pid, va: u64, len: usize) -> std::vec::Vec<u8> {
    let index = procs.index_of(caller).expect("shm_read: caller process does not exist");
    let mapping = find_mapping(&procs.slots[index], va).expect("shm_read: va is not a shared mapping");
    let offset = (va - mapping.va) as usize;
    let page = mapping.page.lock().expect("shared page mutex poisoned");
    page[offset..offset + len].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proc::table::ProcessTableInner;

    fn fresh() -> ProcessTableInner {
        ProcessTableInner::new()
    }

    #[test]
    fn visibility_scenario_flag_zero_child_write_panics() {
        let mut procs = fresh();
        let parent = procs.userinit();
        shm_open(parent, 7, 2, 0).unwrap();
        let child = procs.fork(parent).unwrap();

        let parent_base = shm_attach(&mut procs, parent, 7).unwrap();
        shm_write(&mut procs, parent, parent_base, b"hi");

        let child_base = shm_attach(&mut procs, child, 7).unwrap();
        let read_back = shm_read(&mut procs, child, child_base, 2);
        assert_eq!(&read_back, b"hi");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            shm_write(&mut procs, child, child_base, b"no");
        }));
        assert!(result.is_err());
    }

    #[test]
    fn visibility_scenario_flag_one_child_write_is_visible_to_parent() {
        let mut procs = fresh();
        let parent = procs.userinit();
        shm_open(parent, 8, 1, 1).unwrap();
        let child = procs.fork(parent).unwrap();

        let parent_base = shm_attach(&mut procs, parent, 8).unwrap();
        let child_base = shm_attach(&mut procs, child, 8).unwrap();
        shm_write(&mut procs, child, child_base, b"x");
        let read_back = shm_read(&mut procs, parent, parent_base, 1);
        assert_eq!(&read_back, b"x");
    }
}
