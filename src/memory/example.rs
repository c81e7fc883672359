//! Pooled example handles and derived-example chains.
//!
//! An example wraps one native feature-vector buffer. Derived examples form a
//! singly-linked chain behind the head; every node in the chain refers to the
//! head's allocation but only the head ever frees it.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::pool::PoolCore;
use crate::engine::RawExample;

#[derive(Default)]
struct Slot {
    owner: Option<Weak<PoolCore>>,
    raw: Option<RawExample>,
}

struct ExampleCell {
    slot: Mutex<Slot>,
    inner: Mutex<Option<Example>>,
}

/// Shared reference to one example node.
///
/// Clones refer to the same node. Once a node is unlinked its buffer and
/// owner are gone for good.
#[derive(Clone)]
pub struct Example {
    cell: Arc<ExampleCell>,
}

impl Example {
    pub(crate) fn new(owner: Weak<PoolCore>, raw: RawExample) -> Self {
        Self::from_slot(Slot { owner: Some(owner), raw: Some(raw) })
    }

    fn from_slot(slot: Slot) -> Self {
        Self {
            cell: Arc::new(ExampleCell { slot: Mutex::new(slot), inner: Mutex::new(None) }),
        }
    }

    /// Native buffer, or `None` once the example has been freed.
    pub fn raw(&self) -> Option<RawExample> {
        self.cell.slot.lock().raw
    }

    /// True once the example can no longer be returned to a pool.
    pub fn is_orphaned(&self) -> bool {
        let slot = self.cell.slot.lock();
        slot.owner.is_none() || slot.raw.is_none()
    }

    /// Next node in the derived chain.
    pub fn inner(&self) -> Option<Example> {
        self.cell.inner.lock().clone()
    }

    /// Append a derived node that shares this example's buffer.
    ///
    /// The new node is attached at the tail of the chain and does not own
    /// the buffer.
    pub fn derive(&self) -> Example {
        let slot = self.cell.slot.lock();
        let derived = Self::from_slot(Slot { owner: slot.owner.clone(), raw: slot.raw });
        drop(slot);

        let mut tail = self.clone();
        while let Some(next) = tail.inner() {
            tail = next;
        }
        *tail.cell.inner.lock() = Some(derived.clone());
        derived
    }

    /// Number of derived nodes behind this one.
    pub fn chain_len(&self) -> usize {
        let mut len = 0;
        let mut node = self.inner();
        while let Some(next) = node {
            len += 1;
            node = next.inner();
        }
        len
    }

    pub fn same_node(&self, other: &Example) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    pub(crate) fn owner(&self) -> Option<Weak<PoolCore>> {
        self.cell.slot.lock().owner.clone()
    }

    /// Clear buffer and owner so later passes are no-ops.
    pub(crate) fn unlink(&self) {
        let mut slot = self.cell.slot.lock();
        slot.owner = None;
        slot.raw = None;
    }

    /// Clear every derived node behind this one. Buffers are not freed.
    pub(crate) fn unlink_chain(&self) -> usize {
        let mut cleared = 0;
        let mut node = self.inner();
        while let Some(next) = node {
            next.unlink();
            cleared += 1;
            node = next.inner();
        }
        cleared
    }
}

impl std::fmt::Debug for Example {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Example")
            .field("raw", &self.raw())
            .field("orphaned", &self.is_orphaned())
            .field("chain_len", &self.chain_len())
            .finish()
    }
}
