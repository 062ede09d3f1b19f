//! Bulk allocation of independent blocks which are released together.
//!
//! An [AllocationGroup] records every block allocated through it, so that an
//! initialization routine can either keep all of its blocks or roll every
//! one of them back if a later step fails. See [AllocationGroup::transaction].

use crate::error::{Error, Result};
use std::fmt;


/// Identifier of a block allocated in an [AllocationGroup].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationId(u64);

struct Block {
    id: AllocationId,
    data: Box<[u8]>,
}

/// A group of zero-initialized memory blocks which can be freed in bulk.
///
/// Dropping the group frees every block in it.
///
/// # Examples
///
/// ```
/// use pcm_stream::alloc::AllocationGroup;
///
/// # fn main() -> pcm_stream::Result<()> {
/// let mut group = AllocationGroup::new();
///
/// let a = group.allocate(16)?;
/// let b = group.allocate(32)?;
/// assert_eq!(group.len(), 2);
///
/// group.get_mut(a).unwrap()[0] = 42;
/// assert_eq!(group.get(a).unwrap()[0], 42);
///
/// assert!(group.free(b));
/// assert!(group.get(b).is_none());
///
/// group.free_all();
/// assert!(group.is_empty());
/// # Ok(()) }
/// ```
#[derive(Default)]
pub struct AllocationGroup {
    blocks: Vec<Block>,
    next: u64,
}

impl AllocationGroup {
    /// Construct a new empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zeroed block of `size` bytes and record it in the group.
    ///
    /// On failure [Error::InsufficientMemory] is returned and the group is
    /// left unchanged.
    pub fn allocate(&mut self, size: usize) -> Result<AllocationId> {
        self.blocks
            .try_reserve(1)
            .map_err(|_| Error::InsufficientMemory)?;

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Error::InsufficientMemory)?;
        data.resize(size, 0);

        let id = AllocationId(self.next);
        self.next += 1;

        self.blocks.push(Block {
            id,
            data: data.into_boxed_slice(),
        });

        Ok(id)
    }

    /// Access the block with the given identifier.
    pub fn get(&self, id: AllocationId) -> Option<&[u8]> {
        let block = self.blocks.iter().find(|b| b.id == id)?;
        Some(&block.data[..])
    }

    /// Mutably access the block with the given identifier.
    pub fn get_mut(&mut self, id: AllocationId) -> Option<&mut [u8]> {
        let block = self.blocks.iter_mut().find(|b| b.id == id)?;
        Some(&mut block.data[..])
    }

    /// Free a single block. This is linear in the number of blocks.
    ///
    /// Returns `false` if the block is not part of the group.
    pub fn free(&mut self, id: AllocationId) -> bool {
        match self.blocks.iter().position(|b| b.id == id) {
            Some(index) => {
                self.blocks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Free every block in the group. The group can be reused afterwards.
    pub fn free_all(&mut self) {
        self.blocks.clear();
    }

    /// The number of blocks in the group.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Test if the group has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Start a transaction.
    ///
    /// Blocks allocated through the returned guard are freed when it's
    /// dropped, unless [Transaction::commit] has been called.
    ///
    /// # Examples
    ///
    /// ```
    /// use pcm_stream::alloc::AllocationGroup;
    ///
    /// # fn main() -> pcm_stream::Result<()> {
    /// let mut group = AllocationGroup::new();
    /// let kept = group.allocate(4)?;
    ///
    /// {
    ///     let mut tx = group.transaction();
    ///     tx.allocate(8)?;
    ///     tx.allocate(8)?;
    /// }
    ///
    /// assert_eq!(group.len(), 1);
    /// assert!(group.get(kept).is_some());
    /// # Ok(()) }
    /// ```
    pub fn transaction(&mut self) -> Transaction<'_> {
        Transaction {
            group: self,
            allocated: Vec::new(),
            committed: false,
        }
    }
}

impl fmt::Debug for AllocationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.blocks.iter().map(|b| (b.id, b.data.len())))
            .finish()
    }
}

/// A guard which rolls back allocations unless committed.
///
/// See [AllocationGroup::transaction].
pub struct Transaction<'a> {
    group: &'a mut AllocationGroup,
    allocated: Vec<AllocationId>,
    committed: bool,
}

impl Transaction<'_> {
    /// Allocate a block as part of the transaction.
    pub fn allocate(&mut self, size: usize) -> Result<AllocationId> {
        self.allocated
            .try_reserve(1)
            .map_err(|_| Error::InsufficientMemory)?;

        let id = self.group.allocate(size)?;
        self.allocated.push(id);
        Ok(id)
    }

    /// Keep every block allocated through the transaction.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        for id in self.allocated.drain(..) {
            self.group.free(id);
        }
    }
}
