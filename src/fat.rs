//! File allocation table: one entry per block, linking the blocks of a file into a chain.

use log::debug;

use crate::bitmap::BlockStore;
use crate::block_dev::BlockDevice;
use crate::error::{FsError, Result};
use crate::structs::{BlockId, FatEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationTable {
    entries: Vec<FatEntry>,
}

impl AllocationTable {
    pub fn new(num_blocks: usize) -> Self {
        Self {
            entries: vec![FatEntry::Free; num_blocks],
        }
    }

    pub(crate) fn from_entries(entries: Vec<FatEntry>) -> Self {
        Self { entries }
    }

    fn check(&self, block_id: BlockId) -> Result<usize> {
        let idx = block_id as usize;
        if idx >= self.entries.len() {
            return Err(FsError::InvalidBlockId(block_id));
        }
        Ok(idx)
    }

    pub fn entry(&self, block_id: BlockId) -> Result<FatEntry> {
        let idx = self.check(block_id)?;
        Ok(self.entries[idx])
    }

    pub fn entries(&self) -> &[FatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Makes `prev` point at `next`.
    pub fn link(&mut self, prev: BlockId, next: BlockId) -> Result<()> {
        self.check(next)?;
        let idx = self.check(prev)?;
        self.entries[idx] = FatEntry::Next(next);
        Ok(())
    }

    /// Marks `block_id` as the last block of its chain.
    pub fn terminate(&mut self, block_id: BlockId) -> Result<()> {
        let idx = self.check(block_id)?;
        self.entries[idx] = FatEntry::End;
        Ok(())
    }

    /// Iterates the chain starting at `head`. An absent head yields nothing.
    pub fn chain_of(&self, head: Option<BlockId>) -> Chain<'_> {
        Chain {
            table: self,
            cursor: head,
            steps: 0,
        }
    }

    /// Frees every block of the chain on `store` and resets its entries.
    /// Returns the number of blocks released.
    pub fn release_chain<D: BlockDevice>(
        &mut self,
        head: Option<BlockId>,
        store: &mut BlockStore<D>,
    ) -> Result<usize> {
        let blocks: Vec<BlockId> = self.chain_of(head).collect();
        for &block_id in &blocks {
            store.free(block_id)?;
            let idx = self.check(block_id)?;
            self.entries[idx] = FatEntry::Free;
        }
        if let Some(head) = head {
            debug!("released chain at {} ({} blocks)", head, blocks.len());
        }
        Ok(blocks.len())
    }

    /// Resets every entry to `Free`.
    pub(crate) fn reset(&mut self) {
        self.entries.fill(FatEntry::Free);
    }
}

/// Lazy walk over the blocks of one chain.
/// Stops at `End`, at a `Free` or out-of-range entry, or after visiting as many
/// blocks as the table holds, so a damaged table can never loop forever.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    table: &'a AllocationTable,
    cursor: Option<BlockId>,
    steps: usize,
}

impl Iterator for Chain<'_> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let current = self.cursor?;
        if self.steps >= self.table.len() {
            self.cursor = None;
            return None;
        }
        let entry = self.table.entries.get(current as usize).copied();
        match entry {
            Some(FatEntry::Next(next)) => self.cursor = Some(next),
            Some(FatEntry::End) => self.cursor = None,
            // A free entry is never part of a chain.
            Some(FatEntry::Free) | None => {
                self.cursor = None;
                return None;
            }
        }
        self.steps += 1;
        Some(current)
    }
}
