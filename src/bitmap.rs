//! Free-space management: a block device paired with a used/free bitmap.
//! A set bit means the block belongs to some chain of the allocation table.

use bitvec::prelude::*;
use log::debug;

use crate::block_dev::BlockDevice;
use crate::error::{FsError, Result};
use crate::structs::{Block, BlockId};

#[derive(Debug, Clone)]
pub struct BlockStore<D: BlockDevice> {
    device: D,
    bitmap: BitVec,
}

impl<D: BlockDevice> BlockStore<D> {
    /// Wraps a device with an all-free bitmap sized to it.
    pub fn new(device: D) -> Self {
        let num_blocks = device.num_blocks();
        Self {
            device,
            bitmap: bitvec![0; num_blocks],
        }
    }

    /// Rebuilds a store from a previously saved bitmap.
    pub(crate) fn from_parts(device: D, bitmap: BitVec) -> Result<Self> {
        if bitmap.len() != device.num_blocks() {
            return Err(FsError::Corrupted(format!(
                "bitmap holds {} bits for {} blocks",
                bitmap.len(),
                device.num_blocks()
            )));
        }
        Ok(Self { device, bitmap })
    }

    fn check(&self, block_id: BlockId) -> Result<usize> {
        let idx = block_id as usize;
        if idx >= self.bitmap.len() {
            return Err(FsError::InvalidBlockId(block_id));
        }
        Ok(idx)
    }

    /// Marks the lowest-indexed free block as used and returns it.
    pub fn allocate(&mut self) -> Result<BlockId> {
        let idx = self.bitmap.first_zero().ok_or(FsError::OutOfSpace)?;
        self.bitmap.set(idx, true);
        debug!("allocated block {}", idx);
        Ok(idx as BlockId)
    }

    /// Allocates `count` blocks first-fit, or none of them.
    pub fn allocate_many(&mut self, count: usize) -> Result<Vec<BlockId>> {
        if count > self.free_blocks() {
            return Err(FsError::OutOfSpace);
        }
        let mut allocated = Vec::with_capacity(count);
        for _ in 0..count {
            match self.allocate() {
                Ok(block_id) => allocated.push(block_id),
                Err(e) => {
                    for block_id in allocated {
                        self.bitmap.set(block_id as usize, false);
                    }
                    return Err(e);
                }
            }
        }
        Ok(allocated)
    }

    /// Clears the block's content and marks it free.
    /// Freeing a block that is already free leaves the store unchanged.
    pub fn free(&mut self, block_id: BlockId) -> Result<()> {
        let idx = self.check(block_id)?;
        if !self.bitmap[idx] {
            debug!("block {} already free", block_id);
            return Ok(());
        }
        self.device.clear_block(block_id)?;
        self.bitmap.set(idx, false);
        debug!("freed block {}", block_id);
        Ok(())
    }

    pub fn read_block(&self, block_id: BlockId) -> Result<Block> {
        self.check(block_id)?;
        self.device.read_block(block_id)
    }

    /// Replaces the block's content. `content` must fit in one block.
    pub fn write_block(&mut self, block_id: BlockId, content: &[u8]) -> Result<()> {
        self.check(block_id)?;
        let block = Block::new(content)?;
        self.device.write_block(block_id, &block)
    }

    pub fn is_used(&self, block_id: BlockId) -> bool {
        self.bitmap
            .get(block_id as usize)
            .map(|bit| *bit)
            .unwrap_or(false)
    }

    pub fn num_blocks(&self) -> usize {
        self.bitmap.len()
    }

    pub fn used_blocks(&self) -> usize {
        self.bitmap.count_ones()
    }

    pub fn free_blocks(&self) -> usize {
        self.bitmap.count_zeros()
    }

    pub fn bitmap(&self) -> &BitVec {
        &self.bitmap
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Wipes every block and marks all of them free.
    pub(crate) fn reset(&mut self) -> Result<()> {
        for block_id in 0..self.bitmap.len() {
            self.device.clear_block(block_id as BlockId)?;
        }
        self.bitmap.fill(false);
        Ok(())
    }
}
