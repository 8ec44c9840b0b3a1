use crate::config::NUM_BLOCKS;
use crate::error::FsError;
use crate::structs::{Block, BlockId};

pub trait BlockDevice {
    /// Returns the number of blocks in the block device.
    fn num_blocks(&self) -> usize;

    /// Reads the content of a block.
    fn read_block(&self, block_id: BlockId) -> Result<Block, FsError>;

    /// Overwrites a block in place.
    fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<(), FsError>;

    /// Resets a block to empty content.
    fn clear_block(&mut self, block_id: BlockId) -> Result<(), FsError> {
        self.write_block(block_id, &Block::EMPTY)
    }
}

/// Volatile device backed by a vector of blocks.
#[derive(Debug, Clone)]
pub struct RamDisk {
    blocks: Vec<Block>,
}

impl RamDisk {
    pub fn new(num_blocks: usize) -> Self {
        RamDisk {
            blocks: vec![Block::EMPTY; num_blocks],
        }
    }

    fn check(&self, block_id: BlockId) -> Result<usize, FsError> {
        let idx = block_id as usize;
        if idx >= self.blocks.len() {
            return Err(FsError::InvalidBlockId(block_id));
        }
        Ok(idx)
    }
}

impl Default for RamDisk {
    fn default() -> Self {
        RamDisk::new(NUM_BLOCKS)
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    fn read_block(&self, block_id: BlockId) -> Result<Block, FsError> {
        let idx = self.check(block_id)?;
        Ok(self.blocks[idx])
    }

    fn write_block(&mut self, block_id: BlockId, block: &Block) -> Result<(), FsError> {
        let idx = self.check(block_id)?;
        self.blocks[idx] = *block;
        Ok(())
    }
}
