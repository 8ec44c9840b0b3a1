//! Persisting the whole engine state to one flat file.
//!
//! The file is four bincode records back to back, in this order:
//! namespace tree, free-space bitmap, block contents, allocation table.
//! There is no magic number or version field; the block count and block size
//! are compiled in, and a file whose tables do not match the device is rejected.
//! The file is overwritten in place, so a crash while saving leaves it corrupted.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

use bitvec::vec::BitVec;
use log::{info, warn};

use crate::bitmap::BlockStore;
use crate::block_dev::{BlockDevice, RamDisk};
use crate::config::DEFAULT_SNAPSHOT;
use crate::directory::Namespace;
use crate::fat::AllocationTable;
use crate::structs::{Block, BlockId, FatEntry};
use crate::{Error, FileSystem, Result};

impl<D: BlockDevice> FileSystem<D> {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let blocks = (0..self.store.num_blocks())
            .map(|idx| self.store.read_block(idx as BlockId))
            .collect::<Result<Vec<Block>>>()?;

        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, &self.namespace)?;
        bincode::serialize_into(&mut writer, self.store.bitmap())?;
        bincode::serialize_into(&mut writer, &blocks)?;
        bincode::serialize_into(&mut writer, self.fat.entries())?;
        writer.flush()?;
        info!("saved snapshot to {}", path.display());
        Ok(())
    }

    /// Restores the state saved at `path` onto `device`.
    /// If there is no such file, `device` is wiped and receives the demo tree instead.
    pub fn load_into<P: AsRef<Path>>(path: P, mut device: D) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("no snapshot at {}, starting from the demo tree", path.display());
            return Self::with_demo_tree(device, SystemTime::now());
        }

        let mut reader = BufReader::new(File::open(path)?);
        let namespace: Namespace = bincode::deserialize_from(&mut reader)?;
        let bitmap: BitVec = bincode::deserialize_from(&mut reader)?;
        let blocks: Vec<Block> = bincode::deserialize_from(&mut reader)?;
        let entries: Vec<FatEntry> = bincode::deserialize_from(&mut reader)?;

        let num_blocks = device.num_blocks();
        if blocks.len() != num_blocks || entries.len() != num_blocks {
            return Err(Error::Corrupted(format!(
                "snapshot holds {} blocks and {} table entries, device has {} blocks",
                blocks.len(),
                entries.len(),
                num_blocks
            )));
        }
        for (idx, block) in blocks.iter().enumerate() {
            block.check()?;
            device.write_block(idx as BlockId, block)?;
        }

        let store = BlockStore::from_parts(device, bitmap)?;
        let fs = Self::from_parts(namespace, store, AllocationTable::from_entries(entries))?;
        info!("loaded snapshot from {}: {}", path.display(), fs.dump());
        Ok(fs)
    }
}

impl FileSystem<RamDisk> {
    /// Restores a snapshot onto a default-sized RAM disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_into(path, RamDisk::default())
    }

    /// Loads `DEFAULT_SNAPSHOT` from the working directory.
    pub fn load_default() -> Result<Self> {
        Self::load(DEFAULT_SNAPSHOT)
    }

    /// Saves to `DEFAULT_SNAPSHOT` in the working directory.
    pub fn save_default(&self) -> Result<()> {
        self.save(DEFAULT_SNAPSHOT)
    }
}
