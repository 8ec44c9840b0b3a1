//! Reading and writing file content through block chains.

use log::{debug, warn};

use crate::bitmap::BlockStore;
use crate::block_dev::BlockDevice;
use crate::config::BLOCK_SIZE;
use crate::fat::AllocationTable;
use crate::{Error, FileRecord, Result, Timestamp};

/// Number of blocks needed to hold `len` bytes.
pub fn blocks_for(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE)
}

/// Concatenates the blocks of the record's chain in order.
/// A record without a chain reads as empty.
pub fn read_file<D: BlockDevice>(
    store: &BlockStore<D>,
    fat: &AllocationTable,
    record: &FileRecord,
) -> Result<Vec<u8>> {
    let mut data = Vec::with_capacity(record.length);
    for block_id in fat.chain_of(record.head) {
        data.extend_from_slice(store.read_block(block_id)?.as_bytes());
    }
    Ok(data)
}

/// Replaces the record's content with `data`.
///
/// The old chain is released before the new one is allocated, and the space check
/// counts the blocks it gives back. On `OutOfSpace` nothing changes: the record keeps
/// its previous content and no block is left half-linked.
pub fn write_file<D: BlockDevice>(
    store: &mut BlockStore<D>,
    fat: &mut AllocationTable,
    record: &mut FileRecord,
    data: &[u8],
    time: Timestamp,
) -> Result<()> {
    let needed = blocks_for(data.len());
    let reclaimable = fat.chain_of(record.head).count();
    if needed > store.free_blocks() + reclaimable {
        warn!(
            "write of {} bytes to {} needs {} blocks, only {} available",
            data.len(),
            record.name,
            needed,
            store.free_blocks() + reclaimable
        );
        return Err(Error::OutOfSpace);
    }

    fat.release_chain(record.head, store)?;
    record.head = None;
    record.length = 0;

    let blocks = store.allocate_many(needed)?;
    for (chunk, &block_id) in data.chunks(BLOCK_SIZE).zip(&blocks) {
        store.write_block(block_id, chunk)?;
    }
    for pair in blocks.windows(2) {
        fat.link(pair[0], pair[1])?;
    }
    if let Some(&last) = blocks.last() {
        fat.terminate(last)?;
    }

    record.head = blocks.first().copied();
    record.length = data.len();
    record.modified_at = time;
    debug!("wrote {} bytes to {} over {} blocks", data.len(), record.name, needed);
    Ok(())
}
