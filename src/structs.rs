use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::config::*;
use crate::Error;
use crate::Result;

pub type BlockId = u32;
pub type Timestamp = SystemTime;

/// One fixed-capacity content slot.
/// Only the first `len` bytes of `data` are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    len: u16,
    data: [u8; BLOCK_SIZE],
}

impl Block {
    pub const EMPTY: Self = Self {
        len: 0,
        data: [0; BLOCK_SIZE],
    };

    pub fn new(content: &[u8]) -> Result<Self> {
        if content.len() > BLOCK_SIZE {
            return Err(Error::BlockOverflow);
        }
        let mut data = [0; BLOCK_SIZE];
        data[..content.len()].copy_from_slice(content);
        Ok(Self {
            len: content.len() as u16,
            data,
        })
    }

    /// Fails with `Corrupted` if the stored length exceeds the block capacity.
    /// Only blocks decoded from outside (snapshots) can be in that state.
    pub fn check(&self) -> Result<()> {
        if self.len as usize > BLOCK_SIZE {
            return Err(Error::Corrupted(format!(
                "block length {} exceeds {}",
                self.len, BLOCK_SIZE
            )));
        }
        Ok(())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len()]
    }

    pub fn len(&self) -> usize {
        (self.len as usize).min(BLOCK_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Per-block state in the allocation table.
/// `Free` is its own variant, so a released entry can never be mistaken for a link to block 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FatEntry {
    #[default]
    Free,
    Next(BlockId),
    End,
}

impl FatEntry {
    pub fn is_free(&self) -> bool {
        matches!(self, FatEntry::Free)
    }
}

/// Handle of a directory slot in the namespace arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DirId(pub(crate) usize);

/// Handle of a file slot in the namespace arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(pub(crate) usize);

/// A child of a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Entry {
    Directory(DirId),
    File(FileId),
}

impl Entry {
    pub fn as_dir(&self) -> Option<DirId> {
        match self {
            Entry::Directory(id) => Some(*id),
            Entry::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<FileId> {
        match self {
            Entry::File(id) => Some(*id),
            Entry::Directory(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub name: String,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
    pub(crate) parent: Option<DirId>, // None only for the root
    pub(crate) children: Vec<Entry>,
}

impl DirectoryNode {
    pub(crate) fn new(name: &str, parent: Option<DirId>, time: Timestamp) -> Self {
        Self {
            name: name.to_string(),
            created_at: time,
            modified_at: time,
            parent,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<DirId> {
        self.parent
    }

    pub fn children(&self) -> &[Entry] {
        &self.children
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn subdirectories(&self) -> impl Iterator<Item = DirId> + '_ {
        self.children.iter().filter_map(Entry::as_dir)
    }

    pub fn files(&self) -> impl Iterator<Item = FileId> + '_ {
        self.children.iter().filter_map(Entry::as_file)
    }
}

/// File control block: metadata of a file, its content lives in a block chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
    pub length: usize,
    pub(crate) head: Option<BlockId>, // None for an empty file
    pub(crate) parent: DirId,
}

impl FileRecord {
    pub(crate) fn new(name: &str, parent: DirId, time: Timestamp) -> Self {
        Self {
            name: name.to_string(),
            created_at: time,
            modified_at: time,
            length: 0,
            head: None,
            parent,
        }
    }

    pub fn head(&self) -> Option<BlockId> {
        self.head
    }

    pub fn parent(&self) -> DirId {
        self.parent
    }
}
