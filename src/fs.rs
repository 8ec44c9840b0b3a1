use log::{debug, info};

use crate::bitmap::BlockStore;
use crate::block_dev::{BlockDevice, RamDisk};
use crate::directory::{Namespace, ROOT_DIR};
use crate::fat::AllocationTable;
use crate::file::{blocks_for, read_file, write_file};
use crate::path::{resolve, split};
use crate::structs::*;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct FileSystem<D: BlockDevice = RamDisk> {
    pub(crate) namespace: Namespace,
    pub(crate) store: BlockStore<D>,
    pub(crate) fat: AllocationTable,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Wipes `device` and starts an empty file system on it.
    pub fn new(device: D, time: Timestamp) -> Result<Self> {
        let mut store = BlockStore::new(device);
        store.reset()?;
        let fat = AllocationTable::new(store.num_blocks());
        info!("new file system with {} blocks", store.num_blocks());
        Ok(Self {
            namespace: Namespace::new(time),
            store,
            fat,
        })
    }

    /// A fresh file system holding a small sample tree:
    /// `/folder1/folder2/folder3`, `/file1`, `/folder1/file2`, `/folder1/file3`.
    pub fn with_demo_tree(device: D, time: Timestamp) -> Result<Self> {
        let mut fs = Self::new(device, time)?;
        let folder1 = fs.create_directory(ROOT_DIR, "folder1", time)?;
        let folder2 = fs.create_directory(folder1, "folder2", time)?;
        fs.create_directory(folder2, "folder3", time)?;
        fs.create_file(ROOT_DIR, "file1", time)?;
        fs.create_file(folder1, "file2", time)?;
        fs.create_file(folder1, "file3", time)?;
        Ok(fs)
    }

    /// Assembles a file system from restored parts and checks that they agree.
    pub(crate) fn from_parts(
        namespace: Namespace,
        store: BlockStore<D>,
        fat: AllocationTable,
    ) -> Result<Self> {
        let fs = Self {
            namespace,
            store,
            fat,
        };
        fs.verify()?;
        Ok(fs)
    }

    // Following methods mutate the instance in place; callers sharing it across threads must lock around it.

    pub fn create_directory(&mut self, parent: DirId, name: &str, time: Timestamp) -> Result<DirId> {
        self.namespace.create_directory(parent, name, time)
    }

    pub fn create_file(&mut self, parent: DirId, name: &str, time: Timestamp) -> Result<FileId> {
        self.namespace.create_file(parent, name, time)
    }

    /// Creates a file at an absolute path such as `/docs/notes.txt`.
    /// The parent directory must already exist.
    pub fn create_file_at(&mut self, path: &str, time: Timestamp) -> Result<FileId> {
        let (parent, name) = self.parent_and_leaf(path)?;
        self.create_file(parent, &name, time)
    }

    /// Creates a directory at an absolute path such as `/docs/drafts`.
    pub fn create_directory_at(&mut self, path: &str, time: Timestamp) -> Result<DirId> {
        let (parent, name) = self.parent_and_leaf(path)?;
        self.create_directory(parent, &name, time)
    }

    fn parent_and_leaf(&self, path: &str) -> Result<(DirId, String)> {
        let (parent_path, name) = split(path);
        match self.lookup(&parent_path)? {
            Entry::Directory(parent) => Ok((parent, name)),
            Entry::File(_) => Err(Error::NotDirectory),
        }
    }

    /// The root cannot be renamed: its name is always `/`.
    pub fn rename_directory(&mut self, dir: DirId, name: &str, time: Timestamp) -> Result<()> {
        self.namespace.rename_directory(dir, name, time)
    }

    pub fn rename_file(&mut self, file: FileId, name: &str, time: Timestamp) -> Result<()> {
        self.namespace.rename_file(file, name, time)
    }

    /// Releases the file's chain, then detaches it from its directory.
    pub fn delete_file(&mut self, file: FileId) -> Result<()> {
        let head = self.namespace.file(file)?.head;
        self.fat.release_chain(head, &mut self.store)?;
        self.namespace.remove_file(file)?;
        Ok(())
    }

    /// Deletes a directory with everything below it.
    /// Every file chain in the subtree is released before any node is detached.
    pub fn delete_directory(&mut self, dir: DirId) -> Result<()> {
        if self.namespace.directory(dir)?.parent.is_none() {
            return Err(Error::RootDeletionForbidden);
        }
        for file in self.namespace.files_in_subtree(dir)? {
            let record = self.namespace.file_mut(file)?;
            self.fat.release_chain(record.head, &mut self.store)?;
            record.head = None;
            record.length = 0;
        }
        self.namespace.remove_directory(dir)
    }

    pub fn read(&self, file: FileId) -> Result<Vec<u8>> {
        read_file(&self.store, &self.fat, self.namespace.file(file)?)
    }

    /// Replaces the file's content. All-or-nothing: on `OutOfSpace` the file is untouched.
    pub fn write(&mut self, file: FileId, data: &[u8], time: Timestamp) -> Result<()> {
        let record = self.namespace.file_mut(file)?;
        write_file(&mut self.store, &mut self.fat, record, data, time)
    }

    /// Drops every node but the root and returns all blocks to the free pool.
    pub fn format(&mut self) -> Result<()> {
        info!("formatting");
        self.namespace.clear();
        self.store.reset()?;
        self.fat.reset();
        Ok(())
    }

    pub fn lookup(&self, path: &str) -> Result<Entry> {
        resolve(&self.namespace, path)
    }

    /// Cross-checks the namespace, the bitmap and the allocation table.
    ///
    /// Every file's chain must end in `End`, hold exactly as many blocks as its
    /// length requires, store exactly `length` bytes, and share no block with
    /// another chain. A block is marked used iff its table entry is not `Free`
    /// iff some chain owns it, and free blocks hold no content.
    pub fn verify(&self) -> Result<()> {
        self.namespace.validate()?;
        let num_blocks = self.store.num_blocks();
        if self.fat.len() != num_blocks {
            return Err(Error::Corrupted(format!(
                "allocation table holds {} entries for {} blocks",
                self.fat.len(),
                num_blocks
            )));
        }

        let mut owned = vec![false; num_blocks];
        for (_, record) in self.namespace.files() {
            let chain: Vec<BlockId> = self.fat.chain_of(record.head).collect();
            if chain.len() != blocks_for(record.length) {
                return Err(Error::Corrupted(format!(
                    "{} has {} bytes over {} blocks",
                    record.name,
                    record.length,
                    chain.len()
                )));
            }
            if let Some(&last) = chain.last() {
                if self.fat.entry(last)? != FatEntry::End {
                    return Err(Error::Corrupted(format!("chain of {} is not terminated", record.name)));
                }
            }
            let mut stored = 0;
            for block_id in chain {
                if std::mem::replace(&mut owned[block_id as usize], true) {
                    return Err(Error::Corrupted(format!("block {} is shared", block_id)));
                }
                let block = self.store.read_block(block_id)?;
                block.check()?;
                stored += block.len();
            }
            if stored != record.length {
                return Err(Error::Corrupted(format!(
                    "{} has {} bytes but its chain stores {}",
                    record.name, record.length, stored
                )));
            }
        }

        for (idx, &is_owned) in owned.iter().enumerate() {
            let block_id = idx as BlockId;
            let used = self.store.is_used(block_id);
            let linked = !self.fat.entry(block_id)?.is_free();
            if used != linked || used != is_owned {
                return Err(Error::Corrupted(format!(
                    "block {}: bitmap {}, table {}, owned {}",
                    block_id, used, linked, is_owned
                )));
            }
            if !used && !self.store.read_block(block_id)?.is_empty() {
                return Err(Error::Corrupted(format!("free block {} is not empty", block_id)));
            }
        }
        debug!("verified {} blocks", num_blocks);
        Ok(())
    }

    pub fn root(&self) -> DirId {
        self.namespace.root()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn directory(&self, dir: DirId) -> Result<&DirectoryNode> {
        self.namespace.directory(dir)
    }

    pub fn file(&self, file: FileId) -> Result<&FileRecord> {
        self.namespace.file(file)
    }

    pub fn child_count(&self, dir: DirId) -> Result<usize> {
        Ok(self.namespace.directory(dir)?.child_count())
    }

    pub fn children(&self, dir: DirId) -> Result<&[Entry]> {
        Ok(self.namespace.directory(dir)?.children())
    }

    pub fn parent_of(&self, entry: Entry) -> Result<Option<DirId>> {
        match entry {
            Entry::Directory(dir) => Ok(self.namespace.directory(dir)?.parent),
            Entry::File(file) => Ok(Some(self.namespace.file(file)?.parent)),
        }
    }

    pub fn path_of(&self, entry: Entry) -> Result<String> {
        self.namespace.path_of(entry)
    }

    /// Block indices of the file's chain, in order.
    pub fn chain_of(&self, file: FileId) -> Result<Vec<BlockId>> {
        Ok(self.fat.chain_of(self.namespace.file(file)?.head).collect())
    }

    pub fn store(&self) -> &BlockStore<D> {
        &self.store
    }

    pub fn fat(&self) -> &AllocationTable {
        &self.fat
    }

    pub fn used_blocks(&self) -> usize {
        self.store.used_blocks()
    }

    pub fn free_blocks(&self) -> usize {
        self.store.free_blocks()
    }

    pub fn dump(&self) -> String {
        format!(
            "FileSystem {{ directories: {}, files: {}, blocks: {}/{} used }}",
            self.namespace.directories().count(),
            self.namespace.files().count(),
            self.store.used_blocks(),
            self.store.num_blocks()
        )
    }
}
