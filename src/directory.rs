//! Hierarchical namespace of directories and file records.
//!
//! Nodes live in two arenas (one per kind) and are addressed by `DirId` / `FileId`.
//! Every node records its parent, so detaching a node never searches the tree.
//! Slots of deleted nodes stay empty until the namespace is cleared, which keeps
//! stale handles from silently aliasing a newer node.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::*;
use crate::error::{FsError, Result};
use crate::structs::*;

pub const ROOT_DIR: DirId = DirId(0);

pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN || name.contains(PATH_SEPARATOR) {
        return Err(FsError::InvalidName);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namespace {
    dirs: Vec<Option<DirectoryNode>>,
    files: Vec<Option<FileRecord>>,
}

impl Namespace {
    pub fn new(time: Timestamp) -> Self {
        Self {
            dirs: vec![Some(DirectoryNode::new(ROOT_NAME, None, time))],
            files: Vec::new(),
        }
    }

    pub fn root(&self) -> DirId {
        ROOT_DIR
    }

    pub fn directory(&self, id: DirId) -> Result<&DirectoryNode> {
        self.dirs
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(FsError::NotFound)
    }

    fn directory_mut(&mut self, id: DirId) -> Result<&mut DirectoryNode> {
        self.dirs
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(FsError::NotFound)
    }

    pub fn file(&self, id: FileId) -> Result<&FileRecord> {
        self.files
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(FsError::NotFound)
    }

    pub(crate) fn file_mut(&mut self, id: FileId) -> Result<&mut FileRecord> {
        self.files
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(FsError::NotFound)
    }

    /// Name of a child entry, `None` if the handle is stale.
    pub fn name_of(&self, entry: Entry) -> Option<&str> {
        match entry {
            Entry::Directory(id) => self.directory(id).ok().map(|d| d.name.as_str()),
            Entry::File(id) => self.file(id).ok().map(|f| f.name.as_str()),
        }
    }

    /// Finds the child called `name` in directory `parent`.
    pub fn lookup(&self, parent: DirId, name: &str) -> Result<Entry> {
        self.directory(parent)?
            .children
            .iter()
            .copied()
            .find(|&child| self.name_of(child) == Some(name))
            .ok_or(FsError::NotFound)
    }

    /// Fails with `DuplicateName` if a child of `parent` other than `except` is called `name`.
    /// Also fails with `NotFound` if `parent` is stale.
    fn ensure_unique(&self, parent: DirId, name: &str, except: Option<Entry>) -> Result<()> {
        let taken = self
            .directory(parent)?
            .children
            .iter()
            .any(|&child| Some(child) != except && self.name_of(child) == Some(name));
        if taken {
            return Err(FsError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    pub fn create_directory(&mut self, parent: DirId, name: &str, time: Timestamp) -> Result<DirId> {
        check_name(name)?;
        self.ensure_unique(parent, name, None)?;

        let id = DirId(self.dirs.len());
        self.dirs.push(Some(DirectoryNode::new(name, Some(parent), time)));
        let parent_node = self.directory_mut(parent)?;
        parent_node.children.push(Entry::Directory(id));
        parent_node.modified_at = time;
        debug!("created directory {:?} ({})", id, name);
        Ok(id)
    }

    pub fn create_file(&mut self, parent: DirId, name: &str, time: Timestamp) -> Result<FileId> {
        check_name(name)?;
        self.ensure_unique(parent, name, None)?;

        let id = FileId(self.files.len());
        self.files.push(Some(FileRecord::new(name, parent, time)));
        self.directory_mut(parent)?.children.push(Entry::File(id));
        debug!("created file {:?} ({})", id, name);
        Ok(id)
    }

    pub fn rename_directory(&mut self, id: DirId, name: &str, time: Timestamp) -> Result<()> {
        check_name(name)?;
        let parent = self
            .directory(id)?
            .parent
            .ok_or(FsError::RootRenameForbidden)?;
        self.ensure_unique(parent, name, Some(Entry::Directory(id)))?;
        let node = self.directory_mut(id)?;
        node.name = name.to_string();
        node.modified_at = time;
        Ok(())
    }

    /// Renames a file and refreshes both its own and its parent's modification time.
    pub fn rename_file(&mut self, id: FileId, name: &str, time: Timestamp) -> Result<()> {
        check_name(name)?;
        let parent = self.file(id)?.parent;
        self.ensure_unique(parent, name, Some(Entry::File(id)))?;
        let record = self.file_mut(id)?;
        record.name = name.to_string();
        record.modified_at = time;
        self.directory_mut(parent)?.modified_at = time;
        Ok(())
    }

    /// Detaches a file record from its parent and drops it.
    /// The caller must have released its chain beforehand.
    pub(crate) fn remove_file(&mut self, id: FileId) -> Result<FileRecord> {
        let parent = self.file(id)?.parent;
        self.directory_mut(parent)?
            .children
            .retain(|&child| child != Entry::File(id));
        let record = self.files[id.0].take().ok_or(FsError::NotFound)?;
        debug!("removed file {:?} ({})", id, record.name);
        Ok(record)
    }

    /// Every file below `dir`, at any depth.
    pub fn files_in_subtree(&self, dir: DirId) -> Result<Vec<FileId>> {
        let mut found = Vec::new();
        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            for &child in &self.directory(current)?.children {
                match child {
                    Entry::Directory(sub) => stack.push(sub),
                    Entry::File(file) => found.push(file),
                }
            }
        }
        Ok(found)
    }

    /// Detaches `dir` from its parent and drops the whole subtree.
    /// The caller must have released every chain in the subtree beforehand.
    pub(crate) fn remove_directory(&mut self, dir: DirId) -> Result<()> {
        let parent = self
            .directory(dir)?
            .parent
            .ok_or(FsError::RootDeletionForbidden)?;
        self.directory_mut(parent)?
            .children
            .retain(|&child| child != Entry::Directory(dir));

        let mut stack = vec![dir];
        while let Some(current) = stack.pop() {
            let Some(node) = self.dirs[current.0].take() else {
                continue;
            };
            for child in node.children {
                match child {
                    Entry::Directory(sub) => stack.push(sub),
                    Entry::File(file) => {
                        self.files[file.0] = None;
                    }
                }
            }
        }
        debug!("removed directory {:?}", dir);
        Ok(())
    }

    /// Drops every node except the root, which loses all its children.
    pub(crate) fn clear(&mut self) {
        self.dirs.truncate(1);
        self.files.clear();
        if let Some(Some(root)) = self.dirs.first_mut() {
            root.children.clear();
        }
    }

    /// Absolute path of an entry, built by following parent handles.
    pub fn path_of(&self, entry: Entry) -> Result<String> {
        let (mut parts, mut cursor) = match entry {
            Entry::Directory(id) => {
                let node = self.directory(id)?;
                match node.parent {
                    None => return Ok(ROOT_NAME.to_string()),
                    Some(parent) => (vec![node.name.clone()], parent),
                }
            }
            Entry::File(id) => {
                let record = self.file(id)?;
                (vec![record.name.clone()], record.parent)
            }
        };
        while let Some(parent) = self.directory(cursor)?.parent {
            parts.push(self.directory(cursor)?.name.clone());
            cursor = parent;
        }
        parts.reverse();
        Ok(format!("{}{}", ROOT_NAME, parts.join("/")))
    }

    pub fn directories(&self) -> impl Iterator<Item = (DirId, &DirectoryNode)> + '_ {
        self.dirs
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (DirId(i), node)))
    }

    pub fn files(&self) -> impl Iterator<Item = (FileId, &FileRecord)> + '_ {
        self.files
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|record| (FileId(i), record)))
    }

    /// Checks the tree shape: a parentless root at slot 0, every live node
    /// reachable from it exactly once, and parent handles matching the children lists.
    pub fn validate(&self) -> Result<()> {
        let root = self.directory(ROOT_DIR).map_err(|_| corrupted("missing root"))?;
        if root.parent.is_some() {
            return Err(corrupted("root has a parent"));
        }

        let mut seen_dirs = vec![false; self.dirs.len()];
        let mut seen_files = vec![false; self.files.len()];
        seen_dirs[ROOT_DIR.0] = true;
        let mut stack = vec![ROOT_DIR];
        while let Some(current) = stack.pop() {
            let node = self.directory(current)?;
            let mut names: Vec<&str> = Vec::with_capacity(node.children.len());
            for &child in &node.children {
                let name = self
                    .name_of(child)
                    .ok_or_else(|| corrupted("child handle points at an empty slot"))?;
                if names.contains(&name) {
                    return Err(corrupted("duplicate sibling names"));
                }
                names.push(name);
                match child {
                    Entry::Directory(sub) => {
                        if self.directory(sub)?.parent != Some(current) || seen_dirs[sub.0] {
                            return Err(corrupted("directory linked twice"));
                        }
                        seen_dirs[sub.0] = true;
                        stack.push(sub);
                    }
                    Entry::File(file) => {
                        if self.file(file)?.parent != current || seen_files[file.0] {
                            return Err(corrupted("file linked twice"));
                        }
                        seen_files[file.0] = true;
                    }
                }
            }
        }

        if self.directories().any(|(id, _)| !seen_dirs[id.0])
            || self.files().any(|(id, _)| !seen_files[id.0])
        {
            return Err(corrupted("unreachable node"));
        }
        Ok(())
    }
}

fn corrupted(what: &str) -> FsError {
    FsError::Corrupted(what.to_string())
}
