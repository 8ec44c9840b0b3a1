//! Fatsim is a small single-volume file system engine for teaching purposes.
//! Content lives in fixed-size blocks linked by a FAT-style allocation table,
//! free space is tracked by a bitmap, and files and folders form a tree.
//! Permissions, journaling and concurrent access are out of scope.
//!
//! Fatsim's layers (from bottom to top):
//! 1. Block Device: fixed array of fixed-capacity blocks.          | User implemented or `RamDisk`
//! 2. Bitmap: first-fit allocation and release of blocks.          | Fs implemented
//! 3. FAT: per-block successor links forming file chains.          | Fs implemented
//! 4. Directory/Path: arena-backed tree of folders and records.    | Fs implemented
//! 5. File: reading and writing content along a chain.             | Fs implemented
//! 6. FileSystem: the facade callers drive, plus snapshots.        | Fs implemented
//!
//! The engine is single-threaded and does no locking of its own.

mod config;
mod block_dev;
mod structs;
mod bitmap;
mod fat;
mod directory;
mod path;
mod file;
mod fs;
mod snapshot;
mod error;

pub use block_dev::{BlockDevice, RamDisk};
pub use config::*;
pub use structs::*;
pub use bitmap::BlockStore;
pub use fat::{AllocationTable, Chain};
pub use directory::{Namespace, ROOT_DIR};
pub use path::*;
pub use file::*;
pub use fs::*;
pub use error::FsError as Error;
pub use error::Result;
