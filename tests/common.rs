//! Common utilities for tests

#![allow(unused)]

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fatsim::{FileSystem, RamDisk};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// Fixed point in time, `secs` seconds after the epoch.
pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

/// Empty file system on a RAM disk of `num_blocks` blocks.
pub fn fresh(num_blocks: usize) -> FileSystem {
    FileSystem::new(RamDisk::new(num_blocks), at(0)).unwrap()
}

/// Per-test snapshot location in the system temp directory, removed if already there.
pub fn snapshot_path(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("fatsim-{}-{}.img", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}
