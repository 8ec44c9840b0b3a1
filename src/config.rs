pub const BLOCK_SIZE: usize = 4; // Content units (bytes) per block
pub const NUM_BLOCKS: usize = 1024; // Blocks on the default device

pub const MAX_NAME_LEN: usize = 255;
pub const ROOT_NAME: &str = "/";
pub const PATH_SEPARATOR: char = '/';

pub const DEFAULT_SNAPSHOT: &str = "file_system_info"; // State file used when the caller names none
