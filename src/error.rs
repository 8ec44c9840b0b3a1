use crate::structs::BlockId;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("name already in use: {0}")]
    DuplicateName(String),

    #[error("no free block left on the device")]
    OutOfSpace,

    #[error("the root directory cannot be deleted")]
    RootDeletionForbidden,

    #[error("the root directory cannot be renamed")]
    RootRenameForbidden,

    #[error("no such file or directory")]
    NotFound,

    #[error("not a directory")]
    NotDirectory,

    #[error("invalid name")]
    InvalidName,

    #[error("block {0} is out of range")]
    InvalidBlockId(BlockId),

    #[error("content does not fit in one block")]
    BlockOverflow,

    #[error("corrupted state: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("snapshot codec: {0}")]
    Codec(#[from] bincode::Error),
}

pub type Result<T> = core::result::Result<T, FsError>;
