use thiserror::Error;

use crate::config::{BaseType, BlockId, Bit, PageId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FtlError {
    #[error("address (block {block}, page {page:?}) is outside the drive geometry")]
    InvalidAddress { block: BlockId, page: Option<PageId> },
    #[error("no free or reclaimable block left")]
    OutOfSpace,
    #[error("input of {len} bits is not a multiple of {group}")]
    MalformedInput { len: BaseType, group: BaseType },
    #[error("element {index} holds {value}, expected 0 or 1")]
    InvalidBit { index: BaseType, value: Bit },
    #[error("invalid drive configuration: {0}")]
    InvalidConfig(&'static str),
    #[error("drive lock poisoned by a panicking caller")]
    LockPoisoned,
}

pub type Result<T> = core::result::Result<T, FtlError>;
