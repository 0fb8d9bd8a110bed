//! Virtual NAND flash drive: cells, pages and blocks behind a small flash
//! translation layer with wear leveling, block reclamation and Hamming(7,4)
//! ECC on every page.

pub mod config;
pub mod ecc;
pub mod error;
pub mod ftl;
pub mod latency;
pub mod media;
pub mod ssd;

pub use config::{Bit, BlockId, DriveConfig, PageAddr, PageId};
pub use error::{FtlError, Result};
pub use ftl::Controller;
pub use latency::{Clock, SleepClock, VirtualClock};
pub use media::{BlockState, Drive, WearStats};
pub use ssd::{SharedSsd, Ssd};
