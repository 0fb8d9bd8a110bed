use crate::error::{FtlError, Result};

pub type BaseType = usize;

pub type PageId = BaseType;
pub type BlockId = BaseType;
pub type Counter = BaseType;

/// A single stored bit, 0 or 1.
pub type Bit = u8;

/// Physical `(block, page)` address.
pub type PageAddr = (BlockId, PageId);

pub const DATA_BITS_PER_GROUP: BaseType = 4;
pub const CODE_BITS_PER_GROUP: BaseType = 7;

pub const DEMO_BLOCK_COUNT: BaseType = 10;
pub const DEMO_PAGE_SIZE: BaseType = 16;
pub const DEMO_PAGES_PER_BLOCK: BaseType = 4;
pub const DEMO_READ_SPEED: f64 = 500.;
pub const DEMO_WRITE_SPEED: f64 = 200.;
pub const DEMO_SEED: u64 = 7;

/// Geometry and throughput of one simulated drive.
///
/// `page_size` counts user data cells; the ECC spare area is derived from it
/// (see [`DriveConfig::codeword_len`]). Speeds are in cells per second and only
/// feed the latency model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DriveConfig {
    block_count: BlockId,
    page_size: BaseType,
    pages_per_block: PageId,
    read_speed: f64,
    write_speed: f64,
}

impl DriveConfig {
    pub fn new(
        block_count: BlockId,
        page_size: BaseType,
        pages_per_block: PageId,
        read_speed: f64,
        write_speed: f64,
    ) -> Result<Self> {
        if block_count == 0 {
            return Err(FtlError::InvalidConfig("block_count must be positive"));
        }
        if page_size == 0 || page_size % DATA_BITS_PER_GROUP != 0 {
            return Err(FtlError::InvalidConfig(
                "page_size must be a positive multiple of 4",
            ));
        }
        if pages_per_block == 0 {
            return Err(FtlError::InvalidConfig("pages_per_block must be positive"));
        }
        if !(read_speed.is_finite() && read_speed > 0.) {
            return Err(FtlError::InvalidConfig("read_speed must be a positive number"));
        }
        if !(write_speed.is_finite() && write_speed > 0.) {
            return Err(FtlError::InvalidConfig("write_speed must be a positive number"));
        }

        Ok(DriveConfig {
            block_count,
            page_size,
            pages_per_block,
            read_speed,
            write_speed,
        })
    }

    pub fn demo() -> Self {
        DriveConfig {
            block_count: DEMO_BLOCK_COUNT,
            page_size: DEMO_PAGE_SIZE,
            pages_per_block: DEMO_PAGES_PER_BLOCK,
            read_speed: DEMO_READ_SPEED,
            write_speed: DEMO_WRITE_SPEED,
        }
    }

    pub fn block_count(&self) -> BlockId {
        self.block_count
    }

    pub fn page_size(&self) -> BaseType {
        self.page_size
    }

    pub fn pages_per_block(&self) -> PageId {
        self.pages_per_block
    }

    pub fn read_speed(&self) -> f64 {
        self.read_speed
    }

    pub fn write_speed(&self) -> f64 {
        self.write_speed
    }

    /// Physical cells per page: the Hamming(7,4) codeword of `page_size` data bits.
    pub fn codeword_len(&self) -> BaseType {
        self.page_size / DATA_BITS_PER_GROUP * CODE_BITS_PER_GROUP
    }

    pub fn all_pages(&self) -> BaseType {
        self.block_count * self.pages_per_block
    }

    /// User-visible capacity in data cells.
    pub fn user_capacity(&self) -> BaseType {
        self.all_pages() * self.page_size
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn demo_geometry() {
        let cfg = DriveConfig::demo();
        assert_eq!(cfg.codeword_len(), 28);
        assert_eq!(cfg.all_pages(), 40);
        assert_eq!(cfg.user_capacity(), 640);
        assert_eq!(
            DriveConfig::new(10, 16, 4, 500., 200.).unwrap(),
            DriveConfig::demo()
        );
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(matches!(DriveConfig::new(0, 16, 4, 1., 1.), Err(FtlError::InvalidConfig(_))));
        assert!(matches!(DriveConfig::new(4, 0, 4, 1., 1.), Err(FtlError::InvalidConfig(_))));
        assert!(matches!(DriveConfig::new(4, 10, 4, 1., 1.), Err(FtlError::InvalidConfig(_))));
        assert!(matches!(DriveConfig::new(4, 16, 0, 1., 1.), Err(FtlError::InvalidConfig(_))));
        assert!(matches!(DriveConfig::new(4, 16, 4, 0., 1.), Err(FtlError::InvalidConfig(_))));
        assert!(matches!(
            DriveConfig::new(4, 16, 4, 1., f64::NAN),
            Err(FtlError::InvalidConfig(_))
        ));
    }
}
