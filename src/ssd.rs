use std::sync::RwLock;

use byte_unit::Byte;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[cfg(test)]
use std::println as trace;

#[cfg(not(test))]
use log::*;

use crate::config::*;
use crate::error::{FtlError, Result};
use crate::ftl::Controller;
use crate::latency::{Clock, SleepClock};
use crate::media::{BlockState, Drive, WearStats};

/// One simulated drive together with the controller that serves it.
pub struct Ssd<R: Rng = SmallRng, C: Clock = SleepClock> {
    drive: Drive,
    controller: Controller<R, C>,
}

impl Ssd {
    /// Real-time latency and an entropy-seeded allocator.
    pub fn new(config: DriveConfig) -> Self {
        Ssd::with_parts(config, SmallRng::from_entropy(), SleepClock)
    }
}

impl<R: Rng, C: Clock> Ssd<R, C> {
    pub fn with_parts(config: DriveConfig, rng: R, clock: C) -> Self {
        trace!(
            "Blocks: {}, pages per block: {}, page: {} data + {} ECC cells",
            config.block_count(),
            config.pages_per_block(),
            config.page_size(),
            config.codeword_len() - config.page_size()
        );
        trace!(
            "User Capacity: {} bits, {}",
            config.user_capacity(),
            Byte::from(config.user_capacity() / 8)
                .get_appropriate_unit(true)
                .to_string()
        );

        Ssd {
            controller: Controller::new(&config, rng, clock),
            drive: Drive::new(config),
        }
    }

    pub fn write_data(&mut self, data: &[Bit]) -> Result<()> {
        self.controller.write(&mut self.drive, data)
    }

    pub fn read_data(&self, address: PageAddr) -> Result<Option<Vec<Bit>>> {
        self.controller.read(&self.drive, address)
    }

    pub fn erase_block(&mut self, index: BlockId) -> Result<()> {
        self.controller.erase_block(&mut self.drive, index)
    }

    pub fn invalidate_page(&mut self, address: PageAddr) -> Result<()> {
        self.controller.invalidate_page(&mut self.drive, address)
    }

    pub fn garbage_collect(&mut self) -> Result<BlockId> {
        self.controller.garbage_collect(&mut self.drive)
    }

    /// Flips one physical cell of a page, ECC parity cells included.
    pub fn inject_bit_flip(&mut self, (block, page): PageAddr, cell: BaseType) -> Result<()> {
        self.drive.flip_cell(block, page, cell)
    }

    pub fn block_state(&self, index: BlockId) -> Result<BlockState> {
        self.drive.block_state(index)
    }

    pub fn wear_stats(&self) -> WearStats {
        self.drive.wear_stats()
    }

    pub fn drive(&self) -> &Drive {
        &self.drive
    }

    pub fn controller(&self) -> &Controller<R, C> {
        &self.controller
    }
}

/// An [`Ssd`] shared between threads.
///
/// Writes, erases and trims take the lock exclusively since they move the
/// cursor and the free pool. Reads only take it shared.
pub struct SharedSsd<R: Rng = SmallRng, C: Clock = SleepClock> {
    inner: RwLock<Ssd<R, C>>,
}

impl<R: Rng, C: Clock> SharedSsd<R, C> {
    pub fn new(ssd: Ssd<R, C>) -> Self {
        SharedSsd {
            inner: RwLock::new(ssd),
        }
    }

    pub fn write_data(&self, data: &[Bit]) -> Result<()> {
        self.inner
            .write()
            .map_err(|_| FtlError::LockPoisoned)?
            .write_data(data)
    }

    pub fn read_data(&self, address: PageAddr) -> Result<Option<Vec<Bit>>> {
        self.inner
            .read()
            .map_err(|_| FtlError::LockPoisoned)?
            .read_data(address)
    }

    pub fn erase_block(&self, index: BlockId) -> Result<()> {
        self.inner
            .write()
            .map_err(|_| FtlError::LockPoisoned)?
            .erase_block(index)
    }

    pub fn invalidate_page(&self, address: PageAddr) -> Result<()> {
        self.inner
            .write()
            .map_err(|_| FtlError::LockPoisoned)?
            .invalidate_page(address)
    }

    pub fn valid_pages(&self) -> Result<Vec<PageAddr>> {
        let ssd = self.inner.read().map_err(|_| FtlError::LockPoisoned)?;
        Ok(ssd.controller().valid_pages().to_vec())
    }

    pub fn into_inner(self) -> Result<Ssd<R, C>> {
        self.inner.into_inner().map_err(|_| FtlError::LockPoisoned)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::latency::VirtualClock;

    fn demo_ssd(seed: u64) -> Ssd<SmallRng, VirtualClock> {
        Ssd::with_parts(DriveConfig::demo(), SmallRng::seed_from_u64(seed), VirtualClock::new())
    }

    #[test]
    fn scenario_first_page_reads_back() {
        let mut ssd = demo_ssd(DEMO_SEED);
        ssd.write_data(&[1; 30]).unwrap();

        let page = ssd.read_data((0, 0)).unwrap().unwrap();
        assert_eq!(page.len(), DEMO_PAGE_SIZE);
        assert!(page.iter().all(|&b| b == 1));
    }

    #[test]
    fn scenario_second_write_follows_cursor() {
        for seed in 0..16 {
            let mut ssd = demo_ssd(seed);
            ssd.write_data(&[1; 30]).unwrap();
            ssd.write_data(&[1; 50]).unwrap();

            // 30 bits fill (0,0)-(0,1); 50 bits fill (0,2)-(0,3) and two pages of the next block
            assert_eq!(ssd.read_data((0, 2)).unwrap(), Some(vec![1; 16]));

            let (spill, page) = ssd.controller().cursor();
            assert_eq!(page, 2);
            assert_ne!(spill, 0);
            assert_eq!(ssd.read_data((spill, 0)).unwrap(), Some(vec![1; 16]), "seed {seed}");
            let mut tail = vec![1; 2];
            tail.resize(16, 0);
            assert_eq!(ssd.read_data((spill, 1)).unwrap(), Some(tail), "seed {seed}");
            assert_eq!(ssd.read_data((spill, 2)).unwrap(), None);
            assert_eq!(ssd.block_state(0), Ok(BlockState::Full));
            assert_eq!(ssd.block_state(spill), Ok(BlockState::PartiallyWritten));
        }
    }

    #[test]
    fn latency_is_charged_to_the_clock() {
        let mut ssd = demo_ssd(1);
        ssd.write_data(&[1; 30]).unwrap();
        ssd.read_data((0, 0)).unwrap();
        ssd.read_data((5, 0)).unwrap();
        assert_eq!(
            ssd.controller().clock().elapsed(),
            Duration::from_millis(140 * 2 + 32)
        );
    }

    #[test]
    fn erase_through_facade_keeps_bookkeeping_consistent() {
        let mut ssd = demo_ssd(2);
        ssd.write_data(&[1; 64]).unwrap();
        ssd.erase_block(0).unwrap();

        assert_eq!(ssd.read_data((0, 0)), Ok(None));
        assert!(ssd.controller().valid_pages().is_empty());
        assert!(ssd.drive().is_free(0));
        assert_eq!(ssd.wear_stats().max, 1);
        assert_eq!(
            ssd.erase_block(DEMO_BLOCK_COUNT),
            Err(FtlError::InvalidAddress { block: DEMO_BLOCK_COUNT, page: None })
        );
    }

    #[test]
    fn injected_flip_is_corrected() {
        let mut ssd = demo_ssd(3);
        let data: Vec<Bit> = (0..16).map(|i| (i % 2) as Bit).collect();
        ssd.write_data(&data).unwrap();
        ssd.inject_bit_flip((0, 0), 7 * 2).unwrap();
        ssd.inject_bit_flip((0, 0), 7 * 3 + 5).unwrap();
        assert_eq!(ssd.read_data((0, 0)).unwrap(), Some(data));
        assert!(ssd.inject_bit_flip((0, 0), 28).is_err());
    }

    #[test]
    fn trimmed_block_is_reclaimed() {
        let mut ssd = demo_ssd(4);
        ssd.write_data(&[1; 64]).unwrap();
        for p in 0..DEMO_PAGES_PER_BLOCK {
            ssd.invalidate_page((0, p)).unwrap();
        }
        assert_eq!(ssd.garbage_collect(), Ok(0));
        assert_eq!(ssd.garbage_collect(), Err(FtlError::OutOfSpace));
        assert_eq!(ssd.block_state(0), Ok(BlockState::Erased));
    }

    #[test]
    fn shared_drive_serializes_writers() {
        let shared = Arc::new(SharedSsd::new(demo_ssd(5)));

        let writers: Vec<_> = (0..4)
            .map(|_| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || {
                    for _ in 0..2 {
                        shared.write_data(&[1; 16]).unwrap();
                        shared.read_data((0, 0)).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let live = shared.valid_pages().unwrap();
        assert_eq!(live.len(), 8);
        for &addr in &live {
            assert_eq!(shared.read_data(addr).unwrap(), Some(vec![1; 16]));
        }

        let ssd = Arc::try_unwrap(shared).ok().unwrap().into_inner().unwrap();
        assert_eq!(ssd.drive().free_blocks().len(), DEMO_BLOCK_COUNT - 2);
    }
}
