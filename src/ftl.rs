#[cfg(test)]
use std::{println as warn, println as trace, println as debug};

use num_integer::Integer;
use rand::seq::SliceRandom;
use rand::Rng;

#[cfg(not(test))]
use log::*;

use crate::config::*;
use crate::ecc;
use crate::error::{FtlError, Result};
use crate::latency::{transfer_time, Clock};
use crate::media::Drive;

/// Flash translation layer for one [`Drive`].
///
/// The drive is passed into every call rather than stored, so the caller keeps
/// ownership of the medium and one controller serves exactly one drive.
pub struct Controller<R: Rng, C: Clock> {
    current_block: BlockId,
    current_page: PageId,
    valid_pages: Vec<PageAddr>,
    read_speed: f64,
    write_speed: f64,

    rng: R,
    clock: C,
}

impl<R: Rng, C: Clock> Controller<R, C> {
    pub fn new(config: &DriveConfig, rng: R, clock: C) -> Self {
        Controller {
            current_block: 0,
            current_page: 0,
            valid_pages: Vec::new(),
            read_speed: config.read_speed(),
            write_speed: config.write_speed(),
            rng,
            clock,
        }
    }

    pub fn cursor(&self) -> PageAddr {
        (self.current_block, self.current_page)
    }

    pub fn valid_pages(&self) -> &[PageAddr] {
        &self.valid_pages
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Splits `data` into page-sized chunks and programs them at the cursor.
    ///
    /// The last chunk is padded with zeros up to a full page before encoding,
    /// so a read of that page returns the written prefix followed by zeros.
    pub fn write(&mut self, drive: &mut Drive, data: &[Bit]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if let Some((index, &value)) = data.iter().enumerate().find(|&(_, &b)| b > 1) {
            return Err(FtlError::InvalidBit { index, value });
        }

        let page_size = drive.config().page_size();
        let pages_needed = Integer::div_ceil(&data.len(), &page_size);
        trace!("Write {} bits over {} pages", data.len(), pages_needed);

        for chunk in data.chunks(page_size) {
            if self.current_page == drive.config().pages_per_block() {
                self.advance_block(drive)?;
            }
            if drive.is_free(self.current_block) {
                drive.claim(self.current_block);
            }

            let mut page_bits = chunk.to_vec();
            page_bits.resize(page_size, 0);
            let encoded = ecc::encode(&page_bits)?;

            drive.program(self.current_block, self.current_page, &encoded)?;
            self.valid_pages.push(self.cursor());
            trace!("Programmed page ({}, {})", self.current_block, self.current_page);

            self.clock.delay(transfer_time(encoded.len(), self.write_speed));
            self.current_page += 1;
        }

        Ok(())
    }

    /// Returns the decoded page, or `None` when the page holds no live data.
    pub fn read(&self, drive: &Drive, (block, page): PageAddr) -> Result<Option<Vec<Bit>>> {
        let target = drive.page(block, page)?;
        if !target.is_valid() {
            return Ok(None);
        }

        self.clock
            .delay(transfer_time(drive.config().page_size(), self.read_speed));
        ecc::decode(&target.states()).map(Some)
    }

    /// Marks a live page dead; once a block has no live pages it can be reclaimed.
    pub fn invalidate_page(&mut self, drive: &mut Drive, (block, page): PageAddr) -> Result<()> {
        drive.page_mut(block, page)?.invalidate();
        self.valid_pages.retain(|&addr| addr != (block, page));
        Ok(())
    }

    /// Erases `index` and drops everything the controller tracked inside it.
    pub fn erase_block(&mut self, drive: &mut Drive, index: BlockId) -> Result<()> {
        drive.erase_block(index)?;
        self.forget_block(drive, index);
        Ok(())
    }

    fn forget_block(&mut self, drive: &Drive, index: BlockId) {
        self.valid_pages.retain(|&(block, _)| block != index);
        if index == self.current_block {
            // the open block went back to the pool; next write allocates afresh
            self.current_page = drive.config().pages_per_block();
        }
    }

    fn advance_block(&mut self, drive: &mut Drive) -> Result<()> {
        let chosen = self.get_next_block(drive)?;
        let next = if drive.is_free(chosen) {
            chosen
        } else {
            match self.garbage_collect(drive) {
                Ok(reclaimed) => reclaimed,
                Err(FtlError::OutOfSpace) if !drive.free_blocks().is_empty() => {
                    let free: Vec<BlockId> = drive.free_blocks().iter().copied().collect();
                    self.pick_least_worn(drive, &free)?
                }
                Err(e) => {
                    warn!("Cannot allocate a block after ({}, {}): {}", self.current_block, self.current_page, e);
                    return Err(e);
                }
            }
        };

        drive.claim(next);
        self.current_block = next;
        self.current_page = 0;
        debug!("Open block {} (wear {})", next, drive.wear_count()[next]);
        Ok(())
    }

    /// Wear-leveling allocator: a uniformly random block among the least worn.
    /// Free blocks win the tie when any least-worn block is free.
    pub fn get_next_block(&mut self, drive: &Drive) -> Result<BlockId> {
        let all: Vec<BlockId> = (0..drive.block_count()).collect();
        self.pick_least_worn(drive, &all)
    }

    fn pick_least_worn(&mut self, drive: &Drive, candidates: &[BlockId]) -> Result<BlockId> {
        let wear = drive.wear_count();
        let min = candidates
            .iter()
            .map(|&b| wear[b])
            .min()
            .ok_or(FtlError::OutOfSpace)?;

        let tied: Vec<BlockId> = candidates.iter().copied().filter(|&b| wear[b] == min).collect();
        let tied_free: Vec<BlockId> = tied.iter().copied().filter(|&b| drive.is_free(b)).collect();
        let pool = if tied_free.is_empty() { &tied } else { &tied_free };

        pool.choose(&mut self.rng).copied().ok_or(FtlError::OutOfSpace)
    }

    /// Erases a random written block without live pages and returns its index.
    /// The open block only qualifies once the cursor has run off its end.
    pub fn garbage_collect(&mut self, drive: &mut Drive) -> Result<BlockId> {
        let exhausted = self.current_page == drive.config().pages_per_block();
        let candidates: Vec<BlockId> = (0..drive.block_count())
            .filter(|&b| !drive.is_free(b))
            .filter(|&b| b != self.current_block || exhausted)
            .filter(|&b| drive.blocks()[b].live_pages() == 0)
            .collect();

        let victim = match candidates.choose(&mut self.rng) {
            Some(&victim) => victim,
            None => {
                warn!("No reclaimable block: every written block still holds live pages");
                return Err(FtlError::OutOfSpace);
            }
        };

        debug!("Reclaim block {} out of {} candidates", victim, candidates.len());
        drive.erase_block(victim)?;
        self.forget_block(drive, victim);
        Ok(victim)
    }
}
