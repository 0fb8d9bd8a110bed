use std::collections::BTreeSet;

use crate::config::*;
use crate::error::{FtlError, Result};

#[cfg(test)]
use std::println as trace;

#[cfg(not(test))]
use log::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    state: Bit,
}

impl Cell {
    pub fn state(&self) -> Bit {
        self.state
    }

    fn program(&mut self, bit: Bit) {
        self.state = bit;
    }

    fn flip(&mut self) {
        self.state ^= 1;
    }

    fn erase(&mut self) {
        self.state = 0;
    }
}

#[derive(Clone, Debug)]
pub struct Page {
    cells: Vec<Cell>,
    valid: bool,
}

impl Page {
    fn new(cells: BaseType) -> Self {
        Page {
            cells: vec![Cell::default(); cells],
            valid: false,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn states(&self) -> Vec<Bit> {
        self.cells.iter().map(Cell::state).collect()
    }

    /// Stores `bits` from the first cell onwards and marks the page live.
    /// Cells past `bits.len()` keep their erased state.
    pub(crate) fn program(&mut self, bits: &[Bit]) {
        debug_assert!(bits.len() <= self.cells.len(), "codeword longer than the page");

        for (cell, &bit) in self.cells.iter_mut().zip(bits) {
            cell.program(bit);
        }
        self.valid = true;
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    fn erase(&mut self) {
        self.cells.iter_mut().for_each(Cell::erase);
        self.valid = false;
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum BlockState {
    Erased,
    PartiallyWritten,
    Full,
}

#[derive(Clone, Debug)]
pub struct Block {
    pages: Vec<Page>,
    erased: bool,
    cursor: PageId, // one past the highest programmed page
}

impl Block {
    fn new(cells_per_page: BaseType, pages_per_block: PageId) -> Self {
        Block {
            pages: vec![Page::new(cells_per_page); pages_per_block],
            erased: true,
            cursor: 0,
        }
    }

    pub fn full(&self) -> bool {
        self.cursor == self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, page: PageId) -> Option<&Page> {
        self.pages.get(page)
    }

    pub fn is_erased(&self) -> bool {
        self.erased
    }

    pub fn live_pages(&self) -> Counter {
        self.pages.iter().filter(|p| p.is_valid()).count()
    }

    fn erase(&mut self) {
        self.pages.iter_mut().for_each(Page::erase);
        self.erased = true;
        self.cursor = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WearStats {
    pub min: Counter,
    pub max: Counter,
    pub avg: f64,
    pub gap: Counter,
}

/// The physical medium: every block, its wear history and the free pool.
pub struct Drive {
    config: DriveConfig,
    blocks: Vec<Block>,
    wear_count: Vec<Counter>,
    free_blocks: BTreeSet<BlockId>,
}

impl Drive {
    pub fn new(config: DriveConfig) -> Self {
        let block_count = config.block_count();
        Drive {
            blocks: vec![Block::new(config.codeword_len(), config.pages_per_block()); block_count],
            wear_count: vec![0; block_count],
            free_blocks: (0..block_count).collect(),
            config,
        }
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn block_count(&self) -> BlockId {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn wear_count(&self) -> &[Counter] {
        &self.wear_count
    }

    pub fn free_blocks(&self) -> &BTreeSet<BlockId> {
        &self.free_blocks
    }

    pub fn is_free(&self, index: BlockId) -> bool {
        self.free_blocks.contains(&index)
    }

    pub fn block(&self, index: BlockId) -> Result<&Block> {
        self.blocks.get(index).ok_or(FtlError::InvalidAddress {
            block: index,
            page: None,
        })
    }

    pub fn page(&self, block: BlockId, page: PageId) -> Result<&Page> {
        self.block(block)?.page(page).ok_or(FtlError::InvalidAddress {
            block,
            page: Some(page),
        })
    }

    pub(crate) fn page_mut(&mut self, block: BlockId, page: PageId) -> Result<&mut Page> {
        self.blocks
            .get_mut(block)
            .and_then(|b| b.pages.get_mut(page))
            .ok_or(FtlError::InvalidAddress {
                block,
                page: Some(page),
            })
    }

    pub fn block_state(&self, index: BlockId) -> Result<BlockState> {
        let block = self.block(index)?;
        if block.is_erased() {
            return Ok(BlockState::Erased);
        }
        if block.full() {
            Ok(BlockState::Full)
        } else {
            Ok(BlockState::PartiallyWritten)
        }
    }

    /// Resets every cell of the block and returns it to the free pool.
    /// Wear is charged even when the block was already erased. Outside the
    /// crate erases go through `Controller::erase_block`, which also drops the
    /// block's pages from the controller's live list.
    pub(crate) fn erase_block(&mut self, index: BlockId) -> Result<()> {
        let block = self.blocks.get_mut(index).ok_or(FtlError::InvalidAddress {
            block: index,
            page: None,
        })?;
        block.erase();
        self.wear_count[index] += 1;
        self.free_blocks.insert(index);

        trace!("Erased block {} (wear {})", index, self.wear_count[index]);
        Ok(())
    }

    /// Takes a block out of the free pool before its first page is programmed.
    pub(crate) fn claim(&mut self, index: BlockId) {
        self.free_blocks.remove(&index);
        self.blocks[index].erased = false;
    }

    /// Stores an already encoded codeword into one page and marks it live.
    pub(crate) fn program(&mut self, block: BlockId, page: PageId, bits: &[Bit]) -> Result<()> {
        self.page_mut(block, page)?.program(bits);
        let block = &mut self.blocks[block];
        block.erased = false;
        block.cursor = block.cursor.max(page + 1);
        Ok(())
    }

    /// Flips one physical cell, bypassing the controller. Fault injection only.
    pub fn flip_cell(&mut self, block: BlockId, page: PageId, cell: BaseType) -> Result<()> {
        self.page_mut(block, page)?
            .cells
            .get_mut(cell)
            .ok_or(FtlError::InvalidAddress {
                block,
                page: Some(page),
            })?
            .flip();
        Ok(())
    }

    pub fn wear_stats(&self) -> WearStats {
        let min = self.wear_count.iter().copied().min().unwrap_or(0);
        let max = self.wear_count.iter().copied().max().unwrap_or(0);
        let total: Counter = self.wear_count.iter().sum();
        WearStats {
            min,
            max,
            avg: total as f64 / self.wear_count.len() as f64,
            gap: max - min,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn drive() -> Drive {
        Drive::new(DriveConfig::demo())
    }

    #[test]
    fn starts_erased_and_free() {
        let d = drive();
        assert_eq!(d.block_count(), DEMO_BLOCK_COUNT);
        assert_eq!(d.free_blocks().len(), DEMO_BLOCK_COUNT);
        assert!(d.wear_count().iter().all(|&w| w == 0));
        for block in d.blocks() {
            assert!(block.is_erased());
            assert_eq!(block.pages().len(), DEMO_PAGES_PER_BLOCK);
            for page in block.pages() {
                assert!(!page.is_valid());
                assert_eq!(page.cells().len(), 28);
                assert!(page.states().iter().all(|&b| b == 0));
            }
        }
        assert_eq!(d.block_state(3), Ok(BlockState::Erased));
    }

    #[test]
    fn erase_resets_block_and_charges_wear() {
        let mut d = drive();
        d.claim(2);
        d.program(2, 0, &[1; 28]).unwrap();
        d.program(2, 1, &[1, 0, 1]).unwrap();
        assert!(!d.is_free(2));
        assert_eq!(d.block_state(2), Ok(BlockState::PartiallyWritten));

        d.erase_block(2).unwrap();

        let block = d.block(2).unwrap();
        assert!(block.is_erased());
        assert_eq!(block.live_pages(), 0);
        assert!(block
            .pages()
            .iter()
            .all(|p| !p.is_valid() && p.states().iter().all(|&b| b == 0)));
        assert_eq!(d.wear_count()[2], 1);
        assert!(d.is_free(2));
    }

    #[test]
    fn erasing_idle_block_still_wears_it() {
        let mut d = drive();
        d.erase_block(5).unwrap();
        d.erase_block(5).unwrap();
        assert_eq!(d.wear_count()[5], 2);
        assert_eq!(
            d.wear_stats(),
            WearStats { min: 0, max: 2, avg: 0.2, gap: 2 }
        );
    }

    #[test]
    fn full_block_state() {
        let mut d = drive();
        d.claim(0);
        for p in 0..DEMO_PAGES_PER_BLOCK {
            d.program(0, p, &[0; 28]).unwrap();
        }
        assert_eq!(d.block_state(0), Ok(BlockState::Full));
        d.page_mut(0, 3).unwrap().invalidate();
        assert_eq!(d.block_state(0), Ok(BlockState::Full));
        assert_eq!(d.block(0).unwrap().live_pages(), 3);
    }

    #[test]
    fn rejects_out_of_range_addresses() {
        let mut d = drive();
        assert_eq!(
            d.erase_block(DEMO_BLOCK_COUNT),
            Err(FtlError::InvalidAddress { block: DEMO_BLOCK_COUNT, page: None })
        );
        assert_eq!(
            d.page(0, DEMO_PAGES_PER_BLOCK).err(),
            Some(FtlError::InvalidAddress { block: 0, page: Some(DEMO_PAGES_PER_BLOCK) })
        );
        assert!(d.flip_cell(0, 0, 28).is_err());
        assert!(d.flip_cell(0, 0, 27).is_ok());
        assert_eq!(d.page(0, 0).unwrap().states()[27], 1);
    }
}
