#[macro_use]
extern crate log;
extern crate simplelog;

use nand_sim::config::*;
use nand_sim::{FtlError, SleepClock, Ssd, VirtualClock};
use rand::prelude::*;
use simplelog::*;
use time::macros::format_description;

fn main() -> Result<(), FtlError> {
    let log_cfg = ConfigBuilder::new()
        .set_time_format_custom(format_description!("[hour]:[minute]:[second].[subsecond]"))
        .build();

    if SimpleLogger::init(LevelFilter::Debug, log_cfg).is_err() {
        eprintln!("logger already installed");
    }

    let mut ssd = Ssd::with_parts(
        DriveConfig::demo(),
        SmallRng::seed_from_u64(DEMO_SEED),
        SleepClock,
    );

    ssd.write_data(&[1; 30])?;
    info!("Read Data from (0, 0): {:?}", ssd.read_data((0, 0))?);

    ssd.write_data(&[1; 50])?;
    info!("Read Data from (0, 2): {:?}", ssd.read_data((0, 2))?);

    let (block, page) = ssd.controller().cursor();
    info!("Cursor at ({}, {})", block, page);

    // steady state on simulated time: keep the drive half full, trimming the
    // oldest pages, long enough to cycle every block several times
    let mut ssd = Ssd::with_parts(
        DriveConfig::demo(),
        SmallRng::seed_from_u64(DEMO_SEED),
        VirtualClock::new(),
    );
    let mut rng = SmallRng::seed_from_u64(DEMO_SEED);
    let live_target = DriveConfig::demo().all_pages() / 2;
    for round in 0..DriveConfig::demo().all_pages() * 8 {
        let bits: Vec<Bit> = (0..DEMO_PAGE_SIZE).map(|_| rng.gen_range(0..=1)).collect();
        ssd.write_data(&bits)?;

        while ssd.controller().valid_pages().len() > live_target {
            let oldest = ssd.controller().valid_pages()[0];
            ssd.invalidate_page(oldest)?;
        }
        debug!("Round {} done, {} live pages", round, ssd.controller().valid_pages().len());
    }
    info!("Simulated time: {:?}", ssd.controller().clock().elapsed());

    let stats = ssd.wear_stats();
    info!(
        "Wear min {} max {} avg {:.2} gap {}",
        stats.min, stats.max, stats.avg, stats.gap
    );
    Ok(())
}
