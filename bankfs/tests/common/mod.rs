//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use anyhow::{Result, ensure};
use bankfs::{Config, Filesystem, OpenFlags, boot::BOOT_COUNT_PATH};
use bankfs_adapters::{FlashController, FlashLayout, InternalFlash, RegionConfig, SimulatedFlash};

pub const BLOCK_SIZE: u32 = 1024;
pub const BLOCKS: u32 = 8;

pub type Device = InternalFlash<SimulatedFlash>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Two 1 MiB banks of 1 KiB pages; the region starts bank 2.
pub fn region() -> RegionConfig {
    let layout = FlashLayout::new(0x0800_0000, BLOCK_SIZE, 1024).expect("valid layout");
    RegionConfig::new(layout, 0x0810_0000, BLOCKS).expect("valid region")
}

/// Small geometry so compaction happens within a few dozen commits.
pub fn config() -> Config {
    Config {
        read_size: 16,
        prog_size: 16,
        block_size: BLOCK_SIZE,
        block_count: BLOCKS,
        cache_size: 16,
        lookahead_size: 8,
        block_cycles: 500,
    }
}

pub fn device() -> Device {
    let region = region();
    InternalFlash::new(SimulatedFlash::for_region(&region), region)
}

/// A second device with the same flash contents.
pub fn snapshot(device: &Device) -> Device {
    InternalFlash::new(device.controller().clone(), *device.region())
}

/// Mount and read the boot counter without changing anything.
pub fn read_counter(device: &mut Device) -> Result<u32> {
    let mut fs = Filesystem::new(device, config())?;
    fs.mount()?;
    let mut file = fs.open(BOOT_COUNT_PATH, OpenFlags::READ)?;
    let mut bytes = [0u8; 4];
    let n = file.read(&mut bytes)?;
    ensure!(n == 4, "boot counter holds {} bytes", n);
    Ok(u32::from_le_bytes(bytes))
}

pub fn assert_locked(device: &Device) {
    assert!(device.controller().is_locked(), "flash left unlocked");
}
