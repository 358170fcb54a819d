//! Block device over the on-chip flash region.
//!
//! This is the adapter that sits between a flash filesystem and the flash
//! controller. It translates `(block, offset)` requests into absolute
//! addresses and hardware commands:
//!
//! - **read**: word-by-word copy out of the memory-mapped array
//! - **prog**: one double-word program per 8-byte chunk, under the unlock guard
//! - **erase**: exactly one page erase, under the unlock guard
//! - **sync**: nothing to flush
//!
//! Every request is validated against the region geometry before the
//! controller is touched, so a rejected request never issues a partial
//! hardware operation.

use crate::{
    adapters::ControlGuard,
    domain::{FlashController, PROGRAM_WIDTH, READ_WIDTH, RegionConfig, StatusFlags},
};
use bankfs_block_device::{BlockDevice, BlockError, Geometry};

/// Block device backed by a dedicated region of on-chip flash.
///
/// Owns no per-block state: every call is determined by the arguments, the
/// region configuration and the flash contents. The per-block
/// `erased -> programmed -> erased` lifecycle is the caller's to keep.
///
/// # Type Parameters
///
/// - `C`: The flash controller driving the hardware (or a simulator)
///
/// # Examples
///
/// ```ignore
/// use bankfs_adapters::{InternalFlash, RegionConfig, Stm32l4Controller};
///
/// let controller = unsafe { Stm32l4Controller::new() };
/// let mut flash = InternalFlash::new(controller, RegionConfig::stm32l4r5_bank2());
///
/// flash.erase(0)?;
/// flash.prog(0, 0, &[0u8; 8])?;
/// ```
pub struct InternalFlash<C> {
    controller: C,
    region: RegionConfig,
}

impl<C: FlashController> InternalFlash<C> {
    /// Create a new adapter over `region`, driving `controller`.
    pub fn new(controller: C, region: RegionConfig) -> Self {
        Self { controller, region }
    }

    /// Get the region configuration.
    pub fn region(&self) -> &RegionConfig {
        &self.region
    }

    /// Get a reference to the underlying controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Get a mutable reference to the underlying controller.
    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Consume the adapter and return the underlying controller.
    pub fn into_inner(self) -> C {
        self.controller
    }
}

impl<C: FlashController> BlockDevice for InternalFlash<C> {
    fn geometry(&self) -> Geometry {
        self.region.geometry()
    }

    fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), BlockError> {
        self.region.geometry().check_read(block, offset, buffer.len())?;

        for (i, chunk) in buffer.chunks_exact_mut(READ_WIDTH as usize).enumerate() {
            let address = self.region.block_address(block, offset + i as u32 * READ_WIDTH);
            let word = self.controller.read_word(address).map_err(|e| {
                warn!("flash read failed at {}: {:?}", address, e);
                BlockError::Io
            })?;
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        trace!("read block {} offset {} len {}", block, offset, buffer.len());
        Ok(())
    }

    fn prog(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), BlockError> {
        self.region.geometry().check_prog(block, offset, data.len())?;
        if data.is_empty() {
            return Ok(());
        }

        let region = &self.region;
        let mut guard = ControlGuard::acquire(&mut self.controller).map_err(|e| {
            warn!("flash unlock failed before program: {:?}", e);
            BlockError::Io
        })?;
        guard.clear_status(StatusFlags::STALE);

        for (i, chunk) in data.chunks_exact(PROGRAM_WIDTH as usize).enumerate() {
            let address = region.block_address(block, offset + i as u32 * PROGRAM_WIDTH);
            let mut double_word = [0u8; PROGRAM_WIDTH as usize];
            double_word.copy_from_slice(chunk);

            guard
                .program_double_word(address, u64::from_le_bytes(double_word))
                .map_err(|e| {
                    warn!(
                        "flash program failed at {} (block {} offset {}): {:?}",
                        address,
                        block,
                        offset,
                        e
                    );
                    BlockError::Io
                })?;
        }

        trace!("programmed block {} offset {} len {}", block, offset, data.len());
        Ok(())
    }

    fn erase(&mut self, block: u32) -> Result<(), BlockError> {
        self.region.geometry().check_block(block)?;
        let bank = self.region.bank();
        let page = self.region.page_of(block).ok_or(BlockError::OutOfRange {
            block,
            offset: 0,
            len: 0,
        })?;

        let mut guard = ControlGuard::acquire(&mut self.controller).map_err(|e| {
            warn!("flash unlock failed before erase: {:?}", e);
            BlockError::Io
        })?;
        guard.clear_status(StatusFlags::STALE);
        guard.erase_page(bank, page).map_err(|e| {
            warn!("flash erase failed for block {} (page {}): {:?}", block, page.value(), e);
            BlockError::Io
        })?;

        trace!("erased block {}", block);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), BlockError> {
        // Programs complete before the controller reports success; nothing is buffered.
        Ok(())
    }
}
