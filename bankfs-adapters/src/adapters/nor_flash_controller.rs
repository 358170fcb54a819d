//! Flash controller over `embedded-storage` NOR flash drivers.
//!
//! This lets [`InternalFlash`](crate::InternalFlash) run on top of a HAL's
//! flash driver instead of the register-level controller:
//!
//! ```ignore
//! use bankfs_adapters::{FlashLayout, InternalFlash, NorFlashController, RegionConfig};
//!
//! let hal_flash = dp.FLASH.constrain();
//! let controller = NorFlashController::new(hal_flash, FlashLayout::stm32l4r5());
//! let device = InternalFlash::new(controller, RegionConfig::stm32l4r5_bank2());
//! ```
//!
//! Driver offset 0 is the first byte of bank 1.
//!
//! `embedded-storage` drivers unlock internally for each call, so the lock
//! here is tracked in software only. It still gates program and erase, which
//! keeps the unlock discipline of the adapter observable.

use crate::domain::{
    Bank, ControllerError, FlashAddress, FlashController, FlashLayout, PROGRAM_WIDTH, PageNumber,
    READ_WIDTH, StatusFlags,
};
use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind};

/// [`FlashController`] backed by an `embedded-storage` [`NorFlash`] driver.
pub struct NorFlashController<F> {
    flash: F,
    layout: FlashLayout,
    locked: bool,
    status: StatusFlags,
}

impl<F: NorFlash> NorFlashController<F> {
    /// Wrap `flash`, whose offset space covers both banks of `layout`.
    ///
    /// Starts locked.
    pub fn new(flash: F, layout: FlashLayout) -> Self {
        Self {
            flash,
            layout,
            locked: true,
            status: StatusFlags::empty(),
        }
    }

    /// Get the layout.
    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Status flags recorded from the last failures.
    pub fn status(&self) -> StatusFlags {
        self.status
    }

    /// Consume the controller and return the driver.
    pub fn into_inner(self) -> F {
        self.flash
    }

    fn offset_of(&self, address: FlashAddress, len: u32) -> Result<u32, ControllerError> {
        let capacity = self.flash.capacity() as u64;
        match address.checked_offset_from(self.layout.bank_base(Bank::Bank1)) {
            Some(offset) if offset as u64 + len as u64 <= capacity => Ok(offset),
            _ => Err(ControllerError::OutOfBounds(address)),
        }
    }

    fn fail(&mut self, kind: NorFlashErrorKind) -> ControllerError {
        let flags = match kind {
            NorFlashErrorKind::NotAligned => StatusFlags::PGAERR,
            _ => StatusFlags::OPERR,
        };
        self.status |= flags;
        ControllerError::Status(flags)
    }
}

impl<F: NorFlash> FlashController for NorFlashController<F> {
    fn unlock(&mut self) -> Result<(), ControllerError> {
        self.locked = false;
        Ok(())
    }

    fn lock(&mut self) {
        self.locked = true;
    }

    fn is_locked(&self) -> bool {
        self.locked
    }

    fn clear_status(&mut self, flags: StatusFlags) {
        self.status.remove(flags);
    }

    fn read_word(&mut self, address: FlashAddress) -> Result<u32, ControllerError> {
        let offset = self.offset_of(address, READ_WIDTH)?;
        let mut word = [0u8; READ_WIDTH as usize];
        self.flash
            .read(offset, &mut word)
            .map_err(|e| self.fail(e.kind()))?;
        Ok(u32::from_le_bytes(word))
    }

    fn program_double_word(
        &mut self,
        address: FlashAddress,
        value: u64,
    ) -> Result<(), ControllerError> {
        if self.locked {
            return Err(ControllerError::Locked);
        }
        let offset = self.offset_of(address, PROGRAM_WIDTH)?;
        self.flash
            .write(offset, &value.to_le_bytes())
            .map_err(|e| self.fail(e.kind()))
    }

    fn erase_page(&mut self, bank: Bank, page: PageNumber) -> Result<(), ControllerError> {
        if self.locked {
            return Err(ControllerError::Locked);
        }
        let page_size = self.layout.page_size();
        let address = self
            .layout
            .page_address(bank, page)
            .ok_or(ControllerError::OutOfBounds(self.layout.bank_base(bank)))?;
        let from = self.offset_of(address, page_size)?;
        self.flash
            .erase(from, from + page_size)
            .map_err(|e| self.fail(e.kind()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InternalFlash;
    use crate::domain::RegionConfig;
    use bankfs_block_device::{BlockDevice, BlockError};
    use embedded_storage::nor_flash::{ErrorType, ReadNorFlash};

    const PAGE: usize = 1024;
    const PAGES: usize = 16;

    /// Mock NOR flash: two banks of eight pages each.
    struct MockFlash {
        data: Vec<u8>,
        fail_writes: bool,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: vec![0xFF; PAGE * PAGES],
                fail_writes: false,
            }
        }
    }

    #[derive(Debug)]
    struct MockFlashError(NorFlashErrorKind);

    impl NorFlashError for MockFlashError {
        fn kind(&self) -> NorFlashErrorKind {
            self.0
        }
    }

    impl ErrorType for MockFlash {
        type Error = MockFlashError;
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 4;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            let src = self
                .data
                .get(start..start + bytes.len())
                .ok_or(MockFlashError(NorFlashErrorKind::OutOfBounds))?;
            bytes.copy_from_slice(src);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.data.len()
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 8;
        const ERASE_SIZE: usize = PAGE;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            if from as usize % PAGE != 0 || to as usize % PAGE != 0 {
                return Err(MockFlashError(NorFlashErrorKind::NotAligned));
            }
            self.data[from as usize..to as usize].fill(0xFF);
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            if self.fail_writes {
                return Err(MockFlashError(NorFlashErrorKind::Other));
            }
            let start = offset as usize;
            for (cell, byte) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
                *cell &= byte;
            }
            Ok(())
        }
    }

    fn layout() -> FlashLayout {
        FlashLayout::new(0x0800_0000, PAGE as u32, (PAGES / 2) as u32).unwrap()
    }

    #[test]
    fn test_erase_maps_bank_and_page_to_offset() {
        let mut flash = MockFlash::new();
        flash.data.fill(0);
        let mut controller = NorFlashController::new(flash, layout());

        controller.unlock().unwrap();
        controller.erase_page(Bank::Bank2, PageNumber::new(1)).unwrap();

        let flash = controller.into_inner();
        let erased = 9 * PAGE;
        assert!(flash.data[erased..erased + PAGE].iter().all(|&b| b == 0xFF));
        assert!(flash.data[..erased].iter().all(|&b| b == 0));
        assert!(flash.data[erased + PAGE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_software_lock_gates_mutation() {
        let mut controller = NorFlashController::new(MockFlash::new(), layout());
        assert!(controller.is_locked());
        assert_eq!(
            controller.program_double_word(FlashAddress::new(0x0800_0000), 0),
            Err(ControllerError::Locked)
        );
        assert_eq!(
            controller.erase_page(Bank::Bank1, PageNumber::new(0)),
            Err(ControllerError::Locked)
        );
    }

    #[test]
    fn test_out_of_range_address() {
        let mut controller = NorFlashController::new(MockFlash::new(), layout());
        let below = FlashAddress::new(0x07FF_FFFC);
        assert_eq!(controller.read_word(below), Err(ControllerError::OutOfBounds(below)));

        controller.unlock().unwrap();
        assert_eq!(
            controller.erase_page(Bank::Bank2, PageNumber::new(8)),
            Err(ControllerError::OutOfBounds(FlashAddress::new(0x0800_2000)))
        );
    }

    #[test]
    fn test_driver_error_becomes_status() {
        let mut flash = MockFlash::new();
        flash.fail_writes = true;
        let mut controller = NorFlashController::new(flash, layout());
        controller.unlock().unwrap();

        assert_eq!(
            controller.program_double_word(FlashAddress::new(0x0800_0000), 0),
            Err(ControllerError::Status(StatusFlags::OPERR))
        );
        assert!(controller.status().contains(StatusFlags::OPERR));
        controller.clear_status(StatusFlags::STALE);
        assert!(controller.status().is_empty());
    }

    #[test]
    fn test_block_device_over_nor_flash() {
        let controller = NorFlashController::new(MockFlash::new(), layout());
        let region = RegionConfig::new(layout(), 0x0800_2000, 8).unwrap();
        assert_eq!(region.bank(), Bank::Bank2);
        let mut device = InternalFlash::new(controller, region);

        device.erase(2).unwrap();
        device.prog(2, 16, &[7u8; 16]).unwrap();

        let mut buf = [0u8; 16];
        device.read(2, 16, &mut buf).unwrap();
        assert_eq!(buf, [7u8; 16]);
        assert!(device.controller().is_locked());

        device.controller_mut().flash.fail_writes = true;
        assert_eq!(device.prog(3, 0, &[0u8; 8]), Err(BlockError::Io));
        assert!(device.controller().is_locked());
    }
}
