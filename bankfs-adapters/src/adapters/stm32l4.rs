//! Register-level flash controller for STM32L4 dual-bank parts.
//!
//! Drives the `FLASH` peripheral directly: key-sequence unlock, double-word
//! programming through the `PG` bit and single-page erase through
//! `PER`/`PNB`/`BKER`. Busy waits are bounded by a spin budget so a wedged
//! controller reports [`ControllerError::Busy`] instead of hanging.
//!
//! Program and erase must not run from the bank being modified. Code and
//! vector tables live in bank 1, the storage region in bank 2.

use crate::domain::{
    Bank, ControllerError, FlashAddress, FlashController, FlashLayout, PageNumber, StatusFlags,
};
use core::ptr::{read_volatile, write_volatile};
use core::sync::atomic::{Ordering, compiler_fence};

/// `FLASH` peripheral base address.
pub const FLASH_REGISTERS: u32 = 0x4002_2000;

const KEYR_OFFSET: u32 = 0x08;
const SR_OFFSET: u32 = 0x10;
const CR_OFFSET: u32 = 0x14;

const KEY1: u32 = 0x4567_0123;
const KEY2: u32 = 0xCDEF_89AB;

const CR_PG: u32 = 1 << 0;
const CR_PER: u32 = 1 << 1;
const CR_PNB_SHIFT: u32 = 3;
const CR_PNB_MAX: u32 = 0xFF;
const CR_PNB_MASK: u32 = CR_PNB_MAX << CR_PNB_SHIFT;
const CR_BKER: u32 = 1 << 11;
const CR_STRT: u32 = 1 << 16;
const CR_LOCK: u32 = 1 << 31;

/// Spin iterations allowed per busy wait.
///
/// A 4 KiB page erase takes up to ~25 ms; this leaves ample room at 120 MHz.
pub const SPIN_BUDGET: u32 = 4_000_000;

/// `CR` bits selecting a page erase of `page` in `bank`, before `STRT`.
///
/// Returns `None` if `page` does not fit the page-select field.
pub const fn erase_bits(bank: Bank, page: PageNumber) -> Option<u32> {
    if page.value() > CR_PNB_MAX {
        return None;
    }
    let bank_bit = match bank {
        Bank::Bank1 => 0,
        Bank::Bank2 => CR_BKER,
    };
    Some(CR_PER | (page.value() << CR_PNB_SHIFT) | bank_bit)
}

/// Check a page erase against `layout` and build its `CR` bits.
///
/// A page outside the bank is reported as [`ControllerError::OutOfBounds`]
/// at the address it would have had.
pub fn erase_request(
    layout: &FlashLayout,
    bank: Bank,
    page: PageNumber,
) -> Result<u32, ControllerError> {
    let bits = match layout.page_address(bank, page) {
        Some(_) => erase_bits(bank, page),
        None => None,
    };
    bits.ok_or_else(|| {
        let bank_base = layout.bank_base(bank);
        let address = page
            .value()
            .checked_mul(layout.page_size())
            .and_then(|offset| bank_base.checked_add(offset))
            .unwrap_or(bank_base);
        ControllerError::OutOfBounds(address)
    })
}

/// Clear the operation-select bits of a `CR` value, keeping everything else.
pub const fn without_operation(cr: u32) -> u32 {
    cr & !(CR_PG | CR_PER | CR_PNB_MASK | CR_BKER | CR_STRT)
}

/// Split a double-word into the two words written to the array, low word first.
pub const fn split_double_word(value: u64) -> (u32, u32) {
    (value as u32, (value >> 32) as u32)
}

/// Flash controller for the STM32L4 `FLASH` peripheral.
pub struct Stm32l4Controller {
    base: u32,
    layout: FlashLayout,
}

impl Stm32l4Controller {
    /// Take the `FLASH` peripheral.
    ///
    /// # Safety
    ///
    /// The caller must own the `FLASH` peripheral exclusively for the
    /// lifetime of the controller, and the part must be in dual-bank mode.
    pub unsafe fn new() -> Self {
        Self {
            base: FLASH_REGISTERS,
            layout: FlashLayout::stm32l4r5(),
        }
    }

    /// Bank and page layout erases are checked against.
    pub fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Current status register contents.
    pub fn status(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.read_reg(SR_OFFSET))
    }

    fn read_reg(&self, offset: u32) -> u32 {
        // SAFETY: `new` guarantees exclusive ownership of the peripheral.
        unsafe { read_volatile((self.base + offset) as *const u32) }
    }

    fn write_reg(&mut self, offset: u32, value: u32) {
        // SAFETY: `new` guarantees exclusive ownership of the peripheral.
        unsafe { write_volatile((self.base + offset) as *mut u32, value) }
    }

    fn modify_cr(&mut self, f: impl FnOnce(u32) -> u32) {
        let cr = self.read_reg(CR_OFFSET);
        self.write_reg(CR_OFFSET, f(cr));
    }

    fn wait_idle(&self) -> Result<(), ControllerError> {
        for _ in 0..SPIN_BUDGET {
            if !self.status().contains(StatusFlags::BSY) {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(ControllerError::Busy)
    }

    /// Wait for the running operation, then report and clear its error flags.
    fn finish(&mut self) -> Result<(), ControllerError> {
        let waited = self.wait_idle();
        let errors = self.status().errors();
        self.write_reg(SR_OFFSET, (errors | StatusFlags::EOP).bits());
        waited?;
        if !errors.is_empty() {
            return Err(ControllerError::Status(errors));
        }
        Ok(())
    }
}

impl FlashController for Stm32l4Controller {
    fn unlock(&mut self) -> Result<(), ControllerError> {
        if self.read_reg(CR_OFFSET) & CR_LOCK == 0 {
            return Ok(());
        }
        self.write_reg(KEYR_OFFSET, KEY1);
        self.write_reg(KEYR_OFFSET, KEY2);
        compiler_fence(Ordering::SeqCst);

        if self.read_reg(CR_OFFSET) & CR_LOCK != 0 {
            return Err(ControllerError::UnlockFailed);
        }
        Ok(())
    }

    fn lock(&mut self) {
        self.modify_cr(|cr| cr | CR_LOCK);
    }

    fn is_locked(&self) -> bool {
        self.read_reg(CR_OFFSET) & CR_LOCK != 0
    }

    fn clear_status(&mut self, flags: StatusFlags) {
        // Status bits are write-one-to-clear.
        self.write_reg(SR_OFFSET, flags.bits());
    }

    fn read_word(&mut self, address: FlashAddress) -> Result<u32, ControllerError> {
        // SAFETY: the flash array is always mapped and readable.
        Ok(unsafe { read_volatile(address.value() as *const u32) })
    }

    fn program_double_word(
        &mut self,
        address: FlashAddress,
        value: u64,
    ) -> Result<(), ControllerError> {
        if self.is_locked() {
            return Err(ControllerError::Locked);
        }
        self.wait_idle()?;

        self.modify_cr(|cr| without_operation(cr) | CR_PG);
        compiler_fence(Ordering::SeqCst);

        let (low, high) = split_double_word(value);
        let word = address.value() as *mut u32;
        // SAFETY: the address is double-word aligned inside the flash array and
        // PG is set, so the two writes form one programming operation.
        unsafe {
            write_volatile(word, low);
            write_volatile(word.add(1), high);
        }
        compiler_fence(Ordering::SeqCst);

        let result = self.finish();
        self.modify_cr(|cr| cr & !CR_PG);
        result
    }

    fn erase_page(&mut self, bank: Bank, page: PageNumber) -> Result<(), ControllerError> {
        let bits = erase_request(&self.layout, bank, page)?;
        if self.is_locked() {
            return Err(ControllerError::Locked);
        }
        self.wait_idle()?;

        self.modify_cr(|cr| without_operation(cr) | bits);
        self.modify_cr(|cr| cr | CR_STRT);

        let result = self.finish();
        self.modify_cr(without_operation);
        result
    }
}
