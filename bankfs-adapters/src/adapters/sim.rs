//! RAM-backed flash controller for host-side testing.
//!
//! [`SimulatedFlash`] models the NOR rules of the on-chip array closely
//! enough to exercise the adapter and a filesystem on top of it:
//!
//! - the array starts erased (all `0xFF`)
//! - program and erase are refused while the control interface is locked
//! - a double-word can only be programmed once per erase
//! - erase works on whole pages
//!
//! It also injects the faults that are hard to provoke on real parts: a
//! single failing program, a failing erase and a power cut that tears the
//! double-word in flight.

use crate::domain::{
    Bank, ControllerError, FlashAddress, FlashController, FlashLayout, PROGRAM_WIDTH, PageNumber,
    READ_WIDTH, RegionConfig, StatusFlags,
};
use alloc::{vec, vec::Vec};

/// Simulated on-chip flash covering one region.
#[derive(Debug, Clone)]
pub struct SimulatedFlash {
    layout: FlashLayout,
    base: FlashAddress,
    bank: Bank,
    first_page: PageNumber,
    page_size: u32,
    memory: Vec<u8>,
    erase_counts: Vec<u32>,
    locked: bool,
    status: StatusFlags,
    unlocks: usize,
    programs: usize,
    refuse_unlock: bool,
    fail_program_in: Option<usize>,
    fail_erase: Option<PageNumber>,
    power_budget: Option<usize>,
    powered_off: bool,
}

impl SimulatedFlash {
    /// Create an erased, locked flash array laid out exactly like `region`.
    pub fn for_region(region: &RegionConfig) -> Self {
        let pages = region.block_count() as usize;
        Self {
            layout: *region.layout(),
            base: region.base_address(),
            bank: region.bank(),
            first_page: region.first_page(),
            page_size: region.block_size(),
            memory: vec![0xFF; region.total_size() as usize],
            erase_counts: vec![0; pages],
            locked: true,
            status: StatusFlags::empty(),
            unlocks: 0,
            programs: 0,
            refuse_unlock: false,
            fail_program_in: None,
            fail_erase: None,
            power_budget: None,
            powered_off: false,
        }
    }

    /// Raw contents of the whole array.
    pub fn bytes(&self) -> &[u8] {
        &self.memory
    }

    /// Raw contents of one page.
    ///
    /// Returns `None` if the page is not part of the array.
    pub fn page(&self, page: PageNumber) -> Option<&[u8]> {
        let index = self.page_index(page)?;
        let start = index * self.page_size as usize;
        Some(&self.memory[start..start + self.page_size as usize])
    }

    /// Overwrite array contents without NOR semantics, e.g. to plant garbage.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the array.
    pub fn write_raw(&mut self, offset: usize, data: &[u8]) {
        self.memory[offset..offset + data.len()].copy_from_slice(data);
    }

    /// Number of erases performed on `page`.
    pub fn erase_count(&self, page: PageNumber) -> u32 {
        self.page_index(page)
            .map(|index| self.erase_counts[index])
            .unwrap_or(0)
    }

    /// Number of successful unlocks so far.
    pub fn unlock_count(&self) -> usize {
        self.unlocks
    }

    /// Number of double-words programmed so far.
    pub fn program_count(&self) -> usize {
        self.programs
    }

    /// Current status flags.
    pub fn status(&self) -> StatusFlags {
        self.status
    }

    /// Set status flags, as hardware would after a failed operation.
    pub fn raise_status(&mut self, flags: StatusFlags) {
        self.status |= flags;
    }

    /// Make every unlock attempt fail while `refuse` is set.
    pub fn refuse_unlock(&mut self, refuse: bool) {
        self.refuse_unlock = refuse;
    }

    /// Fail the program issued after `n` further successful programs.
    ///
    /// The failing double-word is left untouched. One-shot.
    pub fn fail_program_at(&mut self, n: usize) {
        self.fail_program_in = Some(n);
    }

    /// Fail the next erase of `page`, leaving its contents scrambled. One-shot.
    pub fn fail_erase_of(&mut self, page: PageNumber) {
        self.fail_erase = Some(page);
    }

    /// Lose power after `n` further successful programs.
    ///
    /// The program in flight at that point only lands its first word. Every
    /// program and erase after it fails until [`Self::restore_power`].
    pub fn cut_power_after(&mut self, n: usize) {
        self.power_budget = Some(n);
    }

    /// Power the array back up, as after a reset.
    ///
    /// Clears pending faults and status, and locks the control interface.
    pub fn restore_power(&mut self) {
        self.powered_off = false;
        self.power_budget = None;
        self.fail_program_in = None;
        self.fail_erase = None;
        self.status = StatusFlags::empty();
        self.locked = true;
    }

    /// Whether a power cut is in effect.
    pub fn is_powered_off(&self) -> bool {
        self.powered_off
    }

    fn page_index(&self, page: PageNumber) -> Option<usize> {
        let index = page.value().checked_sub(self.first_page.value())? as usize;
        (index < self.erase_counts.len()).then_some(index)
    }

    fn offset_of(&self, address: FlashAddress, len: u32) -> Option<usize> {
        let offset = address.checked_offset_from(self.base)? as usize;
        (offset + len as usize <= self.memory.len()).then_some(offset)
    }

    fn fail(&mut self, flags: StatusFlags) -> ControllerError {
        self.status |= flags;
        ControllerError::Status(flags)
    }
}

impl FlashController for SimulatedFlash {
    fn unlock(&mut self) -> Result<(), ControllerError> {
        if self.refuse_unlock {
            return Err(ControllerError::UnlockFailed);
        }
        self.locked = false;
        self.unlocks += 1;
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
        if !address.is_aligned(READ_WIDTH) {
            return Err(ControllerError::OutOfBounds(address));
        }
        let offset = self
            .offset_of(address, READ_WIDTH)
            .ok_or(ControllerError::OutOfBounds(address))?;
        let mut word = [0u8; READ_WIDTH as usize];
        word.copy_from_slice(&self.memory[offset..offset + READ_WIDTH as usize]);
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
        if self.powered_off {
            return Err(self.fail(StatusFlags::OPERR));
        }
        if !address.is_aligned(PROGRAM_WIDTH) {
            return Err(self.fail(StatusFlags::PGAERR));
        }
        let offset = self
            .offset_of(address, PROGRAM_WIDTH)
            .ok_or(ControllerError::OutOfBounds(address))?;

        if self.fail_program_in == Some(0) {
            self.fail_program_in = None;
            return Err(self.fail(StatusFlags::PROGERR));
        }

        let target = &mut self.memory[offset..offset + PROGRAM_WIDTH as usize];
        // Zero may be written over anything; otherwise the double-word must be erased.
        if value != 0 && target.iter().any(|&b| b != 0xFF) {
            return Err(self.fail(StatusFlags::PROGERR));
        }

        let bytes = value.to_le_bytes();
        if self.power_budget == Some(0) {
            let half = READ_WIDTH as usize;
            for (cell, byte) in target[..half].iter_mut().zip(&bytes[..half]) {
                *cell &= byte;
            }
            self.powered_off = true;
            self.power_budget = None;
            return Err(self.fail(StatusFlags::OPERR));
        }

        for (cell, byte) in target.iter_mut().zip(&bytes) {
            *cell &= byte;
        }
        self.programs += 1;
        self.status |= StatusFlags::EOP;
        if let Some(n) = self.fail_program_in.as_mut() {
            *n -= 1;
        }
        if let Some(n) = self.power_budget.as_mut() {
            *n -= 1;
        }
        Ok(())
    }

    fn erase_page(&mut self, bank: Bank, page: PageNumber) -> Result<(), ControllerError> {
        if self.locked {
            return Err(ControllerError::Locked);
        }
        if self.powered_off {
            return Err(self.fail(StatusFlags::OPERR));
        }
        let page_address = self
            .layout
            .page_address(bank, page)
            .unwrap_or(self.layout.bank_base(bank));
        let index = match self.page_index(page) {
            Some(index) if bank == self.bank => index,
            _ => return Err(ControllerError::OutOfBounds(page_address)),
        };

        let start = index * self.page_size as usize;
        let contents = &mut self.memory[start..start + self.page_size as usize];
        if self.fail_erase == Some(page) {
            self.fail_erase = None;
            let half = contents.len() / 2;
            contents[..half].fill(0x00);
            return Err(self.fail(StatusFlags::OPERR));
        }

        contents.fill(0xFF);
        self.erase_counts[index] += 1;
        self.status |= StatusFlags::EOP;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> RegionConfig {
        let layout = FlashLayout::new(0x0800_0000, 256, 4096).unwrap();
        RegionConfig::new(layout, 0x0810_0000, 4).unwrap()
    }

    fn unlocked() -> SimulatedFlash {
        let mut sim = SimulatedFlash::for_region(&region());
        sim.unlock().unwrap();
        sim
    }

    #[test]
    fn test_starts_erased_and_locked() {
        let sim = SimulatedFlash::for_region(&region());
        assert!(sim.is_locked());
        assert_eq!(sim.bytes().len(), 1024);
        assert!(sim.bytes().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_locked_controller_refuses_mutation() {
        let mut sim = SimulatedFlash::for_region(&region());
        let addr = FlashAddress::new(0x0810_0000);
        assert_eq!(sim.program_double_word(addr, 1), Err(ControllerError::Locked));
        assert_eq!(
            sim.erase_page(Bank::Bank2, PageNumber::new(0)),
            Err(ControllerError::Locked)
        );
    }

    #[test]
    fn test_program_and_read_little_endian() {
        let mut sim = unlocked();
        let addr = FlashAddress::new(0x0810_0008);
        sim.program_double_word(addr, 0x1122_3344_5566_7788).unwrap();

        assert_eq!(sim.read_word(addr).unwrap(), 0x5566_7788);
        assert_eq!(sim.read_word(FlashAddress::new(0x0810_000C)).unwrap(), 0x1122_3344);
        assert!(sim.status().contains(StatusFlags::EOP));
    }

    #[test]
    fn test_reprogram_requires_erase() {
        let mut sim = unlocked();
        let addr = FlashAddress::new(0x0810_0000);
        sim.program_double_word(addr, 0xAAAA).unwrap();
        assert_eq!(
            sim.program_double_word(addr, 0x5555),
            Err(ControllerError::Status(StatusFlags::PROGERR))
        );
        // Zeroing an already programmed double-word is allowed.
        sim.program_double_word(addr, 0).unwrap();

        sim.erase_page(Bank::Bank2, PageNumber::new(0)).unwrap();
        sim.program_double_word(addr, 0x5555).unwrap();
    }

    #[test]
    fn test_misaligned_program() {
        let mut sim = unlocked();
        assert_eq!(
            sim.program_double_word(FlashAddress::new(0x0810_0004), 0),
            Err(ControllerError::Status(StatusFlags::PGAERR))
        );
    }

    #[test]
    fn test_out_of_array_access() {
        let mut sim = unlocked();
        let past_end = FlashAddress::new(0x0810_0400);
        assert_eq!(sim.read_word(past_end), Err(ControllerError::OutOfBounds(past_end)));
        assert!(sim.erase_page(Bank::Bank2, PageNumber::new(4)).is_err());
        assert!(sim.erase_page(Bank::Bank1, PageNumber::new(0)).is_err());
        assert_eq!(
            sim.erase_page(Bank::Bank2, PageNumber::new(4096)),
            Err(ControllerError::OutOfBounds(FlashAddress::new(0x0810_0000)))
        );
    }

    #[test]
    fn test_erase_counts_per_page() {
        let mut sim = unlocked();
        sim.erase_page(Bank::Bank2, PageNumber::new(1)).unwrap();
        sim.erase_page(Bank::Bank2, PageNumber::new(1)).unwrap();
        sim.erase_page(Bank::Bank2, PageNumber::new(2)).unwrap();
        assert_eq!(sim.erase_count(PageNumber::new(1)), 2);
        assert_eq!(sim.erase_count(PageNumber::new(2)), 1);
        assert_eq!(sim.erase_count(PageNumber::new(9)), 0);
    }

    #[test]
    fn test_power_cut_tears_double_word() {
        let mut sim = unlocked();
        sim.cut_power_after(1);
        sim.program_double_word(FlashAddress::new(0x0810_0000), 0).unwrap();
        assert!(
            sim.program_double_word(FlashAddress::new(0x0810_0008), 0)
                .is_err()
        );
        assert!(sim.is_powered_off());
        assert_eq!(&sim.bytes()[8..16], &[0, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(sim.erase_page(Bank::Bank2, PageNumber::new(0)).is_err());

        sim.restore_power();
        assert!(sim.is_locked());
        sim.unlock().unwrap();
        sim.erase_page(Bank::Bank2, PageNumber::new(0)).unwrap();
    }

    #[test]
    fn test_failed_erase_scrambles_page() {
        let mut sim = unlocked();
        sim.fail_erase_of(PageNumber::new(3));
        assert!(sim.erase_page(Bank::Bank2, PageNumber::new(3)).is_err());
        assert!(sim.page(PageNumber::new(3)).unwrap().contains(&0x00));
        sim.erase_page(Bank::Bank2, PageNumber::new(3)).unwrap();
        assert!(sim.page(PageNumber::new(3)).unwrap().iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_clear_status() {
        let mut sim = unlocked();
        sim.raise_status(StatusFlags::OPTVERR | StatusFlags::PROGERR);
        sim.clear_status(StatusFlags::STALE);
        assert!(sim.status().is_empty());
    }
}
