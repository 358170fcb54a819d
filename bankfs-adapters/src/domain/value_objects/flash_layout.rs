//! Bank and page layout of a dual-bank flash array.

use super::{Bank, FlashAddress, PROGRAM_WIDTH, PageNumber, RegionConfigError};

/// Start of the first bank on STM32L4R5/S5.
pub const STM32L4R5_BANK1_BASE: u32 = 0x0800_0000;

/// Page size of STM32L4R5/S5 in dual-bank mode.
pub const STM32L4R5_PAGE_SIZE: u32 = 4096;

/// Pages per bank on STM32L4R5/S5 in dual-bank mode.
pub const STM32L4R5_PAGES_PER_BANK: u32 = 256;

/// Where the banks of a dual-bank flash sit and how they divide into pages.
///
/// Bank 2 follows bank 1 directly. Every address in either bank maps to
/// exactly one `(Bank, PageNumber)` pair, which is what page erases take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashLayout {
    bank1_base: FlashAddress,
    page_size: u32,
    pages_per_bank: u32,
}

impl FlashLayout {
    /// Describe a flash array of two equal banks.
    ///
    /// # Errors
    ///
    /// - [`RegionConfigError::InvalidBlockSize`] if `page_size` is not a
    ///   power of two holding whole double-words
    /// - [`RegionConfigError::ZeroPagesPerBank`] if a bank has no pages
    /// - [`RegionConfigError::UnalignedBase`] if `bank1_base` is not page aligned
    /// - [`RegionConfigError::AddressOverflow`] if bank 2 ends past the
    ///   address space
    ///
    /// # Examples
    ///
    /// ```
    /// use bankfs_adapters::{Bank, FlashLayout};
    ///
    /// let layout = FlashLayout::new(0x0800_0000, 2048, 128).unwrap();
    /// assert_eq!(layout.bank_base(Bank::Bank2).value(), 0x0804_0000);
    /// ```
    pub const fn new(
        bank1_base: u32,
        page_size: u32,
        pages_per_bank: u32,
    ) -> Result<Self, RegionConfigError> {
        if !page_size.is_power_of_two() || page_size % PROGRAM_WIDTH != 0 {
            return Err(RegionConfigError::InvalidBlockSize {
                block_size: page_size,
            });
        }
        if pages_per_bank == 0 {
            return Err(RegionConfigError::ZeroPagesPerBank);
        }
        if bank1_base % page_size != 0 {
            return Err(RegionConfigError::UnalignedBase {
                base_address: bank1_base,
                block_size: page_size,
            });
        }
        let Some(bank_size) = page_size.checked_mul(pages_per_bank) else {
            return Err(RegionConfigError::AddressOverflow);
        };
        // Both banks must be addressable; the end itself may be 2^32.
        let Some(last) = bank_size.checked_mul(2) else {
            return Err(RegionConfigError::AddressOverflow);
        };
        if bank1_base.checked_add(last - 1).is_none() {
            return Err(RegionConfigError::AddressOverflow);
        }

        Ok(Self {
            bank1_base: FlashAddress::new(bank1_base),
            page_size,
            pages_per_bank,
        })
    }

    /// STM32L4R5/S5 in dual-bank mode: two banks of 256 pages of 4 KiB.
    pub const fn stm32l4r5() -> Self {
        Self {
            bank1_base: FlashAddress::new(STM32L4R5_BANK1_BASE),
            page_size: STM32L4R5_PAGE_SIZE,
            pages_per_bank: STM32L4R5_PAGES_PER_BANK,
        }
    }

    /// Erase page size in bytes.
    #[inline]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of pages in each bank.
    #[inline]
    pub const fn pages_per_bank(&self) -> u32 {
        self.pages_per_bank
    }

    /// Size of one bank in bytes.
    #[inline]
    pub const fn bank_size(&self) -> u32 {
        self.page_size * self.pages_per_bank
    }

    /// First address of `bank`.
    #[inline]
    pub const fn bank_base(&self, bank: Bank) -> FlashAddress {
        FlashAddress::new(self.bank1_base.value() + bank.index() as u32 * self.bank_size())
    }

    /// First address of `page` in `bank`, or `None` if the bank has no such page.
    pub const fn page_address(&self, bank: Bank, page: PageNumber) -> Option<FlashAddress> {
        if !page.is_within(self.pages_per_bank) {
            return None;
        }
        self.bank_base(bank).checked_add(page.value() * self.page_size)
    }

    /// Bank and page starting at `address`.
    ///
    /// # Errors
    ///
    /// [`RegionConfigError::OutsideFlash`] if `address` is in neither bank,
    /// [`RegionConfigError::UnalignedBase`] if it is not the start of a page.
    ///
    /// ```
    /// use bankfs_adapters::{Bank, FlashAddress, FlashLayout, PageNumber};
    ///
    /// let layout = FlashLayout::stm32l4r5();
    /// assert_eq!(
    ///     layout.locate(FlashAddress::new(0x0810_3000)),
    ///     Ok((Bank::Bank2, PageNumber::new(3)))
    /// );
    /// ```
    pub const fn locate(
        &self,
        address: FlashAddress,
    ) -> Result<(Bank, PageNumber), RegionConfigError> {
        let Some(offset) = address.checked_offset_from(self.bank1_base) else {
            return Err(RegionConfigError::OutsideFlash {
                address: address.value(),
            });
        };
        if offset % self.page_size != 0 {
            return Err(RegionConfigError::UnalignedBase {
                base_address: address.value(),
                block_size: self.page_size,
            });
        }

        let index = offset / self.page_size;
        let (bank, page) = if index < self.pages_per_bank {
            (Bank::Bank1, index)
        } else {
            (Bank::Bank2, index - self.pages_per_bank)
        };
        match PageNumber::checked(page, self.pages_per_bank) {
            Some(page) => Ok((bank, page)),
            None => Err(RegionConfigError::OutsideFlash {
                address: address.value(),
            }),
        }
    }
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self::stm32l4r5()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stm32l4r5_banks() {
        let layout = FlashLayout::stm32l4r5();
        assert_eq!(layout.bank_size(), 1024 * 1024);
        assert_eq!(layout.bank_base(Bank::Bank1).value(), 0x0800_0000);
        assert_eq!(layout.bank_base(Bank::Bank2).value(), 0x0810_0000);
        assert_eq!(FlashLayout::new(0x0800_0000, 4096, 256), Ok(layout));
        assert_eq!(FlashLayout::default(), layout);
    }

    #[test]
    fn test_locate_both_banks() {
        let layout = FlashLayout::stm32l4r5();
        assert_eq!(
            layout.locate(FlashAddress::new(0x0800_0000)),
            Ok((Bank::Bank1, PageNumber::new(0)))
        );
        assert_eq!(
            layout.locate(FlashAddress::new(0x080F_F000)),
            Ok((Bank::Bank1, PageNumber::new(255)))
        );
        assert_eq!(
            layout.locate(FlashAddress::new(0x0810_0000)),
            Ok((Bank::Bank2, PageNumber::new(0)))
        );
        assert_eq!(
            layout.locate(FlashAddress::new(0x081F_F000)),
            Ok((Bank::Bank2, PageNumber::new(255)))
        );
    }

    #[test]
    fn test_locate_rejects_addresses_outside_flash() {
        let layout = FlashLayout::stm32l4r5();
        assert_eq!(
            layout.locate(FlashAddress::new(0x0820_0000)),
            Err(RegionConfigError::OutsideFlash {
                address: 0x0820_0000
            })
        );
        assert_eq!(
            layout.locate(FlashAddress::new(0x07FF_F000)),
            Err(RegionConfigError::OutsideFlash {
                address: 0x07FF_F000
            })
        );
        assert!(matches!(
            layout.locate(FlashAddress::new(0x0810_0800)),
            Err(RegionConfigError::UnalignedBase { .. })
        ));
    }

    #[test]
    fn test_page_address_is_inverse_of_locate() {
        let layout = FlashLayout::new(0x0800_0000, 1024, 16).unwrap();
        for bank in [Bank::Bank1, Bank::Bank2] {
            for page in 0..16 {
                let page = PageNumber::new(page);
                let address = layout.page_address(bank, page).unwrap();
                assert_eq!(layout.locate(address), Ok((bank, page)));
            }
        }
        assert_eq!(layout.page_address(Bank::Bank2, PageNumber::new(16)), None);
    }

    #[test]
    fn test_invalid_layouts() {
        assert_eq!(
            FlashLayout::new(0x0800_0000, 3000, 256),
            Err(RegionConfigError::InvalidBlockSize { block_size: 3000 })
        );
        assert_eq!(
            FlashLayout::new(0x0800_0000, 4, 256),
            Err(RegionConfigError::InvalidBlockSize { block_size: 4 })
        );
        assert_eq!(
            FlashLayout::new(0x0800_0000, 4096, 0),
            Err(RegionConfigError::ZeroPagesPerBank)
        );
        assert!(matches!(
            FlashLayout::new(0x0800_0100, 4096, 256),
            Err(RegionConfigError::UnalignedBase { .. })
        ));
        assert_eq!(
            FlashLayout::new(0xFFFF_0000, 4096, 16),
            Err(RegionConfigError::AddressOverflow)
        );
    }

    #[test]
    fn test_layout_ending_at_top_of_address_space() {
        let layout = FlashLayout::new(0xFFFE_0000, 4096, 16).unwrap();
        assert_eq!(layout.bank_base(Bank::Bank2).value(), 0xFFFF_0000);
        assert_eq!(
            layout.page_address(Bank::Bank2, PageNumber::new(15)),
            Some(FlashAddress::new(0xFFFF_F000))
        );
    }
}
