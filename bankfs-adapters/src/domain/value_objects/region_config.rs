//! Storage region configuration value object.

use super::{Bank, FlashAddress, FlashLayout, PageNumber};
use bankfs_block_device::Geometry;

/// Program granularity of the internal flash: one double-word.
pub const PROGRAM_WIDTH: u32 = 8;

/// Transfer width used when copying out of memory-mapped flash.
pub const READ_WIDTH: u32 = 4;

/// Start of the second bank on STM32L4R5/S5 in dual-bank mode.
pub const STM32L4R5_BANK2_BASE: u32 = 0x0810_0000;

/// Physical placement of the filesystem's storage region.
///
/// A region is a contiguous run of flash pages inside one bank. Each page is
/// one filesystem block. The bank and first page are derived from the base
/// address, so reads, programs and erases always agree on which pages the
/// region owns. The region must never overlap code, vector tables or option
/// bytes; dedicating a whole bank is the simplest way to guarantee that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegionConfig {
    layout: FlashLayout,
    base_address: FlashAddress,
    bank: Bank,
    first_page: PageNumber,
    block_count: u32,
}

impl RegionConfig {
    /// Create a region configuration.
    ///
    /// # Arguments
    ///
    /// * `layout` - Bank and page layout of the flash array
    /// * `base_address` - Absolute address of block 0, the start of a page
    /// * `block_count` - Number of blocks, one per page
    ///
    /// # Errors
    ///
    /// Returns a [`RegionConfigError`] when `base_address` is not the start
    /// of a page, or when the region would run past the end of its bank.
    ///
    /// # Examples
    ///
    /// ```
    /// use bankfs_adapters::{Bank, FlashLayout, RegionConfig};
    ///
    /// let region = RegionConfig::new(FlashLayout::stm32l4r5(), 0x0810_0000, 256).unwrap();
    /// assert_eq!(region.bank(), Bank::Bank2);
    /// assert_eq!(region.total_size(), 1024 * 1024);
    /// ```
    pub const fn new(
        layout: FlashLayout,
        base_address: u32,
        block_count: u32,
    ) -> Result<Self, RegionConfigError> {
        if block_count == 0 {
            return Err(RegionConfigError::ZeroBlockCount);
        }
        let base = FlashAddress::new(base_address);
        let (bank, first_page) = match layout.locate(base) {
            Ok(location) => location,
            Err(err) => return Err(err),
        };
        let pages_per_bank = layout.pages_per_bank();
        match first_page.checked_add(block_count) {
            Some(end) if end.value() <= pages_per_bank => {}
            _ => {
                return Err(RegionConfigError::CrossesBankEnd {
                    first_page: first_page.value(),
                    block_count,
                    pages_per_bank,
                });
            }
        }

        Ok(Self {
            layout,
            base_address: base,
            bank,
            first_page,
            block_count,
        })
    }

    /// The whole second bank of an STM32L4R5 in dual-bank mode.
    ///
    /// 256 blocks of 4 KiB starting at `0x0810_0000`.
    pub const fn stm32l4r5_bank2() -> Self {
        let layout = FlashLayout::stm32l4r5();
        Self {
            layout,
            base_address: FlashAddress::new(STM32L4R5_BANK2_BASE),
            bank: Bank::Bank2,
            first_page: PageNumber::new(0),
            block_count: layout.pages_per_bank(),
        }
    }

    /// Layout of the flash array holding the region.
    #[inline]
    pub const fn layout(&self) -> &FlashLayout {
        &self.layout
    }

    /// Absolute address of block 0.
    #[inline]
    pub const fn base_address(&self) -> FlashAddress {
        self.base_address
    }

    /// Bank holding the region.
    #[inline]
    pub const fn bank(&self) -> Bank {
        self.bank
    }

    /// Page number of block 0 within the bank.
    #[inline]
    pub const fn first_page(&self) -> PageNumber {
        self.first_page
    }

    /// Block size in bytes, equal to the erase page size.
    #[inline]
    pub const fn block_size(&self) -> u32 {
        self.layout.page_size()
    }

    /// Number of blocks.
    #[inline]
    pub const fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Region size in bytes.
    #[inline]
    pub const fn total_size(&self) -> u32 {
        self.block_size() * self.block_count
    }

    /// Geometry reported to consumers of the region.
    pub const fn geometry(&self) -> Geometry {
        Geometry::new(READ_WIDTH, PROGRAM_WIDTH, self.block_size(), self.block_count)
    }

    /// Absolute address of `offset` within `block`.
    ///
    /// Callers validate `block` and `offset` against [`Self::geometry`]
    /// first; the arithmetic cannot overflow for in-range arguments.
    #[inline]
    pub const fn block_address(&self, block: u32, offset: u32) -> FlashAddress {
        FlashAddress::new(self.base_address.value() + block * self.block_size() + offset)
    }

    /// Physical page backing `block`, or `None` past the end of the region.
    #[inline]
    pub const fn page_of(&self, block: u32) -> Option<PageNumber> {
        if block >= self.block_count {
            return None;
        }
        self.first_page.checked_add(block)
    }

    /// Check whether `len` bytes at `address` lie entirely in the region.
    pub const fn contains(&self, address: FlashAddress, len: u32) -> bool {
        let Some(offset) = address.checked_offset_from(self.base_address) else {
            return false;
        };
        match offset.checked_add(len) {
            Some(end) => end <= self.total_size(),
            None => false,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self::stm32l4r5_bank2()
    }
}

/// Errors that can occur when creating a [`RegionConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionConfigError {
    /// Block size is zero, not a power of two, or not double-word aligned.
    InvalidBlockSize {
        /// The requested block size.
        block_size: u32,
    },
    /// Block count is zero.
    ZeroBlockCount,
    /// A bank has no pages.
    ZeroPagesPerBank,
    /// Base address is not aligned to the block size.
    UnalignedBase {
        /// The requested base address.
        base_address: u32,
        /// The requested block size.
        block_size: u32,
    },
    /// The flash array runs past the end of the address space.
    AddressOverflow,
    /// The address lies in neither bank.
    OutsideFlash {
        /// The offending address.
        address: u32,
    },
    /// The region would continue past the last page of its bank.
    CrossesBankEnd {
        /// Page of block 0 within the bank.
        first_page: u32,
        /// The requested block count.
        block_count: u32,
        /// Pages in the bank.
        pages_per_bank: u32,
    },
}

impl core::fmt::Display for RegionConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidBlockSize { block_size } => write!(
                f,
                "Block size {} must be a power of two and a multiple of {}",
                block_size, PROGRAM_WIDTH
            ),
            Self::ZeroBlockCount => write!(f, "Block count cannot be zero"),
            Self::ZeroPagesPerBank => write!(f, "A bank must hold at least one page"),
            Self::UnalignedBase {
                base_address,
                block_size,
            } => write!(
                f,
                "Base address {:#010x} is not aligned to block size {}",
                base_address, block_size
            ),
            Self::AddressOverflow => write!(f, "Flash extends past the end of the address space"),
            Self::OutsideFlash { address } => {
                write!(f, "Address {:#010x} is outside both flash banks", address)
            }
            Self::CrossesBankEnd {
                first_page,
                block_count,
                pages_per_bank,
            } => write!(
                f,
                "{} blocks from page {} run past the {} pages of the bank",
                block_count, first_page, pages_per_bank
            ),
        }
    }
}

impl core::error::Error for RegionConfigError {}
