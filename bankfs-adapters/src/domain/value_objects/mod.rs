//! Value objects for the domain layer.
//!
//! Immutable, validated data types describing where the storage region
//! lives and how the flash hardware reports its state.

mod bank;
mod flash_address;
mod flash_layout;
mod page_number;
mod region_config;
mod status_flags;

pub use bank::Bank;
pub use flash_address::FlashAddress;
pub use flash_layout::{
    FlashLayout, STM32L4R5_BANK1_BASE, STM32L4R5_PAGE_SIZE, STM32L4R5_PAGES_PER_BANK,
};
pub use page_number::PageNumber;
pub use region_config::{
    PROGRAM_WIDTH, READ_WIDTH, RegionConfig, RegionConfigError, STM32L4R5_BANK2_BASE,
};
pub use status_flags::StatusFlags;
