//! On-chip flash block device adapter with hexagonal architecture.
//!
//! This crate exposes a dedicated region of on-chip flash (by default the
//! whole second bank of an STM32L4R5) as a [`BlockDevice`] for a flash
//! filesystem. It is structured using hexagonal architecture (ports and
//! adapters pattern).
//!
//! # Architecture
//!
//! ## Domain Layer (`domain`)
//! Pure region model with no hardware dependencies:
//! - **Value Objects**: `FlashAddress`, `PageNumber`, `Bank`, `FlashLayout`,
//!   `RegionConfig`, `StatusFlags`
//! - **Ports**: `FlashController` interface to the flash hardware
//!
//! ## Adapter Layer (`adapters`)
//! Concrete implementations connecting the domain to hardware:
//! - **`InternalFlash`**: Implements `BlockDevice` using a `FlashController`
//! - **`ControlGuard`**: Keeps the control interface unlocked for one operation
//! - **`Stm32l4Controller`**, **`NorFlashController`**, **`SimulatedFlash`**
//!
//! # Quick Start
//!
//! ```ignore
//! use bankfs_adapters::{InternalFlash, RegionConfig, Stm32l4Controller};
//!
//! let controller = unsafe { Stm32l4Controller::new() };
//! let mut device = InternalFlash::new(controller, RegionConfig::stm32l4r5_bank2());
//!
//! device.erase(0)?;
//! device.prog(0, 0, b"bankfs\0\0")?;
//! ```
//!
//! # Features
//!
//! - `stm32l4`: Register-level STM32L4 controller
//! - `embedded-storage`: Controller over `embedded-storage` NOR flash drivers
//! - `sim`: RAM-backed simulated flash with fault injection (implies `alloc`)
//! - `alloc`: Enable heap-allocated types
//! - `log`: Enable logging support
//! - `defmt`: Enable defmt logging for embedded

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[cfg(any(feature = "alloc", test))]
extern crate alloc;

#[macro_use]
mod fmt;

// Core layers
pub mod adapters;
pub mod domain;

// Re-export commonly used types for convenience
pub use domain::{
    Bank, ControllerError, FlashAddress, FlashController, FlashLayout, PROGRAM_WIDTH, PageNumber,
    READ_WIDTH, RegionConfig, RegionConfigError, STM32L4R5_BANK1_BASE, STM32L4R5_BANK2_BASE,
    STM32L4R5_PAGE_SIZE, STM32L4R5_PAGES_PER_BANK, StatusFlags,
};

pub use adapters::{ControlGuard, InternalFlash};

#[cfg(any(test, feature = "sim"))]
pub use adapters::SimulatedFlash;

#[cfg(any(test, feature = "stm32l4"))]
pub use adapters::Stm32l4Controller;

#[cfg(any(test, feature = "embedded-storage"))]
pub use adapters::NorFlashController;

// Re-export bankfs_block_device types so users can depend on this crate alone
pub use bankfs_block_device::{BlockDevice, BlockError, ERR_INVAL, ERR_IO, Geometry};
