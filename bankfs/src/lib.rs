//! A small power-loss safe filesystem for on-chip flash, and the boot
//! counter built on it.
//!
//! The filesystem runs on any [`BlockDevice`]. Files are small and flat:
//! each one lives inline in a metadata log that is compacted into a spare
//! block when full, so a reset at any point leaves either the old or the
//! new contents of a file.
//!
//! # Quick Start
//!
//! ```ignore
//! use bankfs::{Config, Filesystem, OpenFlags};
//!
//! let mut fs = Filesystem::new(device, Config::stm32l4r5_bank2())?;
//! if fs.mount().is_err() {
//!     fs.format()?;
//!     fs.mount()?;
//! }
//!
//! let mut file = fs.open("settings", OpenFlags::RDWR | OpenFlags::CREATE)?;
//! file.write(b"baud=115200")?;
//! file.close()?;
//! ```
//!
//! The [`boot`] module wraps the mount-or-format dance and keeps a boot
//! counter in a file.
//!
//! # Features
//!
//! - `log`: Enable logging support (default)
//! - `defmt`: Enable defmt logging for embedded
//! - `cortex-m`: Mask interrupts in [`boot::halt`]

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod boot;
mod config;
mod error;
mod fs;

pub use config::{Config, ConfigError};
pub use error::Error;
pub use fs::{File, Filesystem, NAME_MAX, OpenFlags};

pub use bankfs_block_device::{BlockDevice, BlockError, Geometry};
