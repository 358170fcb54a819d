//! Filesystem configuration.

use bankfs_block_device::Geometry;
use core::fmt;

/// Largest inline file regardless of block size.
const INLINE_LIMIT: u32 = 1022;

/// Length of the encoded metadata header before padding.
pub(crate) const HEADER_LEN: u32 = 16;

/// Tuning parameters binding the filesystem to a block device.
///
/// All values are fixed for a given deployment and validated against the
/// device geometry by [`Config::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Minimum read size in bytes.
    pub read_size: u32,
    /// Minimum program size in bytes.
    pub prog_size: u32,
    /// Erase block size in bytes.
    pub block_size: u32,
    /// Number of blocks the filesystem may use.
    pub block_count: u32,
    /// Size of the read/program cache. Must equal `read_size` and `prog_size`.
    pub cache_size: u32,
    /// Lookahead buffer size in bytes; each byte covers eight blocks.
    pub lookahead_size: u32,
    /// Metadata revisions before the log is relocated to a fresh block.
    /// `-1` disables relocation.
    pub block_cycles: i32,
}

impl Config {
    /// Whole second bank of an STM32L4R5.
    pub const fn stm32l4r5_bank2() -> Self {
        Self {
            read_size: 64,
            prog_size: 64,
            block_size: 4096,
            block_count: 256,
            cache_size: 64,
            lookahead_size: 32,
            block_cycles: 500,
        }
    }

    /// Check the configuration against the device it will run on.
    pub fn validate(&self, geometry: &Geometry) -> Result<(), ConfigError> {
        if self.read_size == 0
            || self.cache_size != self.read_size
            || self.cache_size != self.prog_size
        {
            return Err(ConfigError::CacheMismatch {
                read_size: self.read_size,
                prog_size: self.prog_size,
                cache_size: self.cache_size,
            });
        }
        if self.read_size.checked_rem(geometry.read_size) != Some(0) {
            return Err(ConfigError::ReadSize {
                read_size: self.read_size,
                granularity: geometry.read_size,
            });
        }
        if self.prog_size.checked_rem(geometry.prog_size) != Some(0) {
            return Err(ConfigError::ProgSize {
                prog_size: self.prog_size,
                granularity: geometry.prog_size,
            });
        }
        if self.block_size != geometry.block_size
            || self.block_size % self.prog_size != 0
            || self.block_size < 2 * self.header_span() + self.prog_size
        {
            return Err(ConfigError::BlockSize {
                block_size: self.block_size,
                device_block_size: geometry.block_size,
            });
        }
        if self.block_count < 2 || self.block_count > geometry.block_count {
            return Err(ConfigError::BlockCount {
                block_count: self.block_count,
                device_block_count: geometry.block_count,
            });
        }
        if self.lookahead_size == 0 || self.lookahead_size % 8 != 0 {
            return Err(ConfigError::LookaheadSize {
                lookahead_size: self.lookahead_size,
            });
        }
        if self.block_cycles == 0 || self.block_cycles < -1 {
            return Err(ConfigError::BlockCycles {
                block_cycles: self.block_cycles,
            });
        }
        Ok(())
    }

    /// Bytes reserved for the metadata header at the start of a block.
    #[inline]
    pub(crate) const fn header_span(&self) -> u32 {
        align_up(HEADER_LEN, self.prog_size)
    }

    /// Largest file the filesystem stores.
    #[inline]
    pub const fn inline_max(&self) -> u32 {
        let eighth = self.block_size / 8;
        if eighth < INLINE_LIMIT {
            eighth
        } else {
            INLINE_LIMIT
        }
    }

    /// Number of blocks covered by one lookahead window.
    #[inline]
    pub(crate) const fn lookahead_blocks(&self) -> u32 {
        let blocks = self.lookahead_size * 8;
        if blocks < self.block_count {
            blocks
        } else {
            self.block_count
        }
    }

    /// Whether the compaction producing `revision` relocates the log.
    #[inline]
    pub(crate) const fn relocates_at(&self, revision: u32) -> bool {
        self.block_cycles > 0 && revision % self.block_cycles as u32 == 0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::stm32l4r5_bank2()
    }
}

/// Round `value` up to a multiple of `align`.
#[inline]
pub(crate) const fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Reasons a [`Config`] is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// `cache_size`, `read_size` and `prog_size` differ, or are zero.
    CacheMismatch {
        /// Configured read size.
        read_size: u32,
        /// Configured program size.
        prog_size: u32,
        /// Configured cache size.
        cache_size: u32,
    },
    /// `read_size` is not a multiple of the device read granularity.
    ReadSize {
        /// Configured read size.
        read_size: u32,
        /// Device read granularity.
        granularity: u32,
    },
    /// `prog_size` is not a multiple of the device program granularity.
    ProgSize {
        /// Configured program size.
        prog_size: u32,
        /// Device program granularity.
        granularity: u32,
    },
    /// `block_size` does not match the device or cannot hold a metadata log.
    BlockSize {
        /// Configured block size.
        block_size: u32,
        /// Device block size.
        device_block_size: u32,
    },
    /// `block_count` is below two or exceeds the device.
    BlockCount {
        /// Configured block count.
        block_count: u32,
        /// Device block count.
        device_block_count: u32,
    },
    /// `lookahead_size` is zero or not a multiple of 8.
    LookaheadSize {
        /// Configured lookahead size.
        lookahead_size: u32,
    },
    /// `block_cycles` is zero or below -1.
    BlockCycles {
        /// Configured block cycles.
        block_cycles: i32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheMismatch {
                read_size,
                prog_size,
                cache_size,
            } => write!(
                f,
                "cache size {} must equal read size {} and program size {}",
                cache_size, read_size, prog_size
            ),
            Self::ReadSize {
                read_size,
                granularity,
            } => write!(
                f,
                "read size {} is not a multiple of the device read size {}",
                read_size, granularity
            ),
            Self::ProgSize {
                prog_size,
                granularity,
            } => write!(
                f,
                "program size {} is not a multiple of the device program size {}",
                prog_size, granularity
            ),
            Self::BlockSize {
                block_size,
                device_block_size,
            } => write!(
                f,
                "block size {} is unusable on a device with {}-byte blocks",
                block_size, device_block_size
            ),
            Self::BlockCount {
                block_count,
                device_block_count,
            } => write!(
                f,
                "block count {} must be between 2 and the device's {} blocks",
                block_count, device_block_count
            ),
            Self::LookaheadSize { lookahead_size } => write!(
                f,
                "lookahead size {} must be a non-zero multiple of 8",
                lookahead_size
            ),
            Self::BlockCycles { block_cycles } => write!(
                f,
                "block cycles {} must be positive or -1",
                block_cycles
            ),
        }
    }
}

impl core::error::Error for ConfigError {}
