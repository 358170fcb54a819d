//! Filesystem errors and their negative result codes.

use crate::config::ConfigError;
use bankfs_block_device::BlockError;
use core::fmt;

/// Errors returned by filesystem operations.
///
/// Every variant has a stable negative code (see [`Error::code`]) matching
/// the littlefs vocabulary, so firmware can branch on numbers where needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The block device failed.
    Io,
    /// No valid filesystem was found on the device. Safe to format.
    Corrupt,
    /// No file with that name.
    NoEntry,
    /// The file already exists.
    Exists,
    /// The handle was not opened for this kind of access.
    BadFile,
    /// Invalid argument, configuration or filesystem state.
    Invalid,
    /// The file would exceed the inline size limit.
    FileTooLarge,
    /// The metadata block has no room left for the change.
    NoSpace,
    /// The file name is longer than [`NAME_MAX`](crate::NAME_MAX).
    NameTooLong,
}

impl Error {
    /// Negative result code.
    pub const fn code(&self) -> i32 {
        match self {
            Self::Io => -5,
            Self::Corrupt => -84,
            Self::NoEntry => -2,
            Self::Exists => -17,
            Self::BadFile => -9,
            Self::Invalid => -22,
            Self::FileTooLarge => -27,
            Self::NoSpace => -28,
            Self::NameTooLong => -36,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Io => "I/O error",
            Self::Corrupt => "no valid filesystem found",
            Self::NoEntry => "no such file",
            Self::Exists => "file exists",
            Self::BadFile => "bad file handle",
            Self::Invalid => "invalid argument",
            Self::FileTooLarge => "file too large",
            Self::NoSpace => "no space left on device",
            Self::NameTooLong => "file name too long",
        };
        write!(f, "{} ({})", msg, self.code())
    }
}

impl core::error::Error for Error {}

impl From<BlockError> for Error {
    fn from(err: BlockError) -> Self {
        match err {
            BlockError::Io => Self::Io,
            BlockError::OutOfRange { .. } | BlockError::Misaligned { .. } => Self::Invalid,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(_: ConfigError) -> Self {
        Self::Invalid
    }
}
