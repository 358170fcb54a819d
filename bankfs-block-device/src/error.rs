//! Block device errors and their consumer-facing codes.

use core::fmt;

/// Error code for a device-level I/O failure.
pub const ERR_IO: i32 = -5;

/// Error code for a request that violates the device geometry.
pub const ERR_INVAL: i32 = -22;

/// Errors reported by [`BlockDevice`](crate::BlockDevice) implementations.
///
/// Geometry violations are detected before any hardware is touched and map
/// to [`ERR_INVAL`]. Hardware failures map to [`ERR_IO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BlockError {
    /// Block index or byte range lies outside the device.
    OutOfRange {
        /// Requested block index.
        block: u32,
        /// Requested byte offset within the block.
        offset: u32,
        /// Requested transfer length in bytes.
        len: usize,
    },
    /// Offset or length is not a multiple of the transfer granularity.
    Misaligned {
        /// Requested byte offset within the block.
        offset: u32,
        /// Requested transfer length in bytes.
        len: usize,
        /// Granularity the request must honour.
        granularity: u32,
    },
    /// The device reported a failure while executing the request.
    Io,
}

impl BlockError {
    /// Negative error code in the consumer's vocabulary.
    pub const fn code(&self) -> i32 {
        match self {
            Self::OutOfRange { .. } | Self::Misaligned { .. } => ERR_INVAL,
            Self::Io => ERR_IO,
        }
    }

    /// True when the request was rejected before reaching hardware.
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::Misaligned { .. })
    }
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { block, offset, len } => write!(
                f,
                "request of {} bytes at block {} offset {} is out of range",
                len, block, offset
            ),
            Self::Misaligned {
                offset,
                len,
                granularity,
            } => write!(
                f,
                "request of {} bytes at offset {} is not aligned to {} bytes",
                len, offset, granularity
            ),
            Self::Io => write!(f, "block device I/O error"),
        }
    }
}

impl core::error::Error for BlockError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let range = BlockError::OutOfRange {
            block: 3,
            offset: 0,
            len: 8,
        };
        let misaligned = BlockError::Misaligned {
            offset: 1,
            len: 8,
            granularity: 8,
        };
        assert_eq!(range.code(), ERR_INVAL);
        assert_eq!(misaligned.code(), ERR_INVAL);
        assert_eq!(BlockError::Io.code(), ERR_IO);
        assert!(range.is_invalid_argument());
        assert!(!BlockError::Io.is_invalid_argument());
    }

    #[test]
    fn test_display() {
        let msg = format!(
            "{}",
            BlockError::Misaligned {
                offset: 4,
                len: 12,
                granularity: 8
            }
        );
        assert!(msg.contains("not aligned to 8"));
        assert_eq!(format!("{}", BlockError::Io), "block device I/O error");
    }
}
