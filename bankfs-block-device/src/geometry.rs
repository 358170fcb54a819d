//! Device geometry and request validation.

use crate::BlockError;

/// Layout and transfer granularities of a block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    /// Reads must start and end on multiples of this many bytes.
    pub read_size: u32,
    /// Programs must start and end on multiples of this many bytes.
    pub prog_size: u32,
    /// Size of one erasable block in bytes.
    pub block_size: u32,
    /// Number of blocks on the device.
    pub block_count: u32,
}

impl Geometry {
    /// Create a geometry description.
    pub const fn new(read_size: u32, prog_size: u32, block_size: u32, block_count: u32) -> Self {
        Self {
            read_size,
            prog_size,
            block_size,
            block_count,
        }
    }

    /// Total capacity in bytes.
    #[inline]
    pub const fn total_size(&self) -> u64 {
        self.block_size as u64 * self.block_count as u64
    }

    /// Reject block indices past the end of the device.
    pub fn check_block(&self, block: u32) -> Result<(), BlockError> {
        if block >= self.block_count {
            return Err(BlockError::OutOfRange {
                block,
                offset: 0,
                len: 0,
            });
        }
        Ok(())
    }

    /// Validate a read request against range and `read_size` alignment.
    pub fn check_read(&self, block: u32, offset: u32, len: usize) -> Result<(), BlockError> {
        self.check_span(block, offset, len, self.read_size)
    }

    /// Validate a program request against range and `prog_size` alignment.
    pub fn check_prog(&self, block: u32, offset: u32, len: usize) -> Result<(), BlockError> {
        self.check_span(block, offset, len, self.prog_size)
    }

    fn check_span(
        &self,
        block: u32,
        offset: u32,
        len: usize,
        granularity: u32,
    ) -> Result<(), BlockError> {
        let out_of_range = BlockError::OutOfRange { block, offset, len };
        if block >= self.block_count {
            return Err(out_of_range);
        }
        let end = u32::try_from(len)
            .ok()
            .and_then(|len| offset.checked_add(len))
            .ok_or(out_of_range)?;
        if end > self.block_size {
            return Err(out_of_range);
        }

        // `len` fits in u32 past this point
        if granularity > 1 && (offset % granularity != 0 || len as u32 % granularity != 0) {
            return Err(BlockError::Misaligned {
                offset,
                len,
                granularity,
            });
        }
        Ok(())
    }
}
