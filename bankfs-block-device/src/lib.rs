//! Block device capability trait for flash-backed filesystems.
//!
//! A filesystem that persists to raw flash needs exactly four primitives from
//! the storage underneath it: read a byte range of a block, program a byte
//! range of an erased block, erase a whole block, and flush. This crate
//! defines those primitives as the [`BlockDevice`] trait, together with the
//! [`Geometry`] every implementation reports and the [`BlockError`]
//! vocabulary every implementation speaks.
//!
//! # Block model
//!
//! ```text
//!  block 0            block 1                    block N-1
//! ┌──────────────────┬──────────────────┬ ─ ─ ─ ┬──────────────────┐
//! │ offset 0 .. size │ offset 0 .. size │       │ offset 0 .. size │
//! └──────────────────┴──────────────────┴ ─ ─ ─ ┴──────────────────┘
//!   erase: whole block only
//!   prog:  erased bytes only, `prog_size` aligned
//!   read:  `read_size` aligned
//! ```
//!
//! Consumers address storage only through `(block, offset)` pairs. Absolute
//! addresses are an implementation detail of each device.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

mod error;
mod geometry;

pub use error::{BlockError, ERR_INVAL, ERR_IO};
pub use geometry::Geometry;

/// Block-level storage primitives consumed by a flash filesystem.
///
/// Implementations are synchronous: every call runs to completion (or to a
/// reported failure) before returning. None of them retry internally.
///
/// The per-block lifecycle `erased -> programmed -> erased` is owned by the
/// caller. Implementations may trust the caller never to program bytes that
/// have not been erased; doing so yields device-defined results.
pub trait BlockDevice {
    /// Geometry of the device: transfer granularities and block layout.
    fn geometry(&self) -> Geometry;

    /// Read `buffer.len()` bytes from `block` starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::OutOfRange`] or [`BlockError::Misaligned`] when
    /// the request does not fit the geometry, and [`BlockError::Io`] when the
    /// device fails.
    fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), BlockError>;

    /// Program `data` into `block` starting at `offset`.
    ///
    /// The target bytes must be erased. On failure the block may be left
    /// partially programmed.
    fn prog(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), BlockError>;

    /// Erase `block`, resetting every byte to the blank state.
    ///
    /// On failure the contents of the block are undefined.
    fn erase(&mut self, block: u32) -> Result<(), BlockError>;

    /// Flush any state the device buffers internally.
    fn sync(&mut self) -> Result<(), BlockError>;
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    #[inline]
    fn geometry(&self) -> Geometry {
        (**self).geometry()
    }

    #[inline]
    fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), BlockError> {
        (**self).read(block, offset, buffer)
    }

    #[inline]
    fn prog(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), BlockError> {
        (**self).prog(block, offset, data)
    }

    #[inline]
    fn erase(&mut self, block: u32) -> Result<(), BlockError> {
        (**self).erase(block)
    }

    #[inline]
    fn sync(&mut self) -> Result<(), BlockError> {
        (**self).sync()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal RAM device used to exercise the `&mut T` forwarding impl.
    struct RamDevice {
        blocks: Vec<[u8; 64]>,
        syncs: usize,
    }

    impl RamDevice {
        fn new(count: usize) -> Self {
            Self {
                blocks: vec![[0xFF; 64]; count],
                syncs: 0,
            }
        }
    }

    impl BlockDevice for RamDevice {
        fn geometry(&self) -> Geometry {
            Geometry::new(4, 8, 64, self.blocks.len() as u32)
        }

        fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), BlockError> {
            self.geometry().check_read(block, offset, buffer.len())?;
            let start = offset as usize;
            buffer.copy_from_slice(&self.blocks[block as usize][start..start + buffer.len()]);
            Ok(())
        }

        fn prog(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), BlockError> {
            self.geometry().check_prog(block, offset, data.len())?;
            let start = offset as usize;
            self.blocks[block as usize][start..start + data.len()].copy_from_slice(data);
            Ok(())
        }

        fn erase(&mut self, block: u32) -> Result<(), BlockError> {
            self.geometry().check_block(block)?;
            self.blocks[block as usize] = [0xFF; 64];
            Ok(())
        }

        fn sync(&mut self) -> Result<(), BlockError> {
            self.syncs += 1;
            Ok(())
        }
    }

    fn roundtrip<D: BlockDevice>(mut device: D) {
        device.erase(1).unwrap();
        device.prog(1, 8, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let mut buf = [0u8; 8];
        device.read(1, 8, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
        device.sync().unwrap();
    }

    #[test]
    fn test_mut_ref_forwards_all_operations() {
        let mut device = RamDevice::new(4);
        roundtrip(&mut device);
        assert_eq!(device.syncs, 1);
        assert_eq!(device.blocks[1][8], 1);
    }

    fn rejected<D: BlockDevice>(mut device: D) {
        assert_eq!(device.erase(2).unwrap_err().code(), ERR_INVAL);
        assert!(matches!(
            device.prog(0, 4, &[0; 8]),
            Err(BlockError::Misaligned { granularity: 8, .. })
        ));
    }

    #[test]
    fn test_mut_ref_forwards_errors() {
        let mut device = RamDevice::new(2);
        rejected(&mut device);
        assert_eq!(device.blocks[0], [0xFF; 64]);
    }
}
