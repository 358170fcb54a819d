//! Type-safe absolute flash address value object.

use core::fmt;

/// An absolute address in the memory-mapped flash.
///
/// Keeps absolute addresses from being mixed up with block indices or
/// block-relative offsets, which are the only coordinates consumers use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashAddress(u32);

impl FlashAddress {
    /// Create a new flash address.
    ///
    /// # Examples
    ///
    /// ```
    /// use bankfs_adapters::FlashAddress;
    ///
    /// let addr = FlashAddress::new(0x0810_0000);
    /// assert_eq!(addr.value(), 0x0810_0000);
    /// ```
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the underlying u32 value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Advance the address by `bytes`, or `None` on overflow.
    #[inline]
    pub const fn checked_add(self, bytes: u32) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }

    /// Check whether the address is a multiple of `alignment`.
    #[inline]
    pub const fn is_aligned(self, alignment: u32) -> bool {
        alignment != 0 && self.0 % alignment == 0
    }

    /// Byte distance from `base` to this address, or `None` if it lies below `base`.
    #[inline]
    pub const fn checked_offset_from(self, base: Self) -> Option<u32> {
        self.0.checked_sub(base.0)
    }
}

impl fmt::Display for FlashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for FlashAddress {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<FlashAddress> for u32 {
    fn from(addr: FlashAddress) -> Self {
        addr.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_address_checked_add() {
        let addr = FlashAddress::new(0x0810_0000);
        assert_eq!(addr.checked_add(8).unwrap().value(), 0x0810_0008);
        assert_eq!(FlashAddress::new(u32::MAX).checked_add(1), None);
    }

    #[test]
    fn test_flash_address_alignment() {
        assert!(FlashAddress::new(0x0810_0008).is_aligned(8));
        assert!(!FlashAddress::new(0x0810_0004).is_aligned(8));
        assert!(!FlashAddress::new(0).is_aligned(0));
    }

    #[test]
    fn test_flash_address_offset() {
        let base = FlashAddress::new(0x0810_0000);
        assert_eq!(FlashAddress::new(0x0810_1000).checked_offset_from(base), Some(0x1000));
        assert_eq!(base.checked_offset_from(FlashAddress::new(0x0810_1000)), None);
    }

    #[test]
    fn test_flash_address_display() {
        assert_eq!(format!("{}", FlashAddress::new(0x0810_0000)), "0x08100000");
    }
}
