//! Flash status register flags.

bitflags::bitflags! {
    /// Status flags reported by the flash controller.
    ///
    /// Bit positions follow the STM32L4 `FLASH_SR` register so the register
    /// controller can convert with [`StatusFlags::from_bits_truncate`].
    /// Other controllers report the closest matching flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        /// End of operation.
        const EOP = 1 << 0;
        /// Operation error.
        const OPERR = 1 << 1;
        /// Programming error: target double-word was not erased.
        const PROGERR = 1 << 3;
        /// Write protection error.
        const WRPERR = 1 << 4;
        /// Programming alignment error.
        const PGAERR = 1 << 5;
        /// Size error.
        const SIZERR = 1 << 6;
        /// Programming sequence error.
        const PGSERR = 1 << 7;
        /// Fast programming data miss error.
        const MISERR = 1 << 8;
        /// Fast programming error.
        const FASTERR = 1 << 9;
        /// PCROP read error.
        const RDERR = 1 << 14;
        /// Option validity error, set on virgin parts.
        const OPTVERR = 1 << 15;
        /// Operation in progress.
        const BSY = 1 << 16;

        /// Every flag that reports a failed operation.
        const ERRORS = Self::OPERR.bits()
            | Self::PROGERR.bits()
            | Self::WRPERR.bits()
            | Self::PGAERR.bits()
            | Self::SIZERR.bits()
            | Self::PGSERR.bits()
            | Self::MISERR.bits()
            | Self::FASTERR.bits()
            | Self::RDERR.bits()
            | Self::OPTVERR.bits();

        /// Flags cleared before starting a new operation.
        const STALE = Self::ERRORS.bits() | Self::EOP.bits();
    }
}

impl StatusFlags {
    /// The error flags contained in this set.
    #[inline]
    pub const fn errors(self) -> Self {
        self.intersection(Self::ERRORS)
    }

    /// True when any error flag is set.
    #[inline]
    pub const fn has_error(self) -> bool {
        self.intersects(Self::ERRORS)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StatusFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "StatusFlags({=u32:#x})", self.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_exclude_progress_flags() {
        let status = StatusFlags::BSY | StatusFlags::EOP | StatusFlags::PROGERR;
        assert_eq!(status.errors(), StatusFlags::PROGERR);
        assert!(status.has_error());
        assert!(!(StatusFlags::BSY | StatusFlags::EOP).has_error());
    }

    #[test]
    fn test_stale_includes_optverr() {
        assert!(StatusFlags::STALE.contains(StatusFlags::OPTVERR));
        assert!(StatusFlags::STALE.contains(StatusFlags::EOP));
        assert!(!StatusFlags::STALE.contains(StatusFlags::BSY));
    }

    #[test]
    fn test_register_roundtrip() {
        let raw = (1 << 16) | (1 << 7) | (1 << 2);
        let status = StatusFlags::from_bits_truncate(raw);
        assert_eq!(status, StatusFlags::BSY | StatusFlags::PGSERR);
    }
}
