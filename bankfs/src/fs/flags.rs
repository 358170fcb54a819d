//! File open flags.

bitflags::bitflags! {
    /// How a file is opened. Values match the littlefs `LFS_O_*` constants.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        /// Open for reading.
        const READ = 0x0001;
        /// Open for writing.
        const WRITE = 0x0002;
        /// Open for reading and writing.
        const RDWR = Self::READ.bits() | Self::WRITE.bits();
        /// Create the file if it does not exist.
        const CREATE = 0x0100;
        /// With `CREATE`, fail if the file already exists.
        const EXCL = 0x0200;
        /// Truncate an existing file to zero length.
        const TRUNC = 0x0400;
        /// Move to the end of the file before every write.
        const APPEND = 0x0800;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for OpenFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "OpenFlags({=u32:#x})", self.bits())
    }
}
