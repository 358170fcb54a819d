//! Open file handles.

use super::{Change, Filesystem, OpenFlags};
use crate::Error;
use alloc::{string::String, vec::Vec};
use bankfs_block_device::BlockDevice;

/// An open file.
///
/// The handle works on a private copy of the file contents. [`File::close`]
/// (or [`File::sync`]) commits the copy to flash as one atomic log record;
/// dropping the handle without closing discards every change made through it.
///
/// The handle borrows the filesystem mutably, so only one file is open at a
/// time.
pub struct File<'a, D: BlockDevice> {
    fs: &'a mut Filesystem<D>,
    name: String,
    data: Vec<u8>,
    pos: u32,
    flags: OpenFlags,
    dirty: bool,
}

impl<'a, D: BlockDevice> File<'a, D> {
    pub(super) fn new(
        fs: &'a mut Filesystem<D>,
        name: String,
        data: Vec<u8>,
        flags: OpenFlags,
        dirty: bool,
    ) -> Self {
        Self {
            fs,
            name,
            data,
            pos: 0,
            flags,
            dirty,
        }
    }

    /// File name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current length in bytes, including uncommitted writes.
    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    /// True when the file holds no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current position.
    pub fn position(&self) -> u32 {
        self.pos
    }

    /// Read from the current position, returning the number of bytes read.
    ///
    /// Returns fewer bytes than requested at end of file, and 0 past it.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if !self.flags.contains(OpenFlags::READ) {
            return Err(Error::BadFile);
        }
        let start = (self.pos as usize).min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos += n as u32;
        Ok(n)
    }

    /// Write at the current position, extending the file as needed.
    ///
    /// A gap between the end of the file and the position is zero-filled.
    pub fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        if !self.flags.contains(OpenFlags::WRITE) {
            return Err(Error::BadFile);
        }
        if self.flags.contains(OpenFlags::APPEND) {
            self.pos = self.len();
        }
        let start = self.pos as usize;
        let end = start + buf.len();
        if end > self.fs.config().inline_max() as usize {
            return Err(Error::FileTooLarge);
        }
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(buf);
        self.pos = end as u32;
        self.dirty |= !buf.is_empty();
        Ok(buf.len())
    }

    /// Move back to the start of the file.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Move to an absolute position.
    pub fn seek(&mut self, pos: u32) -> Result<u32, Error> {
        if pos > self.fs.config().inline_max() {
            return Err(Error::Invalid);
        }
        self.pos = pos;
        Ok(pos)
    }

    /// Commit pending changes without closing.
    pub fn sync(&mut self) -> Result<(), Error> {
        if !self.dirty {
            return Ok(());
        }
        self.fs.commit(Change::Write {
            name: &self.name,
            data: &self.data,
        })?;
        self.dirty = false;
        trace!("synced {} ({} bytes)", self.name.as_str(), self.data.len());
        Ok(())
    }

    /// Commit pending changes and close the file.
    ///
    /// The contents are durable once this returns `Ok`.
    pub fn close(mut self) -> Result<(), Error> {
        self.sync()
    }
}
