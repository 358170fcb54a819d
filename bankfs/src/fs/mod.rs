//! The filesystem: a flat namespace of small files kept in a metadata log.
//!
//! # Design
//!
//! All state lives in one *metadata block* at a time. The block starts with
//! a header (revision, spare block, checksum) followed by an append-only log
//! of records: the superblock first, then one record per file update or
//! removal. The newest record for a name wins.
//!
//! - **Commit**: a change is one record appended at the log tail. A record
//!   torn by power loss fails its checksum and is ignored at mount.
//! - **Compaction**: when the log is full (or its tail is torn), the live
//!   state is rewritten into the *spare* block with the next revision,
//!   header last. The old block becomes the new spare.
//! - **Relocation**: every `block_cycles` revisions the compaction target
//!   is taken from the lookahead window instead of the spare, moving the
//!   block pair across the device.
//! - **Mount**: every block header is scanned and the valid one with the
//!   newest revision is replayed.

mod file;
mod flags;
mod layout;

pub use file::File;
pub use flags::OpenFlags;

use crate::{Config, ConfigError, Error};
use alloc::{collections::BTreeMap, string::String, vec, vec::Vec};
use bankfs_block_device::BlockDevice;
use layout::{Decoded, Header, Record, RecordKind, Superblock, VERSION};

/// Longest file name in bytes.
pub const NAME_MAX: usize = 255;

/// A filesystem over a block device.
///
/// The filesystem owns its device. Pass `&mut device` to keep using the
/// device afterwards, or take it back with [`Filesystem::into_inner`].
///
/// # Examples
///
/// ```ignore
/// let mut fs = Filesystem::new(device, Config::stm32l4r5_bank2())?;
/// fs.format()?;
/// fs.mount()?;
///
/// let mut file = fs.open("hello", OpenFlags::WRITE | OpenFlags::CREATE)?;
/// file.write(b"hello")?;
/// file.close()?;
///
/// fs.unmount()?;
/// ```
pub struct Filesystem<D: BlockDevice> {
    device: D,
    config: Config,
    state: Option<Mounted>,
}

impl<D: BlockDevice> Filesystem<D> {
    /// Create an unmounted filesystem over `device`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` does not fit the device geometry.
    pub fn new(device: D, config: Config) -> Result<Self, ConfigError> {
        config.validate(&device.geometry())?;
        Ok(Self {
            device,
            config,
            state: None,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a reference to the underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Get a mutable reference to the underlying device.
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Consume the filesystem and return the device.
    pub fn into_inner(self) -> D {
        self.device
    }

    /// Whether the filesystem is mounted.
    pub fn is_mounted(&self) -> bool {
        self.state.is_some()
    }

    /// Revision of the mounted metadata block.
    pub fn revision(&self) -> Option<u32> {
        self.state.as_ref().map(|m| m.revision)
    }

    /// Block currently holding the metadata log.
    pub fn metadata_block(&self) -> Option<u32> {
        self.state.as_ref().map(|m| m.active)
    }

    /// Write an empty filesystem.
    ///
    /// Unmounts first. The new revision is newer than any valid header
    /// already on the device, so stale blocks never win a later mount.
    pub fn format(&mut self) -> Result<(), Error> {
        self.state = None;
        let revision = match self.find_newest()? {
            Some((_, header)) => header.revision.wrapping_add(1),
            None => 1,
        };

        let mut log = Vec::new();
        encode_superblock(&self.config, &mut log);
        let header = Header { revision, spare: 1 };
        write_metadata(&mut self.device, &self.config, 0, header, &log)?;

        info!("formatted with revision {}", revision);
        Ok(())
    }

    /// Mount the filesystem.
    ///
    /// # Errors
    ///
    /// - [`Error::Corrupt`] if no valid metadata block exists
    /// - [`Error::Invalid`] if the filesystem was written with another
    ///   version or geometry
    /// - [`Error::Io`] if the device fails
    pub fn mount(&mut self) -> Result<(), Error> {
        self.state = None;
        let Some((block, header)) = self.find_newest()? else {
            debug!("no valid metadata block");
            return Err(Error::Corrupt);
        };

        let image = read_block(&mut self.device, &self.config, block)?;
        let mounted = Mounted::replay(&self.config, block, header, &image)?;
        info!(
            "mounted block {} revision {} with {} files",
            block,
            header.revision,
            mounted.files.len()
        );
        self.state = Some(mounted);
        Ok(())
    }

    /// Unmount the filesystem and flush the device.
    pub fn unmount(&mut self) -> Result<(), Error> {
        if self.state.take().is_none() {
            return Err(Error::Invalid);
        }
        self.device.sync()?;
        debug!("unmounted");
        Ok(())
    }

    /// Open a file.
    ///
    /// A file created by this call is committed before the handle is
    /// returned.
    pub fn open(&mut self, path: &str, flags: OpenFlags) -> Result<File<'_, D>, Error> {
        let name = validate_name(path)?;
        if !flags.intersects(OpenFlags::RDWR) {
            return Err(Error::Invalid);
        }
        if flags.intersects(OpenFlags::TRUNC | OpenFlags::APPEND) && !flags.contains(OpenFlags::WRITE)
        {
            return Err(Error::Invalid);
        }

        let existing = self.mounted()?.files.get(name).cloned();
        let data = match existing {
            Some(_) if flags.contains(OpenFlags::CREATE | OpenFlags::EXCL) => {
                return Err(Error::Exists);
            }
            Some(data) => data,
            None if flags.contains(OpenFlags::CREATE) => {
                self.commit(Change::Write { name, data: &[] })?;
                debug!("created {}", name);
                Vec::new()
            }
            None => return Err(Error::NoEntry),
        };

        let truncate = flags.contains(OpenFlags::TRUNC) && !data.is_empty();
        let data = if truncate { Vec::new() } else { data };
        Ok(File::new(self, String::from(name), data, flags, truncate))
    }

    /// Whether a file exists.
    pub fn exists(&self, path: &str) -> Result<bool, Error> {
        let name = validate_name(path)?;
        Ok(self.mounted()?.files.contains_key(name))
    }

    /// Remove a file.
    pub fn remove(&mut self, path: &str) -> Result<(), Error> {
        let name = validate_name(path)?;
        if !self.mounted()?.files.contains_key(name) {
            return Err(Error::NoEntry);
        }
        self.commit(Change::Remove { name })?;
        debug!("removed {}", name);
        Ok(())
    }

    pub(crate) fn commit(&mut self, change: Change<'_>) -> Result<(), Error> {
        let Self {
            device,
            config,
            state,
        } = self;
        let mounted = state.as_mut().ok_or(Error::Invalid)?;
        mounted.commit(device, config, change)
    }

    fn mounted(&self) -> Result<&Mounted, Error> {
        self.state.as_ref().ok_or(Error::Invalid)
    }

    /// Scan every block header for the newest valid one.
    fn find_newest(&mut self) -> Result<Option<(u32, Header)>, Error> {
        let span = self.config.header_span();
        let mut buf = vec![0u8; span as usize];
        let mut newest: Option<(u32, Header)> = None;

        for block in 0..self.config.block_count {
            read_span(&mut self.device, &self.config, block, 0, &mut buf)?;
            let Some(header) = Header::decode(&buf) else {
                continue;
            };
            if header.spare >= self.config.block_count || header.spare == block {
                continue;
            }
            trace!("block {} holds revision {}", block, header.revision);
            let newer = match newest {
                Some((_, best)) => layout::is_newer(header.revision, best.revision),
                None => true,
            };
            if newer {
                newest = Some((block, header));
            }
        }
        Ok(newest)
    }
}

/// A pending change to the file table.
pub(crate) enum Change<'a> {
    Write { name: &'a str, data: &'a [u8] },
    Remove { name: &'a str },
}

impl Change<'_> {
    fn record(&self) -> Record<'_> {
        match self {
            Self::Write { name, data } => Record::file(name.as_bytes(), data),
            Self::Remove { name } => Record::remove(name.as_bytes()),
        }
    }

    fn apply(&self, files: &mut BTreeMap<String, Vec<u8>>) {
        match self {
            Self::Write { name, data } => {
                files.insert(String::from(*name), data.to_vec());
            }
            Self::Remove { name } => {
                files.remove(*name);
            }
        }
    }
}

/// In-memory state of a mounted filesystem.
struct Mounted {
    active: u32,
    spare: u32,
    revision: u32,
    /// Offset of the next record in the active block.
    tail: u32,
    /// The tail holds torn bytes; the next commit must compact.
    dirty_tail: bool,
    files: BTreeMap<String, Vec<u8>>,
    lookahead: Lookahead,
}

impl Mounted {
    fn replay(config: &Config, block: u32, header: Header, image: &[u8]) -> Result<Self, Error> {
        let mut offset = config.header_span() as usize;

        let superblock = match layout::decode_record(&image[offset..], config.prog_size) {
            Decoded::Record(record, len) => {
                offset += len;
                Superblock::parse(&record).ok_or(Error::Corrupt)?
            }
            _ => return Err(Error::Corrupt),
        };
        if superblock.version != VERSION
            || superblock.block_size != config.block_size
            || superblock.block_count != config.block_count
        {
            warn!(
                "superblock mismatch: version {} block size {} block count {}",
                superblock.version,
                superblock.block_size,
                superblock.block_count
            );
            return Err(Error::Invalid);
        }

        let mut files = BTreeMap::new();
        let mut dirty_tail = false;
        while offset < image.len() {
            match layout::decode_record(&image[offset..], config.prog_size) {
                Decoded::Record(record, len) => {
                    apply_record(&mut files, &record);
                    offset += len;
                }
                Decoded::Erased => break,
                Decoded::Invalid => {
                    warn!("torn record at block {} offset {}", block, offset);
                    dirty_tail = true;
                    break;
                }
            }
        }

        Ok(Self {
            active: block,
            spare: header.spare,
            revision: header.revision,
            tail: offset as u32,
            dirty_tail,
            files,
            lookahead: Lookahead::new(config, header.revision),
        })
    }

    fn commit<D: BlockDevice>(
        &mut self,
        device: &mut D,
        config: &Config,
        change: Change<'_>,
    ) -> Result<(), Error> {
        let record = change.record();
        let len = record.encoded_len(config.prog_size);

        if !self.dirty_tail && self.tail + len <= config.block_size {
            let mut bytes = Vec::with_capacity(len as usize);
            record.encode_into(&mut bytes, config.prog_size);
            if let Err(e) = device.prog(self.active, self.tail, &bytes) {
                warn!("append to block {} failed: {}", self.active, e);
                self.dirty_tail = true;
                return Err(e.into());
            }
            self.tail += len;
            change.apply(&mut self.files);
            return Ok(());
        }

        let mut files = self.files.clone();
        change.apply(&mut files);
        self.compact(device, config, files)
    }

    fn compact<D: BlockDevice>(
        &mut self,
        device: &mut D,
        config: &Config,
        files: BTreeMap<String, Vec<u8>>,
    ) -> Result<(), Error> {
        let mut log = Vec::new();
        encode_superblock(config, &mut log);
        for (name, data) in &files {
            Record::file(name.as_bytes(), data).encode_into(&mut log, config.prog_size);
        }
        if config.header_span() as usize + log.len() > config.block_size as usize {
            return Err(Error::NoSpace);
        }

        let revision = self.revision.wrapping_add(1);
        let target = if config.relocates_at(revision) {
            match self.lookahead.alloc(config, [self.active, self.spare]) {
                Some(block) => {
                    debug!("relocating metadata from block {} to {}", self.active, block);
                    block
                }
                None => self.spare,
            }
        } else {
            self.spare
        };

        let header = Header {
            revision,
            spare: self.active,
        };
        write_metadata(device, config, target, header, &log)?;
        debug!("compacted into block {} revision {}", target, revision);

        self.spare = self.active;
        self.active = target;
        self.revision = revision;
        self.tail = config.header_span() + log.len() as u32;
        self.dirty_tail = false;
        self.files = files;
        Ok(())
    }
}

/// Window of candidate blocks for relocating the metadata log.
///
/// Covers `lookahead_size * 8` blocks at a time and slides forward when
/// exhausted. Every block outside the metadata pair is free.
#[derive(Debug, Clone, Copy)]
struct Lookahead {
    start: u32,
    next: u32,
}

impl Lookahead {
    fn new(config: &Config, seed: u32) -> Self {
        Self {
            start: seed % config.block_count,
            next: 0,
        }
    }

    fn alloc(&mut self, config: &Config, in_use: [u32; 2]) -> Option<u32> {
        let window = config.lookahead_blocks();
        for _ in 0..config.block_count {
            if self.next >= window {
                self.start = (self.start + window) % config.block_count;
                self.next = 0;
            }
            let candidate = (self.start + self.next) % config.block_count;
            self.next += 1;
            if !in_use.contains(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

fn apply_record(files: &mut BTreeMap<String, Vec<u8>>, record: &Record<'_>) {
    let Ok(name) = core::str::from_utf8(record.name) else {
        return;
    };
    match record.kind {
        RecordKind::File => {
            files.insert(String::from(name), record.data.to_vec());
        }
        RecordKind::Remove => {
            files.remove(name);
        }
        RecordKind::Superblock => {}
    }
}

fn encode_superblock(config: &Config, out: &mut Vec<u8>) {
    let data = layout::superblock_data(config);
    Record {
        kind: RecordKind::Superblock,
        name: layout::SUPERBLOCK_NAME,
        data: &data,
    }
    .encode_into(out, config.prog_size);
}

fn validate_name(path: &str) -> Result<&str, Error> {
    let name = path.strip_prefix('/').unwrap_or(path);
    if name.is_empty() || name.contains('/') {
        return Err(Error::Invalid);
    }
    if name.len() > NAME_MAX {
        return Err(Error::NameTooLong);
    }
    Ok(name)
}

/// Erase `block`, write `log` after the header span, then the header.
fn write_metadata<D: BlockDevice>(
    device: &mut D,
    config: &Config,
    block: u32,
    header: Header,
    log: &[u8],
) -> Result<(), Error> {
    let span = config.header_span();
    device.erase(block)?;
    if !log.is_empty() {
        device.prog(block, span, log)?;
    }
    device.prog(block, 0, &header.encode(span))?;
    Ok(())
}

/// Read `buf.len()` bytes at `offset` in cache-sized pieces.
fn read_span<D: BlockDevice>(
    device: &mut D,
    config: &Config,
    block: u32,
    offset: u32,
    buf: &mut [u8],
) -> Result<(), Error> {
    for (i, chunk) in buf.chunks_mut(config.cache_size as usize).enumerate() {
        device.read(block, offset + (i as u32) * config.cache_size, chunk)?;
    }
    Ok(())
}

fn read_block<D: BlockDevice>(device: &mut D, config: &Config, block: u32) -> Result<Vec<u8>, Error> {
    let mut image = vec![0u8; config.block_size as usize];
    read_span(device, config, block, 0, &mut image)?;
    Ok(image)
}
