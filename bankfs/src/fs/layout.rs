//! On-flash layout of metadata blocks.
//!
//! ```text
//! offset 0            header_span                                 block_size
//! ┌──────────────────┬─────────────┬────────────┬─────┬──────────────────┐
//! │ header (padded)  │ superblock  │ record     │ ... │ erased (0xFF)    │
//! └──────────────────┴─────────────┴────────────┴─────┴──────────────────┘
//!
//! header: magic u32 | revision u32 | spare u32 | crc32 u32
//! record: kind u8 | name_len u8 | data_len u16 | name | data | crc32 u32 | pad
//! ```
//!
//! All integers are little-endian. Records are padded with `0xFF` to a
//! multiple of the program size, so every record starts on a program
//! boundary. The header is written after the records it covers; a block
//! with a valid header therefore holds a complete log.

use crate::config::{Config, HEADER_LEN, align_up};
use alloc::{vec, vec::Vec};
use crc::{CRC_32_ISO_HDLC, Crc};

/// Header magic, `"BKFS"` when read as bytes.
pub(crate) const MAGIC: u32 = u32::from_le_bytes(*b"BKFS");

/// Name carried by the superblock record.
pub(crate) const SUPERBLOCK_NAME: &[u8] = b"bankfs";

/// On-disk format version.
pub(crate) const VERSION: u32 = 1;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
const ERASED: u8 = 0xFF;
const PREAMBLE_LEN: usize = 4;
const CRC_LEN: usize = 4;

/// Metadata block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub revision: u32,
    pub spare: u32,
}

impl Header {
    /// Encode padded to `span` bytes.
    pub fn encode(&self, span: u32) -> Vec<u8> {
        let mut out = vec![ERASED; span as usize];
        out[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        out[4..8].copy_from_slice(&self.revision.to_le_bytes());
        out[8..12].copy_from_slice(&self.spare.to_le_bytes());
        let crc = CRC32.checksum(&out[0..12]);
        out[12..16].copy_from_slice(&crc.to_le_bytes());
        out
    }

    /// Decode a header, rejecting bad magic or checksum.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN as usize || read_u32(bytes, 0) != MAGIC {
            return None;
        }
        if CRC32.checksum(&bytes[0..12]) != read_u32(bytes, 12) {
            return None;
        }
        Some(Self {
            revision: read_u32(bytes, 4),
            spare: read_u32(bytes, 8),
        })
    }
}

/// True when revision `a` is newer than `b`, tolerating wrap-around.
#[inline]
pub(crate) fn is_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum RecordKind {
    Superblock = 1,
    File = 2,
    Remove = 3,
}

impl RecordKind {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Superblock),
            2 => Some(Self::File),
            3 => Some(Self::Remove),
            _ => None,
        }
    }
}

/// One log record, borrowing its name and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Record<'a> {
    pub kind: RecordKind,
    pub name: &'a [u8],
    pub data: &'a [u8],
}

impl<'a> Record<'a> {
    pub fn file(name: &'a [u8], data: &'a [u8]) -> Self {
        Self {
            kind: RecordKind::File,
            name,
            data,
        }
    }

    pub fn remove(name: &'a [u8]) -> Self {
        Self {
            kind: RecordKind::Remove,
            name,
            data: &[],
        }
    }

    /// Encoded length including checksum and padding.
    pub fn encoded_len(&self, prog_size: u32) -> u32 {
        let raw = PREAMBLE_LEN + self.name.len() + self.data.len() + CRC_LEN;
        align_up(raw as u32, prog_size)
    }

    /// Append the encoded record to `out`.
    ///
    /// Names are at most 255 bytes and payloads at most `u16::MAX` bytes;
    /// callers enforce both.
    pub fn encode_into(&self, out: &mut Vec<u8>, prog_size: u32) {
        let start = out.len();
        out.push(self.kind as u8);
        out.push(self.name.len() as u8);
        out.extend_from_slice(&(self.data.len() as u16).to_le_bytes());
        out.extend_from_slice(self.name);
        out.extend_from_slice(self.data);
        let crc = CRC32.checksum(&out[start..]);
        out.extend_from_slice(&crc.to_le_bytes());
        out.resize(start + self.encoded_len(prog_size) as usize, ERASED);
    }
}

/// Result of decoding at a log position.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Decoded<'a> {
    /// A valid record and its padded length.
    Record(Record<'a>, usize),
    /// The rest of the block is erased: end of log.
    Erased,
    /// Torn or corrupted bytes.
    Invalid,
}

/// Decode the record at the start of `buf`, which runs to the end of the block.
pub(crate) fn decode_record(buf: &[u8], prog_size: u32) -> Decoded<'_> {
    if buf.iter().all(|&b| b == ERASED) {
        return Decoded::Erased;
    }
    if buf.len() < PREAMBLE_LEN + CRC_LEN {
        return Decoded::Invalid;
    }

    let name_len = buf[1] as usize;
    let data_len = u16::from_le_bytes([buf[2], buf[3]]) as usize;
    let body_end = PREAMBLE_LEN + name_len + data_len;
    let crc_end = body_end + CRC_LEN;
    let padded = align_up(crc_end as u32, prog_size) as usize;
    if padded > buf.len() {
        return Decoded::Invalid;
    }
    if CRC32.checksum(&buf[..body_end]) != read_u32(buf, body_end) {
        return Decoded::Invalid;
    }
    let Some(kind) = RecordKind::from_u8(buf[0]) else {
        return Decoded::Invalid;
    };

    let name = &buf[PREAMBLE_LEN..PREAMBLE_LEN + name_len];
    let data = &buf[PREAMBLE_LEN + name_len..body_end];
    Decoded::Record(Record { kind, name, data }, padded)
}

/// Payload of the superblock record for `config`.
pub(crate) fn superblock_data(config: &Config) -> [u8; 12] {
    let mut data = [0u8; 12];
    data[0..4].copy_from_slice(&VERSION.to_le_bytes());
    data[4..8].copy_from_slice(&config.block_size.to_le_bytes());
    data[8..12].copy_from_slice(&config.block_count.to_le_bytes());
    data
}

/// Superblock contents: version, block size, block count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Superblock {
    pub version: u32,
    pub block_size: u32,
    pub block_count: u32,
}

impl Superblock {
    pub fn parse(record: &Record<'_>) -> Option<Self> {
        if record.kind != RecordKind::Superblock
            || record.name != SUPERBLOCK_NAME
            || record.data.len() != 12
        {
            return None;
        }
        Some(Self {
            version: read_u32(record.data, 0),
            block_size: read_u32(record.data, 4),
            block_count: read_u32(record.data, 8),
        })
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip_and_padding() {
        let header = Header {
            revision: 7,
            spare: 3,
        };
        let bytes = header.encode(64);
        assert_eq!(bytes.len(), 64);
        assert!(bytes[16..].iter().all(|&b| b == 0xFF));
        assert_eq!(Header::decode(&bytes), Some(header));
    }

    #[test]
    fn test_header_rejects_corruption() {
        let mut bytes = Header {
            revision: 1,
            spare: 1,
        }
        .encode(16);
        bytes[5] ^= 0x01;
        assert_eq!(Header::decode(&bytes), None);
        assert_eq!(Header::decode(&[0xFF; 16]), None);
    }

    #[test]
    fn test_revision_wraps() {
        assert!(is_newer(2, 1));
        assert!(!is_newer(1, 2));
        assert!(!is_newer(5, 5));
        assert!(is_newer(0, u32::MAX));
    }

    #[test]
    fn test_record_padded_to_prog_size() {
        let record = Record::file(b"boot_count", &[1, 0, 0, 0]);
        let mut out = Vec::new();
        record.encode_into(&mut out, 16);
        assert_eq!(out.len(), 32);
        assert_eq!(record.encoded_len(16), 32);
        assert_eq!(&out[22..], &[0xFF; 10]);

        match decode_record(&out, 16) {
            Decoded::Record(decoded, len) => {
                assert_eq!(decoded, record);
                assert_eq!(len, 32);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_end_of_log() {
        assert_eq!(decode_record(&[0xFF; 64], 16), Decoded::Erased);
        assert_eq!(decode_record(&[], 16), Decoded::Erased);
    }

    #[test]
    fn test_decode_torn_record() {
        let mut out = Vec::new();
        Record::file(b"a", &[9; 20]).encode_into(&mut out, 8);
        out.resize(64, 0xFF);
        // Only the first word landed.
        let mut torn = vec![0xFF; 64];
        torn[..4].copy_from_slice(&out[..4]);
        assert_eq!(decode_record(&torn, 8), Decoded::Invalid);

        // A stray programmed byte after an erased kind byte is not end of log.
        let mut stray = vec![0xFF; 64];
        stray[10] = 0;
        assert_eq!(decode_record(&stray, 8), Decoded::Invalid);
    }

    #[test]
    fn test_superblock_record() {
        let config = Config::stm32l4r5_bank2();
        let data = superblock_data(&config);
        let record = Record {
            kind: RecordKind::Superblock,
            name: SUPERBLOCK_NAME,
            data: &data,
        };
        assert_eq!(
            Superblock::parse(&record),
            Some(Superblock {
                version: VERSION,
                block_size: 4096,
                block_count: 256
            })
        );
        assert_eq!(Superblock::parse(&Record::file(b"bankfs", &data)), None);
    }
}
