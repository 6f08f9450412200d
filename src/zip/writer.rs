//! In-memory ZIP assembly.
//!
//! Layout of the produced archive:
//!
//! ```text
//! [local header 0][data 0] ... [local header n-1][data n-1]
//! [central header 0] ... [central header n-1]
//! [end of central directory]
//! ```
//!
//! Offsets are computed up front as prefix sums of the local section, so
//! every central header is written once with its final offset.
//!
//! There is no ZIP64 support. Offsets and sizes are 32-bit and the entry
//! count is 16-bit; past 4 GiB or 65,535 entries those fields wrap and the
//! archive is unreadable. The builder logs a warning when that happens.

use crate::crc32::Crc32Table;
use crate::error::ZipError;

use super::entry::{FileEntry, ZipEntry};
use super::structures::{DosDateTime, EndOfCentralDirectory};

const MAX_ENTRIES: usize = u16::MAX as usize;
const MAX_OFFSET: u64 = u32::MAX as u64;

/// Builds a complete archive from an ordered list of entries.
pub struct ArchiveBuilder<'t> {
    modified: DosDateTime,
    table: &'t Crc32Table,
}

impl ArchiveBuilder<'static> {
    /// Builder stamping entries with the current local time.
    pub fn new() -> Self {
        Self {
            modified: DosDateTime::now(),
            table: Crc32Table::global(),
        }
    }
}

impl Default for ArchiveBuilder<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'t> ArchiveBuilder<'t> {
    /// Use a fixed modification time for every entry.
    pub fn modified(mut self, modified: DosDateTime) -> Self {
        self.modified = modified;
        self
    }

    pub fn table<'u>(self, table: &'u Crc32Table) -> ArchiveBuilder<'u> {
        ArchiveBuilder {
            modified: self.modified,
            table,
        }
    }

    /// Encode each entry, in input order.
    pub fn encode_entries(&self, entries: &[FileEntry]) -> Result<Vec<ZipEntry>, ZipError> {
        entries
            .iter()
            .map(|e| ZipEntry::encode(e, self.modified, self.table))
            .collect()
    }

    pub fn build(&self, entries: &[FileEntry]) -> Result<Vec<u8>, ZipError> {
        let encoded = self.encode_entries(entries)?;
        assemble(&encoded)
    }
}

/// Byte offset of every entry's local header: the running sum of the
/// preceding entries' header + data lengths.
pub fn local_header_offsets(entries: &[ZipEntry]) -> Vec<u64> {
    entries
        .iter()
        .scan(0u64, |next, entry| {
            let offset = *next;
            *next += entry.local_len();
            Some(offset)
        })
        .collect()
}

/// Whether an archive with `entries` entries and `bytes` bytes before the
/// end record would overflow the 16-bit count or 32-bit offset fields.
pub fn exceeds_classic_limits(entries: usize, bytes: u64) -> bool {
    entries > MAX_ENTRIES || bytes > MAX_OFFSET
}

/// Lay out encoded entries into a finished archive.
pub fn assemble(entries: &[ZipEntry]) -> Result<Vec<u8>, ZipError> {
    let offsets = local_header_offsets(entries);

    let cd_offset: u64 = entries.iter().map(ZipEntry::local_len).sum();
    let central: Vec<_> = entries
        .iter()
        .zip(&offsets)
        .map(|(entry, &offset)| entry.central_header(offset))
        .collect();
    let cd_size: u64 = central.iter().map(|h| h.encoded_len() as u64).sum();

    if exceeds_classic_limits(entries.len(), cd_offset + cd_size) {
        tracing::warn!(
            entries = entries.len(),
            bytes = cd_offset + cd_size,
            "archive exceeds the non-ZIP64 limits, size and count fields will wrap"
        );
    }

    let eocd = EndOfCentralDirectory::new(entries.len() as u16, cd_size as u32, cd_offset as u32);

    let mut out = Vec::with_capacity((cd_offset + cd_size) as usize + EndOfCentralDirectory::SIZE);
    for entry in entries {
        entry.local_header().write_to(&mut out)?;
        out.extend_from_slice(entry.data());
    }
    for header in &central {
        header.write_to(&mut out)?;
    }
    eocd.write_to(&mut out)?;

    tracing::info!(
        entries = entries.len(),
        bytes = out.len(),
        "assembled zip archive"
    );

    Ok(out)
}

/// Build a complete stored-method archive, stamped with the current time.
pub fn create_zip_file(entries: &[FileEntry]) -> Result<Vec<u8>, ZipError> {
    ArchiveBuilder::new().build(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ArchiveBuilder<'static> {
        ArchiveBuilder::new().modified(DosDateTime {
            time: 0x7000,
            date: 0x5A21,
        })
    }

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn empty_archive_is_a_bare_eocd() {
        let zip = builder().build(&[]).unwrap();
        assert_eq!(zip.len(), 22);
        assert_eq!(&zip[0..4], b"PK\x05\x06");
        assert_eq!(u16_at(&zip, 8), 0);
        assert_eq!(u16_at(&zip, 10), 0);
        assert_eq!(u32_at(&zip, 12), 0);
        assert_eq!(u32_at(&zip, 16), 0);
    }

    #[test]
    fn offsets_are_prefix_sums() {
        let entries = vec![
            FileEntry::new("a.txt", "aaa"),
            FileEntry::new("dir/b.txt", ""),
            FileEntry::new("c", "cccccccc"),
        ];
        let encoded = builder().encode_entries(&entries).unwrap();
        let offsets = local_header_offsets(&encoded);
        assert_eq!(offsets, vec![0, 30 + 5 + 3, 38 + 30 + 9]);
    }

    #[test]
    fn central_directory_accounting() {
        let entries = vec![
            FileEntry::new("README.md", "hello"),
            FileEntry::new("skills/foo/SKILL.md", "x"),
        ];
        let zip = builder().build(&entries).unwrap();

        let local_section = (30 + 9 + 5) + (30 + 19 + 1);
        let central_section = (46 + 9) + (46 + 19);
        assert_eq!(zip.len(), local_section + central_section + 22);

        let eocd = &zip[zip.len() - 22..];
        assert_eq!(u16_at(eocd, 8), 2);
        assert_eq!(u16_at(eocd, 10), 2);
        assert_eq!(u32_at(eocd, 12) as usize, central_section);
        assert_eq!(u32_at(eocd, 16) as usize, local_section);

        // second central header points at the second local header
        let second_central = local_section + 46 + 9;
        assert_eq!(&zip[second_central..second_central + 4], b"PK\x01\x02");
        assert_eq!(u32_at(&zip, second_central + 42), 30 + 9 + 5);
        assert_eq!(&zip[44..48], b"PK\x03\x04");
    }

    #[test]
    fn single_file_bytes() {
        let zip = builder()
            .build(&[FileEntry::new("README.md", "hello")])
            .unwrap();
        assert_eq!(&zip[0..4], b"PK\x03\x04");
        assert_eq!(u16_at(&zip, 8), 0); // stored
        assert_eq!(u16_at(&zip, 10), 0x7000);
        assert_eq!(u16_at(&zip, 12), 0x5A21);
        assert_eq!(u32_at(&zip, 14), 0x3610A686);
        assert_eq!(&zip[30..39], b"README.md");
        assert_eq!(&zip[39..44], b"hello");
    }

    #[test]
    fn classic_limits() {
        assert!(!exceeds_classic_limits(0, 0));
        assert!(!exceeds_classic_limits(65_535, u32::MAX as u64));
        assert!(exceeds_classic_limits(65_536, 0));
        assert!(exceeds_classic_limits(1, u32::MAX as u64 + 1));
        assert!(exceeds_classic_limits(1, 5 * 1024 * 1024 * 1024));
    }

    #[test]
    fn first_invalid_entry_aborts_build() {
        let entries = vec![FileEntry::new("ok", "1"), FileEntry::new("", "2")];
        assert!(matches!(builder().build(&entries), Err(ZipError::EmptyPath)));
    }
}
