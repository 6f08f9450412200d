use crate::crc32::Crc32Table;
use crate::error::ZipError;

use super::structures::{
    CentralDirectoryHeader, CompressionMethod, DosDateTime, LocalFileHeader, ZIP_VERSION,
};

/// One file to place in an archive: an archive-relative, `/`-separated path
/// and its UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// An entry encoded for the STORED method: its local header and the bytes
/// that follow it. The central directory header is derived once the entry's
/// position in the archive is known (see [`ZipEntry::central_header`]).
#[derive(Debug, Clone)]
pub struct ZipEntry {
    local: LocalFileHeader,
    data: Vec<u8>,
}

impl ZipEntry {
    pub fn encode(
        entry: &FileEntry,
        modified: DosDateTime,
        table: &Crc32Table,
    ) -> Result<Self, ZipError> {
        let file_name = entry.path.as_bytes().to_vec();
        if file_name.is_empty() {
            return Err(ZipError::EmptyPath);
        }
        if file_name.len() > u16::MAX as usize {
            return Err(ZipError::PathTooLong(file_name.len()));
        }

        let data = entry.content.as_bytes().to_vec();
        // Stored: compressed size == uncompressed size. Sizes past 4 GiB wrap.
        let size = data.len() as u32;

        let local = LocalFileHeader {
            version_needed: ZIP_VERSION,
            flags: 0,
            compression_method: CompressionMethod::Stored,
            modified,
            crc32: table.checksum(&data),
            compressed_size: size,
            uncompressed_size: size,
            file_name,
            extra_field_len: 0,
        };

        tracing::debug!(
            path = %entry.path,
            size = data.len(),
            crc32 = local.crc32,
            "encoded entry"
        );

        Ok(Self { local, data })
    }

    pub fn local_header(&self) -> &LocalFileHeader {
        &self.local
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes this entry occupies in the local section (header + data).
    pub fn local_len(&self) -> u64 {
        (self.local.encoded_len() + self.data.len()) as u64
    }

    /// Central directory header for this entry when its local header sits
    /// at `offset`. Offsets past 4 GiB wrap.
    pub fn central_header(&self, offset: u64) -> CentralDirectoryHeader {
        CentralDirectoryHeader::for_local(&self.local, offset as u32)
    }
}

/// Encode a single entry stamped with the current local time.
pub fn create_zip_entry(path: &str, content: &str) -> Result<ZipEntry, ZipError> {
    ZipEntry::encode(
        &FileEntry::new(path, content),
        DosDateTime::now(),
        Crc32Table::global(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> DosDateTime {
        DosDateTime {
            time: 0x6000,
            date: 0x5821,
        }
    }

    #[test]
    fn sizes_and_crc_match_content() {
        let entry =
            ZipEntry::encode(&FileEntry::new("README.md", "hello"), stamp(), Crc32Table::global())
                .unwrap();
        let local = entry.local_header();
        assert_eq!(local.crc32, 0x3610A686);
        assert_eq!(local.compressed_size, 5);
        assert_eq!(local.uncompressed_size, 5);
        assert_eq!(local.compression_method, CompressionMethod::Stored);
        assert_eq!(entry.data(), b"hello");
        assert_eq!(entry.local_len(), 30 + 9 + 5);

        let central = entry.central_header(1234);
        assert_eq!(central.crc32, local.crc32);
        assert_eq!(central.compressed_size, local.compressed_size);
        assert_eq!(central.uncompressed_size, local.uncompressed_size);
        assert_eq!(central.modified, stamp());
        assert_eq!(central.local_header_offset, 1234);
        assert_eq!(central.encoded_len(), 46 + 9);
    }

    #[test]
    fn multibyte_content_measured_in_bytes() {
        let entry =
            ZipEntry::encode(&FileEntry::new("docs/ü.txt", "日本"), stamp(), Crc32Table::global())
                .unwrap();
        assert_eq!(entry.local_header().uncompressed_size, 6);
        assert_eq!(entry.local_header().file_name.len(), "docs/ü.txt".len());
    }

    #[test]
    fn empty_content_is_allowed() {
        let entry = create_zip_entry("empty.txt", "").unwrap();
        assert_eq!(entry.local_header().crc32, 0);
        assert_eq!(entry.local_header().uncompressed_size, 0);
        assert!(entry.data().is_empty());
    }

    #[test]
    fn empty_path_is_rejected() {
        assert!(matches!(
            create_zip_entry("", "x"),
            Err(ZipError::EmptyPath)
        ));
    }

    #[test]
    fn oversized_path_is_rejected() {
        let path = "a".repeat(70_000);
        assert!(matches!(
            create_zip_entry(&path, "x"),
            Err(ZipError::PathTooLong(70_000))
        ));
    }
}
