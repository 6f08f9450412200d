//! Low-level ZIP archive parser.
//!
//! Reads archives through the [`ReadAt`] trait, tail first:
//! 1. Find the End of Central Directory (EOCD) at the end of the data
//! 2. Read the whole Central Directory in one read
//! 3. For extraction, read each entry's Local File Header to locate its data

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Typically used through [`ZipExtractor`](super::ZipExtractor)
/// rather than directly.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    /// Create a new parser for the given reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - A shared reference to a reader implementing [`ReadAt`]
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD is located at the end of the archive. Archives with a
    /// trailing comment are handled by searching backwards for the
    /// signature.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in the archive).
    ///
    /// # Errors
    ///
    /// Returns an error if no valid EOCD can be found, indicating
    /// the data is not a ZIP archive.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            bail!("Not a valid ZIP file");
        }

        // Common case: no comment, the record is the last 22 bytes.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;

        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && buf[20..22] == [0, 0] {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length must account for every trailing byte.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        bail!("Not a valid ZIP file")
    }

    /// Check for a ZIP64 End of Central Directory Locator directly before
    /// the EOCD.
    ///
    /// # Arguments
    ///
    /// * `eocd_offset` - Offset of the regular EOCD in the archive
    ///
    /// # Returns
    ///
    /// `true` only when the locator signature is present. Sentinel values
    /// (`0xFFFF` entries, `0xFFFFFFFF` sizes) in the EOCD are not enough:
    /// a classic archive may hold exactly 65,535 entries.
    pub async fn has_zip64_locator(&self, eocd_offset: u64) -> Result<bool> {
        if eocd_offset < ZIP64_LOCATOR_SIZE as u64 {
            return Ok(false);
        }
        let mut sig = [0u8; 4];
        self.reader
            .read_exact_at(eocd_offset - ZIP64_LOCATOR_SIZE as u64, &mut sig)
            .await?;
        Ok(sig == ZIP64_LOCATOR_SIGNATURE)
    }

    /// List all entries recorded in the Central Directory.
    ///
    /// Reads the EOCD first, then fetches the whole Central Directory in a
    /// single read and parses one header per recorded entry.
    ///
    /// # Returns
    ///
    /// A vector of [`ZipFileEntry`] structures in Central Directory order.
    ///
    /// # Errors
    ///
    /// Returns an error for ZIP64 or multi-disk archives, for a Central
    /// Directory that overlaps the EOCD, or for a malformed header.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        if self.has_zip64_locator(eocd_offset).await? {
            bail!("ZIP64 archives are not supported");
        }
        if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
            bail!("Multi-disk archives are not supported");
        }

        let cd_offset = eocd.cd_offset as u64;
        let cd_size = eocd.cd_size as u64;
        if cd_offset + cd_size > eocd_offset {
            bail!(
                "Central Directory ({} bytes at {}) overlaps the end record at {}",
                cd_size,
                cd_offset,
                eocd_offset
            );
        }

        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data).await?;

        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..eocd.total_entries {
            let entry = Self::parse_cdfh(&mut cursor)
                .with_context(|| format!("central directory entry {}", index))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Parse one Central Directory File Header, leaving the cursor on the
    /// next one.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
        if cursor.read_u32::<LittleEndian>()? != CentralDirectoryHeader::SIGNATURE {
            bail!("Invalid Central Directory File Header");
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let time = cursor.read_u16::<LittleEndian>()?;
        let date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Lossy: names written by other tools may not be UTF-8
        let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();
        let is_directory = file_name.ends_with('/');

        let skip = extra_field_length as u64 + file_comment_length as u64;
        cursor.set_position(cursor.position() + skip);

        Ok(ZipFileEntry {
            file_name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            modified: DosDateTime { time, date },
            is_directory,
        })
    }

    /// Get the actual data offset for an entry.
    ///
    /// The Local File Header has its own variable-length name and extra
    /// field, which may differ from the Central Directory copy, so it is
    /// read to find where the data begins.
    ///
    /// # Arguments
    ///
    /// * `entry` - An entry returned by [`list_files()`](Self::list_files)
    ///
    /// # Errors
    ///
    /// Returns an error if the Local File Header is missing or invalid.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LocalFileHeader::SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut lfh_buf)
            .await
            .with_context(|| format!("local header of {}", entry.file_name))?;

        let (_, file_name_length) = LocalFileHeader::from_bytes(&lfh_buf)?;
        let extra_field_length = u16::from_le_bytes([lfh_buf[28], lfh_buf[29]]) as u64;

        Ok(entry.lfh_offset
            + LocalFileHeader::SIZE as u64
            + file_name_length as u64
            + extra_field_length)
    }

    /// The underlying reader, for fetching entry data after
    /// [`get_data_offset()`](Self::get_data_offset).
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Total size of the archive in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceReader;
    use crate::zip::{ArchiveBuilder, FileEntry};

    fn parser(data: Vec<u8>) -> ZipParser<SliceReader> {
        ZipParser::new(Arc::new(SliceReader::new(data)))
    }

    #[tokio::test]
    async fn eocd_with_trailing_comment() {
        let mut zip = ArchiveBuilder::new()
            .build(&[FileEntry::new("a", "b")])
            .unwrap();
        let eocd_at = zip.len() - EndOfCentralDirectory::SIZE;
        let comment = b"built by hand";
        zip[eocd_at + 20..eocd_at + 22].copy_from_slice(&(comment.len() as u16).to_le_bytes());
        zip.extend_from_slice(comment);

        let parser = parser(zip);
        let (eocd, offset) = parser.find_eocd().await.unwrap();
        assert_eq!(offset as usize, eocd_at);
        assert_eq!(eocd.comment_len as usize, comment.len());
        assert_eq!(parser.list_files().await.unwrap()[0].file_name, "a");
    }

    #[tokio::test]
    async fn full_entry_count_is_not_zip64() {
        let entries: Vec<_> = (0..u16::MAX as usize)
            .map(|i| FileEntry::new(format!("f{}", i), ""))
            .collect();
        let zip = ArchiveBuilder::new().build(&entries).unwrap();
        let parser = parser(zip);

        let (eocd, offset) = parser.find_eocd().await.unwrap();
        assert_eq!(eocd.total_entries, 0xFFFF);
        assert!(!parser.has_zip64_locator(offset).await.unwrap());
        assert_eq!(parser.list_files().await.unwrap().len(), 65_535);
    }

    #[tokio::test]
    async fn zip64_locator_is_rejected() {
        // empty archive with a ZIP64 locator spliced in before the EOCD
        let mut zip = ZIP64_LOCATOR_SIGNATURE.to_vec();
        zip.resize(ZIP64_LOCATOR_SIZE, 0);
        let eocd = EndOfCentralDirectory::new(0, 0, ZIP64_LOCATOR_SIZE as u32);
        eocd.write_to(&mut zip).unwrap();

        let parser = parser(zip);
        assert!(parser.has_zip64_locator(ZIP64_LOCATOR_SIZE as u64).await.unwrap());
        let err = parser.list_files().await.unwrap_err();
        assert!(err.to_string().contains("ZIP64"));
    }

    #[tokio::test]
    async fn rejects_non_zip_data() {
        assert!(parser(b"definitely not a zip archive".to_vec())
            .find_eocd()
            .await
            .is_err());
        assert!(parser(b"PK".to_vec()).find_eocd().await.is_err());
    }

    #[tokio::test]
    async fn data_offset_skips_name() {
        let zip = ArchiveBuilder::new()
            .build(&[FileEntry::new("one.txt", "1"), FileEntry::new("two.txt", "22")])
            .unwrap();
        let parser = parser(zip);
        let entries = parser.list_files().await.unwrap();
        assert_eq!(entries[1].lfh_offset, 30 + 7 + 1);
        assert_eq!(parser.get_data_offset(&entries[1]).await.unwrap(), 38 + 30 + 7);
    }
}
