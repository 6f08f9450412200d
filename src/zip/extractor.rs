use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::crc32::calculate_crc32;
use crate::io::ReadAt;
use anyhow::{Context, Result, bail};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Upper bound on the buffer reserved up front for inflated data. Larger
/// entries still inflate, the buffer just grows as it goes.
const MAX_PREALLOCATE: u64 = 16 * 1024 * 1024;

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    /// Create a new extractor for the given reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - A shared reference to a reader implementing [`ReadAt`]
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Read and decompress an entry, checking its CRC-32.
    ///
    /// # Arguments
    ///
    /// * `entry` - An entry returned by [`list_files()`](Self::list_files)
    ///
    /// # Returns
    ///
    /// The entry's uncompressed bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry's data extends past the end of the
    /// archive, if the compression method is not STORED or DEFLATE, or if
    /// the length or CRC-32 of the result does not match the header.
    pub async fn extract_to_memory(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.parser.get_data_offset(entry).await?;

        // Sizes come from the archive; check them against the real length
        // before allocating anything.
        let data_end = data_offset.checked_add(entry.compressed_size);
        if data_end.is_none_or(|end| end > self.parser.size()) {
            bail!(
                "{}: {} bytes at offset {} extend past the end of the archive ({} bytes)",
                entry.file_name,
                entry.compressed_size,
                data_offset,
                self.parser.size()
            );
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser
            .reader()
            .read_exact_at(data_offset, &mut raw)
            .await
            .with_context(|| format!("data of {}", entry.file_name))?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let capacity = entry.uncompressed_size.min(MAX_PREALLOCATE);
                let mut out = Vec::with_capacity(capacity as usize);
                // One byte past the declared size is enough to report a mismatch.
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .with_context(|| format!("inflating {}", entry.file_name))?;
                out
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for {}",
                    method,
                    entry.file_name
                );
            }
        };

        if data.len() as u64 != entry.uncompressed_size {
            bail!(
                "{}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                data.len()
            );
        }

        let crc = calculate_crc32(&data);
        if crc != entry.crc32 {
            bail!(
                "{}: bad CRC {:08x} (should be {:08x})",
                entry.file_name,
                crc,
                entry.crc32
            );
        }

        Ok(data)
    }

    /// Verify an entry without keeping its data
    pub async fn test_entry(&self, entry: &ZipFileEntry) -> Result<()> {
        self.extract_to_memory(entry).await.map(|_| ())
    }

    /// Extract an entry below `dest`, creating parent directories.
    ///
    /// Returns the path written.
    pub async fn extract_to_dir(&self, entry: &ZipFileEntry, dest: &Path) -> Result<PathBuf> {
        let output_path = dest.join(sanitize_entry_path(&entry.file_name)?);

        if entry.is_directory {
            fs::create_dir_all(&output_path).await?;
            return Ok(output_path);
        }

        self.extract_to_file(entry, &output_path).await?;
        Ok(output_path)
    }

    /// Extract file to disk
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let data = self.extract_to_memory(entry).await?;

        let mut file = fs::File::create(output_path)
            .await
            .with_context(|| format!("cannot create {}", output_path.display()))?;
        file.write_all(&data).await?;

        Ok(())
    }

    /// Extract file to stdout
    pub async fn extract_to_stdout(&self, entry: &ZipFileEntry) -> Result<()> {
        let data = self.extract_to_memory(entry).await?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&data).await?;
        stdout.flush().await?;

        Ok(())
    }
}

/// Relative path for an entry name, refusing names that would land outside
/// the extraction directory.
pub fn sanitize_entry_path(name: &str) -> Result<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                bail!("Refusing to extract {}: path escapes the destination", name);
            }
        }
    }
    if path.as_os_str().is_empty() {
        bail!("Entry has an empty name");
    }
    Ok(path)
}
