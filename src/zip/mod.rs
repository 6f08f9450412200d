//! ZIP archive writing and reading.
//!
//! ## Architecture
//!
//! - [`structures`]: the wire records (local header, central header, EOCD)
//!   and the DOS timestamp encoding shared by both directions
//! - [`entry`]: encodes one [`FileEntry`] into a local header plus data
//! - [`writer`]: lays encoded entries out into a finished archive
//! - [`parser`] / [`extractor`]: read archives back, list and verify them
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and file data for each entry
//! 2. Central Directory with metadata for all entries
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - Writing: STORED (no compression) entries with UTF-8 names and content
//! - Reading: STORED and DEFLATE entries, CRC-32 verification
//!
//! ## Limitations
//!
//! - No ZIP64: archives over 4 GiB or with more than 65,535 entries are
//!   written with wrapped fields, and rejected when read
//! - No encryption support
//! - No multi-disk archive support

mod entry;
mod extractor;
mod parser;
mod structures;
mod writer;

pub use entry::{FileEntry, ZipEntry, create_zip_entry};
pub use extractor::{ZipExtractor, sanitize_entry_path};
pub use parser::ZipParser;
pub use structures::*;
pub use writer::{ArchiveBuilder, assemble, create_zip_file, local_header_offsets};
