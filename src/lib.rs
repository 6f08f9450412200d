//! # stowzip
//!
//! Builds ZIP archives in memory from `(path, text)` pairs, without a
//! compression library: every entry is STORED, and the archive is a single
//! byte buffer ready to be written to disk or returned from an HTTP handler.
//!
//! ## Features
//!
//! - CRC-32 with a once-initialized shared lookup table
//! - Stored-method entries with DOS timestamps and UTF-8 names
//! - Archive assembly with offsets computed up front (no header patching)
//! - A reader to list, verify and extract archives (STORED and DEFLATE)
//! - Toolkit bundles: a JSON manifest of components flattened into an archive,
//!   on the command line or behind `GET /download-zip`
//!
//! ## Example
//!
//! ```no_run
//! use stowzip::{FileEntry, create_zip_file};
//!
//! fn main() -> anyhow::Result<()> {
//!     let zip = create_zip_file(&[
//!         FileEntry::new("README.md", "hello"),
//!         FileEntry::new("skills/foo/SKILL.md", "x"),
//!     ])?;
//!     std::fs::write("out.zip", zip)?;
//!     Ok(())
//! }
//! ```

pub mod bundle;
pub mod cli;
pub mod crc32;
pub mod error;
pub mod io;
pub mod server;
pub mod source;
pub mod zip;

pub use cli::Cli;
pub use crc32::{Crc32Table, calculate_crc32};
pub use error::ZipError;
pub use io::{LocalFileReader, ReadAt, SliceReader};
pub use zip::{ArchiveBuilder, FileEntry, ZipExtractor, ZipFileEntry, create_zip_file};
