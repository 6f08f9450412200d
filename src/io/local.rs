use super::ReadAt;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Archive on the local filesystem, read with positioned reads.
///
/// The file handle is shared between concurrent reads: every read names its
/// own offset, so there is no cursor to race on.
pub struct LocalFileReader {
    file: std::fs::File,
    size: u64,
}

impl LocalFileReader {
    /// Open `path` for reading and record its current length.
    ///
    /// # Arguments
    ///
    /// * `path` - Archive to open
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its metadata read.
    /// The error names the path.
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        let size = file
            .metadata()
            .with_context(|| format!("cannot stat {}", path.display()))?
            .len();
        Ok(Self { file, size })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    /// `pread(2)` on Unix, `ReadFile` with an offset on Windows. Neither
    /// moves a shared cursor.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            Ok(self.file.read_at(buf, offset)?)
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            Ok(self.file.seek_read(buf, offset)?)
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = (offset, buf);
            anyhow::bail!("positioned reads are not supported on this platform")
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}
