//! Collect archive entries from the local filesystem.

use anyhow::{Context, Result};
use std::path::{Component, Path};
use tokio::fs;

use crate::zip::FileEntry;

/// Read files and (recursively) directories into entries.
///
/// A file argument is stored under its own name; a directory's files are
/// stored under the directory name. Entries are sorted by path so the same
/// tree always yields the same archive.
pub async fn collect_entries(paths: &[impl AsRef<Path>]) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();

    for root in paths {
        let root = root.as_ref();
        let metadata = fs::metadata(root)
            .await
            .with_context(|| format!("cannot stat {}", root.display()))?;

        if metadata.is_dir() {
            let mut pending = vec![root.to_path_buf()];
            while let Some(dir) = pending.pop() {
                let mut read_dir = fs::read_dir(&dir)
                    .await
                    .with_context(|| format!("cannot read directory {}", dir.display()))?;
                while let Some(child) = read_dir.next_entry().await? {
                    let path = child.path();
                    if child.file_type().await?.is_dir() {
                        pending.push(path);
                    } else {
                        entries.push(read_entry(&path).await?);
                    }
                }
            }
        } else {
            entries.push(read_entry(root).await?);
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

async fn read_entry(path: &Path) -> Result<FileEntry> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {} as UTF-8 text", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "adding file");
    Ok(FileEntry::new(archive_path(path), content))
}

/// Archive name for a filesystem path: `/`-separated, without root, prefix,
/// `.` or `..` components.
pub fn archive_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
