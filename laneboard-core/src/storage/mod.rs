pub mod lanes;
pub mod table;
pub mod tasks;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use lanes::LaneStore;
pub use table::{Change, FlatTable};
pub use tasks::TaskStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt table {path:?}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
/// Refuses to write empty content over a non-empty file.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    if content.trim().is_empty() {
        if let Ok(existing) = fs::read_to_string(path) {
            if !existing.trim().is_empty() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "Refusing to overwrite non-empty file with empty content",
                ));
            }
        }
    }

    let tmp_path = tmp_path_for(path);
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;

    // fsync directory for rename durability
    if let Some(dir) = path.parent() {
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
    Ok(())
}

/// Sibling temp path used by `atomic_write` (`tasks.csv` -> `tasks.csv.tmp`).
pub(crate) fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
