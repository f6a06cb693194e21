/// A flat table on disk: one header record naming the columns, then one
/// record per row.
///
/// Rows are handed out as `Vec<String>` in the table's own header order,
/// whatever order the file's header uses. Every mutation goes through
/// `modify`: load the full table, let the caller edit it, then atomically
/// replace the file. A per-table mutex serializes those cycles in-process.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};

use super::{atomic_write, StorageError};
use crate::codec;

pub type Row = Vec<String>;

/// What a `modify` closure decided to do with the rows it edited.
pub enum Change<T> {
    /// Persist the edited rows, then return the value.
    Write(T),
    /// Discard any edits and return the value without touching the file.
    Keep(T),
}

pub struct FlatTable {
    path: PathBuf,
    headers: &'static [&'static str],
    write_lock: Mutex<()>,
}

impl FlatTable {
    /// Open a table, creating the parent directory and a header-only file if
    /// either is missing.
    pub fn open(path: PathBuf, headers: &'static [&'static str]) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let table = Self {
            path,
            headers,
            write_lock: Mutex::new(()),
        };
        if !table.path.exists() {
            atomic_write(&table.path, &table.render(&[]))?;
            log::info!("[laneboard.storage] Created table {:?}", table.path);
        }
        Ok(table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all rows. A missing file reads as an empty table.
    pub fn load(&self) -> Result<Vec<Row>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = codec::parse_records(&content).into_iter();
        let Some(file_headers) = records.next() else {
            return Ok(Vec::new());
        };

        // file column index -> our column index
        let mapping: Vec<Option<usize>> = file_headers
            .iter()
            .map(|h| self.headers.iter().position(|ours| *ours == h.trim()))
            .collect();
        if mapping.iter().all(Option::is_none) {
            return Err(StorageError::Corrupt {
                path: self.path.clone(),
                reason: format!("header {:?} names none of {:?}", file_headers, self.headers),
            });
        }

        let rows = records
            .filter_map(|record| {
                let mut row = vec![String::new(); self.headers.len()];
                for (value, target) in record.into_iter().zip(&mapping) {
                    if let Some(idx) = target {
                        row[*idx] = value;
                    }
                }
                if row.iter().all(String::is_empty) {
                    None
                } else {
                    Some(row)
                }
            })
            .collect();
        Ok(rows)
    }

    /// Replace the whole table with `rows`.
    pub fn save(&self, rows: &[Row]) -> Result<(), StorageError> {
        atomic_write(&self.path, &self.render(rows))?;
        Ok(())
    }

    /// Load, edit, and (if the closure asks for it) atomically replace.
    pub fn modify<T>(
        &self,
        edit: impl FnOnce(&mut Vec<Row>) -> Result<Change<T>, StorageError>,
    ) -> Result<T, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut rows = self.load()?;
        match edit(&mut rows)? {
            Change::Write(value) => {
                self.save(&rows)?;
                Ok(value)
            }
            Change::Keep(value) => Ok(value),
        }
    }

    /// File modification time as `YYYY-MM-DD HH:MM` local time.
    pub fn last_modified(&self) -> Option<String> {
        let modified = fs::metadata(&self.path).ok()?.modified().ok()?;
        let local: DateTime<Local> = modified.into();
        Some(local.format("%Y-%m-%d %H:%M").to_string())
    }

    fn render(&self, rows: &[Row]) -> String {
        let mut out = String::new();
        codec::write_record(&mut out, self.headers);
        for row in rows {
            codec::write_record(&mut out, row.as_slice());
        }
        out
    }
}
