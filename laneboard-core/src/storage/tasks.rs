/// Task table plus the id high-water mark.
///
/// Ids are decimal strings. The next id is one past the larger of the highest
/// id in the table and the persisted high-water mark, so deleting the newest
/// task never frees its id for reuse.
use std::fs;
use std::path::{Path, PathBuf};

use super::table::{Change, FlatTable, Row};
use super::{atomic_write, StorageError};
use crate::codec::{decode_field, encode_field};
use crate::types::{Task, TaskInput};

pub const TASKS_FILE: &str = "tasks.csv";
pub const TASK_SEQ_FILE: &str = "tasks.seq";

const HEADERS: &[&str] = &[
    "id",
    "title_b64",
    "notes_b64",
    "swimlane_b64",
    "column_b64",
    "due",
];

const ID: usize = 0;
const TITLE: usize = 1;
const NOTES: usize = 2;
const SWIMLANE: usize = 3;
const COLUMN: usize = 4;
const DUE: usize = 5;

fn decode_row(row: &Row) -> Task {
    Task {
        id: row[ID].clone(),
        title: decode_field(&row[TITLE]),
        notes: decode_field(&row[NOTES]),
        swimlane: decode_field(&row[SWIMLANE]),
        column: decode_field(&row[COLUMN]),
        due: row[DUE].clone(),
    }
}

fn numeric_id(id: &str) -> u64 {
    id.trim().parse().unwrap_or(0)
}

pub struct TaskStore {
    table: FlatTable,
    seq_path: PathBuf,
}

impl TaskStore {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            table: FlatTable::open(data_dir.join(TASKS_FILE), HEADERS)?,
            seq_path: data_dir.join(TASK_SEQ_FILE),
        })
    }

    pub fn list(&self) -> Result<Vec<Task>, StorageError> {
        Ok(self.table.load()?.iter().map(decode_row).collect())
    }

    pub fn get(&self, id: &str) -> Result<Option<Task>, StorageError> {
        Ok(self
            .table
            .load()?
            .iter()
            .find(|row| row[ID] == id)
            .map(decode_row))
    }

    /// Append a task under a fresh id and return the id. Does not check that
    /// the swimlane/column pair exists.
    pub fn create(&self, input: &TaskInput) -> Result<String, StorageError> {
        self.table.modify(|rows| {
            let table_max = rows.iter().map(|r| numeric_id(&r[ID])).max().unwrap_or(0);
            let next = table_max.max(self.high_water_mark()?) + 1;
            let id = next.to_string();

            // Mark first: a crash after this point burns the id instead of reusing it.
            atomic_write(&self.seq_path, &format!("{}\n", next))?;

            rows.push(vec![
                id.clone(),
                encode_field(&input.title),
                encode_field(&input.notes),
                encode_field(&input.swimlane),
                encode_field(&input.column),
                input.due.clone(),
            ]);
            log::info!(
                target: "laneboard.storage.tasks",
                "Created task {} in ({:?}, {:?})",
                id,
                input.swimlane,
                input.column
            );
            Ok(Change::Write(id))
        })
    }

    /// Overwrite a task's fields. A blank title keeps the stored one.
    /// Returns false if no task has this id.
    pub fn update(&self, id: &str, input: &TaskInput) -> Result<bool, StorageError> {
        self.table.modify(|rows| {
            let Some(row) = rows.iter_mut().find(|r| r[ID] == id) else {
                return Ok(Change::Keep(false));
            };
            if !input.title.is_empty() {
                row[TITLE] = encode_field(&input.title);
            }
            row[NOTES] = encode_field(&input.notes);
            row[SWIMLANE] = encode_field(&input.swimlane);
            row[COLUMN] = encode_field(&input.column);
            row[DUE] = input.due.clone();
            log::info!(target: "laneboard.storage.tasks", "Updated task {}", id);
            Ok(Change::Write(true))
        })
    }

    /// Returns false if no task has this id.
    pub fn move_task(&self, id: &str, swimlane: &str, column: &str) -> Result<bool, StorageError> {
        self.table.modify(|rows| {
            let Some(row) = rows.iter_mut().find(|r| r[ID] == id) else {
                return Ok(Change::Keep(false));
            };
            row[SWIMLANE] = encode_field(swimlane);
            row[COLUMN] = encode_field(column);
            log::info!(
                target: "laneboard.storage.tasks",
                "Moved task {} to ({:?}, {:?})",
                id,
                swimlane,
                column
            );
            Ok(Change::Write(true))
        })
    }

    /// Remove a task. Returns whether a row was removed; absence is not an error.
    pub fn delete(&self, id: &str) -> Result<bool, StorageError> {
        self.table.modify(|rows| {
            let before = rows.len();
            rows.retain(|r| r[ID] != id);
            if rows.len() == before {
                log::debug!(target: "laneboard.storage.tasks", "Delete of unknown task {}", id);
                Ok(Change::Keep(false))
            } else {
                log::info!(target: "laneboard.storage.tasks", "Deleted task {}", id);
                Ok(Change::Write(true))
            }
        })
    }

    /// Point every task in swimlane `old` at `new`. Returns tasks rewritten.
    pub fn rename_swimlane_refs(&self, old: &str, new: &str) -> Result<usize, StorageError> {
        self.rewrite(|task| task.swimlane == old, |row| {
            row[SWIMLANE] = encode_field(new);
        })
    }

    /// Move every task in `swimlane` to (`target_swimlane`, `target_column`).
    pub fn relocate_from_swimlane(
        &self,
        swimlane: &str,
        target_swimlane: &str,
        target_column: &str,
    ) -> Result<usize, StorageError> {
        self.rewrite(|task| task.swimlane == swimlane, |row| {
            row[SWIMLANE] = encode_field(target_swimlane);
            row[COLUMN] = encode_field(target_column);
        })
    }

    pub fn rename_column_refs(
        &self,
        swimlane: &str,
        old: &str,
        new: &str,
    ) -> Result<usize, StorageError> {
        self.rewrite(
            |task| task.swimlane == swimlane && task.column == old,
            |row| row[COLUMN] = encode_field(new),
        )
    }

    pub fn relocate_from_column(
        &self,
        swimlane: &str,
        column: &str,
        target_column: &str,
    ) -> Result<usize, StorageError> {
        self.rewrite(
            |task| task.swimlane == swimlane && task.column == column,
            |row| row[COLUMN] = encode_field(target_column),
        )
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        Ok(self.table.load()?.len())
    }

    pub fn last_modified(&self) -> Option<String> {
        self.table.last_modified()
    }

    /// Highest id ever handed out, or 0 if no mark has been written yet.
    /// An unreadable or garbled mark is an error.
    fn high_water_mark(&self) -> Result<u64, StorageError> {
        let content = match fs::read_to_string(&self.seq_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };
        content
            .trim()
            .parse()
            .map_err(|e| StorageError::Corrupt {
                path: self.seq_path.clone(),
                reason: format!("id mark {:?}: {}", content.trim(), e),
            })
    }

    /// Bulk rewrite of rows whose decoded task matches. Skips the write when
    /// nothing matched.
    fn rewrite(
        &self,
        selects: impl Fn(&Task) -> bool,
        apply: impl Fn(&mut Row),
    ) -> Result<usize, StorageError> {
        let touched = self.table.modify(|rows| {
            let mut touched = 0;
            for row in rows.iter_mut() {
                if selects(&decode_row(row)) {
                    apply(row);
                    touched += 1;
                }
            }
            if touched == 0 {
                Ok(Change::Keep(0))
            } else {
                Ok(Change::Write(touched))
            }
        })?;
        if touched > 0 {
            log::info!(target: "laneboard.storage.tasks", "Cascaded change to {} tasks", touched);
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, TaskStore) {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn input(title: &str, swimlane: &str, column: &str) -> TaskInput {
        TaskInput {
            title: title.to_string(),
            swimlane: swimlane.to_string(),
            column: column.to_string(),
            ..TaskInput::default()
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let (_dir, store) = store();
        let first = store.create(&input("Fix login bug", "Incidents", "Detected")).unwrap();
        let second = store.create(&input("Rotate keys", "Incidents", "Detected")).unwrap();
        assert_eq!(first, "1");
        assert_eq!(second, "2");
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let (_dir, store) = store();
        let mut seen = Vec::new();
        for round in 0..6 {
            let id = store.create(&input(&format!("t{}", round), "S", "C")).unwrap();
            if round % 2 == 1 {
                // Deleting the newest task is the case max+1 alone gets wrong.
                assert!(store.delete(&id).unwrap());
            }
            seen.push(numeric_id(&id));
        }
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "{:?}", seen);
        assert_eq!(seen.last(), Some(&6));
    }

    #[test]
    fn test_ids_continue_past_hand_written_rows() {
        let (_dir, store) = store();
        fs::write(
            store.table.path(),
            "id,title_b64,notes_b64,swimlane_b64,column_b64,due\n41,,,,,\n",
        )
        .unwrap();
        assert_eq!(store.create(&input("next", "S", "C")).unwrap(), "42");
    }

    #[test]
    fn test_garbled_id_mark_fails_create() {
        let (dir, store) = store();
        store.create(&input("a", "S", "C")).unwrap();
        let newest = store.create(&input("b", "S", "C")).unwrap();
        assert!(store.delete(&newest).unwrap());

        fs::write(dir.path().join(TASK_SEQ_FILE), "two\n").unwrap();
        let err = store.create(&input("c", "S", "C")).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_unreadable_id_mark_fails_create() {
        let (dir, store) = store();
        let seq = dir.path().join(TASK_SEQ_FILE);
        fs::create_dir(&seq).unwrap();
        let err = store.create(&input("a", "S", "C")).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_get_and_roundtrip_of_hostile_text() {
        let (_dir, store) = store();
        let mut task = input("title, with \"quotes\"", "Lane,1", "Col\n2");
        task.notes = "line one\nline two, ünïcode ✓".to_string();
        task.due = "2026-01-31".to_string();
        let id = store.create(&task).unwrap();

        let loaded = store.get(&id).unwrap().unwrap();
        assert_eq!(loaded.title, task.title);
        assert_eq!(loaded.notes, task.notes);
        assert_eq!(loaded.swimlane, task.swimlane);
        assert_eq!(loaded.column, task.column);
        assert_eq!(loaded.due, task.due);
        assert!(store.get("999").unwrap().is_none());
    }

    #[test]
    fn test_update_keeps_title_when_blank() {
        let (_dir, store) = store();
        let id = store.create(&input("Original", "S", "C")).unwrap();

        let mut change = input("", "S", "D");
        change.notes = "new notes".to_string();
        assert!(store.update(&id, &change).unwrap());

        let task = store.get(&id).unwrap().unwrap();
        assert_eq!(task.title, "Original");
        assert_eq!(task.column, "D");
        assert_eq!(task.notes, "new notes");
        assert!(!store.update("404", &change).unwrap());
    }

    #[test]
    fn test_move_only_touches_location() {
        let (_dir, store) = store();
        let mut task = input("Keep me", "S", "C");
        task.due = "friday".to_string();
        let id = store.create(&task).unwrap();

        assert!(store.move_task(&id, "T", "X").unwrap());
        let moved = store.get(&id).unwrap().unwrap();
        assert_eq!((moved.swimlane.as_str(), moved.column.as_str()), ("T", "X"));
        assert_eq!(moved.title, "Keep me");
        assert_eq!(moved.due, "friday");
        assert!(!store.move_task("nope", "T", "X").unwrap());
    }

    #[test]
    fn test_delete_missing_is_noop() {
        let (_dir, store) = store();
        store.create(&input("a", "S", "C")).unwrap();
        let before = fs::read_to_string(store.table.path()).unwrap();
        assert!(!store.delete("77").unwrap());
        assert_eq!(fs::read_to_string(store.table.path()).unwrap(), before);
    }

    #[test]
    fn test_cascade_rewrites() {
        let (_dir, store) = store();
        let t1 = store.create(&input("t1", "A", "col1")).unwrap();
        let t2 = store.create(&input("t2", "A", "col2")).unwrap();
        let t3 = store.create(&input("t3", "C", "col1")).unwrap();

        assert_eq!(store.rename_swimlane_refs("A", "B").unwrap(), 2);
        assert_eq!(store.get(&t1).unwrap().unwrap().swimlane, "B");
        assert_eq!(store.get(&t3).unwrap().unwrap().swimlane, "C");

        assert_eq!(store.rename_column_refs("B", "col1", "first").unwrap(), 1);
        assert_eq!(store.get(&t1).unwrap().unwrap().column, "first");
        assert_eq!(store.get(&t3).unwrap().unwrap().column, "col1");

        assert_eq!(store.relocate_from_column("B", "col2", "first").unwrap(), 1);
        assert_eq!(store.get(&t2).unwrap().unwrap().column, "first");

        assert_eq!(store.relocate_from_swimlane("B", "C", "col1").unwrap(), 2);
        let tasks = store.list().unwrap();
        assert!(tasks.iter().all(|t| t.swimlane == "C" && t.column == "col1"));

        assert_eq!(store.rename_swimlane_refs("missing", "x").unwrap(), 0);
    }
}
