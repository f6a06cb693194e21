/// Board service: the only layer with business rules.
///
/// Every operation validates against the lane table before it touches
/// either store. Renames and deletions cascade into the task table as a
/// second, separate write:
/// - rename: lane rows first, then task references
/// - delete: tasks relocated to the fallback first, then lane rows removed
///
/// The two files are not updated transactionally. If the second write fails
/// the error is returned and the tables stay out of step until the caller
/// retries.
use std::path::Path;

use crate::storage::{LaneStore, StorageError, TaskStore};
use crate::types::{BoardMeta, BoardStats, GroupedBoard, LaneRow, Lanes, Task, TaskInput, TaskMove};

/// Machine-checkable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "bad_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl BoardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::Validation(_) => ErrorKind::BadInput,
            BoardError::NotFound(_) => ErrorKind::NotFound,
            BoardError::Conflict(_) => ErrorKind::Conflict,
            BoardError::Storage(_) => ErrorKind::Internal,
        }
    }
}

fn validation(message: &str) -> BoardError {
    BoardError::Validation(message.to_string())
}

fn not_found(message: &str) -> BoardError {
    BoardError::NotFound(message.to_string())
}

fn conflict(message: &str) -> BoardError {
    BoardError::Conflict(message.to_string())
}

fn trimmed(input: &TaskInput) -> TaskInput {
    TaskInput {
        title: input.title.trim().to_string(),
        notes: input.notes.clone(),
        swimlane: input.swimlane.trim().to_string(),
        column: input.column.trim().to_string(),
        due: input.due.trim().to_string(),
    }
}

pub struct BoardService {
    lanes: LaneStore,
    tasks: TaskStore,
}

impl BoardService {
    /// Open (or create) both tables under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, BoardError> {
        Ok(Self {
            lanes: LaneStore::open(data_dir)?,
            tasks: TaskStore::open(data_dir)?,
        })
    }

    pub fn lanes(&self) -> &LaneStore {
        &self.lanes
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn structured_lanes(&self) -> Result<Lanes, BoardError> {
        Ok(self.lanes.list_structured()?)
    }

    pub fn raw_lanes(&self) -> Result<Vec<LaneRow>, BoardError> {
        Ok(self.lanes.list_raw()?)
    }

    pub fn list_tasks(&self) -> Result<Vec<Task>, BoardError> {
        Ok(self.tasks.list()?)
    }

    pub fn get_task(&self, id: &str) -> Result<Task, BoardError> {
        self.tasks
            .get(id.trim())?
            .ok_or_else(|| not_found("Task not found"))
    }

    pub fn stats(&self) -> Result<BoardStats, BoardError> {
        Ok(BoardStats {
            count: self.tasks.count()?,
            tasks_last_modified: self.tasks.last_modified(),
            lanes_last_modified: self.lanes.last_modified(),
        })
    }

    /// Every (swimlane, column) cell with its tasks.
    ///
    /// Tasks pointing at a swimlane that no longer exists are shown under the
    /// first swimlane, and unknown columns under that swimlane's first column.
    /// A task that still has no cell (empty board) is left out.
    pub fn grouped(&self) -> Result<(GroupedBoard, Lanes), BoardError> {
        let lanes = self.lanes.list_structured()?;
        let tasks = self.tasks.list()?;
        let mut grouped = GroupedBoard::empty(&lanes);

        for task in tasks {
            let swimlane = if lanes.swimlane_exists(&task.swimlane) {
                Some(task.swimlane.clone())
            } else {
                lanes.first_swimlane().map(str::to_string)
            };
            let Some(swimlane) = swimlane else {
                log::warn!(
                    target: "laneboard.board",
                    "Dropping task {} from view: board has no swimlanes",
                    task.id
                );
                continue;
            };
            let column = if lanes.column_exists(&swimlane, &task.column) {
                Some(task.column.clone())
            } else {
                lanes.first_column(&swimlane).map(str::to_string)
            };
            let Some(column) = column else {
                log::warn!(
                    target: "laneboard.board",
                    "Dropping task {} from view: swimlane {:?} has no columns",
                    task.id,
                    swimlane
                );
                continue;
            };

            let id = task.id.clone();
            if !grouped.place(&swimlane, &column, task) {
                log::warn!(
                    target: "laneboard.board",
                    "Dropping task {} from view: no cell ({:?}, {:?})",
                    id,
                    swimlane,
                    column
                );
            }
        }

        Ok((grouped, lanes))
    }

    // ── Tasks ──────────────────────────────────────────────────────────

    pub fn create_task(&self, input: &TaskInput) -> Result<Task, BoardError> {
        let input = trimmed(input);
        if input.title.is_empty() {
            return Err(validation("Title is required"));
        }
        let lanes = self.lanes.list_structured()?;
        if !lanes.swimlane_exists(&input.swimlane) {
            return Err(validation("Invalid swimlane"));
        }
        if !lanes.column_exists(&input.swimlane, &input.column) {
            return Err(validation("Invalid column"));
        }

        let id = self.tasks.create(&input)?;
        self.get_task(&id)
    }

    /// Update a task. Omitted swimlane/column keep their stored values, but
    /// whenever either is supplied the resulting pair must exist.
    pub fn update_task(&self, id: &str, input: &TaskInput) -> Result<Task, BoardError> {
        let existing = self.get_task(id)?;
        let mut input = trimmed(input);

        let location_supplied = !input.swimlane.is_empty() || !input.column.is_empty();
        if input.swimlane.is_empty() {
            input.swimlane = existing.swimlane.clone();
        }
        if input.column.is_empty() {
            input.column = existing.column.clone();
        }

        if location_supplied {
            let lanes = self.lanes.list_structured()?;
            if !lanes.swimlane_exists(&input.swimlane) {
                return Err(validation("Invalid swimlane"));
            }
            if !lanes.column_exists(&input.swimlane, &input.column) {
                return Err(validation("Invalid column"));
            }
        }

        if !self.tasks.update(&existing.id, &input)? {
            // Deleted between our read and the write.
            return Err(not_found("Task not found"));
        }
        self.get_task(&existing.id)
    }

    pub fn move_task(&self, id: &str, target: &TaskMove) -> Result<(), BoardError> {
        let swimlane = target.swimlane.trim();
        let column = target.column.trim();
        let lanes = self.lanes.list_structured()?;
        if !lanes.swimlane_exists(swimlane) {
            return Err(validation("Invalid swimlane"));
        }
        if !lanes.column_exists(swimlane, column) {
            return Err(validation("Invalid column"));
        }

        if self.tasks.move_task(id.trim(), swimlane, column)? {
            Ok(())
        } else {
            Err(not_found("Task not found"))
        }
    }

    /// Idempotent: deleting an unknown id succeeds.
    // TODO: other task operations report unknown ids as NotFound; decide
    // with the UI whether delete should too before changing it.
    pub fn delete_task(&self, id: &str) -> Result<(), BoardError> {
        self.tasks.delete(id.trim())?;
        Ok(())
    }

    // ── Swimlanes ──────────────────────────────────────────────────────

    pub fn add_swimlane(&self, name: &str, first_column: &str) -> Result<(), BoardError> {
        let (name, first_column) = (name.trim(), first_column.trim());
        if name.is_empty() || first_column.is_empty() {
            return Err(validation("Swimlane and first column are required"));
        }
        if self.lanes.swimlane_exists(name)? {
            return Err(conflict("Swimlane already exists"));
        }
        if !self.lanes.add_swimlane(name, first_column)? {
            return Err(conflict("Swimlane already exists"));
        }
        Ok(())
    }

    pub fn rename_swimlane(&self, old: &str, new: &str) -> Result<(), BoardError> {
        let (old, new) = (old.trim(), new.trim());
        if old.is_empty() || new.is_empty() {
            return Err(validation("Old and new swimlane names are required"));
        }
        let lanes = self.lanes.list_structured()?;
        if !lanes.swimlane_exists(old) {
            return Err(not_found("Swimlane not found"));
        }
        if lanes.swimlane_exists(new) {
            return Err(conflict("New swimlane name already exists"));
        }

        self.lanes.rename_swimlane(old, new)?;
        let moved = self.tasks.rename_swimlane_refs(old, new)?;
        log::info!(
            target: "laneboard.board",
            "Renamed swimlane {:?} -> {:?} ({} tasks)",
            old,
            new,
            moved
        );
        Ok(())
    }

    /// Delete a swimlane, relocating its tasks to the fallback's first column.
    pub fn delete_swimlane(&self, name: &str, fallback: &str) -> Result<(), BoardError> {
        let (name, fallback) = (name.trim(), fallback.trim());
        let lanes = self.lanes.list_structured()?;
        if !lanes.swimlane_exists(name) {
            return Err(not_found("Swimlane not found"));
        }
        if name == fallback {
            return Err(conflict("Fallback cannot be the same as swimlane to delete"));
        }
        let Some(fallback_column) = lanes.first_column(fallback) else {
            return Err(not_found("Fallback swimlane not found"));
        };

        let moved = self.tasks.relocate_from_swimlane(name, fallback, fallback_column)?;
        self.lanes.delete_swimlane(name)?;
        log::info!(
            target: "laneboard.board",
            "Deleted swimlane {:?}, {} tasks moved to ({:?}, {:?})",
            name,
            moved,
            fallback,
            fallback_column
        );
        Ok(())
    }

    // ── Columns ────────────────────────────────────────────────────────

    pub fn add_column(&self, swimlane: &str, column: &str) -> Result<(), BoardError> {
        let (swimlane, column) = (swimlane.trim(), column.trim());
        if swimlane.is_empty() || column.is_empty() {
            return Err(validation("Swimlane and column are required"));
        }
        let lanes = self.lanes.list_structured()?;
        if !lanes.swimlane_exists(swimlane) {
            return Err(not_found("Swimlane not found"));
        }
        if lanes.column_exists(swimlane, column) {
            return Err(conflict("Column already exists in this swimlane"));
        }
        if !self.lanes.add_column(swimlane, column)? {
            return Err(conflict("Column already exists in this swimlane"));
        }
        Ok(())
    }

    pub fn rename_column(&self, swimlane: &str, old: &str, new: &str) -> Result<(), BoardError> {
        let (swimlane, old, new) = (swimlane.trim(), old.trim(), new.trim());
        if swimlane.is_empty() || old.is_empty() || new.is_empty() {
            return Err(validation("Swimlane, old column, and new column are required"));
        }
        let lanes = self.lanes.list_structured()?;
        if !lanes.swimlane_exists(swimlane) {
            return Err(not_found("Swimlane not found"));
        }
        if !lanes.column_exists(swimlane, old) {
            return Err(not_found("Column not found"));
        }
        if lanes.column_exists(swimlane, new) {
            return Err(conflict("New column name already exists in this swimlane"));
        }

        self.lanes.rename_column(swimlane, old, new)?;
        let moved = self.tasks.rename_column_refs(swimlane, old, new)?;
        log::info!(
            target: "laneboard.board",
            "Renamed column {:?} -> {:?} in {:?} ({} tasks)",
            old,
            new,
            swimlane,
            moved
        );
        Ok(())
    }

    /// Delete a column, relocating its tasks to `fallback` in the same swimlane.
    pub fn delete_column(
        &self,
        swimlane: &str,
        column: &str,
        fallback: &str,
    ) -> Result<(), BoardError> {
        let (swimlane, column, fallback) = (swimlane.trim(), column.trim(), fallback.trim());
        let lanes = self.lanes.list_structured()?;
        if !lanes.column_exists(swimlane, column) {
            return Err(not_found("Column not found"));
        }
        if column == fallback {
            return Err(conflict("Fallback cannot be the same as column to delete"));
        }
        if !lanes.column_exists(swimlane, fallback) {
            return Err(not_found("Fallback column not found"));
        }

        let moved = self.tasks.relocate_from_column(swimlane, column, fallback)?;
        self.lanes.delete_column(swimlane, column)?;
        log::info!(
            target: "laneboard.board",
            "Deleted column {:?} in {:?}, {} tasks moved to {:?}",
            column,
            swimlane,
            moved,
            fallback
        );
        Ok(())
    }

    pub fn update_meta(&self, meta: &BoardMeta) -> Result<(), BoardError> {
        if meta.swimlanes.is_empty() {
            return Err(validation("Invalid meta data"));
        }
        let touched = self.lanes.update_meta(meta)?;
        log::info!(target: "laneboard.board", "Updated board metadata ({} lane rows)", touched);
        Ok(())
    }
}
