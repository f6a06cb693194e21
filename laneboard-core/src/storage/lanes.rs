/// Lane table: one row per (swimlane, column) pair.
///
/// The swimlane -> columns view is rebuilt from the rows on every read and
/// never cached, so a read after a write always sees the write.
use std::path::Path;

use super::table::{Change, FlatTable, Row};
use super::StorageError;
use crate::codec::{decode_field, encode_field};
use crate::types::{parse_order, BoardMeta, LaneRow, Lanes};

pub const LANES_FILE: &str = "lanes.csv";

const HEADERS: &[&str] = &[
    "swimlane_b64",
    "column_b64",
    "swimlane_color",
    "column_color",
    "swimlane_order",
];

/// Board layout written on first read of an empty table.
const DEFAULT_LANES: &[(&str, &[&str])] = &[
    (
        "Incidents",
        &["Detected", "Investigating", "Fixing", "Verifying", "Postmortem"],
    ),
    (
        "Ops backlog",
        &["Triaged", "Planned", "In progress", "Review", "Done"],
    ),
];

fn decode_row(row: &Row) -> LaneRow {
    LaneRow {
        swimlane: decode_field(&row[0]),
        column: decode_field(&row[1]),
        swimlane_color: row[2].clone(),
        column_color: row[3].clone(),
        swimlane_order: parse_order(&row[4]).unwrap_or(0),
    }
}

fn encode_row(lane: &LaneRow) -> Row {
    vec![
        encode_field(&lane.swimlane),
        encode_field(&lane.column),
        lane.swimlane_color.clone(),
        lane.column_color.clone(),
        lane.swimlane_order.to_string(),
    ]
}

fn new_row(swimlane: &str, column: &str, order: i64) -> LaneRow {
    LaneRow {
        swimlane: swimlane.to_string(),
        column: column.to_string(),
        swimlane_color: String::new(),
        column_color: String::new(),
        swimlane_order: order,
    }
}

fn default_rows() -> Vec<LaneRow> {
    DEFAULT_LANES
        .iter()
        .flat_map(|(swimlane, columns)| columns.iter().map(move |c| new_row(swimlane, c, 0)))
        .collect()
}

pub struct LaneStore {
    table: FlatTable,
}

impl LaneStore {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            table: FlatTable::open(data_dir.join(LANES_FILE), HEADERS)?,
        })
    }

    /// Rows in stored order, fields decoded.
    pub fn list_raw(&self) -> Result<Vec<LaneRow>, StorageError> {
        Ok(self.table.load()?.iter().map(decode_row).collect())
    }

    /// Swimlane view sorted by order. Seeds and persists the default board
    /// when the table has no rows at all.
    pub fn list_structured(&self) -> Result<Lanes, StorageError> {
        let mut rows = self.list_raw()?;
        if rows.is_empty() {
            rows = self.table.modify(|stored| {
                if !stored.is_empty() {
                    // Someone else seeded between our read and the lock.
                    return Ok(Change::Keep(stored.iter().map(decode_row).collect()));
                }
                let seed = default_rows();
                *stored = seed.iter().map(encode_row).collect();
                log::info!(
                    target: "laneboard.storage.lanes",
                    "Seeded empty lane table with {} default rows",
                    seed.len()
                );
                Ok(Change::Write(seed))
            })?;
        }
        Ok(Lanes::from_rows(&rows))
    }

    pub fn swimlane_exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.list_structured()?.swimlane_exists(name))
    }

    pub fn column_exists(&self, swimlane: &str, column: &str) -> Result<bool, StorageError> {
        Ok(self.list_structured()?.column_exists(swimlane, column))
    }

    pub fn first_swimlane(&self) -> Result<Option<String>, StorageError> {
        Ok(self.list_structured()?.first_swimlane().map(str::to_string))
    }

    pub fn first_column(&self, swimlane: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .list_structured()?
            .first_column(swimlane)
            .map(str::to_string))
    }

    /// Append a swimlane with its first column, ordered after every existing
    /// swimlane. Returns false if the name is taken.
    pub fn add_swimlane(&self, name: &str, first_column: &str) -> Result<bool, StorageError> {
        // Make sure an empty table is seeded before we append to it.
        self.list_structured()?;
        self.table.modify(|rows| {
            let lanes = Lanes::from_rows(&rows.iter().map(decode_row).collect::<Vec<_>>());
            if lanes.swimlane_exists(name) {
                return Ok(Change::Keep(false));
            }
            let order = lanes.max_order() + 1;
            rows.push(encode_row(&new_row(name, first_column, order)));
            log::info!(
                target: "laneboard.storage.lanes",
                "Added swimlane {:?} (first column {:?}, order {})",
                name,
                first_column,
                order
            );
            Ok(Change::Write(true))
        })
    }

    /// Rewrite the swimlane name on every matching row. Returns rows touched.
    pub fn rename_swimlane(&self, old: &str, new: &str) -> Result<usize, StorageError> {
        self.rewrite(|lane| {
            if lane.swimlane == old {
                lane.swimlane = new.to_string();
                true
            } else {
                false
            }
        })
    }

    /// Remove every row of a swimlane. Returns rows removed.
    pub fn delete_swimlane(&self, name: &str) -> Result<usize, StorageError> {
        self.remove_where(|lane| lane.swimlane == name)
    }

    /// Append a column to an existing swimlane, inheriting its order.
    /// Returns false if the swimlane is unknown or already has the column.
    pub fn add_column(&self, swimlane: &str, column: &str) -> Result<bool, StorageError> {
        self.list_structured()?;
        self.table.modify(|rows| {
            let lanes = Lanes::from_rows(&rows.iter().map(decode_row).collect::<Vec<_>>());
            let Some(lane) = lanes.get(swimlane) else {
                return Ok(Change::Keep(false));
            };
            if lane.has_column(column) {
                return Ok(Change::Keep(false));
            }
            rows.push(encode_row(&new_row(swimlane, column, lane.order)));
            log::info!(
                target: "laneboard.storage.lanes",
                "Added column {:?} to swimlane {:?}",
                column,
                swimlane
            );
            Ok(Change::Write(true))
        })
    }

    pub fn rename_column(
        &self,
        swimlane: &str,
        old: &str,
        new: &str,
    ) -> Result<usize, StorageError> {
        self.rewrite(|lane| {
            if lane.swimlane == swimlane && lane.column == old {
                lane.column = new.to_string();
                true
            } else {
                false
            }
        })
    }

    pub fn delete_column(&self, swimlane: &str, column: &str) -> Result<usize, StorageError> {
        self.remove_where(|lane| lane.swimlane == swimlane && lane.column == column)
    }

    /// Apply colors and orders from `meta`. Rows of swimlanes not named in
    /// the mapping are left as they are.
    pub fn update_meta(&self, meta: &BoardMeta) -> Result<usize, StorageError> {
        // The defaults must exist before they can be recolored.
        self.list_structured()?;
        self.rewrite(|lane| {
            let Some(update) = meta.swimlanes.get(&lane.swimlane) else {
                return false;
            };
            if let Some(color) = &update.color {
                lane.swimlane_color = color.clone();
            }
            if let Some(order) = update.order {
                lane.swimlane_order = order;
            }
            if let Some(color) = update.columns.get(&lane.column) {
                lane.column_color = color.clone();
            }
            true
        })
    }

    pub fn last_modified(&self) -> Option<String> {
        self.table.last_modified()
    }

    /// Edit rows in place. Persists only if `edit` reported a change.
    fn rewrite(&self, mut edit: impl FnMut(&mut LaneRow) -> bool) -> Result<usize, StorageError> {
        let touched = self.table.modify(|rows| {
            let mut touched = 0;
            for row in rows.iter_mut() {
                let mut lane = decode_row(row);
                if edit(&mut lane) {
                    *row = encode_row(&lane);
                    touched += 1;
                }
            }
            if touched == 0 {
                Ok(Change::Keep(0))
            } else {
                Ok(Change::Write(touched))
            }
        })?;
        log::debug!(target: "laneboard.storage.lanes", "Rewrote {} lane rows", touched);
        Ok(touched)
    }

    fn remove_where(&self, predicate: impl Fn(&LaneRow) -> bool) -> Result<usize, StorageError> {
        let removed = self.table.modify(|rows| {
            let before = rows.len();
            rows.retain(|row| !predicate(&decode_row(row)));
            let removed = before - rows.len();
            if removed == 0 {
                Ok(Change::Keep(0))
            } else {
                Ok(Change::Write(removed))
            }
        })?;
        log::info!(target: "laneboard.storage.lanes", "Removed {} lane rows", removed);
        Ok(removed)
    }
}
