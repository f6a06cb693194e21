use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

/// One stored (swimlane, column) pair with its display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneRow {
    pub swimlane: String,
    pub column: String,
    pub swimlane_color: String,
    pub column_color: String,
    pub swimlane_order: i64,
}

/// A swimlane reconstructed from every lane row sharing its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swimlane {
    pub name: String,
    /// Distinct column names in first-seen order.
    pub columns: Vec<String>,
    pub color: String,
    pub order: i64,
    pub column_colors: BTreeMap<String, String>,
}

impl Swimlane {
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Derived swimlane -> columns view, sorted by `order` (stable).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lanes {
    swimlanes: Vec<Swimlane>,
}

impl Lanes {
    /// Build the view from raw rows. Rows with an empty swimlane or column
    /// name are ignored.
    pub fn from_rows(rows: &[LaneRow]) -> Self {
        let mut swimlanes: Vec<Swimlane> = Vec::new();

        for row in rows {
            if row.swimlane.is_empty() || row.column.is_empty() {
                continue;
            }
            let lane = match swimlanes.iter().position(|l| l.name == row.swimlane) {
                Some(pos) => &mut swimlanes[pos],
                None => {
                    swimlanes.push(Swimlane {
                        name: row.swimlane.clone(),
                        columns: Vec::new(),
                        color: String::new(),
                        order: row.swimlane_order,
                        column_colors: BTreeMap::new(),
                    });
                    let last = swimlanes.len() - 1;
                    &mut swimlanes[last]
                }
            };

            if !lane.has_column(&row.column) {
                lane.columns.push(row.column.clone());
            }
            if lane.color.is_empty() {
                lane.color = row.swimlane_color.clone();
            }
            if !row.column_color.is_empty() {
                lane.column_colors
                    .entry(row.column.clone())
                    .or_insert_with(|| row.column_color.clone());
            }
        }

        // sort_by_key is stable: equal orders keep first-seen order.
        swimlanes.sort_by_key(|l| l.order);
        Self { swimlanes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Swimlane> {
        self.swimlanes.iter()
    }

    pub fn len(&self) -> usize {
        self.swimlanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.swimlanes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Swimlane> {
        self.swimlanes.iter().find(|l| l.name == name)
    }

    pub fn swimlane_exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn column_exists(&self, swimlane: &str, column: &str) -> bool {
        self.get(swimlane).is_some_and(|l| l.has_column(column))
    }

    pub fn first_swimlane(&self) -> Option<&str> {
        self.swimlanes.first().map(|l| l.name.as_str())
    }

    pub fn first_column(&self, swimlane: &str) -> Option<&str> {
        self.get(swimlane)
            .and_then(|l| l.columns.first())
            .map(String::as_str)
    }

    /// Highest swimlane order, or 0 for an empty board.
    pub fn max_order(&self) -> i64 {
        self.swimlanes.iter().map(|l| l.order).fold(0, i64::max)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SwimlaneView<'a> {
    cols: &'a [String],
    color: &'a str,
    order: i64,
    col_colors: &'a BTreeMap<String, String>,
}

/// Serializes as an ordered object keyed by swimlane name, the shape the
/// board UI consumes.
impl Serialize for Lanes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.swimlanes.len()))?;
        for lane in &self.swimlanes {
            map.serialize_entry(
                &lane.name,
                &SwimlaneView {
                    cols: &lane.columns,
                    color: &lane.color,
                    order: lane.order,
                    col_colors: &lane.column_colors,
                },
            )?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub notes: String,
    pub swimlane: String,
    pub column: String,
    pub due: String,
}

/// Task fields as supplied by a caller for create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskInput {
    pub title: String,
    pub notes: String,
    pub swimlane: String,
    pub column: String,
    pub due: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskMove {
    pub swimlane: String,
    pub column: String,
}

/// Bulk color/order update, keyed by swimlane name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardMeta {
    #[serde(default)]
    pub swimlanes: BTreeMap<String, SwimlaneMetaUpdate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwimlaneMetaUpdate {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "deserialize_order")]
    pub order: Option<i64>,
    /// column name -> color
    #[serde(default)]
    pub columns: HashMap<String, String>,
}

/// Accepts `3`, `3.0` or `"3"`. Anything else is treated as absent.
fn deserialize_order<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawOrder {
        Int(i64),
        Float(f64),
        Text(String),
        #[allow(dead_code)]
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<RawOrder>::deserialize(d)? {
        Some(RawOrder::Int(n)) => Some(n),
        Some(RawOrder::Float(f)) if f.is_finite() => Some(f as i64),
        Some(RawOrder::Text(s)) => parse_order(&s),
        _ => None,
    })
}

/// Parse a stored or supplied order value. Fractions truncate.
pub fn parse_order(value: &str) -> Option<i64> {
    let value = value.trim();
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedColumn {
    pub name: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedSwimlane {
    pub name: String,
    pub columns: Vec<GroupedColumn>,
}

/// Tasks placed into every (swimlane, column) cell of the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedBoard {
    pub swimlanes: Vec<GroupedSwimlane>,
}

impl GroupedBoard {
    /// One empty cell per existing (swimlane, column) pair.
    pub fn empty(lanes: &Lanes) -> Self {
        Self {
            swimlanes: lanes
                .iter()
                .map(|lane| GroupedSwimlane {
                    name: lane.name.clone(),
                    columns: lane
                        .columns
                        .iter()
                        .map(|c| GroupedColumn {
                            name: c.clone(),
                            tasks: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn cell(&self, swimlane: &str, column: &str) -> Option<&[Task]> {
        self.swimlanes
            .iter()
            .find(|s| s.name == swimlane)?
            .columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.tasks.as_slice())
    }

    /// Put a task into an existing cell. Returns false if there is no such cell.
    pub fn place(&mut self, swimlane: &str, column: &str, task: Task) -> bool {
        let cell = self
            .swimlanes
            .iter_mut()
            .find(|s| s.name == swimlane)
            .and_then(|s| s.columns.iter_mut().find(|c| c.name == column));
        match cell {
            Some(cell) => {
                cell.tasks.push(task);
                true
            }
            None => false,
        }
    }

    pub fn task_count(&self) -> usize {
        self.swimlanes
            .iter()
            .flat_map(|s| s.columns.iter())
            .map(|c| c.tasks.len())
            .sum()
    }
}

struct ColumnsView<'a>(&'a [GroupedColumn]);

impl Serialize for ColumnsView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for column in self.0 {
            map.serialize_entry(&column.name, &column.tasks)?;
        }
        map.end()
    }
}

/// Serializes as `{ swimlane: { column: [task, ...] } }`, in board order.
impl Serialize for GroupedBoard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.swimlanes.len()))?;
        for swimlane in &self.swimlanes {
            map.serialize_entry(&swimlane.name, &ColumnsView(&swimlane.columns))?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardStats {
    pub count: usize,
    pub tasks_last_modified: Option<String>,
    pub lanes_last_modified: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(swimlane: &str, column: &str, color: &str, order: i64) -> LaneRow {
        LaneRow {
            swimlane: swimlane.to_string(),
            column: column.to_string(),
            swimlane_color: color.to_string(),
            column_color: String::new(),
            swimlane_order: order,
        }
    }

    #[test]
    fn test_lanes_from_rows_groups_and_sorts_stably() {
        let rows = vec![
            row("Ops", "Todo", "", 2),
            row("Incidents", "Detected", "", 0),
            row("Ops", "Doing", "#00ff00", 2),
            row("Ops", "Todo", "#ff0000", 2),
            row("Later", "Idea", "", 0),
            row("", "Orphan", "", 0),
        ];
        let lanes = Lanes::from_rows(&rows);
        let names: Vec<&str> = lanes.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Incidents", "Later", "Ops"]);

        let ops = lanes.get("Ops").unwrap();
        assert_eq!(ops.columns, vec!["Todo", "Doing"]);
        assert_eq!(ops.color, "#00ff00");
        assert!(lanes.column_exists("Ops", "Doing"));
        assert!(!lanes.column_exists("Ops", "Orphan"));
        assert_eq!(lanes.first_swimlane(), Some("Incidents"));
        assert_eq!(lanes.first_column("Ops"), Some("Todo"));
        assert_eq!(lanes.first_column("Missing"), None);
        assert_eq!(lanes.max_order(), 2);
    }

    #[test]
    fn test_empty_lanes_have_no_first_swimlane() {
        let lanes = Lanes::from_rows(&[]);
        assert!(lanes.is_empty());
        assert_eq!(lanes.first_swimlane(), None);
        assert_eq!(lanes.max_order(), 0);
    }

    #[test]
    fn test_lanes_serialize_in_display_order() {
        let lanes = Lanes::from_rows(&[row("Zeta", "A", "", 0), row("Alpha", "B", "", 1)]);
        let json = serde_json::to_string(&lanes).unwrap();
        let zeta = json.find("\"Zeta\"").unwrap();
        let alpha = json.find("\"Alpha\"").unwrap();
        assert!(zeta < alpha, "{}", json);
        assert!(json.contains("\"cols\":[\"A\"]"));
    }

    #[test]
    fn test_meta_order_accepts_numbers_and_strings() {
        let meta: BoardMeta = serde_json::from_value(serde_json::json!({
            "swimlanes": {
                "A": { "order": 3 },
                "B": { "order": "4" },
                "C": { "order": 2.7 },
                "D": { "color": "#fff" },
            }
        }))
        .unwrap();
        assert_eq!(meta.swimlanes["A"].order, Some(3));
        assert_eq!(meta.swimlanes["B"].order, Some(4));
        assert_eq!(meta.swimlanes["C"].order, Some(2));
        assert_eq!(meta.swimlanes["D"].order, None);
        assert_eq!(meta.swimlanes["D"].color.as_deref(), Some("#fff"));
    }

    #[test]
    fn test_meta_order_of_other_types_is_absent() {
        let meta: BoardMeta = serde_json::from_value(serde_json::json!({
            "swimlanes": {
                "A": { "order": true, "color": "#abc" },
                "B": { "order": { "n": 1 } },
                "C": { "order": null },
                "D": { "order": "x" },
            }
        }))
        .unwrap();
        assert_eq!(meta.swimlanes["A"].order, None);
        assert_eq!(meta.swimlanes["A"].color.as_deref(), Some("#abc"));
        assert_eq!(meta.swimlanes["B"].order, None);
        assert_eq!(meta.swimlanes["C"].order, None);
        assert_eq!(meta.swimlanes["D"].order, None);
    }

    #[test]
    fn test_grouped_board_place_and_serialize() {
        let lanes = Lanes::from_rows(&[row("S", "A", "", 0), row("S", "B", "", 0)]);
        let mut grouped = GroupedBoard::empty(&lanes);
        let task = Task {
            id: "1".into(),
            title: "t".into(),
            notes: String::new(),
            swimlane: "S".into(),
            column: "B".into(),
            due: String::new(),
        };
        assert!(grouped.place("S", "B", task.clone()));
        assert!(!grouped.place("S", "Nope", task));
        assert_eq!(grouped.cell("S", "A").unwrap().len(), 0);
        assert_eq!(grouped.cell("S", "B").unwrap().len(), 1);

        let value = serde_json::to_value(&grouped).unwrap();
        assert_eq!(value["S"]["B"][0]["id"], "1");
        assert!(value["S"]["A"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_parse_order() {
        assert_eq!(parse_order(" 7 "), Some(7));
        assert_eq!(parse_order("1.9"), Some(1));
        assert_eq!(parse_order("x"), None);
        assert_eq!(parse_order(""), None);
    }
}
