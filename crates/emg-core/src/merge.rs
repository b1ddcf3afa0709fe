//! Tick-aligned inner join of two independently recorded tables

use crate::columns::try_find_columns;
use crate::error::{EmgError, EmgResult};
use crate::signal_table::{Column, SignalTable, TableSettings};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Substring identifying timestamp-like columns
pub const TIMESTAMP_PATTERN: &str = "Timestamp";
/// Substring identifying elapsed-time columns
pub const ELAPSE_PATTERN: &str = "Elapse";
/// Name of the collapsed timestamp column
pub const CANONICAL_TIMESTAMP: &str = "Timestamp";
/// Name of the collapsed elapsed-time column
pub const CANONICAL_ELAPSE: &str = "Elapse (s)";

const LEFT_SUFFIX: &str = "_x";
const RIGHT_SUFFIX: &str = "_y";

/// One side of the join with its deduplicated ticks
struct JoinSide<'a> {
    table: &'a SignalTable,
    /// `(row, tick)` in row order, first occurrence of each tick only
    rows: Vec<(usize, i64)>,
}

impl<'a> JoinSide<'a> {
    fn new(table: &'a SignalTable) -> EmgResult<Self> {
        let time = table.time()?;
        let mut seen = HashSet::with_capacity(time.len());
        let mut rows = Vec::with_capacity(time.len());
        let mut non_finite = 0usize;

        for (row, &value) in time.iter().enumerate() {
            if !value.is_finite() {
                non_finite += 1;
                continue;
            }
            let tick = value as i64;
            if seen.insert(tick) {
                rows.push((row, tick));
            }
        }

        if non_finite > 0 {
            warn!(
                column = table.time_name(),
                dropped = non_finite,
                "Dropping rows with non-finite ticks before merge"
            );
        }
        debug!(
            column = table.time_name(),
            rows = time.len(),
            unique = rows.len(),
            "Deduplicated merge ticks"
        );

        Ok(Self { table, rows })
    }
}

impl SignalTable {
    /// Inner-join `self` and `other` on their integer tick columns.
    ///
    /// The left table wins every tie: its settings, event designation and the first
    /// column of each collapsed timestamp/elapsed group are kept. Inputs are not
    /// modified.
    pub fn merge(&self, other: &SignalTable) -> EmgResult<SignalTable> {
        if self.frequency() != other.frequency() {
            return Err(EmgError::IncompatiblePeriod {
                expected: self.period(),
                actual: other.period(),
            });
        }

        let left_channels: BTreeSet<&String> = self.channel_names().iter().collect();
        let right_channels: BTreeSet<&String> = other.channel_names().iter().collect();
        if left_channels == right_channels {
            return Err(EmgError::DuplicateChannel {
                channels: self.channel_names().to_vec(),
            });
        }

        let left = JoinSide::new(self)?;
        let right = JoinSide::new(other)?;

        let right_index: HashMap<i64, usize> =
            right.rows.iter().map(|&(row, tick)| (tick, row)).collect();
        let (pairs, ticks): (Vec<(usize, usize)>, Vec<f64>) = left
            .rows
            .iter()
            .filter_map(|&(row, tick)| right_index.get(&tick).map(|&r| ((row, r), tick as f64)))
            .unzip();
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = pairs.into_iter().unzip();

        let shared_key = self.time_name() == other.time_name();
        let left_names: HashSet<&str> = self.column_names().collect();
        let right_names: HashSet<&str> = other
            .column_names()
            .filter(|name| !(shared_key && *name == other.time_name()))
            .collect();
        let clashes: HashSet<&str> = left_names.intersection(&right_names).copied().collect();

        let rename = |name: &str, suffix: &str| -> String {
            if clashes.contains(name) {
                format!("{}{}", name, suffix)
            } else {
                name.to_string()
            }
        };

        let mut columns = Vec::with_capacity(left_names.len() + right_names.len());
        for (side, rows, suffix) in [
            (&left, &left_rows, LEFT_SUFFIX),
            (&right, &right_rows, RIGHT_SUFFIX),
        ] {
            for column in side.table.columns() {
                let is_key = column.name() == side.table.time_name();
                if is_key && shared_key && suffix == RIGHT_SUFFIX {
                    continue;
                }
                let values = if is_key {
                    ticks.clone()
                } else {
                    rows.iter().map(|&i| column.values()[i]).collect()
                };
                columns.push(Column::new(rename(column.name(), suffix), values));
            }
        }

        let channel_names = self
            .channel_names()
            .iter()
            .map(|c| rename(c, LEFT_SUFFIX))
            .chain(other.channel_names().iter().map(|c| rename(c, RIGHT_SUFFIX)))
            .collect();
        let settings = TableSettings {
            channel_names,
            time_name: rename(self.time_name(), LEFT_SUFFIX),
            event_name: rename(self.event_name(), LEFT_SUFFIX),
            ..self.settings()
        };

        let mut merged = SignalTable::new(columns, settings)?;
        collapse_duplicates(&mut merged)?;

        debug!(
            left_rows = self.rows(),
            right_rows = other.rows(),
            merged_rows = merged.rows(),
            time = merged.time_name(),
            "Merged signal tables"
        );
        Ok(merged)
    }
}

/// Fold duplicated timestamp-like and elapsed-like columns into one canonical column each
fn collapse_duplicates(table: &mut SignalTable) -> EmgResult<()> {
    let timestamps = try_find_columns(table, &[TIMESTAMP_PATTERN]);
    let elapses = try_find_columns(table, &[ELAPSE_PATTERN]);

    for (group, canonical) in [(&timestamps, CANONICAL_TIMESTAMP), (&elapses, CANONICAL_ELAPSE)] {
        if group.len() <= 1 {
            continue;
        }
        let kept = table.remove_column(&group[0])?.renamed(canonical);
        for name in &group[1..] {
            table.remove_column(name)?;
        }
        table.insert(kept)?;
    }

    if timestamps.len() > 1 {
        table.set_time_name(CANONICAL_TIMESTAMP);
    } else if elapses.len() > 1 && elapses.iter().any(|name| name == table.time_name()) {
        table.set_time_name(CANONICAL_ELAPSE);
    }
    Ok(())
}
