//! Event window detection from marker toggles

use emg_core::{EmgError, EmgResult, SignalTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Marker step emitted by the Shimmer units when an event toggles
pub const DEFAULT_TOGGLE_MAGNITUDE: f64 = 3.0;

/// Event segmentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Absolute first difference that marks a toggle
    pub toggle_magnitude: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            toggle_magnitude: DEFAULT_TOGGLE_MAGNITUDE,
        }
    }
}

/// A row bounding an event
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventRow {
    pub index: usize,
    /// Value of the table's time column at `index`, if the table has one
    pub time: Option<f64>,
}

/// One detected event occurrence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventInterval {
    pub start: EventRow,
    pub stop: EventRow,
}

impl EventConfig {
    pub fn validate(&self) -> EmgResult<()> {
        if !(self.toggle_magnitude.is_finite() && self.toggle_magnitude > 0.0) {
            return Err(EmgError::config(format!(
                "Toggle magnitude must be positive, got {}",
                self.toggle_magnitude
            )));
        }
        Ok(())
    }

    /// Pair up toggle rows of `event_column` (default: the table's event column).
    ///
    /// Toggles pair in order as (start, stop); an unpaired last toggle is dropped.
    pub fn find_events(
        &self,
        table: &SignalTable,
        event_column: Option<&str>,
    ) -> EmgResult<Vec<EventInterval>> {
        self.validate()?;
        let column = event_column.unwrap_or(table.event_name());
        let events = table.column(column)?;
        let time = table.try_column(table.time_name());

        let toggles: Vec<usize> = events
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| (pair[1] - pair[0]).abs() == self.toggle_magnitude)
            .map(|(i, _)| i + 1)
            .collect();

        let row = |index: usize| EventRow {
            index,
            time: time.map(|t| t[index]),
        };
        let intervals: Vec<EventInterval> = toggles
            .chunks_exact(2)
            .map(|pair| EventInterval {
                start: row(pair[0]),
                stop: row(pair[1]),
            })
            .collect();

        debug!(
            column,
            toggles = toggles.len(),
            intervals = intervals.len(),
            "Segmented events"
        );
        Ok(intervals)
    }
}

/// [`EventConfig::find_events`] with the default toggle magnitude
pub fn find_events(
    table: &SignalTable,
    event_column: Option<&str>,
) -> EmgResult<Vec<EventInterval>> {
    EventConfig::default().find_events(table, event_column)
}
