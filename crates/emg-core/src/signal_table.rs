//! SignalTable: canonical container for multi-column EMG recordings

use crate::error::{EmgError, EmgResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default sampling frequency of the Shimmer recordings (Hz)
pub const DEFAULT_FREQUENCY: f64 = 1024.0;
/// Default number of points handed to a chart per series
pub const DEFAULT_MAX_DISPLAY_POINTS: usize = 1000;
/// Default moving-average window (seconds)
pub const DEFAULT_WINDOW_TIME: f64 = 1.0;

/// Rows shown by the `Display` preview
const PREVIEW_ROWS: usize = 5;

/// Construction parameters for a [`SignalTable`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Columns holding signal channels
    pub channel_names: Vec<String>,
    /// Column holding sample timestamps
    pub time_name: String,
    /// Column holding the event marker
    pub event_name: String,
    /// Sampling frequency in Hz
    pub frequency: f64,
    /// Maximum number of points DISPLAYED per series; storage is unaffected
    pub max_display_points: usize,
    /// Moving-average window in seconds
    pub window_time: f64,
}

impl TableSettings {
    /// Settings with the given column designations and default rates
    pub fn new(channel_names: Vec<String>, time_name: &str, event_name: &str) -> Self {
        Self {
            channel_names,
            time_name: time_name.to_string(),
            event_name: event_name.to_string(),
            ..Self::default()
        }
    }

    /// Check numeric settings
    pub fn validate(&self) -> EmgResult<()> {
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(EmgError::config(format!(
                "Sampling frequency must be positive, got {}",
                self.frequency
            )));
        }
        if self.max_display_points == 0 {
            return Err(EmgError::config("Max display points must be greater than 0"));
        }
        if !(self.window_time.is_finite() && self.window_time >= 0.0) {
            return Err(EmgError::config(format!(
                "Window time must be non-negative, got {}",
                self.window_time
            )));
        }
        Ok(())
    }
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            channel_names: Vec::new(),
            time_name: String::new(),
            event_name: String::new(),
            frequency: DEFAULT_FREQUENCY,
            max_display_points: DEFAULT_MAX_DISPLAY_POINTS,
            window_time: DEFAULT_WINDOW_TIME,
        }
    }
}

/// A named column of samples.
///
/// Values sit behind an `Arc` so a derived table can reuse an unchanged column of
/// its source. Replacing a column swaps the pointer; stored values are never
/// written through a shared buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Arc<Vec<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: Arc::new(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Arc::clone(&self.values),
        }
    }

    /// True when both columns point at the same buffer
    pub fn shares_buffer(&self, other: &Column) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

/// Row-oriented table of named numeric columns with channel/time/event designations
#[derive(Debug, Clone)]
pub struct SignalTable {
    columns: Vec<Column>,
    rows: usize,
    channel_names: Vec<String>,
    time_name: String,
    event_name: String,
    frequency: f64,
    max_display_points: usize,
    window_time: f64,
}

impl SignalTable {
    /// Create a table; every column must share one length and names must be unique
    pub fn new(columns: Vec<Column>, settings: TableSettings) -> EmgResult<Self> {
        settings.validate()?;

        let rows = columns.first().map(Column::len).unwrap_or(0);
        for (i, column) in columns.iter().enumerate() {
            if column.len() != rows {
                return Err(EmgError::LengthMismatch {
                    column: column.name.clone(),
                    expected: rows,
                    actual: column.len(),
                });
            }
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(EmgError::Schema {
                    reason: format!("Duplicate column name '{}'", column.name),
                });
            }
        }

        Ok(SignalTable {
            columns,
            rows,
            channel_names: settings.channel_names,
            time_name: settings.time_name,
            event_name: settings.event_name,
            frequency: settings.frequency,
            max_display_points: settings.max_display_points,
            window_time: settings.window_time,
        })
    }

    /// Create a table from `(name, values)` pairs
    pub fn from_columns<N: Into<String>>(
        columns: Vec<(N, Vec<f64>)>,
        settings: TableSettings,
    ) -> EmgResult<Self> {
        let columns = columns
            .into_iter()
            .map(|(name, values)| Column::new(name, values))
            .collect();
        Self::new(columns, settings)
    }

    /// Number of rows (samples)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Check if table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in table order
    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(Column::name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a column, `None` if absent
    pub fn try_column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(Column::values)
    }

    /// Values of a column by exact name
    pub fn column(&self, name: &str) -> EmgResult<&[f64]> {
        self.try_column(name).ok_or_else(|| EmgError::not_found(name))
    }

    /// The [`Column`] handle for `name`, including its shared buffer
    pub fn column_entry(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Insert a column, replacing any existing column with the same name in place
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> EmgResult<()> {
        self.insert(Column::new(name, values))
    }

    pub(crate) fn insert(&mut self, column: Column) -> EmgResult<()> {
        let actual = column.len();
        if !self.columns.is_empty() && actual != self.rows {
            return Err(EmgError::LengthMismatch {
                column: column.name,
                expected: self.rows,
                actual,
            });
        }
        if self.columns.is_empty() {
            self.rows = column.len();
        }

        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Remove a column and return it
    pub fn remove_column(&mut self, name: &str) -> EmgResult<Column> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| EmgError::not_found(name))?;
        Ok(self.columns.remove(index))
    }

    /// Builder-style insert for functional pipelines
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> EmgResult<Self> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    pub fn set_channel_names(&mut self, names: Vec<String>) {
        self.channel_names = names;
    }

    pub fn time_name(&self) -> &str {
        &self.time_name
    }

    pub fn set_time_name(&mut self, name: impl Into<String>) {
        self.time_name = name.into();
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn set_event_name(&mut self, name: impl Into<String>) {
        self.event_name = name.into();
    }

    /// Channel columns in registry order
    pub fn channels(&self) -> EmgResult<Vec<(&str, &[f64])>> {
        self.channel_names
            .iter()
            .map(|name| Ok((name.as_str(), self.column(name)?)))
            .collect()
    }

    /// Time column values
    pub fn time(&self) -> EmgResult<&[f64]> {
        self.column(&self.time_name)
    }

    /// Event column values
    pub fn event(&self) -> EmgResult<&[f64]> {
        self.column(&self.event_name)
    }

    /// Sampling frequency in Hz
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Seconds per sample, always `1 / frequency`
    pub fn period(&self) -> f64 {
        1.0 / self.frequency
    }

    pub fn set_frequency(&mut self, frequency: f64) -> EmgResult<()> {
        if !(frequency.is_finite() && frequency > 0.0) {
            return Err(EmgError::config(format!(
                "Sampling frequency must be positive, got {}",
                frequency
            )));
        }
        self.frequency = frequency;
        Ok(())
    }

    pub fn set_period(&mut self, period: f64) -> EmgResult<()> {
        if !(period.is_finite() && period > 0.0) {
            return Err(EmgError::config(format!(
                "Sampling period must be positive, got {}",
                period
            )));
        }
        self.frequency = 1.0 / period;
        Ok(())
    }

    pub fn max_display_points(&self) -> usize {
        self.max_display_points
    }

    pub fn window_time(&self) -> f64 {
        self.window_time
    }

    /// Moving-average window in samples: `floor(window_time / period)`
    pub fn window_length(&self) -> usize {
        (self.window_time / self.period()).floor() as usize
    }

    /// Uniform stride that keeps a chart series within `max_display_points`
    pub fn display_stride(&self) -> usize {
        if self.rows < self.max_display_points {
            1
        } else {
            (self.rows / self.max_display_points).max(1)
        }
    }

    /// Snapshot of the designations and rates of this table
    pub fn settings(&self) -> TableSettings {
        TableSettings {
            channel_names: self.channel_names.clone(),
            time_name: self.time_name.clone(),
            event_name: self.event_name.clone(),
            frequency: self.frequency,
            max_display_points: self.max_display_points,
            window_time: self.window_time,
        }
    }

    /// New table holding the given rows, in the given order
    pub fn select_rows(&self, indices: &[usize]) -> EmgResult<SignalTable> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.rows) {
            return Err(EmgError::config(format!(
                "Row index {} out of bounds (0-{})",
                bad, self.rows
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i]).collect()))
            .collect();

        SignalTable::new(columns, self.settings())
    }

    /// Values of one row in column order
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.rows).then(|| self.columns.iter().map(|c| c.values[index]).collect())
    }
}

impl fmt::Display for SignalTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.column_names().collect();
        writeln!(f, "{}", names.join("\t"))?;
        for index in 0..self.rows.min(PREVIEW_ROWS) {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|c| format!("{}", c.values[index]))
                .collect();
            writeln!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> SignalTable {
        SignalTable::from_columns(
            vec![
                ("Timestamp_4680", vec![0.0, 1.0, 2.0, 3.0]),
                ("CH1_4680", vec![0.5, -0.5, 0.25, 0.0]),
                ("Event_4680", vec![0.0, 0.0, 3.0, 3.0]),
            ],
            TableSettings::new(vec!["CH1_4680".to_string()], "Timestamp_4680", "Event_4680"),
        )
        .unwrap()
    }

    #[test]
    fn test_table_creation() {
        let table = sample_table();

        assert_eq!(table.rows(), 4);
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.time().unwrap(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(table.event().unwrap()[2], 3.0);
        assert_eq!(table.channels().unwrap()[0].0, "CH1_4680");
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let result = SignalTable::from_columns(
            vec![("a", vec![1.0, 2.0]), ("b", vec![1.0])],
            TableSettings::default(),
        );
        assert!(matches!(
            result,
            Err(EmgError::LengthMismatch { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_insert_wrong_length_rejected() {
        let mut table = sample_table();
        let rows = table.rows();
        let result = table.insert_column("short", vec![1.0; rows - 1]);
        match result {
            Err(EmgError::LengthMismatch { column, expected, actual }) => {
                assert_eq!(column, "short");
                assert_eq!(expected, rows);
                assert_eq!(actual, rows - 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!table.has_column("short"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = SignalTable::from_columns(
            vec![("a", vec![1.0]), ("a", vec![2.0])],
            TableSettings::default(),
        );
        assert!(matches!(result, Err(EmgError::Schema { .. })));
    }

    #[test]
    fn test_period_frequency_invariant() {
        let mut table = sample_table();
        assert_eq!(table.frequency(), 1024.0);
        assert_eq!(table.period(), 1.0 / 1024.0);

        table.set_period(0.002).unwrap();
        assert!((table.frequency() - 500.0).abs() < 1e-9);
        assert!((table.period() - 0.002).abs() < 1e-12);

        assert!(table.set_period(0.0).is_err());
        assert!(table.set_frequency(-1.0).is_err());
    }

    #[test]
    fn test_window_length() {
        let table = sample_table();
        // 1 second at 1024 Hz
        assert_eq!(table.window_length(), 1024);
    }

    #[test]
    fn test_display_stride() {
        let values: Vec<f64> = (0..2500).map(|i| i as f64).collect();
        let mut settings = TableSettings::default();
        settings.max_display_points = 1000;
        let table = SignalTable::from_columns(vec![("t", values)], settings).unwrap();
        assert_eq!(table.display_stride(), 2);

        let short = SignalTable::from_columns(vec![("t", vec![1.0; 10])], TableSettings::default())
            .unwrap();
        assert_eq!(short.display_stride(), 1);
    }

    #[test]
    fn test_insert_replaces_without_aliasing() {
        let original = sample_table();
        let mut derived = original.clone();

        assert!(derived
            .column_entry("CH1_4680")
            .unwrap()
            .shares_buffer(original.column_entry("CH1_4680").unwrap()));

        derived.insert_column("CH1_4680", vec![9.0; 4]).unwrap();
        assert_eq!(derived.column("CH1_4680").unwrap(), &[9.0; 4]);
        assert_eq!(original.column("CH1_4680").unwrap(), &[0.5, -0.5, 0.25, 0.0]);
        // Replacement keeps column position
        assert_eq!(derived.column_names().nth(1), Some("CH1_4680"));
    }

    #[test]
    fn test_select_rows() {
        let table = sample_table();
        let selected = table.select_rows(&[3, 1]).unwrap();
        assert_eq!(selected.rows(), 2);
        assert_eq!(selected.time().unwrap(), &[3.0, 1.0]);
        assert!(table.select_rows(&[4]).is_err());
    }

    #[test]
    fn test_missing_column() {
        let mut table = sample_table();
        table.set_event_name("Event_9999");
        assert!(matches!(table.event(), Err(EmgError::ColumnNotFound { .. })));
    }

    #[test]
    fn test_display_preview() {
        let preview = sample_table().to_string();
        assert!(preview.starts_with("Timestamp_4680\tCH1_4680\tEvent_4680"));
        assert_eq!(preview.lines().count(), 5);
    }
}
