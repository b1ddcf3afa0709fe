//! Labelled quantile summaries per column

use emg_core::{EmgError, EmgResult, SignalTable};
use serde::Serialize;
use std::fmt;

/// Quantiles reported when none are requested
pub const DEFAULT_QUANTILES: [f64; 3] = [0.9, 0.5, 0.1];

/// Row label for a quantile: `Max`, `Min` or the truncated percentile (`90th`)
pub fn quantile_label(q: f64) -> String {
    if q == 1.0 {
        "Max".to_string()
    } else if q == 0.0 {
        "Min".to_string()
    } else {
        format!("{}th", (q * 100.0) as i64)
    }
}

/// Linearly interpolated quantile of the non-NaN values; NaN if there are none
pub fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Percentile label → value table, one value column per input column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileTable {
    quantiles: Vec<f64>,
    labels: Vec<String>,
    columns: Vec<String>,
    /// `values[row][column]`
    values: Vec<Vec<f64>>,
}

impl QuantileTable {
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn quantiles(&self) -> &[f64] {
        &self.quantiles
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values of one labelled row in column order
    pub fn row(&self, label: &str) -> Option<&[f64]> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.values[i].as_slice())
    }

    pub fn value(&self, label: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(label).map(|row| row[col])
    }
}

impl fmt::Display for QuantileTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Percentile")?;
        for column in &self.columns {
            write!(f, "\t{}", column)?;
        }
        writeln!(f)?;
        for (label, row) in self.labels.iter().zip(&self.values) {
            write!(f, "{}", label)?;
            for value in row {
                write!(f, "\t{}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Quantiles `qs` of `columns` (default: the table's channels), in the given orders
pub fn quantiles(
    table: &SignalTable,
    qs: &[f64],
    columns: Option<&[String]>,
) -> EmgResult<QuantileTable> {
    if let Some(bad) = qs.iter().find(|q| !(0.0..=1.0).contains(*q)) {
        return Err(EmgError::config(format!(
            "Quantiles must lie in [0, 1], got {}",
            bad
        )));
    }

    let columns = columns.unwrap_or(table.channel_names()).to_vec();
    let data = columns
        .iter()
        .map(|name| table.column(name))
        .collect::<EmgResult<Vec<_>>>()?;

    let values = qs
        .iter()
        .map(|&q| data.iter().map(|values| quantile(values, q)).collect())
        .collect();

    Ok(QuantileTable {
        quantiles: qs.to_vec(),
        labels: qs.iter().map(|&q| quantile_label(q)).collect(),
        columns,
        values,
    })
}
