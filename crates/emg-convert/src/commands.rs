//! Command implementations behind the CLI

use anyhow::{bail, Context, Result};
use emg_core::columns::{find_column, find_columns, try_find_columns};
use emg_core::{
    read_csv_path, write_csv_path, AdapterConfig, ConversionReport, FormatAdapter, SignalTable,
    TableSettings,
};
use emg_processing::{preprocess, quantiles, ChartRequest, ProcessingConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Contents of a `--config` JSON file; every section is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub adapter: AdapterConfig,
    /// Rates and windows applied to every loaded table
    pub table: TableSettings,
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.table.validate()?;
        config.processing.validate()?;
        Ok(config)
    }
}

/// Batch-convert containers under `dir` into sibling CSV files
pub fn convert(config: &AppConfig, dir: &Path, recursive: bool) -> Result<ConversionReport> {
    let adapter = FormatAdapter::new(config.adapter.clone());
    let report = adapter
        .convert_dir(dir, recursive)
        .with_context(|| format!("Failed to convert {}", dir.display()))?;

    for (file, reason) in &report.failed {
        warn!(file = %file.display(), reason = %reason, "Skipped");
    }
    Ok(report)
}

/// Substrings locating the designated columns of each input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPatterns {
    pub channel: String,
    pub time: String,
    pub event: String,
}

impl Default for ColumnPatterns {
    fn default() -> Self {
        Self {
            channel: "CH".to_string(),
            time: "Timestamp".to_string(),
            event: "Event".to_string(),
        }
    }
}

/// Outputs requested from `process`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutputs {
    /// Processed table as CSV
    pub table: PathBuf,
    /// Chart description as JSON
    pub chart: Option<PathBuf>,
    /// Quantile summary as text
    pub summary: Option<PathBuf>,
}

/// Load one input (container or CSV) and assign its designations by pattern
pub fn load_table(
    config: &AppConfig,
    path: &Path,
    patterns: &ColumnPatterns,
) -> Result<SignalTable> {
    let loaded = if config.adapter.matches(path) {
        FormatAdapter::new(config.adapter.clone()).read_path(path, config.table.clone())
    } else {
        read_csv_path(path, config.table.clone())
    };
    let mut table = loaded.with_context(|| format!("Failed to load {}", path.display()))?;

    let channels = find_columns(&table, &[patterns.channel.as_str()])
        .with_context(|| format!("No channel columns in {}", path.display()))?;
    let time = find_column(&table, &patterns.time)
        .with_context(|| format!("No single time column in {}", path.display()))?;
    let event = try_find_columns(&table, &[patterns.event.as_str()])
        .into_iter()
        .next()
        .unwrap_or_default();

    info!(
        file = %path.display(),
        rows = table.rows(),
        channels = ?channels,
        time = %time,
        event = %event,
        "Loaded table"
    );
    table.set_channel_names(channels);
    table.set_time_name(time);
    table.set_event_name(event);
    Ok(table)
}

/// Load, merge, preprocess and write the requested outputs
pub fn process(
    config: &AppConfig,
    inputs: &[PathBuf],
    patterns: &ColumnPatterns,
    outputs: &ProcessOutputs,
) -> Result<SignalTable> {
    let Some((first, rest)) = inputs.split_first() else {
        bail!("At least one input file is required");
    };

    let mut table = load_table(config, first, patterns)?;
    for path in rest {
        let other = load_table(config, path, patterns)?;
        table = table
            .merge(&other)
            .with_context(|| format!("Failed to merge {}", path.display()))?;
    }

    let processed = preprocess(&table, &config.processing).context("Preprocessing failed")?;

    write_csv_path(&processed, &outputs.table)
        .with_context(|| format!("Failed to write {}", outputs.table.display()))?;
    info!(
        output = %outputs.table.display(),
        columns = processed.columns().len(),
        "Wrote processed table"
    );

    if let Some(path) = &outputs.chart {
        let event_name = processed.event_name();
        let request = ChartRequest {
            events: (!event_name.is_empty()).then(|| event_name.to_string()),
            ..ChartRequest::default()
        };
        let spec = config
            .processing
            .chart
            .build(&processed, &request, &config.processing.events)?;
        fs::write(path, spec.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(output = %path.display(), series = spec.series.len(), "Wrote chart");
    }

    if let Some(path) = &outputs.summary {
        let report = quantiles(&processed, &config.processing.quantiles, None)?;
        fs::write(path, report.to_string())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(output = %path.display(), "Wrote summary");
    }

    Ok(processed)
}
