//! Format adapter for binary scientific containers
//!
//! A [`ContainerReader`] turns a byte stream into named fields. The adapter then
//! drops bookkeeping keys, maps verbose instrument names onto short canonical
//! ones and flattens every numeric field into a table column.

use crate::error::{EmgError, EmgResult};
use crate::signal_table::{Column, SignalTable, TableSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// File name fragment identifying containers to convert
pub const DEFAULT_EXTENSION: &str = ".mat";

/// Header keys injected by container writers
pub const DEFAULT_EXCLUDE: [&str; 3] = ["__header__", "__version__", "__globals__"];

/// Shimmer field names and their short canonical names
pub const SHIMMER_RENAME: [(&str, &str); 10] = [
    ("Shimmer_4680_TimestampSync_Unix_CAL", "Timestamp_4680"),
    ("Shimmer_4680_ECG_EMG_Status1_CAL", "Status_4680"),
    ("Shimmer_4680_EMG_CH1_24BIT_CAL", "CH1_4680"),
    ("Shimmer_4680_EMG_CH2_24BIT_CAL", "CH2_4680"),
    ("Shimmer_4680_Event_Marker_CAL", "Event_4680"),
    ("Shimmer_5470_TimestampSync_Unix_CAL", "Timestamp_5470"),
    ("Shimmer_5470_ECG_EMG_Status1_CAL", "Status_5470"),
    ("Shimmer_5470_EMG_CH1_24BIT_CAL", "CH1_5470"),
    ("Shimmer_5470_EMG_CH2_24BIT_CAL", "CH2_5470"),
    ("Shimmer_5470_Event_Marker_CAL", "Event_5470"),
];

/// A single field read from a container
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Numeric array, already flattened in storage order
    Numeric { values: Vec<f64>, dims: Vec<usize> },
    /// Anything that is not a numeric array (strings, structs, cells)
    Unsupported { kind: String },
}

/// Ordered field name → value mapping as produced by a reader
pub type FieldMap = Vec<(String, FieldValue)>;

/// Black-box parser for a named-array container
pub trait ContainerReader {
    /// Parse the whole stream; fails with [`EmgError::Format`] when the stream is not
    /// a container this reader understands
    fn read_fields(&self, reader: &mut dyn Read) -> EmgResult<FieldMap>;
}

/// MATLAB level-5 `.mat` reader
#[derive(Debug, Clone, Copy, Default)]
pub struct MatReader;

impl ContainerReader for MatReader {
    fn read_fields(&self, reader: &mut dyn Read) -> EmgResult<FieldMap> {
        let mat = matfile::MatFile::parse(reader).map_err(|e| EmgError::Format {
            reason: format!("File could not be loaded as mat: {:?}", e),
        })?;

        Ok(mat
            .arrays()
            .iter()
            .map(|array| {
                let value = match numeric_values(array.data()) {
                    Some(values) => FieldValue::Numeric {
                        values,
                        dims: array.size().to_vec(),
                    },
                    None => FieldValue::Unsupported {
                        kind: "non-numeric".to_string(),
                    },
                };
                (array.name().to_string(), value)
            })
            .collect())
    }
}

/// Real part of any numeric class, widened to `f64`
fn numeric_values(data: &matfile::NumericData) -> Option<Vec<f64>> {
    use matfile::NumericData;

    fn widen<T: Copy + Into<f64>>(real: &[T]) -> Vec<f64> {
        real.iter().map(|&v| v.into()).collect()
    }

    let values = match data {
        NumericData::Double { real, .. } => real.clone(),
        NumericData::Single { real, .. } => widen(real),
        NumericData::Int8 { real, .. } => widen(real),
        NumericData::UInt8 { real, .. } => widen(real),
        NumericData::Int16 { real, .. } => widen(real),
        NumericData::UInt16 { real, .. } => widen(real),
        NumericData::Int32 { real, .. } => widen(real),
        NumericData::UInt32 { real, .. } => widen(real),
        NumericData::Int64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(values)
}

/// Adapter configuration: what to convert, what to drop, what to rename
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// File name fragment selecting containers (default `.mat`)
    pub extension: String,
    /// Field names removed before flattening
    pub exclude: Vec<String>,
    /// Field name → canonical column name
    pub rename: BTreeMap<String, String>,
}

impl AdapterConfig {
    /// True when the file name carries the configured extension
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.contains(self.extension.as_str()))
            .unwrap_or(false)
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            exclude: DEFAULT_EXCLUDE.iter().map(|k| k.to_string()).collect(),
            rename: SHIMMER_RENAME
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

/// Drop every field whose name is in `exclude`
pub fn exclude_fields(fields: FieldMap, exclude: &[String]) -> FieldMap {
    fields
        .into_iter()
        .filter(|(name, _)| !exclude.contains(name))
        .collect()
}

/// Rename fields present in `rename`; others pass through.
///
/// When two fields land on one name the later value wins and the earlier
/// position is kept.
pub fn rename_fields(fields: FieldMap, rename: &BTreeMap<String, String>) -> FieldMap {
    let mut renamed: FieldMap = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let name = rename.get(&name).cloned().unwrap_or(name);
        match renamed.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => renamed.push((name, value)),
        }
    }
    renamed
}

/// Converts containers into signal tables
#[derive(Debug, Clone, Default)]
pub struct FormatAdapter<R: ContainerReader = MatReader> {
    config: AdapterConfig,
    reader: R,
}

impl FormatAdapter<MatReader> {
    /// Adapter for `.mat` containers
    pub fn new(config: AdapterConfig) -> Self {
        Self::with_reader(config, MatReader)
    }
}

impl<R: ContainerReader> FormatAdapter<R> {
    pub fn with_reader(config: AdapterConfig, reader: R) -> Self {
        Self { config, reader }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Apply the exclude list
    pub fn exclude(&self, fields: FieldMap) -> FieldMap {
        exclude_fields(fields, &self.config.exclude)
    }

    /// Apply the rename map
    pub fn rename(&self, fields: FieldMap) -> FieldMap {
        rename_fields(fields, &self.config.rename)
    }

    /// Parse, exclude, rename and flatten into equally long columns
    pub fn to_columns(&self, reader: &mut dyn Read) -> EmgResult<Vec<Column>> {
        let fields = self.rename(self.exclude(self.reader.read_fields(reader)?));

        let mut columns = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            match value {
                FieldValue::Numeric { values, dims } => {
                    debug!(field = %name, ?dims, len = values.len(), "Flattened field");
                    columns.push(Column::new(name, values));
                }
                FieldValue::Unsupported { kind } => {
                    warn!(field = %name, kind = %kind, "Skipping field that cannot be flattened");
                }
            }
        }

        let Some(first) = columns.first() else {
            return Err(EmgError::Schema {
                reason: "No numeric fields survived flattening".to_string(),
            });
        };
        let rows = first.len();
        if let Some(ragged) = columns.iter().find(|c| c.len() != rows) {
            return Err(EmgError::Schema {
                reason: format!(
                    "Field '{}' has {} values, expected {} like '{}'",
                    ragged.name(),
                    ragged.len(),
                    rows,
                    first.name()
                ),
            });
        }

        Ok(columns)
    }

    /// Read a container into a [`SignalTable`]
    pub fn to_table(
        &self,
        reader: &mut dyn Read,
        settings: TableSettings,
    ) -> EmgResult<SignalTable> {
        SignalTable::new(self.to_columns(reader)?, settings)
    }

    /// Open `path` and read it into a [`SignalTable`]
    pub fn read_path(&self, path: &Path, settings: TableSettings) -> EmgResult<SignalTable> {
        let mut reader = BufReader::new(File::open(path)?);
        self.to_table(&mut reader, settings)
    }
}
