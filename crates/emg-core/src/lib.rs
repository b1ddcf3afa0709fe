//! EMG-Core: signal table, column resolution, merging and file formats
//!
//! Everything downstream (filters, envelopes, event segmentation, charts)
//! works on the [`SignalTable`] defined here.

pub mod columns;
pub mod convert;
pub mod error;
pub mod format;
pub mod merge;
pub mod signal_table;
pub mod text;

pub use columns::{find_column, find_columns, try_find_columns, ColumnGroup, ColumnPredicate};
pub use convert::ConversionReport;
pub use error::{EmgError, EmgResult};
pub use format::{AdapterConfig, ContainerReader, FieldValue, FormatAdapter, MatReader};
pub use signal_table::*;
pub use text::{read_csv, read_csv_path, write_csv, write_csv_path};
