//! Delimited text import and export
//!
//! Empty cells read as NaN and NaN is written back as an empty cell, so a table
//! survives a write/read cycle with its gaps intact.

use crate::error::{EmgError, EmgResult};
use crate::signal_table::{Column, SignalTable, TableSettings};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Read a headed CSV stream into a table
pub fn read_csv<R: Read>(reader: R, settings: TableSettings) -> EmgResult<SignalTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let names: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.trim_start_matches('\u{feff}');
            if name.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                name.to_string()
            }
        })
        .collect();

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        for (i, cell) in record.iter().enumerate() {
            values[i].push(parse_cell(cell).ok_or_else(|| EmgError::Format {
                reason: format!(
                    "Non-numeric value '{}' in column '{}' at row {}",
                    cell, names[i], row
                ),
            })?);
        }
    }

    let columns: Vec<Column> = names
        .into_iter()
        .zip(values)
        .map(|(name, values)| Column::new(name, values))
        .collect();
    if columns.is_empty() {
        return Err(EmgError::Schema {
            reason: "Text input has no columns".to_string(),
        });
    }

    let table = SignalTable::new(columns, settings)?;
    debug!(rows = table.rows(), columns = table.columns().len(), "Read CSV table");
    Ok(table)
}

/// Open and read a CSV file
pub fn read_csv_path(path: &Path, settings: TableSettings) -> EmgResult<SignalTable> {
    read_csv(File::open(path)?, settings)
}

fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return Some(f64::NAN);
    }
    match cell {
        "True" | "true" => Some(1.0),
        "False" | "false" => Some(0.0),
        _ => cell.parse().ok(),
    }
}

/// Write every column of `table` as headed CSV, without an index column
pub fn write_csv<W: Write>(table: &SignalTable, writer: W) -> EmgResult<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(table.column_names())?;

    for index in 0..table.rows() {
        let record = table.columns().iter().map(|c| {
            let value = c.values()[index];
            if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            }
        });
        writer.write_record(record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write the table to it
pub fn write_csv_path(table: &SignalTable, path: &Path) -> EmgResult<()> {
    write_csv(table, File::create(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv() {
        let input = "Timestamp_4680,CH1_4680,Event_4680\n0,0.5,0\n1,,3\n2,-1e-3,3\n";
        let table = read_csv(
            input.as_bytes(),
            TableSettings::new(vec!["CH1_4680".to_string()], "Timestamp_4680", "Event_4680"),
        )
        .unwrap();

        assert_eq!(table.rows(), 3);
        assert_eq!(table.time().unwrap(), &[0.0, 1.0, 2.0]);
        let channel = table.column("CH1_4680").unwrap();
        assert!(channel[1].is_nan());
        assert_eq!(channel[2], -0.001);
    }

    #[test]
    fn test_unnamed_index_header() {
        let table = read_csv(",a\n0,1\n1,2\n".as_bytes(), TableSettings::default()).unwrap();
        assert!(table.has_column("Unnamed: 0"));
    }

    #[test]
    fn test_non_numeric_cell() {
        let result = read_csv("a,b\n1,hello\n".as_bytes(), TableSettings::default());
        assert!(matches!(result, Err(EmgError::Format { .. })));
    }

    #[test]
    fn test_ragged_record() {
        let result = read_csv("a,b\n1,2\n3\n".as_bytes(), TableSettings::default());
        assert!(matches!(result, Err(EmgError::Csv(_))));
    }

    #[test]
    fn test_write_csv_blanks_nan() {
        let table = SignalTable::from_columns(
            vec![("t", vec![0.0, 1.0]), ("x", vec![f64::NAN, 2.5])],
            TableSettings::default(),
        )
        .unwrap();

        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "t,x\n0,\n1,2.5\n");
    }

    #[test]
    fn test_file_cycle_keeps_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = SignalTable::from_columns(
            vec![("t", vec![0.0, 1.0, 2.0]), ("x", vec![1.0, f64::NAN, 3.0])],
            TableSettings::default(),
        )
        .unwrap();

        write_csv_path(&table, &path).unwrap();
        let back = read_csv_path(&path, TableSettings::default()).unwrap();

        assert_eq!(back.column("t").unwrap(), &[0.0, 1.0, 2.0]);
        assert!(back.column("x").unwrap()[1].is_nan());
    }
}
