//! Batch conversion of container files into sibling CSV files

use crate::error::EmgResult;
use crate::format::{ContainerReader, FormatAdapter};
use crate::signal_table::{SignalTable, TableSettings};
use crate::text::write_csv_path;
use jwalk::WalkDir;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of a directory conversion
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Written CSV files
    pub converted: Vec<PathBuf>,
    /// Files without the configured extension
    pub skipped: Vec<PathBuf>,
    /// Files that matched but could not be converted, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// `dir/name.csv` for `dir/name.ext`; the base name ends at the first dot
pub fn sibling_csv_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or(name);
    input.with_file_name(format!("{}.csv", stem))
}

impl<R: ContainerReader> FormatAdapter<R> {
    /// Convert one container to CSV next to it, returning the written path
    pub fn convert_file(&self, input: &Path) -> EmgResult<PathBuf> {
        let mut reader = BufReader::new(File::open(input)?);
        let columns = self.to_columns(&mut reader)?;
        let table = SignalTable::new(columns, TableSettings::default())?;

        let output = sibling_csv_path(input);
        write_csv_path(&table, &output)?;
        info!(input = %input.display(), output = %output.display(), "Converted");
        Ok(output)
    }

    /// Convert every matching file under `dir`.
    ///
    /// Hidden entries are ignored and symlinks are not followed. A file or
    /// sub-directory that fails is recorded and logged and the batch carries on;
    /// only failure to list `dir` itself is an error.
    pub fn convert_dir(&self, dir: &Path, recursive: bool) -> EmgResult<ConversionReport> {
        // Surface an unreadable root before walking
        fs::read_dir(dir)?;

        let mut walk = WalkDir::new(dir)
            .sort(true)
            .skip_hidden(true)
            .follow_links(false);
        if !recursive {
            walk = walk.max_depth(1);
        }

        let mut report = ConversionReport::default();
        for entry in walk {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| dir.to_path_buf());
                    if !report.failed.iter().any(|(failed, _)| failed == &path) {
                        warn!(path = %path.display(), error = %e, "Entry could not be read");
                        report.failed.push((path, e.to_string()));
                    }
                    continue;
                }
            };

            let path = entry.path();
            if let Some(e) = &entry.read_children_error {
                if !report.failed.iter().any(|(failed, _)| failed == &path) {
                    warn!(path = %path.display(), error = %e, "Directory could not be read");
                    report.failed.push((path.clone(), e.to_string()));
                }
            }
            let file_type = entry.file_type();
            if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
                continue;
            }
            if !self.config().matches(&path) {
                info!(file = %path.display(), "Skipping");
                report.skipped.push(path);
                continue;
            }

            match self.convert_file(&path) {
                Ok(output) => report.converted.push(output),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "File could not be converted");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        info!(
            converted = report.converted.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Conversion complete"
        );
        Ok(report)
    }
}
