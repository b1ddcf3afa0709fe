//! Column resolution by naming convention
//!
//! Pipeline stages append columns as they run (`Bandpass 1_4680`, `RMS 1_4680`, ...),
//! so channel groups are found at call time by matching names, never cached.

use crate::error::{EmgError, EmgResult};
use crate::signal_table::SignalTable;

/// Predicate deciding whether a column name belongs to a group
pub trait ColumnPredicate {
    fn matches(&self, name: &str) -> bool;

    /// Human-readable form used in error values
    fn describe(&self) -> String;
}

/// Matches every name containing the substring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contains(pub String);

/// Matches one exact name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exact(pub String);

impl ColumnPredicate for Contains {
    fn matches(&self, name: &str) -> bool {
        name.contains(self.0.as_str())
    }

    fn describe(&self) -> String {
        self.0.clone()
    }
}

impl ColumnPredicate for Exact {
    fn matches(&self, name: &str) -> bool {
        name == self.0
    }

    fn describe(&self) -> String {
        self.0.clone()
    }
}

/// Column names in table order that satisfy `predicate`
pub fn resolve<P: ColumnPredicate + ?Sized>(table: &SignalTable, predicate: &P) -> Vec<String> {
    table
        .column_names()
        .filter(|name| predicate.matches(name))
        .map(str::to_string)
        .collect()
}

/// A named group of columns sharing a naming convention
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnGroup {
    patterns: Vec<String>,
}

impl ColumnGroup {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Matches for every pattern, pattern by pattern; see [`try_find_columns`]
    pub fn resolve(&self, table: &SignalTable) -> Vec<String> {
        try_find_columns(table, &self.patterns)
    }

    /// Like [`ColumnGroup::resolve`] but fails when nothing matches
    pub fn require(&self, table: &SignalTable) -> EmgResult<Vec<String>> {
        find_columns(table, &self.patterns)
    }
}

/// Every column containing any of `patterns`.
///
/// Results are concatenated pattern by pattern, each in table order, so a name
/// matching two patterns appears twice. Empty when nothing matches.
pub fn try_find_columns<S: AsRef<str>>(table: &SignalTable, patterns: &[S]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|pattern| resolve(table, &Contains(pattern.as_ref().to_string())))
        .collect()
}

/// [`try_find_columns`], failing with `ColumnNotFound` on an empty result
pub fn find_columns<S: AsRef<str>>(table: &SignalTable, patterns: &[S]) -> EmgResult<Vec<String>> {
    let columns = try_find_columns(table, patterns);
    if columns.is_empty() {
        let joined: Vec<&str> = patterns.iter().map(AsRef::as_ref).collect();
        return Err(EmgError::not_found(joined.join(", ")));
    }
    Ok(columns)
}

/// Exactly one column containing `pattern`
pub fn find_column(table: &SignalTable, pattern: &str) -> EmgResult<String> {
    let mut columns = find_columns(table, &[pattern])?;
    if columns.len() > 1 {
        return Err(EmgError::AmbiguousColumn {
            pattern: pattern.to_string(),
            matches: columns,
        });
    }
    Ok(columns.remove(0))
}

/// Order-preserving de-duplication of resolver output
pub fn dedup_columns(columns: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(columns.len());
    for name in columns {
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}
