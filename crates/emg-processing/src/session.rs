//! Per-user session holding uploaded tables and derived reports
//!
//! The calling layer owns one [`Session`] per user and passes dataset handles
//! around instead of keeping tables in shared global state.

use crate::chart::{ChartRequest, ChartSpec};
use crate::config::ProcessingConfig;
use crate::events::EventInterval;
use crate::pipeline::preprocess;
use crate::summary::{quantiles, QuantileTable};
use emg_core::{EmgError, EmgResult, SignalTable};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// A dataset stored in a session
#[derive(Debug, Clone)]
pub enum Dataset {
    Table(SignalTable),
    Report(QuantileTable),
}

impl Dataset {
    /// Type name used in mismatch errors
    pub fn kind(&self) -> &'static str {
        match self {
            Dataset::Table(_) => "SignalTable",
            Dataset::Report(_) => "QuantileTable",
        }
    }
}

/// Datasets of one user session keyed by handle
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    config: ProcessingConfig,
    datasets: HashMap<Uuid, Dataset>,
}

impl Session {
    pub fn new(config: ProcessingConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            datasets: HashMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Store a dataset and return its handle
    pub fn insert(&mut self, dataset: Dataset) -> Uuid {
        let handle = Uuid::new_v4();
        debug!(session = %self.id, %handle, kind = dataset.kind(), "Stored dataset");
        self.datasets.insert(handle, dataset);
        handle
    }

    pub fn insert_table(&mut self, table: SignalTable) -> Uuid {
        self.insert(Dataset::Table(table))
    }

    pub fn get(&self, handle: Uuid) -> EmgResult<&Dataset> {
        self.datasets.get(&handle).ok_or_else(|| EmgError::UnknownDataset {
            handle: handle.to_string(),
        })
    }

    pub fn remove(&mut self, handle: Uuid) -> EmgResult<Dataset> {
        self.datasets.remove(&handle).ok_or_else(|| EmgError::UnknownDataset {
            handle: handle.to_string(),
        })
    }

    /// The table behind `handle`; `TypeMismatch` if it holds a report
    pub fn table(&self, handle: Uuid) -> EmgResult<&SignalTable> {
        match self.get(handle)? {
            Dataset::Table(table) => Ok(table),
            other => Err(EmgError::TypeMismatch {
                expected: "SignalTable",
                found: other.kind(),
            }),
        }
    }

    pub fn report(&self, handle: Uuid) -> EmgResult<&QuantileTable> {
        match self.get(handle)? {
            Dataset::Report(report) => Ok(report),
            other => Err(EmgError::TypeMismatch {
                expected: "QuantileTable",
                found: other.kind(),
            }),
        }
    }

    /// Merge two stored tables; the merged table is stored under a new handle
    pub fn merge(&mut self, left: Uuid, right: Uuid) -> EmgResult<Uuid> {
        let merged = self.table(left)?.merge(self.table(right)?)?;
        Ok(self.insert_table(merged))
    }

    /// Preprocess a stored table with the session configuration
    pub fn preprocess(&mut self, handle: Uuid) -> EmgResult<Uuid> {
        let processed = preprocess(self.table(handle)?, &self.config)?;
        Ok(self.insert_table(processed))
    }

    /// Quantile report of a stored table (default quantiles and columns from the
    /// configuration and the table's channels)
    pub fn summarize(&mut self, handle: Uuid, columns: Option<&[String]>) -> EmgResult<Uuid> {
        let report = quantiles(self.table(handle)?, &self.config.quantiles, columns)?;
        Ok(self.insert(Dataset::Report(report)))
    }

    pub fn events(
        &self,
        handle: Uuid,
        event_column: Option<&str>,
    ) -> EmgResult<Vec<EventInterval>> {
        self.config
            .events
            .find_events(self.table(handle)?, event_column)
    }

    pub fn chart(&self, handle: Uuid, request: &ChartRequest) -> EmgResult<ChartSpec> {
        self.config
            .chart
            .build(self.table(handle)?, request, &self.config.events)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ProcessingConfig::default())
    }
}
