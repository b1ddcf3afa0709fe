//! Configuration management for EMG processing

use crate::chart::ChartConfig;
use crate::events::EventConfig;
use crate::filters::BandpassConfig;
use crate::stage::ElapsedTimeStage;
use crate::summary::DEFAULT_QUANTILES;
use emg_core::{EmgError, EmgResult};
use serde::{Deserialize, Serialize};

/// Default RMS window (ms)
pub const DEFAULT_RMS_WINDOW_MS: f64 = 100.0;

/// Every tunable of the preprocessing pipeline and its reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Configuration name/profile
    pub name: String,
    /// Elapsed-time column and tick rate
    pub elapsed: ElapsedTimeStage,
    /// Bandpass applied to the original channels
    pub bandpass: BandpassConfig,
    /// RMS window over the bandpass outputs (ms)
    pub rms_window_ms: f64,
    pub events: EventConfig,
    /// Quantiles reported by summaries
    pub quantiles: Vec<f64>,
    pub chart: ChartConfig,
}

impl ProcessingConfig {
    /// Shimmer EMG preset: 3 Hz / 0.01 Hz envelope bandpass, 100 ms RMS
    pub fn shimmer_emg() -> Self {
        Self {
            name: "Shimmer EMG".to_string(),
            elapsed: ElapsedTimeStage::default(),
            bandpass: BandpassConfig::default(),
            rms_window_ms: DEFAULT_RMS_WINDOW_MS,
            events: EventConfig::default(),
            quantiles: DEFAULT_QUANTILES.to_vec(),
            chart: ChartConfig::default(),
        }
    }

    /// Validate everything that does not depend on a table's sampling rate
    pub fn validate(&self) -> EmgResult<()> {
        if self.name.is_empty() {
            return Err(EmgError::config("Configuration name cannot be empty"));
        }

        if self.elapsed.column.is_empty() {
            return Err(EmgError::config("Elapsed time column name cannot be empty"));
        }

        if !(self.elapsed.ticks_per_second.is_finite() && self.elapsed.ticks_per_second > 0.0) {
            return Err(EmgError::config("Ticks per second must be positive"));
        }

        if self.bandpass.order == 0 {
            return Err(EmgError::config("Bandpass order must be at least 1"));
        }

        if !(self.bandpass.lowpass_hz > 0.0 && self.bandpass.highpass_hz > 0.0) {
            return Err(EmgError::config("Bandpass cutoffs must be positive"));
        }

        if !(self.rms_window_ms.is_finite() && self.rms_window_ms > 0.0) {
            return Err(EmgError::config("RMS window must be positive"));
        }

        self.events.validate()?;

        if let Some(q) = self.quantiles.iter().find(|q| !(0.0..=1.0).contains(*q)) {
            return Err(EmgError::config(format!("Quantile {} outside [0, 1]", q)));
        }

        if !(0.0..=1.0).contains(&self.chart.event_opacity) {
            return Err(EmgError::config("Event opacity must lie in [0, 1]"));
        }

        Ok(())
    }

    /// Validate the parts that depend on the sampling rate
    pub fn validate_for(&self, sampling_rate: f64) -> EmgResult<()> {
        self.validate()?;
        self.bandpass.validate(sampling_rate)
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> EmgResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EmgError::config(format!("Failed to serialize configuration: {}", e)))
    }

    /// Import configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> EmgResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EmgError::config(format!("Failed to deserialize configuration: {}", e)))
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self::shimmer_emg()
    }
}
