//! EMG-Processing: envelope pipeline, event segmentation and reports
//!
//! Batch processing of [`emg_core::SignalTable`]s: Butterworth bandpass,
//! moving-average and RMS envelopes, normalization, event windows, quantile
//! summaries and chart descriptions.

pub mod chart;
pub mod config;
pub mod envelope;
pub mod events;
pub mod filters;
pub mod pipeline;
pub mod session;
pub mod stage;
pub mod summary;

pub use chart::{chart, ChartConfig, ChartRequest, ChartSpec, Visibility};
pub use config::ProcessingConfig;
pub use events::{find_events, EventConfig, EventInterval, EventRow};
pub use filters::{BandpassConfig, ButterworthFilter, FilterConfig, FilterType};
pub use pipeline::{preprocess, Pipeline, PipelineBuilder};
pub use session::{Dataset, Session};
pub use stage::{derived_name, SignalStage, StageContext};
pub use summary::{quantiles, QuantileTable, DEFAULT_QUANTILES};
