//! Processing pipeline for chaining stages

use crate::config::ProcessingConfig;
use crate::filters::BandpassConfig;
use crate::stage::{
    ElapsedTimeStage, EnvelopeStage, NormalizeStage, SignalStage, StageContext, BANDPASS_LABEL,
};
use emg_core::{EmgResult, SignalTable};
use std::time::Instant;
use tracing::debug;

/// Ordered chain of stages run against one table
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn SignalStage>>,
}

/// Pipeline builder for constructing processing chains
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Box<dyn SignalStage>>,
}

impl Pipeline {
    /// Create new empty pipeline
    pub fn new(name: &str) -> Self {
        Pipeline {
            name: name.to_string(),
            stages: Vec::new(),
        }
    }

    pub fn add_stage(&mut self, stage: Box<dyn SignalStage>) {
        self.stages.push(stage);
    }

    /// The standard EMG preprocessing chain:
    /// elapsed time, bandpass of the raw channels, moving average and RMS of the
    /// bandpass outputs, then normalization of every derived channel
    pub fn preprocessing(config: &ProcessingConfig) -> EmgResult<Self> {
        config.validate()?;

        let mut builder = PipelineBuilder::new(&config.name);
        builder
            .add_elapsed_time(config.elapsed.clone())
            .add_bandpass(config.bandpass.clone())
            .add_moving_average_of(BANDPASS_LABEL)
            .add_rms_of(BANDPASS_LABEL, config.rms_window_ms)
            .add_normalize();
        Ok(builder.build())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.stages.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order. The first failing stage aborts the run.
    pub fn run(&self, input: &SignalTable) -> EmgResult<SignalTable> {
        let ctx = StageContext::from_table(input);
        let start = Instant::now();

        let mut current = input.clone();
        for stage in &self.stages {
            let stage_start = Instant::now();
            current = stage.process(&current, &ctx)?;
            debug!(
                pipeline = %self.name,
                stage = stage.name(),
                columns = current.columns().len(),
                elapsed_us = stage_start.elapsed().as_micros() as u64,
                "Stage complete"
            );
        }

        debug!(
            pipeline = %self.name,
            rows = current.rows(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Pipeline complete"
        );
        Ok(current)
    }
}

impl SignalStage for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, input: &SignalTable, _ctx: &StageContext) -> EmgResult<SignalTable> {
        self.run(input)
    }
}

impl PipelineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: Vec::new(),
        }
    }

    pub fn add_stage(&mut self, stage: Box<dyn SignalStage>) -> &mut Self {
        self.stages.push(stage);
        self
    }

    pub fn add_elapsed_time(&mut self, stage: ElapsedTimeStage) -> &mut Self {
        self.add_stage(Box::new(stage))
    }

    pub fn add_bandpass(&mut self, config: BandpassConfig) -> &mut Self {
        self.add_stage(Box::new(EnvelopeStage::bandpass(config)))
    }

    pub fn add_moving_average_of(&mut self, label: &str) -> &mut Self {
        self.add_stage(Box::new(EnvelopeStage::moving_average_of(label)))
    }

    pub fn add_rms_of(&mut self, label: &str, window_ms: f64) -> &mut Self {
        self.add_stage(Box::new(EnvelopeStage::rms_of(label, window_ms)))
    }

    pub fn add_normalize(&mut self) -> &mut Self {
        self.add_stage(Box::new(NormalizeStage))
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            name: self.name,
            stages: self.stages,
        }
    }
}

/// Run the standard preprocessing chain on `table`
pub fn preprocess(table: &SignalTable, config: &ProcessingConfig) -> EmgResult<SignalTable> {
    config.validate_for(table.frequency())?;
    Pipeline::preprocessing(config)?.run(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emg_core::{EmgError, TableSettings};

    fn raw_table(rows: usize) -> SignalTable {
        SignalTable::from_columns(
            vec![
                ("Timestamp_4680", (0..rows).map(|i| 5000.0 + i as f64).collect()),
                (
                    "CH1_4680",
                    (0..rows).map(|i| ((i as f64) * 0.37).sin() * 2.0).collect(),
                ),
                (
                    "CH2_4680",
                    (0..rows).map(|i| ((i as f64) * 0.11).cos() + 0.5).collect(),
                ),
                ("Event_4680", vec![0.0; rows]),
            ],
            TableSettings::new(
                vec!["CH1_4680".to_string(), "CH2_4680".to_string()],
                "Timestamp_4680",
                "Event_4680",
            ),
        )
        .unwrap()
    }

    #[test]
    fn test_pipeline_builder() {
        let mut builder = PipelineBuilder::new("Test Pipeline");
        builder.add_normalize();
        let pipeline = builder.build();

        assert_eq!(pipeline.name(), "Test Pipeline");
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.stage_names(), vec!["Normalize"]);
    }

    #[test]
    fn test_preprocessing_stage_order() {
        let pipeline = Pipeline::preprocessing(&ProcessingConfig::default()).unwrap();
        assert_eq!(
            pipeline.stage_names(),
            vec!["Elapsed Time", "Bandpass", "Moving Average", "RMS", "Normalize"]
        );
    }

    #[test]
    fn test_preprocess_adds_derived_channels() {
        let input = raw_table(3000);
        let output = preprocess(&input, &ProcessingConfig::default()).unwrap();

        assert_eq!(
            output.channel_names(),
            &[
                "CH1_4680",
                "CH2_4680",
                "Bandpass 1_4680",
                "Bandpass 2_4680",
                "Moving Average 1_4680",
                "Moving Average 2_4680",
                "RMS 1_4680",
                "RMS 2_4680",
            ]
        );
        assert_eq!(output.time_name(), "Elapse (s)");
        assert_eq!(output.rows(), input.rows());

        // Raw channels untouched and unnormalized
        assert_eq!(output.column("CH1_4680").unwrap(), input.column("CH1_4680").unwrap());
        assert!(output
            .column_entry("CH2_4680")
            .unwrap()
            .shares_buffer(input.column_entry("CH2_4680").unwrap()));

        // Derived channels span [0, 1]
        for name in ["Bandpass 1_4680", "RMS 2_4680", "Moving Average 1_4680"] {
            let values: Vec<f64> = output
                .column(name)
                .unwrap()
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .collect();
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert!(min.abs() < 1e-12, "{} min {}", name, min);
            assert!((max - 1.0).abs() < 1e-12, "{} max {}", name, max);
        }

        // Input untouched
        assert_eq!(input.columns().len(), 4);
        assert_eq!(input.time_name(), "Timestamp_4680");
    }

    #[test]
    fn test_leading_nans() {
        let output = preprocess(&raw_table(3000), &ProcessingConfig::default()).unwrap();

        let moving = output.column("Moving Average 1_4680").unwrap();
        assert!(moving[..1023].iter().all(|v| v.is_nan()));
        assert!(moving[1023].is_finite());

        let rms = output.column("RMS 1_4680").unwrap();
        assert!(rms[..101].iter().all(|v| v.is_nan()));
        assert!(rms[101].is_finite());
    }

    #[test]
    fn test_stage_failure_is_fatal() {
        let mut input = raw_table(100);
        input.set_time_name("Timestamp_9999");
        assert!(matches!(
            preprocess(&input, &ProcessingConfig::default()),
            Err(EmgError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_cutoff_for_rate() {
        let mut config = ProcessingConfig::default();
        config.bandpass.lowpass_hz = 900.0;
        assert!(matches!(
            preprocess(&raw_table(100), &config),
            Err(EmgError::Configuration { .. })
        ));
    }
}
