//! Table-to-table processing stages

use crate::envelope::{
    elapsed_seconds, min_max_normalize, rolling_mean, rolling_rms, window_samples,
};
use crate::filters::BandpassConfig;
use emg_core::{EmgError, EmgResult, SignalTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Label of the bandpass stage outputs
pub const BANDPASS_LABEL: &str = "Bandpass";
/// Label of the moving-average stage outputs
pub const MOVING_AVERAGE_LABEL: &str = "Moving Average";
/// Label of the RMS stage outputs
pub const RMS_LABEL: &str = "RMS";

/// Characters of group tag stripped from a channel name (`CH1_4680` → `1_4680`)
const GROUP_TAG_LEN: usize = 2;

/// Name of a derived column: the stage label, a space, and the channel identity
pub fn derived_name(label: &str, channel: &str) -> String {
    let identity: String = channel.chars().skip(GROUP_TAG_LEN).collect();
    format!("{} {}", label, identity)
}

/// Derived names for every channel; fails when two channels share an identity
fn derived_names(label: &str, channels: &[String]) -> EmgResult<Vec<String>> {
    let names: Vec<String> = channels.iter().map(|c| derived_name(label, c)).collect();
    for (i, name) in names.iter().enumerate() {
        if let Some(j) = names[..i].iter().position(|n| n == name) {
            return Err(EmgError::Schema {
                reason: format!(
                    "Channels '{}' and '{}' both derive '{}'",
                    channels[j], channels[i], name
                ),
            });
        }
    }
    Ok(names)
}

/// State shared by every stage of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct StageContext {
    /// Channel designations of the table the run started from
    pub original_channels: Vec<String>,
}

impl StageContext {
    pub fn from_table(table: &SignalTable) -> Self {
        Self {
            original_channels: table.channel_names().to_vec(),
        }
    }
}

/// One step of a processing pipeline.
///
/// A stage never modifies its input; it returns a new table with the same row
/// count.
pub trait SignalStage: Send + Sync {
    /// Stage name for logs
    fn name(&self) -> &str;

    fn process(&self, input: &SignalTable, ctx: &StageContext) -> EmgResult<SignalTable>;
}

/// Appends an elapsed-seconds column and makes it the time designation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElapsedTimeStage {
    /// Name of the new time column
    pub column: String,
    /// Raw ticks per second of the source time column
    pub ticks_per_second: f64,
}

impl Default for ElapsedTimeStage {
    fn default() -> Self {
        Self {
            column: "Elapse (s)".to_string(),
            ticks_per_second: 1000.0,
        }
    }
}

impl SignalStage for ElapsedTimeStage {
    fn name(&self) -> &str {
        "Elapsed Time"
    }

    fn process(&self, input: &SignalTable, _ctx: &StageContext) -> EmgResult<SignalTable> {
        if !(self.ticks_per_second.is_finite() && self.ticks_per_second > 0.0) {
            return Err(EmgError::config(format!(
                "Ticks per second must be positive, got {}",
                self.ticks_per_second
            )));
        }

        let elapsed = elapsed_seconds(input.time()?, self.ticks_per_second);
        let mut output = input.clone();
        output.insert_column(self.column.clone(), elapsed)?;
        output.set_time_name(self.column.clone());
        Ok(output)
    }
}

/// Per-column transformation applied by an [`EnvelopeStage`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnvelopeKind {
    /// Mean removal, rectification and Butterworth smoothing
    Bandpass(BandpassConfig),
    /// Trailing mean over the table's `window_length()`
    MovingAverage,
    /// Trailing RMS over a fixed window in milliseconds
    Rms { window_ms: f64 },
}

impl EnvelopeKind {
    pub fn label(&self) -> &'static str {
        match self {
            EnvelopeKind::Bandpass(_) => BANDPASS_LABEL,
            EnvelopeKind::MovingAverage => MOVING_AVERAGE_LABEL,
            EnvelopeKind::Rms { .. } => RMS_LABEL,
        }
    }

    fn apply(&self, values: &[f64], table: &SignalTable) -> EmgResult<Vec<f64>> {
        match self {
            EnvelopeKind::Bandpass(config) => config.apply(values, table.frequency()),
            EnvelopeKind::MovingAverage => rolling_mean(values, table.window_length()),
            EnvelopeKind::Rms { window_ms } => {
                rolling_rms(values, window_samples(window_ms / 1000.0, table.period()))
            }
        }
    }
}

/// Which columns an envelope stage reads, one per original channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelSource {
    /// The original channels themselves
    Original,
    /// The outputs of an earlier stage with this label
    Derived(String),
}

/// Derives one column per original channel and registers it as a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeStage {
    pub kind: EnvelopeKind,
    pub source: ChannelSource,
}

impl EnvelopeStage {
    pub fn new(kind: EnvelopeKind, source: ChannelSource) -> Self {
        Self { kind, source }
    }

    /// Bandpass of the original channels
    pub fn bandpass(config: BandpassConfig) -> Self {
        Self::new(EnvelopeKind::Bandpass(config), ChannelSource::Original)
    }

    /// Moving average of another stage's outputs
    pub fn moving_average_of(label: &str) -> Self {
        Self::new(EnvelopeKind::MovingAverage, ChannelSource::Derived(label.to_string()))
    }

    /// RMS of another stage's outputs
    pub fn rms_of(label: &str, window_ms: f64) -> Self {
        Self::new(EnvelopeKind::Rms { window_ms }, ChannelSource::Derived(label.to_string()))
    }

    fn source_column(&self, channel: &str) -> String {
        match &self.source {
            ChannelSource::Original => channel.to_string(),
            ChannelSource::Derived(label) => derived_name(label, channel),
        }
    }
}

impl SignalStage for EnvelopeStage {
    fn name(&self) -> &str {
        self.kind.label()
    }

    fn process(&self, input: &SignalTable, ctx: &StageContext) -> EmgResult<SignalTable> {
        let label = self.kind.label();
        let names = derived_names(label, &ctx.original_channels)?;
        let mut output = input.clone();
        let mut channels = input.channel_names().to_vec();

        for (channel, name) in ctx.original_channels.iter().zip(names) {
            let source = self.source_column(channel);
            let values = self.kind.apply(input.column(&source)?, input)?;

            debug!(stage = label, source = %source, output = %name, "Derived column");
            output.insert_column(name.clone(), values)?;
            if !channels.contains(&name) {
                channels.push(name);
            }
        }

        output.set_channel_names(channels);
        Ok(output)
    }
}

/// Min-max normalizes every channel except the original ones
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStage;

impl SignalStage for NormalizeStage {
    fn name(&self) -> &str {
        "Normalize"
    }

    fn process(&self, input: &SignalTable, ctx: &StageContext) -> EmgResult<SignalTable> {
        let mut output = input.clone();
        for channel in input.channel_names() {
            if ctx.original_channels.contains(channel) {
                continue;
            }
            output.insert_column(channel.clone(), min_max_normalize(input.column(channel)?))?;
        }
        Ok(output)
    }
}
