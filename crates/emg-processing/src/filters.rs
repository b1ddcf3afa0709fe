//! Butterworth filters built from cascaded biquad sections

use crate::envelope::demean_rectify;
use emg_core::{EmgError, EmgResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Butterworth response shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterType {
    /// Butterworth lowpass filter
    ButterworthLowpass,
    /// Butterworth highpass filter
    ButterworthHighpass,
}

/// Single filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub filter_type: FilterType,
    /// Filter order, at least 1
    pub order: usize,
    /// Cutoff frequency (Hz)
    pub cutoff_freq: f64,
}

impl FilterConfig {
    /// Create lowpass filter configuration
    pub fn lowpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthLowpass,
            order,
            cutoff_freq,
        }
    }

    /// Create highpass filter configuration
    pub fn highpass(cutoff_freq: f64, order: usize) -> Self {
        Self {
            filter_type: FilterType::ButterworthHighpass,
            order,
            cutoff_freq,
        }
    }

    /// Check order and cutoff against the sampling rate
    pub fn validate(&self, sampling_rate: f64) -> EmgResult<()> {
        if self.order == 0 {
            return Err(EmgError::config("Filter order must be at least 1"));
        }
        if !(self.cutoff_freq.is_finite() && self.cutoff_freq > 0.0) {
            return Err(EmgError::config(format!(
                "Cutoff frequency must be positive, got {}",
                self.cutoff_freq
            )));
        }
        if self.cutoff_freq >= sampling_rate / 2.0 {
            return Err(EmgError::config(format!(
                "Cutoff frequency {} Hz must be less than Nyquist frequency {} Hz",
                self.cutoff_freq,
                sampling_rate / 2.0
            )));
        }
        Ok(())
    }
}

/// Second (or first) order section:
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
#[derive(Debug, Clone, PartialEq)]
pub struct BiquadSection {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadSection {
    fn from_coefficients(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Bilinear-transformed second order section with quality factor `q`
    fn second_order(filter_type: FilterType, k: f64, q: f64) -> Self {
        let k2 = k * k;
        let norm = k2 + k / q + 1.0;
        let a1 = 2.0 * (k2 - 1.0) / norm;
        let a2 = (k2 - k / q + 1.0) / norm;

        match filter_type {
            FilterType::ButterworthLowpass => {
                let b0 = k2 / norm;
                Self::from_coefficients(b0, 2.0 * b0, b0, a1, a2)
            }
            FilterType::ButterworthHighpass => {
                let b0 = 1.0 / norm;
                Self::from_coefficients(b0, -2.0 * b0, b0, a1, a2)
            }
        }
    }

    /// Real-pole section used by odd orders
    fn first_order(filter_type: FilterType, k: f64) -> Self {
        let norm = k + 1.0;
        let a1 = (k - 1.0) / norm;

        match filter_type {
            FilterType::ButterworthLowpass => {
                let b0 = k / norm;
                Self::from_coefficients(b0, b0, 0.0, a1, 0.0)
            }
            FilterType::ButterworthHighpass => {
                let b0 = 1.0 / norm;
                Self::from_coefficients(b0, -b0, 0.0, a1, 0.0)
            }
        }
    }

    pub fn process_sample(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.b1 * self.x1 + self.b2 * self.x2
            - self.a1 * self.y1
            - self.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }

    /// `[b0, b1, b2, a1, a2]`
    pub fn coefficients(&self) -> [f64; 5] {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
    }
}

/// Butterworth filter of any order as a cascade of biquad sections
#[derive(Debug, Clone, PartialEq)]
pub struct ButterworthFilter {
    filter_config: FilterConfig,
    sampling_rate: f64,
    biquads: Vec<BiquadSection>,
}

impl ButterworthFilter {
    /// Design the filter for `sampling_rate`
    pub fn new(filter_config: FilterConfig, sampling_rate: f64) -> EmgResult<Self> {
        filter_config.validate(sampling_rate)?;

        let order = filter_config.order;
        let filter_type = filter_config.filter_type;
        // Pre-warp frequency for bilinear transform
        let k = (PI * filter_config.cutoff_freq / sampling_rate).tan();

        let mut biquads: Vec<BiquadSection> = (1..=order / 2)
            .map(|i| {
                let angle = (2 * i - 1) as f64 * PI / (2 * order) as f64;
                let q = 1.0 / (2.0 * angle.sin());
                BiquadSection::second_order(filter_type, k, q)
            })
            .collect();
        if order % 2 == 1 {
            biquads.push(BiquadSection::first_order(filter_type, k));
        }

        Ok(Self {
            filter_config,
            sampling_rate,
            biquads,
        })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.filter_config
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.biquads
    }

    pub fn reset(&mut self) {
        for biquad in &mut self.biquads {
            biquad.reset();
        }
    }

    /// Filter a whole column from zero initial state
    pub fn filter(&mut self, input: &[f64]) -> Vec<f64> {
        self.reset();
        input
            .iter()
            .map(|&sample| {
                self.biquads
                    .iter_mut()
                    .fold(sample, |acc, biquad| biquad.process_sample(acc))
            })
            .collect()
    }
}

/// Envelope bandpass: rectify around the mean, then a lowpass followed by a highpass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandpassConfig {
    /// Order of both filters
    pub order: usize,
    /// Lowpass cutoff (Hz)
    pub lowpass_hz: f64,
    /// Highpass cutoff (Hz)
    pub highpass_hz: f64,
}

impl Default for BandpassConfig {
    fn default() -> Self {
        Self {
            order: 2,
            lowpass_hz: 3.0,
            highpass_hz: 0.01,
        }
    }
}

impl BandpassConfig {
    pub fn validate(&self, sampling_rate: f64) -> EmgResult<()> {
        FilterConfig::lowpass(self.lowpass_hz, self.order).validate(sampling_rate)?;
        FilterConfig::highpass(self.highpass_hz, self.order).validate(sampling_rate)
    }

    /// Design both filters for `sampling_rate`
    pub fn design(&self, sampling_rate: f64) -> EmgResult<(ButterworthFilter, ButterworthFilter)> {
        let lowpass = FilterConfig::lowpass(self.lowpass_hz, self.order);
        let highpass = FilterConfig::highpass(self.highpass_hz, self.order);
        Ok((
            ButterworthFilter::new(lowpass, sampling_rate)?,
            ButterworthFilter::new(highpass, sampling_rate)?,
        ))
    }

    /// Apply to one column; filter state starts at zero for every call
    pub fn apply(&self, values: &[f64], sampling_rate: f64) -> EmgResult<Vec<f64>> {
        let (mut lowpass, mut highpass) = self.design(sampling_rate)?;
        let rectified = demean_rectify(values);
        Ok(highpass.filter(&lowpass.filter(&rectified)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f64 = 1024.0;

    fn sine(freq: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / FS).sin())
            .collect()
    }

    fn tail_peak(values: &[f64]) -> f64 {
        values[values.len() / 2..]
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    #[test]
    fn test_second_order_matches_closed_form() {
        let filter = ButterworthFilter::new(FilterConfig::lowpass(3.0, 2), FS).unwrap();
        assert_eq!(filter.sections().len(), 1);

        let k = (PI * 3.0 / FS).tan();
        let norm = k * k + std::f64::consts::SQRT_2 * k + 1.0;
        let [b0, b1, b2, a1, a2] = filter.sections()[0].coefficients();
        assert!((b0 - k * k / norm).abs() < 1e-15);
        assert!((b1 - 2.0 * b0).abs() < 1e-15);
        assert!((b2 - b0).abs() < 1e-15);
        assert!((a1 - 2.0 * (k * k - 1.0) / norm).abs() < 1e-15);
        assert!((a2 - (k * k - std::f64::consts::SQRT_2 * k + 1.0) / norm).abs() < 1e-15);
    }

    #[test]
    fn test_section_count() {
        for (order, sections) in [(1, 1), (2, 1), (3, 2), (4, 2), (6, 3)] {
            let filter = ButterworthFilter::new(FilterConfig::highpass(10.0, order), FS).unwrap();
            assert_eq!(filter.sections().len(), sections, "order {}", order);
        }
    }

    #[test]
    fn test_lowpass_dc_gain_and_attenuation() {
        let mut filter = ButterworthFilter::new(FilterConfig::lowpass(10.0, 4), FS).unwrap();

        let dc = filter.filter(&vec![1.0; 4096]);
        assert!((dc[4095] - 1.0).abs() < 1e-6);

        let high = filter.filter(&sine(200.0, 4096));
        assert!(tail_peak(&high) < 0.01);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = ButterworthFilter::new(FilterConfig::highpass(20.0, 2), FS).unwrap();
        let out = filter.filter(&vec![1.0; 4096]);
        assert!(out[4095].abs() < 1e-6);

        let pass = filter.filter(&sine(200.0, 4096));
        assert!(tail_peak(&pass) > 0.95);
    }

    #[test]
    fn test_filter_state_resets_between_columns() {
        let mut filter = ButterworthFilter::new(FilterConfig::lowpass(3.0, 2), FS).unwrap();
        let input = sine(1.0, 512);
        let first = filter.filter(&input);
        let second = filter.filter(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_cutoffs() {
        assert!(ButterworthFilter::new(FilterConfig::lowpass(600.0, 2), FS).is_err());
        assert!(ButterworthFilter::new(FilterConfig::lowpass(0.0, 2), FS).is_err());
        assert!(ButterworthFilter::new(FilterConfig::lowpass(5.0, 0), FS).is_err());
    }

    #[test]
    fn test_bandpass_output_length_and_finite() {
        let input: Vec<f64> = (0..2048).map(|i| ((i * 37) % 101) as f64 - 50.0).collect();
        let out = BandpassConfig::default().apply(&input, FS).unwrap();
        assert_eq!(out.len(), input.len());
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_bandpass_of_constant_is_zero() {
        let out = BandpassConfig::default().apply(&[5.0; 256], FS).unwrap();
        assert!(out.iter().all(|v| *v == 0.0));
    }
}
