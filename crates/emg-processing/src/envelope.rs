//! Column kernels: rectification, trailing windows, normalization, elapsed time
//!
//! Trailing windows follow the usual strict semantics: the first `window - 1`
//! outputs are NaN, and any NaN inside a window makes that output NaN.

use emg_core::{EmgError, EmgResult};

/// Mean of the non-NaN values, NaN if there are none
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// `|x - mean|` for every sample
pub fn demean_rectify(values: &[f64]) -> Vec<f64> {
    let mean = nan_mean(values);
    values.iter().map(|v| (v - mean).abs()).collect()
}

/// Samples covered by `window_seconds` at `period`, rounded down
pub fn window_samples(window_seconds: f64, period: f64) -> usize {
    (window_seconds / period).floor() as usize
}

fn check_window(window: usize) -> EmgResult<()> {
    if window == 0 {
        return Err(EmgError::config("Window length must be at least one sample"));
    }
    Ok(())
}

/// Trailing arithmetic mean over `window` samples
pub fn rolling_mean(values: &[f64], window: usize) -> EmgResult<Vec<f64>> {
    check_window(window)?;

    let mut out = vec![f64::NAN; values.len()];
    let mut sum = 0.0;
    let mut nans = 0usize;

    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            nans += 1;
        } else {
            sum += value;
        }

        if i >= window {
            let leaving = values[i - window];
            if leaving.is_nan() {
                nans -= 1;
            } else {
                sum -= leaving;
            }
        }

        if i + 1 >= window && nans == 0 {
            out[i] = sum / window as f64;
        }
    }
    Ok(out)
}

/// Trailing root-mean-square over `window` samples
pub fn rolling_rms(values: &[f64], window: usize) -> EmgResult<Vec<f64>> {
    let squares: Vec<f64> = values.iter().map(|v| v * v).collect();
    Ok(rolling_mean(&squares, window)?
        .into_iter()
        // Running sums can dip a hair below zero
        .map(|ms| if ms.is_nan() { ms } else { ms.max(0.0).sqrt() })
        .collect())
}

/// `(x - min) / (max - min)` using the column's own range.
///
/// A constant column has no range and comes back as all NaN.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        return vec![f64::NAN; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}

/// Cumulative sum of successive tick differences, divided by `ticks_per_second`.
///
/// The first difference counts as zero; a NaN tick yields NaN at that row without
/// breaking the running total.
pub fn elapsed_seconds(time: &[f64], ticks_per_second: f64) -> Vec<f64> {
    let mut total = 0.0;
    let mut out = Vec::with_capacity(time.len());

    for (i, &tick) in time.iter().enumerate() {
        let diff = if i == 0 { 0.0 } else { tick - time[i - 1] };
        if diff.is_nan() {
            out.push(f64::NAN);
        } else {
            total += diff;
            out.push(total / ticks_per_second);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            if e.is_nan() {
                assert!(a.is_nan(), "index {}: expected NaN, got {}", i, a);
            } else {
                assert!((a - e).abs() < 1e-9, "index {}: expected {}, got {}", i, e, a);
            }
        }
    }

    #[test]
    fn test_demean_rectify() {
        assert_close(&demean_rectify(&[1.0, 2.0, 3.0]), &[1.0, 0.0, 1.0]);
        assert_close(&demean_rectify(&[1.0, f64::NAN, 3.0]), &[1.0, f64::NAN, 1.0]);
    }

    #[test]
    fn test_rolling_mean() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_close(&out, &[f64::NAN, f64::NAN, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rolling_mean_window_one_is_identity() {
        let input = [3.0, -1.0, 2.5];
        assert_close(&rolling_mean(&input, 1).unwrap(), &input);
    }

    #[test]
    fn test_rolling_mean_window_longer_than_input() {
        let out = rolling_mean(&[1.0, 2.0], 5).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_rolling_mean_nan_poisons_window() {
        let out = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2).unwrap();
        assert_close(&out, &[f64::NAN, f64::NAN, f64::NAN, 3.5, 4.5]);
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(matches!(
            rolling_mean(&[1.0], 0),
            Err(EmgError::Configuration { .. })
        ));
        assert!(rolling_rms(&[1.0], 0).is_err());
    }

    #[test]
    fn test_rolling_rms() {
        let out = rolling_rms(&[3.0, -4.0, 0.0], 2).unwrap();
        assert_close(&out, &[f64::NAN, (12.5f64).sqrt(), (8.0f64).sqrt()]);
    }

    #[test]
    fn test_min_max_normalize() {
        let out = min_max_normalize(&[2.0, 4.0, f64::NAN, 6.0]);
        assert_close(&out, &[0.0, 0.5, f64::NAN, 1.0]);
    }

    #[test]
    fn test_normalize_constant_column_is_nan() {
        assert!(min_max_normalize(&[7.0; 4]).iter().all(|v| v.is_nan()));
        assert!(min_max_normalize(&[f64::NAN; 2]).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_elapsed_seconds() {
        let out = elapsed_seconds(&[1000.0, 1001.0, 1003.0, 1006.0], 1000.0);
        assert_close(&out, &[0.0, 0.001, 0.003, 0.006]);
    }

    #[test]
    fn test_elapsed_survives_rollover_gap() {
        let out = elapsed_seconds(&[10.0, 20.0, f64::NAN, 40.0, 50.0], 10.0);
        assert_close(&out, &[0.0, 1.0, f64::NAN, f64::NAN, 2.0]);
    }

    #[test]
    fn test_window_samples() {
        assert_eq!(window_samples(0.1, 1.0 / 1024.0), 102);
        assert_eq!(window_samples(1.0, 1.0 / 1024.0), 1024);
        assert_eq!(window_samples(0.001, 1.0 / 100.0), 0);
    }
}
