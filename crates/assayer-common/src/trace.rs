use serde::{Deserialize, Serialize};

use crate::error::AssayerError;
use crate::spectrum::IonMode;

/// Min-max normalisation to [0, 1].
///
/// If the range of values is zero (which would mean dividing by zero), the
/// values are returned unchanged.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(max - min).is_normal() {
        return values.to_vec();
    }
    values.iter().map(|&v| (v - min) / (max - min)).collect()
}

/// Index of the value closest to `target`. `None` on an empty slice.
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut min_diff = f64::MAX;
    let mut closest = None;
    for (index, value) in values.iter().enumerate() {
        let diff = (value - target).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = Some(index);
        }
    }
    closest
}

/// A single detected maximum on a total-ion chromatogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TicTracePeak {
    pub mode: IonMode,
    /// Retention time, minutes.
    pub time: f64,
    /// Intensity at the apex, in the trace's raw units.
    pub intensity: f64,
}

/// Total ion chromatogram for one ionisation mode.
///
/// `times` are minutes and monotonically increasing; `intensities` are raw
/// counts (the peak finder normalises internally). `peaks` is filled in by
/// peak detection and starts empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicTrace {
    pub mode: IonMode,
    pub times: Vec<f64>,
    pub intensities: Vec<f64>,
    pub peaks: Vec<TicTracePeak>,
}

impl TicTrace {
    pub fn new(mode: IonMode, times: Vec<f64>, intensities: Vec<f64>) -> Result<Self, AssayerError> {
        if times.len() != intensities.len() {
            return Err(AssayerError::shape("TIC trace", times.len(), intensities.len()));
        }
        Ok(TicTrace {
            mode,
            times,
            intensities,
            peaks: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// A detected analog peak with its integration window.
///
/// `lhs <= time <= rhs` (minutes). `relative_integral` is this peak's area
/// divided by the summed area of all peaks detected in the same call, so the
/// values of one detection pass sum to 1. `relative_height` is the contour
/// height at which the width was measured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalogTracePeak {
    pub time: f64,
    pub intensity: f64,
    pub relative_integral: f64,
    pub relative_height: f64,
    pub lhs: f64,
    pub rhs: f64,
}

/// Analog detector (UV / ELSD) chromatogram.
///
/// Intensities are divided by their maximum at construction; the
/// pre-normalisation maximum is kept in `raw_max` for callers that need
/// absolute scale back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalogTrace {
    pub times: Vec<f64>,
    pub intensities: Vec<f64>,
    pub raw_max: f64,
    pub peaks: Vec<AnalogTracePeak>,
}

impl AnalogTrace {
    pub fn new(times: Vec<f64>, raw_intensities: Vec<f64>) -> Result<Self, AssayerError> {
        if times.len() != raw_intensities.len() {
            return Err(AssayerError::shape(
                "analog trace",
                times.len(),
                raw_intensities.len(),
            ));
        }
        let raw_max = raw_intensities
            .iter()
            .cloned()
            .fold(f64::NEG_INFINITY, f64::max);
        let intensities = if raw_max.is_normal() {
            raw_intensities.iter().map(|&v| v / raw_max).collect()
        } else {
            raw_intensities
        };
        Ok(AnalogTrace {
            times,
            intensities,
            raw_max,
            peaks: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_spans_unit_interval() {
        let normalized = min_max_normalize(&[2.0, 4.0, 6.0]);
        assert_eq!(normalized, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalize_flat_returns_unchanged() {
        let normalized = min_max_normalize(&[3.0, 3.0, 3.0]);
        assert_eq!(normalized, vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn nearest_index_picks_closest() {
        let times = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&times, 1.4), Some(1));
        assert_eq!(nearest_index(&times, 1.6), Some(2));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn analog_trace_keeps_raw_max() {
        let trace = AnalogTrace::new(vec![0.0, 1.0, 2.0], vec![1.0, 4.0, 2.0]).unwrap();
        assert_eq!(trace.raw_max, 4.0);
        assert_eq!(trace.intensities, vec![0.25, 1.0, 0.5]);
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let err = TicTrace::new(IonMode::Positive, vec![0.0, 1.0], vec![1.0]).unwrap_err();
        assert!(matches!(err, AssayerError::ShapeMismatch { .. }));
    }
}
