//! 1-D peak detection over traces and spectra.
//!
//! Detection always runs on a min-max normalised copy of the signal, so the
//! `height` option is a fraction of the signal's dynamic range. Analog
//! detection is additionally restricted to the usable chromatographic window
//! and augments each peak with a width-integrated relative area.

use assayer_common::config::PeakPickerParams;
use assayer_common::error::AssayerError;
use assayer_common::spectrum::{MassPeak, MassSpectrum};
use assayer_common::trace::{min_max_normalize, AnalogTrace, AnalogTracePeak, TicTrace, TicTracePeak};

/// Width of one peak measured at a relative contour height.
///
/// `left_ip` / `right_ip` are fractional sample indices where the signal
/// crosses `width_height`, interpolated between neighbouring samples and
/// clipped to the array ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakWidth {
    pub width: f64,
    pub width_height: f64,
    pub left_ip: f64,
    pub right_ip: f64,
}

/// Indices of all local maxima, plateaus resolved to their midpoint.
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut midpoints = Vec::new();
    if x.len() < 3 {
        return midpoints;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut i_ahead = i + 1;
            while i_ahead < i_max && x[i_ahead] == x[i] {
                i_ahead += 1;
            }
            if x[i_ahead] < x[i] {
                let left_edge = i;
                let right_edge = i_ahead - 1;
                midpoints.push((left_edge + right_edge) / 2);
                i = i_ahead;
            }
        }
        i += 1;
    }
    midpoints
}

/// Greedy suppression of lower peaks within `distance` samples of a higher
/// one. Spacing of exactly `distance` survives.
fn select_by_distance(peaks: &[usize], x: &[f64], distance: usize) -> Vec<bool> {
    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        x[peaks[a]]
            .partial_cmp(&x[peaks[b]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }
    keep
}

/// Topographic prominence of the peak at `peak`, with the positions of the
/// contour minima on either side.
///
/// The search walks outward until the signal rises above the peak or the
/// array ends; the lower contour is the higher of the two minima found.
fn prominence_data(x: &[f64], peak: usize) -> (f64, usize, usize) {
    let mut left_min = x[peak];
    let mut left_base = peak;
    let mut i = peak;
    while i > 0 && x[i - 1] <= x[peak] {
        i -= 1;
        if x[i] < left_min {
            left_min = x[i];
            left_base = i;
        }
    }

    let mut right_min = x[peak];
    let mut right_base = peak;
    let mut i = peak;
    while i + 1 < x.len() && x[i + 1] <= x[peak] {
        i += 1;
        if x[i] < right_min {
            right_min = x[i];
            right_base = i;
        }
    }

    let prominence = x[peak] - left_min.max(right_min);
    (prominence, left_base, right_base)
}

/// Detect indices where `x` is a local maximum satisfying `params`.
///
/// Filters are applied in order: height, distance, prominence, width. The
/// returned indices are strictly increasing.
pub fn find_peaks(x: &[f64], params: &PeakPickerParams) -> Vec<usize> {
    let mut peaks = local_maxima(x);

    if let Some(height) = params.height {
        peaks.retain(|&i| x[i] >= height);
    }
    if let Some(distance) = params.distance {
        let keep = select_by_distance(&peaks, x, distance);
        peaks = peaks
            .into_iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(p))
            .collect();
    }
    if let Some(min_prominence) = params.prominence {
        peaks.retain(|&i| prominence_data(x, i).0 >= min_prominence);
    }
    if let Some(min_width) = params.width {
        let rel_height = params.rel_height.unwrap_or(0.5);
        let widths = peak_widths(x, &peaks, rel_height);
        peaks = peaks
            .into_iter()
            .zip(widths)
            .filter_map(|(p, w)| (w.width >= min_width).then_some(p))
            .collect();
    }
    peaks
}

/// Measure each peak's width at `rel_height`.
///
/// The evaluation height is
/// `width_height = peak_y - rel_height * (peak_y - lower_contour)` with the
/// lower contour taken from the prominence bases; the contour search walks
/// outward from the apex until the signal crosses `width_height` and
/// interpolates the fractional crossing.
pub fn peak_widths(x: &[f64], peaks: &[usize], rel_height: f64) -> Vec<PeakWidth> {
    let mut widths = Vec::with_capacity(peaks.len());
    for &peak in peaks {
        let (prominence, left_base, right_base) = prominence_data(x, peak);
        let width_height = x[peak] - rel_height * prominence;

        let mut i = peak;
        while i > left_base && x[i] > width_height {
            i -= 1;
        }
        let mut left_ip = i as f64;
        if x[i] < width_height {
            left_ip += (width_height - x[i]) / (x[i + 1] - x[i]);
        }

        let mut i = peak;
        while i < right_base && x[i] > width_height {
            i += 1;
        }
        let mut right_ip = i as f64;
        if x[i] < width_height {
            right_ip -= (width_height - x[i]) / (x[i - 1] - x[i]);
        }

        widths.push(PeakWidth {
            width: right_ip - left_ip,
            width_height,
            left_ip,
            right_ip,
        });
    }
    widths
}

/// Detect TIC peaks and record them on the trace.
///
/// Thresholding runs on normalised intensities; the recorded apex intensity
/// is in the trace's raw units.
pub fn pick_tic_peaks(trace: &mut TicTrace, params: &PeakPickerParams) -> Vec<TicTracePeak> {
    let normalized = min_max_normalize(&trace.intensities);
    let indices = find_peaks(&normalized, params);
    let peaks: Vec<TicTracePeak> = indices
        .into_iter()
        .map(|i| TicTracePeak {
            mode: trace.mode,
            time: trace.times[i],
            intensity: trace.intensities[i],
        })
        .collect();
    trace.peaks = peaks.clone();
    peaks
}

/// Detect m/z peaks on a spectrum using the same normalise-then-threshold
/// rule as the traces.
pub fn pick_spectrum_peaks(spectrum: &MassSpectrum, params: &PeakPickerParams) -> Vec<MassPeak> {
    let normalized = min_max_normalize(&spectrum.intensities);
    find_peaks(&normalized, params)
        .into_iter()
        .map(|i| MassPeak {
            mz_value: spectrum.masses[i],
            mode: spectrum.mode,
        })
        .collect()
}

/// Time at a fractional sample index, linearly interpolated.
fn time_at(times: &[f64], frac_idx: f64) -> f64 {
    let lo = frac_idx.floor().max(0.0) as usize;
    let lo = lo.min(times.len() - 1);
    let hi = (lo + 1).min(times.len() - 1);
    let frac = frac_idx - lo as f64;
    times[lo] + frac * (times[hi] - times[lo])
}

/// Trapezoidal area of `y - width_height` between the interpolated width
/// boundaries, unit sample spacing, boundaries clipped to the array.
fn contour_area(y: &[f64], left_ip: f64, right_ip: f64, width_height: f64) -> f64 {
    let lo = left_ip.floor().max(0.0) as usize;
    let hi = (right_ip.ceil() as usize).min(y.len() - 1);
    let mut area = 0.0;
    for i in lo..hi {
        area += 0.5 * ((y[i] - width_height) + (y[i + 1] - width_height));
    }
    area
}

/// Detect analog peaks inside `[solvent_front, run_end]` minutes and record
/// them on the trace.
///
/// Samples outside the window are excluded before detection; a sample
/// exactly on either boundary is inside. Peak areas are integrated at
/// `integral_rel_height` and normalised so the `relative_integral` values
/// of one call sum to 1.
pub fn pick_analog_peaks(
    trace: &mut AnalogTrace,
    params: &PeakPickerParams,
    solvent_front: f64,
    run_end: f64,
    integral_rel_height: f64,
) -> Result<Vec<AnalogTracePeak>, AssayerError> {
    let start = trace.times.partition_point(|&t| t < solvent_front);
    let stop = trace.times.partition_point(|&t| t <= run_end);
    if start >= stop {
        trace.peaks.clear();
        return Ok(Vec::new());
    }
    let window_times = &trace.times[start..stop];
    let window = &trace.intensities[start..stop];
    let normalized = min_max_normalize(window);

    let indices = find_peaks(&normalized, params);
    let widths = peak_widths(&normalized, &indices, integral_rel_height);

    let areas: Vec<f64> = widths
        .iter()
        .map(|w| contour_area(&normalized, w.left_ip, w.right_ip, w.width_height))
        .collect();
    let total: f64 = areas.iter().sum();

    let peaks: Vec<AnalogTracePeak> = indices
        .iter()
        .zip(&widths)
        .zip(&areas)
        .map(|((&i, w), &area)| AnalogTracePeak {
            time: window_times[i],
            intensity: trace.intensities[start + i],
            // Degenerate flat windows carry no area; share the unit mass
            // equally so the per-call integrals still sum to 1.
            relative_integral: if total > 0.0 {
                area / total
            } else {
                1.0 / indices.len() as f64
            },
            relative_height: w.width_height,
            lhs: time_at(window_times, w.left_ip),
            rhs: time_at(window_times, w.right_ip),
        })
        .collect();

    trace.peaks = peaks.clone();
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assayer_common::spectrum::IonMode;

    /// Two triangular peaks of different heights on a flat baseline.
    fn two_peak_signal() -> Vec<f64> {
        let mut x = vec![0.0; 40];
        // tall peak at 10
        for (offset, v) in [(8, 0.3), (9, 0.7), (10, 1.0), (11, 0.7), (12, 0.3)] {
            x[offset] = v;
        }
        // shorter peak at 30
        for (offset, v) in [(28, 0.2), (29, 0.4), (30, 0.6), (31, 0.4), (32, 0.2)] {
            x[offset] = v;
        }
        x
    }

    #[test]
    fn finds_both_maxima() {
        let peaks = find_peaks(&two_peak_signal(), &PeakPickerParams::default());
        assert_eq!(peaks, vec![10, 30]);
    }

    #[test]
    fn height_filter_is_inclusive() {
        let x = two_peak_signal();
        let peaks = find_peaks(&x, &PeakPickerParams::with_height_distance(0.6, 1));
        assert_eq!(peaks, vec![10, 30]);
        let peaks = find_peaks(&x, &PeakPickerParams::with_height_distance(0.61, 1));
        assert_eq!(peaks, vec![10]);
    }

    #[test]
    fn distance_keeps_the_tallest() {
        let x = two_peak_signal();
        // both peaks lie 20 samples apart; a distance of 21 suppresses the
        // shorter one, a distance of exactly 20 keeps both
        let peaks = find_peaks(&x, &PeakPickerParams::with_height_distance(0.1, 21));
        assert_eq!(peaks, vec![10]);
        let peaks = find_peaks(&x, &PeakPickerParams::with_height_distance(0.1, 20));
        assert_eq!(peaks, vec![10, 30]);
    }

    #[test]
    fn returned_indices_respect_spacing() {
        let x = two_peak_signal();
        for distance in [1usize, 5, 10, 20, 25] {
            let params = PeakPickerParams::with_height_distance(0.0, distance);
            let peaks = find_peaks(&x, &params);
            for pair in peaks.windows(2) {
                assert!(pair[1] - pair[0] >= distance);
            }
        }
    }

    #[test]
    fn plateau_resolves_to_midpoint() {
        let x = [0.0, 1.0, 1.0, 1.0, 0.0];
        assert_eq!(local_maxima(&x), vec![2]);
    }

    #[test]
    fn width_at_half_height_is_interpolated() {
        // symmetric triangle: apex 1.0 at index 3, half height crossings at
        // fractional indices 1.5 and 4.5
        let x = [0.0, 0.25, 0.75, 1.0, 0.75, 0.25, 0.0];
        let widths = peak_widths(&x, &[3], 0.5);
        assert_eq!(widths.len(), 1);
        let w = &widths[0];
        assert!((w.width_height - 0.5).abs() < 1e-12);
        assert!((w.left_ip - 1.5).abs() < 1e-12);
        assert!((w.right_ip - 4.5).abs() < 1e-12);
        assert!((w.width - 3.0).abs() < 1e-12);
    }

    #[test]
    fn analog_relative_integrals_sum_to_one() {
        let times: Vec<f64> = (0..40).map(|i| i as f64 * 0.25).collect();
        let mut trace = AnalogTrace::new(times, two_peak_signal()).unwrap();
        let params = PeakPickerParams::with_height_distance(0.05, 5);
        let peaks = pick_analog_peaks(&mut trace, &params, 0.0, 10.0, 0.95).unwrap();
        assert_eq!(peaks.len(), 2);
        let total: f64 = peaks.iter().map(|p| p.relative_integral).sum();
        assert!((total - 1.0).abs() < 1e-9);
        for p in &peaks {
            assert!(p.lhs <= p.time && p.time <= p.rhs);
        }
        assert_eq!(trace.peaks, peaks);
    }

    #[test]
    fn analog_window_excludes_outside_peaks() {
        let times: Vec<f64> = (0..40).map(|i| i as f64 * 0.25).collect();
        let mut trace = AnalogTrace::new(times, two_peak_signal()).unwrap();
        let params = PeakPickerParams::with_height_distance(0.05, 5);
        // window boundary at t = 3.0 min falls exactly on a sample, which is
        // still inside; the peak at t = 7.5 min is excluded
        let peaks = pick_analog_peaks(&mut trace, &params, 0.0, 3.0, 0.95).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].time - 2.5).abs() < 1e-12);
    }

    #[test]
    fn spectrum_peaks_carry_mz_and_mode() {
        let masses: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let spectrum =
            MassSpectrum::new(IonMode::Positive, masses, two_peak_signal()).unwrap();
        let peaks =
            pick_spectrum_peaks(&spectrum, &PeakPickerParams::with_height_distance(0.5, 5));
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].mz_value, 110.0);
        assert_eq!(peaks[1].mz_value, 130.0);
        assert!(peaks.iter().all(|p| p.mode == IonMode::Positive));
    }
}
