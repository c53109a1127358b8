//! NMR spectrum comparison by dynamic time warping.
//!
//! DTW tolerates the small chemical-shift perturbations that defeat a direct
//! point-by-point correlation: the alignment may stretch either sequence
//! locally, as long as both are consumed monotonically. Multiple references
//! are summed into a union signature, so a test spectrum passes if it matches
//! the combined fingerprint of any supplied reference.

use std::path::Path;

use dtw_rs::{Algorithm, DynamicTimeWarping};
use serde::{Deserialize, Serialize};

use assayer_common::error::AssayerError;
use assayer_common::spectrum::NmrSpectrum;
use assayer_common::trace::min_max_normalize;

/// Outcome of one comparison, with the preprocessed arrays and the optimal
/// alignment path retained for archiving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmrComparison {
    /// Accumulated DTW cost between the pruned arrays, Euclidean sample
    /// metric, symmetric step pattern.
    pub distance: f64,
    /// `distance < threshold`, strict.
    pub passed: bool,
    pub distance_threshold: f64,
    pub pruning_threshold: f64,
    /// Normalised, pruned union reference.
    pub reference: Vec<f64>,
    /// Normalised, pruned test array.
    pub test: Vec<f64>,
    /// Optimal alignment path over the two arrays.
    pub path: Vec<(usize, usize)>,
}

impl NmrComparison {
    /// Write the comparison as a JSON record, the archive format the
    /// orchestrator keeps alongside each batch.
    pub fn archive<P: AsRef<Path>>(&self, path: P) -> Result<(), AssayerError> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| AssayerError::Io(std::io::Error::other(e)))
    }
}

/// Replace values below `threshold` (strictly) with zero.
fn prune(values: &mut [f64], threshold: f64) {
    for v in values.iter_mut() {
        if *v < threshold {
            *v = 0.0;
        }
    }
}

/// Compare a test intensity array against one or more reference arrays.
///
/// All arrays are truncated to the shortest length, each reference is
/// min-max normalised independently, multiple references are summed
/// pointwise and the sum re-normalised, the test array is normalised, both
/// sides are noise-pruned, and the DTW distance between them decides the
/// verdict (strict `<` against `distance_threshold`).
pub fn compare_arrays(
    test: &[f64],
    references: &[&[f64]],
    distance_threshold: f64,
    pruning_threshold: f64,
) -> Result<NmrComparison, AssayerError> {
    if references.is_empty() {
        return Err(AssayerError::shape("DTW reference set", 0, 1));
    }
    let length = references
        .iter()
        .map(|r| r.len())
        .chain([test.len()])
        .min()
        .unwrap_or(0);
    if length == 0 {
        return Err(AssayerError::shape("DTW input", test.len(), length));
    }

    // union signature: normalise each reference, sum, re-normalise
    let mut summed = vec![0.0; length];
    for reference in references {
        let normalized = min_max_normalize(&reference[..length]);
        for (acc, value) in summed.iter_mut().zip(&normalized) {
            *acc += value;
        }
    }
    let mut reference = min_max_normalize(&summed);
    let mut test = min_max_normalize(&test[..length]);

    prune(&mut reference, pruning_threshold);
    prune(&mut test, pruning_threshold);

    let dtw = DynamicTimeWarping::between(&reference, &test);
    let distance = dtw.distance();

    log::debug!(
        "DTW distance {:.4} over {} samples (threshold {:.4})",
        distance,
        length,
        distance_threshold
    );

    Ok(NmrComparison {
        distance,
        passed: distance < distance_threshold,
        distance_threshold,
        pruning_threshold,
        reference,
        test,
        path: dtw.path(),
    })
}

/// Compare spectra over a chemical-shift window.
///
/// Both sides are cropped to `[min, max]` ppm before their intensity arrays
/// are handed to [`compare_arrays`].
pub fn compare_spectra(
    test: &NmrSpectrum,
    references: &[NmrSpectrum],
    distance_threshold: f64,
    pruning_threshold: f64,
    ppm_range: (f64, f64),
) -> Result<NmrComparison, AssayerError> {
    let (min_ppm, max_ppm) = ppm_range;
    let test_window = test.crop(min_ppm, max_ppm);
    let reference_windows: Vec<NmrSpectrum> = references
        .iter()
        .map(|r| r.crop(min_ppm, max_ppm))
        .collect();
    let reference_arrays: Vec<&[f64]> = reference_windows
        .iter()
        .map(|r| r.intensities.as_slice())
        .collect();
    compare_arrays(
        &test_window.intensities,
        &reference_arrays,
        distance_threshold,
        pruning_threshold,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(len: usize, centres: &[usize]) -> Vec<f64> {
        (0..len)
            .map(|i| {
                centres
                    .iter()
                    .map(|&c| (-((i as f64 - c as f64) / 3.0).powi(2)).exp())
                    .sum()
            })
            .collect()
    }

    #[test]
    fn identical_arrays_have_zero_distance() {
        let x = signature(120, &[30, 70]);
        let comparison = compare_arrays(&x, &[&x], 1e-6, 0.05).unwrap();
        assert_eq!(comparison.distance, 0.0);
        assert!(comparison.passed);
    }

    #[test]
    fn threshold_is_strict() {
        let x = signature(120, &[30, 70]);
        // zero distance against a zero threshold: not strictly below
        let comparison = compare_arrays(&x, &[&x], 0.0, 0.05).unwrap();
        assert_eq!(comparison.distance, 0.0);
        assert!(!comparison.passed);
    }

    #[test]
    fn dtw_absorbs_small_shifts_but_not_missing_peaks() {
        let reference = signature(200, &[60, 120]);
        let shifted = signature(200, &[63, 123]);
        let missing = signature(200, &[60]);

        // a 3-sample chemical-shift perturbation warps away almost freely
        let near = compare_arrays(&shifted, &[&reference], 1.0, 0.05).unwrap();
        assert!(near.passed, "shifted distance was {}", near.distance);

        // a reference peak with no counterpart must be paid for in full
        let far = compare_arrays(&missing, &[&reference], 1.0, 0.05).unwrap();
        assert!(!far.passed, "missing-peak distance was {}", far.distance);
        assert!(near.distance < far.distance);
    }

    #[test]
    fn verdict_is_symmetric_for_preprocessed_inputs() {
        let a = signature(150, &[40, 90]);
        let b = signature(150, &[43, 93]);
        let threshold = 5.0;
        let forward = compare_arrays(&a, &[&b], threshold, 0.05).unwrap();
        let backward = compare_arrays(&b, &[&a], threshold, 0.05).unwrap();
        assert_eq!(forward.passed, backward.passed);
    }

    #[test]
    fn union_signature_contains_every_reference_peak() {
        let ref_a = signature(150, &[40]);
        let ref_b = signature(150, &[100]);
        let test = signature(150, &[40, 100]);
        let joint =
            compare_arrays(&test, &[ref_a.as_slice(), ref_b.as_slice()], 1.0, 0.1).unwrap();
        // the non-overlapping peaks survive summation and re-normalisation
        assert!((joint.reference[40] - 1.0).abs() < 1e-9);
        assert!((joint.reference[100] - 1.0).abs() < 1e-9);
        // a product carrying both signatures matches the combined fingerprint
        assert!(joint.passed);
    }

    #[test]
    fn arrays_truncate_to_shortest() {
        let long = signature(200, &[50]);
        let short = signature(120, &[50]);
        let comparison = compare_arrays(&long, &[&short], f64::MAX, 0.05).unwrap();
        assert_eq!(comparison.test.len(), 120);
        assert_eq!(comparison.reference.len(), 120);
    }

    #[test]
    fn empty_input_is_shape_mismatch() {
        let x = signature(50, &[20]);
        assert!(matches!(
            compare_arrays(&[], &[&x], 1.0, 0.05),
            Err(AssayerError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            compare_arrays(&x, &[], 1.0, 0.05),
            Err(AssayerError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn pruning_zeroes_the_baseline() {
        let x = signature(100, &[50]);
        let comparison = compare_arrays(&x, &[&x], 1.0, 0.05).unwrap();
        assert!(comparison
            .test
            .iter()
            .all(|&v| v == 0.0 || v >= 0.05));
    }
}
