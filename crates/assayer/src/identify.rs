//! Matching detected m/z peaks against the expected-results catalogue.

use assayer_common::catalogue::ExpectedResults;
use assayer_common::config::PeakPickerParams;
use assayer_common::error::AssayerError;
use assayer_common::spectrum::{IonMode, MassSpectrumExperimentalHit, RawData};

use crate::peaks::{pick_spectrum_peaks, pick_tic_peaks};

fn default_tic_params() -> PeakPickerParams {
    PeakPickerParams::with_height_distance(0.2, 50)
}

fn default_ms_params() -> PeakPickerParams {
    PeakPickerParams::with_height_distance(0.5, 30)
}

/// Identify expected ions in one acquired run.
///
/// With `direct_injection` (forced when no `time` is given) the analysis
/// time is the retention time of the first detected TIC peak; a flat TIC is
/// a `NoPeaksFound` fault. Otherwise the supplied `time` (minutes) is used
/// as-is.
///
/// The spectrum at the analysis time is peak-picked and every
/// (MS peak, catalogue match) pair within `atol` Daltons becomes one hit.
/// The outer loop runs over MS peaks in ascending m/z, the inner loop over
/// catalogue matches in the catalogue's ascending-m/z order, so repeated
/// calls yield identical lists. Duplicate matches of one catalogue entry by
/// nearby MS peaks are preserved for the caller to judge.
pub fn identify_hits<R: RawData + ?Sized>(
    raw: &R,
    expected: &ExpectedResults,
    mode: IonMode,
    atol: f64,
    direct_injection: bool,
    time: Option<f64>,
    tic_peak_params: Option<&PeakPickerParams>,
    ms_peak_params: Option<&PeakPickerParams>,
) -> Result<Vec<MassSpectrumExperimentalHit>, AssayerError> {
    let direct_injection = direct_injection || time.is_none();

    let time_in_minutes = if direct_injection {
        let mut tic = raw.get_trace(mode)?;
        let params = tic_peak_params.cloned().unwrap_or_else(default_tic_params);
        let tic_peaks = pick_tic_peaks(&mut tic, &params);
        let first = tic_peaks.first().ok_or_else(|| {
            AssayerError::NoPeaksFound(format!("TIC trace ({mode}) in direct injection"))
        })?;
        log::debug!(
            "direct injection: analysing first TIC peak at {:.3} min",
            first.time
        );
        first.time
    } else {
        // checked above: direct_injection is forced whenever time is None
        time.expect("explicit retention time")
    };

    let mut spectrum = raw.get_mass_spectrum(time_in_minutes, mode, 0)?;
    let params = ms_peak_params.cloned().unwrap_or_else(default_ms_params);
    let ms_peaks = pick_spectrum_peaks(&spectrum, &params);

    for peak in &ms_peaks {
        for matched in expected.find(peak, atol) {
            spectrum
                .experimental_hits
                .push(MassSpectrumExperimentalHit::new(peak, matched, time_in_minutes));
        }
    }

    log::debug!(
        "identified {} hits from {} MS peaks at {:.3} min ({mode})",
        spectrum.experimental_hits.len(),
        ms_peaks.len(),
        time_in_minutes
    );
    Ok(spectrum.experimental_hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assayer_common::spectrum::{MassSpectrum, MassSpectrumResult};
    use assayer_common::trace::{AnalogTrace, TicTrace};

    /// In-memory run: one TIC per mode and one scan table shared across
    /// times (sufficient for direct-injection tests).
    pub(crate) struct FixtureRun {
        pub tic: Vec<f64>,
        pub tic_times: Vec<f64>,
        pub masses: Vec<f64>,
        pub intensities: Vec<f64>,
    }

    impl RawData for FixtureRun {
        fn get_analog_trace(&self) -> Result<AnalogTrace, AssayerError> {
            AnalogTrace::new(self.tic_times.clone(), self.tic.clone())
        }

        fn get_trace(&self, mode: IonMode) -> Result<TicTrace, AssayerError> {
            TicTrace::new(mode, self.tic_times.clone(), self.tic.clone())
        }

        fn get_mass_spectrum(
            &self,
            _time: f64,
            mode: IonMode,
            _average: usize,
        ) -> Result<MassSpectrum, AssayerError> {
            MassSpectrum::new(mode, self.masses.clone(), self.intensities.clone())
        }
    }

    fn gaussian_bump(len: usize, centre: usize, width: f64) -> Vec<f64> {
        (0..len)
            .map(|i| (-((i as f64 - centre as f64) / width).powi(2)).exp())
            .collect()
    }

    fn run_with_peak_at(mz: f64) -> FixtureRun {
        let masses: Vec<f64> = (0..200).map(|i| mz - 100.0 + i as f64).collect();
        FixtureRun {
            tic: gaussian_bump(400, 120, 15.0),
            tic_times: (0..400).map(|i| i as f64 * 0.01).collect(),
            masses,
            intensities: gaussian_bump(200, 100, 2.0),
        }
    }

    fn catalogue(mz: f64, formula: &str) -> ExpectedResults {
        ExpectedResults::from_entries(vec![MassSpectrumResult {
            mz_value: mz,
            mode: IonMode::Positive,
            formula: formula.to_string(),
            charge: 2,
        }])
        .unwrap()
    }

    #[test]
    fn direct_injection_hit_carries_both_mz_values() {
        // expected-mass scenario: catalogue at 500.30, observed apex 500.35
        let run = run_with_peak_at(500.35);
        let expected = catalogue(500.30, "C30H40N6_M2");
        let hits = identify_hits(
            &run,
            &expected,
            IonMode::Positive,
            0.4,
            true,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.formula, "C30H40N6_M2");
        assert_eq!(hit.mz_value, 500.35);
        assert_eq!(hit.mz_expected, 500.30);
        assert!((hit.mz_value - hit.mz_expected).abs() <= 0.4);
        assert!(((hit.mz_value - hit.mz_expected).abs() / hit.mz_expected - 1.0e-4).abs() < 1e-5);
        // analysis time is the first TIC peak
        assert!((hit.time - 1.2).abs() < 1e-9);
    }

    #[test]
    fn flat_tic_surfaces_no_peaks_found() {
        let mut run = run_with_peak_at(500.35);
        run.tic = vec![1.0; run.tic.len()];
        let expected = catalogue(500.30, "C30H40N6_M2");
        let err = identify_hits(
            &run,
            &expected,
            IonMode::Positive,
            0.4,
            true,
            None,
            None,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, AssayerError::NoPeaksFound(_)));
    }

    #[test]
    fn missing_time_forces_direct_injection() {
        let run = run_with_peak_at(500.35);
        let expected = catalogue(500.30, "C30H40N6_M2");
        // direct_injection = false but no time given: still resolved via TIC
        let hits = identify_hits(
            &run,
            &expected,
            IonMode::Positive,
            0.4,
            false,
            None,
            None,
            None,
        )
        .unwrap();
        assert!((hits[0].time - 1.2).abs() < 1e-9);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let run = run_with_peak_at(500.35);
        let expected = catalogue(500.30, "C30H40N6_M2");
        let call = || {
            identify_hits(
                &run,
                &expected,
                IonMode::Positive,
                0.4,
                true,
                None,
                None,
                None,
            )
            .unwrap()
        };
        assert_eq!(call(), call());
    }

    #[test]
    fn peak_at_tolerance_edge_is_a_hit() {
        // 500.5 and 500.0 are exactly representable, so |delta| == atol holds
        let run = run_with_peak_at(500.5);
        let expected = catalogue(500.0, "X_M0");
        let hits = identify_hits(
            &run,
            &expected,
            IonMode::Positive,
            0.5,
            true,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(hits.len(), 1);
    }
}
