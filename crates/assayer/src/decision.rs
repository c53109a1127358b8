//! Rule-based decision makers over parsed instrument data.
//!
//! Each decision maker is a total function from its inputs plus a settings
//! sub-record to a verdict and its supporting context. Faults (missing
//! peaks, malformed formulas, shape mismatches) are surfaced to the caller;
//! a decision is never "passed because we could not check".

use std::collections::BTreeSet;
use std::path::Path;

use ordered_float::OrderedFloat;

use assayer_common::catalogue::ExpectedResults;
use assayer_common::config::{DecisionCriteria, MsDefaults, NmrCriteria};
use assayer_common::error::AssayerError;
use assayer_common::spectrum::{IonMode, MassSpectrumExperimentalHit, NmrSpectrum, RawData};
use assayer_common::trace::AnalogTracePeak;

use crate::compare::compare_spectra;
use crate::identify::identify_hits;
use crate::peaks::pick_analog_peaks;

/// Direct-injection expected-mass check.
///
/// Runs the hit identifier on the first TIC peak with the tuned defaults
/// from the settings table. Passes iff at least one expected ion was
/// observed; the hits ride along either way.
pub fn expected_mass<R: RawData + ?Sized>(
    raw: &R,
    expected: &ExpectedResults,
    mode: IonMode,
    ms: &MsDefaults,
) -> Result<(bool, Vec<MassSpectrumExperimentalHit>), AssayerError> {
    let hits = identify_hits(
        raw,
        expected,
        mode,
        ms.peak_match_tolerance,
        true,
        None,
        Some(&ms.tic_peak_params),
        Some(&ms.ms_peak_params),
    )?;
    Ok((!hits.is_empty(), hits))
}

/// Metal count encoded in a formula label.
///
/// The substring after the first `_` carries structural metadata; its
/// character at index 1 is the metal count. The convention is positional
/// and undocumented upstream, so the parse failure is its own error kind
/// rather than a silent zero.
pub fn metal_count(formula: &str) -> Result<usize, AssayerError> {
    formula
        .split('_')
        .nth(1)
        .and_then(|meta| meta.chars().nth(1))
        .and_then(|c| c.to_digit(10))
        .map(|n| n as usize)
        .ok_or_else(|| AssayerError::FormulaParseFailure(formula.to_string()))
}

/// Expected-mass check for metal complexes.
///
/// High-metal-count assignments are only trusted when they are corroborated:
/// a hit whose metal count reaches `criteria.metals_mz[0]` survives only if
/// at least `criteria.metals_mz[1]` hits share its formula. Hits below the
/// metal threshold pass through unconditionally. A formula the convention
/// cannot be read from is fatal to the whole call.
pub fn expected_mass_metals<R: RawData + ?Sized>(
    raw: &R,
    expected: &ExpectedResults,
    mode: IonMode,
    ms: &MsDefaults,
    criteria: &DecisionCriteria,
) -> Result<(bool, Vec<MassSpectrumExperimentalHit>), AssayerError> {
    let (_, hits) = expected_mass(raw, expected, mode, ms)?;
    let [metal_threshold, support_needed] = criteria.metals_mz;

    let mut pruned = Vec::new();
    for hit in &hits {
        let metals = metal_count(&hit.formula)?;
        if metals >= metal_threshold {
            let support = hits.iter().filter(|h| h.formula == hit.formula).count();
            if support >= support_needed {
                pruned.push(hit.clone());
            } else {
                log::debug!(
                    "pruning {}-metal hit `{}`: {} of {} supporting hits",
                    metals,
                    hit.formula,
                    support,
                    support_needed
                );
            }
        } else {
            pruned.push(hit.clone());
        }
    }
    Ok((!pruned.is_empty(), pruned))
}

/// Round to two decimals as an exact integer key, so rounded peaks can live
/// in ordinary sets.
fn centi(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Does the reaction's NMR peak list differ enough from its reagents'?
///
/// Criterion 1 (count): the reaction may not gain or lose more than
/// `criteria.peak_number` peaks relative to the union of the reagent peak
/// lists. Criterion 2 (shift): after removing every reagent peak (rounded
/// to two decimals, set semantics) from the rounded reaction set, at least
/// half of `|union|` reaction peaks must remain. Passes iff both hold.
pub fn different_from_reagents(
    reaction_peaks: &[f64],
    reagents: &[Vec<f64>],
    criteria: &DecisionCriteria,
) -> bool {
    let union: BTreeSet<OrderedFloat<f64>> = reagents
        .iter()
        .flatten()
        .map(|&p| OrderedFloat(p))
        .collect();

    let count_diff = (union.len() as i64 - reaction_peaks.len() as i64).unsigned_abs() as usize;
    if count_diff > criteria.peak_number {
        log::debug!(
            "reaction differs from reagents by {} peaks, above the allowed {}",
            count_diff,
            criteria.peak_number
        );
        return false;
    }

    let mut reaction_set: BTreeSet<i64> = reaction_peaks.iter().map(|&p| centi(p)).collect();
    for reagent_peak in &union {
        reaction_set.remove(&centi(reagent_peak.into_inner()));
    }
    reaction_set.len() as f64 >= 0.5 * union.len() as f64
}

/// Outcome of the LC-first workflow: the overall verdict, one hit list per
/// analog peak (empty for peaks below the integral threshold), and the
/// analog peaks themselves.
#[derive(Debug, Clone)]
pub struct LcFirstOutcome {
    pub decision: bool,
    pub per_peak_hits: Vec<Vec<MassSpectrumExperimentalHit>>,
    pub analog_peaks: Vec<AnalogTracePeak>,
}

/// LC-first expected-mass check.
///
/// Detects analog peaks on the UV trace; every peak whose relative integral
/// reaches `threshold` (inclusive) is chased into the mass domain at
/// `peak time + lc_ms_flowpath`, the fixed plumbing delay between detector
/// and source. The decision is true iff any retained peak yielded a hit.
pub fn expected_lcms<R: RawData + ?Sized>(
    raw: &R,
    expected: &ExpectedResults,
    mode: IonMode,
    threshold: f64,
    ms: &MsDefaults,
) -> Result<LcFirstOutcome, AssayerError> {
    let mut analog = raw.get_analog_trace()?;
    let analog_peaks = pick_analog_peaks(
        &mut analog,
        &ms.analog_peaks_params,
        ms.solvent_front,
        ms.lc_run_end,
        ms.integral_rel_height,
    )?;

    let mut per_peak_hits = Vec::with_capacity(analog_peaks.len());
    for peak in &analog_peaks {
        if peak.relative_integral >= threshold {
            let ms_time = peak.time + ms.lc_ms_flowpath / 60.0;
            let hits = identify_hits(
                raw,
                expected,
                mode,
                ms.peak_match_tolerance,
                false,
                Some(ms_time),
                Some(&ms.tic_peak_params),
                Some(&ms.ms_peak_params),
            )?;
            per_peak_hits.push(hits);
        } else {
            per_peak_hits.push(Vec::new());
        }
    }

    let decision = per_peak_hits.iter().any(|hits| !hits.is_empty());
    Ok(LcFirstOutcome {
        decision,
        per_peak_hits,
        analog_peaks,
    })
}

/// Does the test spectrum replicate the reference signature?
///
/// Thin wrapper over the DTW comparator: crops to the ppm window, compares
/// against the union of the references, optionally archives the comparison
/// record. Returns the verdict with the distance behind it.
pub fn same_as_reference(
    test: &NmrSpectrum,
    references: &[NmrSpectrum],
    criteria: &NmrCriteria,
    archive_path: Option<&Path>,
) -> Result<(bool, f64), AssayerError> {
    let comparison = compare_spectra(
        test,
        references,
        criteria.distance_threshold,
        criteria.pruning_threshold,
        criteria.ppm_range,
    )?;
    if let Some(path) = archive_path {
        comparison.archive(path)?;
    }
    Ok((comparison.passed, comparison.distance))
}
