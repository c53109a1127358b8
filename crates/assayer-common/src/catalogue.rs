use ordered_float::OrderedFloat;

use crate::error::AssayerError;
use crate::spectrum::{MassPeak, MassSpectrumResult};

/// The expected-results catalogue: every ion the current experiment could
/// produce, indexed for tolerance lookup.
///
/// Entries are kept sorted by m/z so a lookup is a binary search to the
/// lower edge of the window followed by a forward walk, and matches come
/// back in ascending m/z. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct ExpectedResults {
    entries: Vec<MassSpectrumResult>,
}

impl ExpectedResults {
    /// Build a catalogue, validating the schema: charges must be positive.
    pub fn from_entries(mut entries: Vec<MassSpectrumResult>) -> Result<Self, AssayerError> {
        for entry in &entries {
            if entry.charge == 0 {
                return Err(AssayerError::MalformedCatalogue(format!(
                    "formula `{}` has charge 0",
                    entry.formula
                )));
            }
            if !entry.mz_value.is_finite() || entry.mz_value <= 0.0 {
                return Err(AssayerError::MalformedCatalogue(format!(
                    "formula `{}` has non-positive m/z {}",
                    entry.formula, entry.mz_value
                )));
            }
        }
        // formula as tie-break keeps lookup order stable however the source
        // map iterated
        entries.sort_by(|a, b| {
            OrderedFloat(a.mz_value)
                .cmp(&OrderedFloat(b.mz_value))
                .then_with(|| a.formula.cmp(&b.formula))
        });
        Ok(ExpectedResults { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MassSpectrumResult> {
        self.entries.iter()
    }

    /// All catalogue entries of the peak's mode within `atol` Daltons of the
    /// peak, ascending by m/z. The window is inclusive on both edges: a peak
    /// exactly at the tolerance boundary matches.
    pub fn find(&self, peak: &MassPeak, atol: f64) -> Vec<&MassSpectrumResult> {
        let lower = peak.mz_value - atol;
        let upper = peak.mz_value + atol;
        let start = self
            .entries
            .partition_point(|e| OrderedFloat(e.mz_value) < OrderedFloat(lower));
        self.entries[start..]
            .iter()
            .take_while(|e| e.mz_value <= upper)
            .filter(|e| e.mode == peak.mode)
            .collect()
    }
}
