//! The per-batch summary document the orchestrator publishes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use assayer_common::error::AssayerError;
use assayer_common::spectrum::MassSpectrumExperimentalHit;

/// Result of one experiment. Only experiments that were actually evaluated
/// get an entry; a faulted experiment is logged and omitted so the summary
/// never implies a success that was not checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEntry {
    #[serde(rename = "MS_PASS")]
    pub ms_pass: bool,
    pub mz_peaks: Vec<MassSpectrumExperimentalHit>,
}

/// Write the summary with keys in ascending order (`BTreeMap` iteration).
pub fn write_summary<P: AsRef<Path>>(
    path: P,
    entries: &BTreeMap<String, SummaryEntry>,
) -> Result<(), AssayerError> {
    let file = std::fs::File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, entries)
        .map_err(|e| AssayerError::Io(std::io::Error::other(e)))
}
