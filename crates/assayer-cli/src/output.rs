use std::collections::BTreeMap;

use assayer_common::error::AssayerError;
use assayer_labpath::summary::SummaryEntry;

/// Fold per-experiment outcomes into the summary map.
///
/// Faulted experiments are logged and left out: the summary must never
/// carry an entry that implies a result that was not actually checked.
pub fn collect_summary(
    results: Vec<(String, Result<SummaryEntry, AssayerError>)>,
) -> BTreeMap<String, SummaryEntry> {
    let mut summary = BTreeMap::new();
    for (experiment_id, result) in results {
        match result {
            Ok(entry) => {
                summary.insert(experiment_id, entry);
            }
            Err(err) => {
                log::warn!(
                    "[assayer::collect_summary] Recording experiment `{}` as failed: {err}",
                    experiment_id
                );
            }
        }
    }
    summary
}
