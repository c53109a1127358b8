//! Expected-MS catalogue files.
//!
//! Structured as `{experiment_id: {formula: {"ES+" | "ES-": {"m/z", "charge"}}}}`;
//! every schema violation is a `MalformedCatalogue` fault.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use assayer_common::catalogue::ExpectedResults;
use assayer_common::error::AssayerError;
use assayer_common::spectrum::{IonMode, MassSpectrumResult};

#[derive(Debug, Clone, Deserialize)]
struct RawIon {
    #[serde(rename = "m/z")]
    mz: f64,
    charge: u32,
}

type RawFormulaTable = HashMap<String, HashMap<String, RawIon>>;

fn catalogue_from_table(table: RawFormulaTable) -> Result<ExpectedResults, AssayerError> {
    let mut entries = Vec::new();
    for (formula, modes) in table {
        for (mode, ion) in modes {
            let mode = IonMode::from_str(&mode).map_err(|_| {
                AssayerError::MalformedCatalogue(format!(
                    "formula `{formula}` carries unknown mode `{mode}`"
                ))
            })?;
            entries.push(MassSpectrumResult {
                mz_value: ion.mz,
                mode,
                formula: formula.clone(),
                charge: ion.charge,
            });
        }
    }
    ExpectedResults::from_entries(entries)
}

/// Load the per-experiment catalogues from a catalogue file.
pub fn load_catalogues<P: AsRef<Path>>(
    path: P,
) -> Result<HashMap<String, ExpectedResults>, AssayerError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|_| AssayerError::InputMissing(path.to_path_buf()))?;
    if contents.is_empty() {
        return Err(AssayerError::InputMissing(path.to_path_buf()));
    }
    let raw: HashMap<String, RawFormulaTable> = serde_json::from_str(&contents)
        .map_err(|e| AssayerError::MalformedCatalogue(e.to_string()))?;

    let mut catalogues = HashMap::with_capacity(raw.len());
    for (experiment_id, table) in raw {
        let catalogue = catalogue_from_table(table)?;
        log::debug!(
            "catalogue `{experiment_id}`: {} expected ions",
            catalogue.len()
        );
        catalogues.insert(experiment_id, catalogue);
    }
    Ok(catalogues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assayer_common::spectrum::MassPeak;
    use std::io::Write;

    const CATALOGUE: &str = r#"{
        "EXP-001": {
            "C30H40N6_M2": {
                "ES+": {"m/z": 500.30, "charge": 2},
                "ES-": {"m/z": 498.28, "charge": 2}
            },
            "C28H36O8_M0": {
                "ES+": {"m/z": 612.20, "charge": 1}
            }
        }
    }"#;

    #[test]
    fn catalogue_file_loads_per_experiment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOGUE.as_bytes()).unwrap();
        let catalogues = load_catalogues(file.path()).unwrap();
        assert_eq!(catalogues.len(), 1);
        let catalogue = &catalogues["EXP-001"];
        assert_eq!(catalogue.len(), 3);
        let hits = catalogue.find(
            &MassPeak {
                mz_value: 500.35,
                mode: IonMode::Positive,
            },
            0.4,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].charge, 2);
    }

    #[test]
    fn unknown_mode_is_malformed() {
        let doc = CATALOGUE.replace("ES-", "APCI");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(doc.as_bytes()).unwrap();
        assert!(matches!(
            load_catalogues(file.path()),
            Err(AssayerError::MalformedCatalogue(_))
        ));
    }

    #[test]
    fn negative_charge_is_malformed() {
        let doc = CATALOGUE.replace("\"charge\": 2", "\"charge\": -2");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(doc.as_bytes()).unwrap();
        assert!(matches!(
            load_catalogues(file.path()),
            Err(AssayerError::MalformedCatalogue(_))
        ));
    }
}
