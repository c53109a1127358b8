//! Sample batch files and the closed instrument vocabularies.
//!
//! A batch file maps 1-based rack slots (as text keys) to the sample
//! loaded there, its solvent and the NMR experiments requested for it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use assayer_common::error::AssayerError;

/// Deuterated solvents the benchtop NMR recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Solvent {
    #[serde(rename = "CDCl3")]
    Chloroform,
    #[serde(rename = "DMSO-d6")]
    Dmso,
    #[serde(rename = "D2O")]
    Water,
    #[serde(rename = "MeOD")]
    Methanol,
    #[serde(rename = "CD3CN")]
    Acetonitrile,
}

/// NMR experiment parameter sets the workstation can queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NmrExperiment {
    #[serde(rename = "PROTON")]
    Proton,
    #[serde(rename = "PROTON_EXTENDED")]
    ProtonExtended,
    #[serde(rename = "CARBON")]
    Carbon,
    #[serde(rename = "FLUORINE")]
    Fluorine,
    #[serde(rename = "PHOSPHORUS")]
    Phosphorus,
}

/// Physical rack geometries the gripper knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RackLayout {
    Kuka,
    Pal,
}

impl RackLayout {
    fn vials_per_tray(&self) -> u32 {
        match self {
            RackLayout::Kuka => 48,
            RackLayout::Pal => 54,
        }
    }

    /// `rack:slot` location of a 1-based batch position, row-major within a
    /// tray.
    pub fn location(&self, position: u32) -> String {
        let per_tray = self.vials_per_tray();
        let tray = 1 + (position - 1) / per_tray;
        let slot = 1 + (position - 1) % per_tray;
        format!("{tray}:{slot}")
    }
}

impl FromStr for RackLayout {
    type Err = AssayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "KUKA" => Ok(RackLayout::Kuka),
            "PAL" => Ok(RackLayout::Pal),
            other => Err(AssayerError::InvalidRackLayout(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SampleRecord {
    /// Arbitrary identifier or nested attribute map.
    sample_info: serde_json::Value,
    solvent: Solvent,
    #[serde(default)]
    nmr_experiments: Vec<NmrExperiment>,
}

/// One sample of a batch, at its 1-based rack slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub position: u32,
    pub sample_info: serde_json::Value,
    pub solvent: Solvent,
    pub nmr_experiments: Vec<NmrExperiment>,
}

impl Sample {
    /// Stable label for file naming and summary keys: the `sample_info`
    /// string itself, or a position-derived fallback when the info is a
    /// nested map.
    pub fn label(&self) -> String {
        match &self.sample_info {
            serde_json::Value::String(s) => s.clone(),
            _ => format!("sample_{}", self.position),
        }
    }
}

/// An ordered sample batch, loaded from a batch file.
#[derive(Debug, Clone, Default)]
pub struct SampleBatch {
    pub samples: Vec<Sample>,
}

impl SampleBatch {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssayerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|_| AssayerError::InputMissing(path.to_path_buf()))?;
        if contents.is_empty() {
            return Err(AssayerError::InputMissing(path.to_path_buf()));
        }
        SampleBatch::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, AssayerError> {
        let records: HashMap<String, SampleRecord> =
            serde_json::from_str(contents).map_err(|e| {
                AssayerError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("batch file: {e}"),
                ))
            })?;

        let mut samples = Vec::with_capacity(records.len());
        for (key, record) in records {
            let position: u32 = key.parse().map_err(|_| {
                AssayerError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("batch position `{key}` is not an integer"),
                ))
            })?;
            samples.push(Sample {
                position,
                sample_info: record.sample_info,
                solvent: record.solvent,
                nmr_experiments: record.nmr_experiments,
            });
        }
        samples.sort_by_key(|s| s.position);
        log::debug!("loaded batch of {} samples", samples.len());
        Ok(SampleBatch { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: &str = r#"{
        "2": {
            "sample_info": "JS-2-081-A",
            "solvent": "CDCl3",
            "nmr_experiments": ["PROTON", "CARBON"]
        },
        "1": {
            "sample_info": {"step": 3, "plate": "P1"},
            "solvent": "DMSO-d6",
            "nmr_experiments": ["PROTON"]
        }
    }"#;

    #[test]
    fn batch_is_ordered_by_position() {
        let batch = SampleBatch::from_json_str(BATCH).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.samples[0].position, 1);
        assert_eq!(batch.samples[0].solvent, Solvent::Dmso);
        assert_eq!(batch.samples[0].label(), "sample_1");
        assert_eq!(batch.samples[1].label(), "JS-2-081-A");
        assert_eq!(
            batch.samples[1].nmr_experiments,
            vec![NmrExperiment::Proton, NmrExperiment::Carbon]
        );
    }

    #[test]
    fn unknown_solvent_is_rejected() {
        let doc = BATCH.replace("CDCl3", "toluene");
        assert!(SampleBatch::from_json_str(&doc).is_err());
    }

    #[test]
    fn unknown_experiment_is_rejected() {
        let doc = BATCH.replace("CARBON", "COSY");
        assert!(SampleBatch::from_json_str(&doc).is_err());
    }

    #[test]
    fn rack_layouts_map_slots() {
        assert_eq!(RackLayout::Kuka.location(1), "1:1");
        assert_eq!(RackLayout::Kuka.location(48), "1:48");
        assert_eq!(RackLayout::Kuka.location(49), "2:1");
        assert_eq!(RackLayout::Pal.location(55), "2:1");
        assert!(matches!(
            "AGILENT".parse::<RackLayout>(),
            Err(AssayerError::InvalidRackLayout(_))
        ));
        assert_eq!("KUKA".parse::<RackLayout>().unwrap(), RackLayout::Kuka);
    }
}
