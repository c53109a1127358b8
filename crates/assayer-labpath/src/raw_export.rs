//! Reader for exported LCMS run data.
//!
//! Vendor RAW parsing happens outside this workspace; the acquisition
//! wrapper exports each run as a single JSON document holding the analog
//! channel, one TIC per ionisation mode, and the scan table. This reader
//! loads that document once and answers the [`RawData`] queries from memory.
//!
//! All scans of one mode must share a mass axis so that scan averaging is a
//! pointwise mean; a row of the wrong length is a shape fault at load time.

use serde::Deserialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use assayer_common::error::AssayerError;
use assayer_common::spectrum::{IonMode, MassSpectrum, RawData};
use assayer_common::trace::{nearest_index, AnalogTrace, TicTrace};

#[derive(Debug, Clone, Deserialize)]
struct ChannelData {
    times: Vec<f64>,
    intensities: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct ScanTable {
    masses: Vec<f64>,
    times: Vec<f64>,
    /// One row per scan, parallel to `times`, each row parallel to `masses`.
    intensities: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDocument {
    analog: ChannelData,
    traces: HashMap<String, ChannelData>,
    scans: HashMap<String, ScanTable>,
}

/// One acquired run, backed by its JSON export.
#[derive(Debug, Clone)]
pub struct JsonRawExport {
    analog: ChannelData,
    traces: HashMap<IonMode, ChannelData>,
    scans: HashMap<IonMode, ScanTable>,
}

impl JsonRawExport {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AssayerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|_| AssayerError::InputMissing(path.to_path_buf()))?;
        if contents.is_empty() {
            return Err(AssayerError::InputMissing(path.to_path_buf()));
        }
        let document: RawDocument = serde_json::from_str(&contents).map_err(|e| {
            AssayerError::Io(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("raw export {}: {e}", path.display()),
            ))
        })?;
        JsonRawExport::from_document(document)
    }

    fn from_document(document: RawDocument) -> Result<Self, AssayerError> {
        if document.analog.times.len() != document.analog.intensities.len() {
            return Err(AssayerError::shape(
                "analog channel",
                document.analog.times.len(),
                document.analog.intensities.len(),
            ));
        }

        let mut traces = HashMap::new();
        for (mode, channel) in document.traces {
            let mode = IonMode::from_str(&mode)?;
            if channel.times.len() != channel.intensities.len() {
                return Err(AssayerError::shape(
                    "TIC channel",
                    channel.times.len(),
                    channel.intensities.len(),
                ));
            }
            traces.insert(mode, channel);
        }

        let mut scans = HashMap::new();
        for (mode, table) in document.scans {
            let mode = IonMode::from_str(&mode)?;
            if table.times.len() != table.intensities.len() {
                return Err(AssayerError::shape(
                    "scan table",
                    table.times.len(),
                    table.intensities.len(),
                ));
            }
            for row in &table.intensities {
                if row.len() != table.masses.len() {
                    return Err(AssayerError::shape("scan row", table.masses.len(), row.len()));
                }
            }
            scans.insert(mode, table);
        }

        Ok(JsonRawExport {
            analog: document.analog,
            traces,
            scans,
        })
    }

    fn scan_table(&self, mode: IonMode) -> Result<&ScanTable, AssayerError> {
        self.scans.get(&mode).ok_or_else(|| {
            AssayerError::Io(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("raw export carries no scan data for {mode}"),
            ))
        })
    }
}

impl RawData for JsonRawExport {
    fn get_analog_trace(&self) -> Result<AnalogTrace, AssayerError> {
        AnalogTrace::new(self.analog.times.clone(), self.analog.intensities.clone())
    }

    fn get_trace(&self, mode: IonMode) -> Result<TicTrace, AssayerError> {
        let channel = self.traces.get(&mode).ok_or_else(|| {
            AssayerError::Io(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("raw export carries no TIC for {mode}"),
            ))
        })?;
        TicTrace::new(mode, channel.times.clone(), channel.intensities.clone())
    }

    fn get_mass_spectrum(
        &self,
        time: f64,
        mode: IonMode,
        average: usize,
    ) -> Result<MassSpectrum, AssayerError> {
        let table = self.scan_table(mode)?;
        let centre = nearest_index(&table.times, time).ok_or_else(|| {
            AssayerError::NoPeaksFound(format!("empty scan table for {mode}"))
        })?;

        let first = centre.saturating_sub(average);
        let last = (centre + average).min(table.times.len() - 1);
        let window = &table.intensities[first..=last];

        let intensities = if window.len() == 1 {
            window[0].clone()
        } else {
            let mut averaged = vec![0.0; table.masses.len()];
            for row in window {
                for (acc, v) in averaged.iter_mut().zip(row) {
                    *acc += v;
                }
            }
            for v in averaged.iter_mut() {
                *v /= window.len() as f64;
            }
            averaged
        };

        MassSpectrum::new(mode, table.masses.clone(), intensities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn document() -> RawDocument {
        RawDocument {
            analog: ChannelData {
                times: vec![0.0, 0.5, 1.0],
                intensities: vec![0.1, 1.0, 0.2],
            },
            traces: HashMap::from([(
                "ES+".to_string(),
                ChannelData {
                    times: vec![0.0, 0.5, 1.0],
                    intensities: vec![10.0, 100.0, 20.0],
                },
            )]),
            scans: HashMap::from([(
                "ES+".to_string(),
                ScanTable {
                    masses: vec![100.0, 200.0, 300.0],
                    times: vec![0.0, 0.5, 1.0],
                    intensities: vec![
                        vec![1.0, 2.0, 3.0],
                        vec![4.0, 5.0, 6.0],
                        vec![7.0, 8.0, 9.0],
                    ],
                },
            )]),
        }
    }

    #[test]
    fn nearest_scan_is_returned() {
        let export = JsonRawExport::from_document(document()).unwrap();
        let spectrum = export
            .get_mass_spectrum(0.6, IonMode::Positive, 0)
            .unwrap();
        assert_eq!(spectrum.intensities, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn averaging_clips_to_bounds() {
        let export = JsonRawExport::from_document(document()).unwrap();
        // centred on the last scan, the 2k+1 window only has two rows left
        let spectrum = export
            .get_mass_spectrum(1.0, IonMode::Positive, 1)
            .unwrap();
        assert_eq!(spectrum.intensities, vec![5.5, 6.5, 7.5]);
        // full-window average around the middle scan
        let spectrum = export
            .get_mass_spectrum(0.5, IonMode::Positive, 1)
            .unwrap();
        assert_eq!(spectrum.intensities, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn ragged_scan_row_is_shape_mismatch() {
        let mut doc = document();
        doc.scans.get_mut("ES+").unwrap().intensities[1] = vec![1.0, 2.0];
        assert!(matches!(
            JsonRawExport::from_document(doc),
            Err(AssayerError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn unknown_mode_key_is_rejected() {
        let mut doc = document();
        let table = doc.scans.remove("ES+").unwrap();
        doc.scans.insert("APCI".to_string(), table);
        assert!(matches!(
            JsonRawExport::from_document(doc),
            Err(AssayerError::UnknownMode(_))
        ));
    }

    #[test]
    fn missing_file_is_input_missing() {
        let err = JsonRawExport::open("/nonexistent/run.json").unwrap_err();
        assert!(matches!(err, AssayerError::InputMissing(_)));
    }

    #[test]
    fn empty_file_is_input_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.flush().unwrap();
        let err = JsonRawExport::open(file.path()).unwrap_err();
        assert!(matches!(err, AssayerError::InputMissing(_)));
    }
}
