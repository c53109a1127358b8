//! Processed NMR spectrum files.
//!
//! The spectrometer-side processing exports each experiment as a JSON
//! document with parallel `ppm` and `intensities` arrays; TopSpin-native
//! dataset parsing stays outside this workspace.

use serde::Deserialize;
use std::path::Path;

use assayer_common::error::AssayerError;
use assayer_common::spectrum::NmrSpectrum;

#[derive(Debug, Clone, Deserialize)]
struct NmrDocument {
    ppm: Vec<f64>,
    intensities: Vec<f64>,
}

pub fn load_nmr_spectrum<P: AsRef<Path>>(path: P) -> Result<NmrSpectrum, AssayerError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .map_err(|_| AssayerError::InputMissing(path.to_path_buf()))?;
    if contents.is_empty() {
        return Err(AssayerError::InputMissing(path.to_path_buf()));
    }
    let document: NmrDocument = serde_json::from_str(&contents).map_err(|e| {
        AssayerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("NMR export {}: {e}", path.display()),
        ))
    })?;
    NmrSpectrum::new(document.ppm, document.intensities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn spectrum_loads_and_validates_shape() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"ppm": [0.0, 1.0, 2.0], "intensities": [0.1, 0.9, 0.2]}"#)
            .unwrap();
        let spectrum = load_nmr_spectrum(file.path()).unwrap();
        assert_eq!(spectrum.len(), 3);

        let mut ragged = tempfile::NamedTempFile::new().unwrap();
        ragged
            .write_all(br#"{"ppm": [0.0, 1.0], "intensities": [0.1]}"#)
            .unwrap();
        assert!(matches!(
            load_nmr_spectrum(ragged.path()),
            Err(AssayerError::ShapeMismatch { .. })
        ));
    }
}
