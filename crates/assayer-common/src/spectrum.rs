use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AssayerError;
use crate::trace::{AnalogTrace, TicTrace};

/// Electrospray polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IonMode {
    #[serde(rename = "ES+")]
    Positive,
    #[serde(rename = "ES-")]
    Negative,
}

impl IonMode {
    pub fn as_str(&self) -> &str {
        match self {
            IonMode::Positive => "ES+",
            IonMode::Negative => "ES-",
        }
    }
}

impl FromStr for IonMode {
    type Err = AssayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES+" => Ok(IonMode::Positive),
            "ES-" => Ok(IonMode::Negative),
            other => Err(AssayerError::UnknownMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for IonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single m/z observation. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassPeak {
    pub mz_value: f64,
    pub mode: IonMode,
}

/// An expected ion: an m/z the catalogue says a given formula produces at a
/// given charge in a given mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpectrumResult {
    pub mz_value: f64,
    pub mode: IonMode,
    pub formula: String,
    /// Charge magnitude, always positive.
    pub charge: u32,
}

/// An expected ion actually observed in a spectrum.
///
/// `mz_value` is the detected peak, `mz_expected` the catalogue value; the
/// pair satisfies `|mz_value - mz_expected| <= atol` for the tolerance the
/// hit was emitted under. `time` is the retention time in minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpectrumExperimentalHit {
    pub mz_value: f64,
    pub mode: IonMode,
    pub formula: String,
    pub charge: u32,
    pub mz_expected: f64,
    pub time: f64,
}

impl MassSpectrumExperimentalHit {
    pub fn new(peak: &MassPeak, expected: &MassSpectrumResult, time: f64) -> Self {
        MassSpectrumExperimentalHit {
            mz_value: peak.mz_value,
            mode: peak.mode,
            formula: expected.formula.clone(),
            charge: expected.charge,
            mz_expected: expected.mz_value,
            time,
        }
    }
}

/// One scan (or an average of scans) from the mass spectrometer.
///
/// `masses` and `intensities` are parallel arrays with `masses`
/// monotonically non-decreasing. `experimental_hits` is accumulated by
/// identification routines and starts empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MassSpectrum {
    pub mode: IonMode,
    pub masses: Vec<f64>,
    pub intensities: Vec<f64>,
    pub experimental_hits: Vec<MassSpectrumExperimentalHit>,
}

impl MassSpectrum {
    pub fn new(mode: IonMode, masses: Vec<f64>, intensities: Vec<f64>) -> Result<Self, AssayerError> {
        if masses.len() != intensities.len() {
            return Err(AssayerError::shape(
                "mass spectrum",
                masses.len(),
                intensities.len(),
            ));
        }
        Ok(MassSpectrum {
            mode,
            masses,
            intensities,
            experimental_hits: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.masses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }

    /// Element-wise numerical closeness on both arrays, same mode.
    pub fn approx_eq(&self, other: &MassSpectrum, tol: f64) -> bool {
        self.mode == other.mode
            && self.masses.len() == other.masses.len()
            && self
                .masses
                .iter()
                .zip(&other.masses)
                .all(|(a, b)| (a - b).abs() <= tol)
            && self
                .intensities
                .iter()
                .zip(&other.intensities)
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

/// A processed 1-D NMR spectrum: chemical shift axis plus intensities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmrSpectrum {
    /// Chemical shifts, ppm, monotonically decreasing or increasing as
    /// delivered by the processing pipeline.
    pub ppm: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl NmrSpectrum {
    pub fn new(ppm: Vec<f64>, intensities: Vec<f64>) -> Result<Self, AssayerError> {
        if ppm.len() != intensities.len() {
            return Err(AssayerError::shape(
                "NMR spectrum",
                ppm.len(),
                intensities.len(),
            ));
        }
        Ok(NmrSpectrum { ppm, intensities })
    }

    pub fn len(&self) -> usize {
        self.ppm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ppm.is_empty()
    }

    /// Restrict the spectrum to the chemical-shift window `[min, max]`
    /// (inclusive on both ends).
    pub fn crop(&self, min_ppm: f64, max_ppm: f64) -> NmrSpectrum {
        let mut ppm = Vec::new();
        let mut intensities = Vec::new();
        for (&shift, &intensity) in self.ppm.iter().zip(&self.intensities) {
            if shift >= min_ppm && shift <= max_ppm {
                ppm.push(shift);
                intensities.push(intensity);
            }
        }
        NmrSpectrum { ppm, intensities }
    }
}

/// Access to one acquired LCMS run.
///
/// Implementations own whatever storage the instrument export uses; the
/// analytical pipeline only sees these three views. Traces and spectra are
/// produced fresh per call and owned by the caller.
pub trait RawData {
    /// Analog (UV / ELSD) chromatogram, times in minutes, intensities
    /// normalised by their maximum at construction.
    fn get_analog_trace(&self) -> Result<AnalogTrace, AssayerError>;

    /// Total ion chromatogram for one ionisation mode, raw intensities.
    fn get_trace(&self, mode: IonMode) -> Result<TicTrace, AssayerError>;

    /// The scan nearest `time` (minutes). `average = k` averages the 2k+1
    /// scans centred on that scan, clipped to the run's bounds.
    fn get_mass_spectrum(
        &self,
        time: f64,
        mode: IonMode,
        average: usize,
    ) -> Result<MassSpectrum, AssayerError>;
}
