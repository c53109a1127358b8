use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::AssayerError;

/// Recognised peak-picker options, enumerated explicitly so a typo in the
/// settings file fails at load time instead of being silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeakPickerParams {
    /// Minimum height after min-max normalisation, as a fraction of the
    /// trace's dynamic range.
    pub height: Option<f64>,
    /// Minimum horizontal separation between kept peaks, in samples.
    pub distance: Option<usize>,
    /// Minimum topographic prominence after normalisation.
    pub prominence: Option<f64>,
    /// Minimum width at `rel_height`, in samples.
    pub width: Option<f64>,
    /// Relative height at which widths are measured. Defaults to 0.5.
    pub rel_height: Option<f64>,
}

impl Default for PeakPickerParams {
    fn default() -> Self {
        PeakPickerParams {
            height: None,
            distance: None,
            prominence: None,
            width: None,
            rel_height: None,
        }
    }
}

impl PeakPickerParams {
    pub fn with_height_distance(height: f64, distance: usize) -> Self {
        PeakPickerParams {
            height: Some(height),
            distance: Some(distance),
            ..Default::default()
        }
    }
}

/// The `[defaults.MS]` table: tuned instrument parameters shared by every
/// decision maker that touches LCMS data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MsDefaults {
    /// Absolute, symmetric m/z tolerance in Daltons.
    pub peak_match_tolerance: f64,
    pub tic_peak_params: PeakPickerParams,
    pub ms_peak_params: PeakPickerParams,
    pub analog_peaks_params: PeakPickerParams,
    /// Relative-integral cutoff below which an analog peak is not chased
    /// into the mass domain.
    pub analog_peak_threshold: f64,
    /// Start of the usable analog window, minutes.
    pub solvent_front: f64,
    /// End of the usable analog window, minutes.
    pub lc_run_end: f64,
    /// Relative height at which analog peak widths are integrated.
    pub integral_rel_height: f64,
    /// Plumbing delay between the analog detector and the MS source, seconds.
    pub lc_ms_flowpath: f64,
    /// Injection volume written into the autosampler queue, microlitres.
    pub injection_volume: f64,
    /// Instrument method files referenced by every queue record.
    #[serde(default)]
    pub ms_file: String,
    #[serde(default)]
    pub ms_tune_file: String,
    #[serde(default)]
    pub inlet_file: String,
}

impl Default for MsDefaults {
    fn default() -> Self {
        MsDefaults {
            peak_match_tolerance: 0.4,
            tic_peak_params: PeakPickerParams::with_height_distance(0.2, 50),
            ms_peak_params: PeakPickerParams::with_height_distance(0.5, 30),
            analog_peaks_params: PeakPickerParams::with_height_distance(0.05, 10),
            analog_peak_threshold: 0.1,
            solvent_front: 0.5,
            lc_run_end: 9.5,
            integral_rel_height: 0.95,
            lc_ms_flowpath: 6.0,
            injection_volume: 1.0,
            ms_file: String::new(),
            ms_tune_file: String::new(),
            inlet_file: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(rename = "MS")]
    pub ms: MsDefaults,
}

/// The `[workflows.decision]` table: thresholds for the rule-based decision
/// makers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionCriteria {
    /// Decision maker the runner applies to each sample. Current options are
    /// "expected_mass", "expected_mass_metals" and "expected_lcms".
    pub method: String,
    /// Ionisation mode the runner searches, "ES+" or "ES-".
    #[serde(default = "default_ion_mode")]
    pub ion_mode: String,
    /// Maximum tolerated difference between the reagent and reaction peak
    /// counts in `different_from_reagents`.
    pub peak_number: usize,
    /// Two-element list: minimum metal count for a hit to need support, and
    /// the number of same-formula hits that constitutes support.
    pub metals_mz: [usize; 2],
}

fn default_ion_mode() -> String {
    "ES+".to_string()
}

impl Default for DecisionCriteria {
    fn default() -> Self {
        DecisionCriteria {
            method: "expected_mass".to_string(),
            ion_mode: default_ion_mode(),
            peak_number: 3,
            metals_mz: [2, 2],
        }
    }
}

impl std::fmt::Display for DecisionCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "\n---- Decision Criteria ----\n\
            method: {}\n\
            ion_mode: {}\n\
            peak_number: {}\n\
            metals_mz: {:?}\n\
            ---------------------------",
            self.method, self.ion_mode, self.peak_number, self.metals_mz
        )
    }
}

/// The `[workflows.nmr]` table: thresholds for `same_as_reference`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NmrCriteria {
    /// DTW distance below which (strictly) two spectra count as the same.
    pub distance_threshold: f64,
    /// Normalised intensities below this are zeroed before alignment.
    #[serde(default = "default_pruning_threshold")]
    pub pruning_threshold: f64,
    /// Chemical-shift window compared, ppm (min, max).
    pub ppm_range: (f64, f64),
}

fn default_pruning_threshold() -> f64 {
    0.1
}

impl Default for NmrCriteria {
    fn default() -> Self {
        NmrCriteria {
            distance_threshold: 15.0,
            pruning_threshold: default_pruning_threshold(),
            ppm_range: (-2.0, 12.0),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workflows {
    pub decision: DecisionCriteria,
    #[serde(default)]
    pub nmr: NmrCriteria,
}

/// The `[paths]` table, consumed only by the CLI runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(rename = "batch-file")]
    pub batch_file: PathBuf,
    #[serde(rename = "expected-results")]
    pub expected_results: PathBuf,
    #[serde(rename = "raw-dir")]
    pub raw_dir: PathBuf,
    #[serde(rename = "nmr-dir")]
    pub nmr_dir: Option<PathBuf>,
    #[serde(rename = "summary-file")]
    pub summary_file: PathBuf,
    #[serde(rename = "queue-file")]
    pub queue_file: Option<PathBuf>,
    #[serde(rename = "rack-layout")]
    pub rack_layout: Option<String>,
    #[serde(rename = "insert-blanks", default)]
    pub insert_blanks: bool,
}

/// The full settings table, loaded once at process start and passed down by
/// sub-record. The core never reads process-wide state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub defaults: Defaults,
    pub workflows: Workflows,
    pub paths: Option<PathsConfig>,
}

impl Settings {
    /// Parse a TOML settings table. Absent or unparseable keys surface as
    /// `ConfigMissing` with the parser's key path in the message.
    pub fn from_toml_str(contents: &str) -> Result<Self, AssayerError> {
        toml::from_str(contents).map_err(|e| AssayerError::ConfigMissing(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AssayerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|_| AssayerError::InputMissing(path.to_path_buf()))?;
        if contents.is_empty() {
            return Err(AssayerError::InputMissing(path.to_path_buf()));
        }
        Settings::from_toml_str(&contents)
    }
}
