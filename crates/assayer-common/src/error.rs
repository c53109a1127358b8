use std::path::PathBuf;
use thiserror::Error;

/// Faults the decision pipeline distinguishes. Decision makers surface these
/// to the caller; none of them is ever downgraded to a passing result.
#[derive(Error, Debug)]
pub enum AssayerError {
    #[error("input file missing or empty: {}", .0.display())]
    InputMissing(PathBuf),
    #[error("malformed expected-results catalogue: {0}")]
    MalformedCatalogue(String),
    #[error("no peaks found: {0}")]
    NoPeaksFound(String),
    #[error("array length mismatch in {context}: {left} vs {right}")]
    ShapeMismatch {
        context: String,
        left: usize,
        right: usize,
    },
    #[error("unknown ionisation mode: {0} (expected ES+ or ES-)")]
    UnknownMode(String),
    #[error("unrecognised rack layout: {0}")]
    InvalidRackLayout(String),
    #[error("cannot parse a metal count from formula `{0}`")]
    FormulaParseFailure(String),
    #[error("missing or invalid settings key: {0}")]
    ConfigMissing(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssayerError {
    /// Helper for the recurring parallel-array check on traces and spectra.
    pub fn shape(context: &str, left: usize, right: usize) -> Self {
        AssayerError::ShapeMismatch {
            context: context.to_string(),
            left,
            right,
        }
    }
}
