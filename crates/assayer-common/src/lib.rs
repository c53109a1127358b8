pub mod catalogue;
pub mod config;
pub mod error;
pub mod logging;
pub mod spectrum;
pub mod trace;

pub use catalogue::ExpectedResults;
pub use error::AssayerError;
pub use spectrum::{
    IonMode, MassPeak, MassSpectrum, MassSpectrumExperimentalHit, MassSpectrumResult, NmrSpectrum,
    RawData,
};
pub use trace::{AnalogTrace, AnalogTracePeak, TicTrace, TicTracePeak};
