pub mod dynamic_time_warping;

pub use dynamic_time_warping::{compare_arrays, compare_spectra, NmrComparison};
