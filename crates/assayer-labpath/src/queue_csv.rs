//! The autosampler's injection queue file.
//!
//! Comma-separated with a header row, one record per injection, Unix
//! newlines. When blank injections are requested, each sample is preceded
//! by a blank drawn from the fixed wash position `2:48`.

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

use assayer_common::config::MsDefaults;
use assayer_common::error::AssayerError;

use crate::batch::{RackLayout, SampleBatch};

/// Rack position blanks are drawn from.
const BLANK_LOCATION: &str = "2:48";

/// One injection, in the autosampler's column layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueRecord {
    #[serde(rename = "INDEX")]
    pub index: u32,
    #[serde(rename = "FILE_NAME")]
    pub file_name: String,
    #[serde(rename = "FILE_TEXT")]
    pub file_text: String,
    #[serde(rename = "MS_FILE")]
    pub ms_file: String,
    #[serde(rename = "MS_TUNE_FILE")]
    pub ms_tune_file: String,
    #[serde(rename = "INLET_FILE")]
    pub inlet_file: String,
    #[serde(rename = "SAMPLE_LOCATION")]
    pub sample_location: String,
    #[serde(rename = "INJ_VOL")]
    pub inj_vol: f64,
}

/// Serialise a batch into queue records.
///
/// Indices are 1-based and sequential over everything written, blanks
/// included, so a blank injected before sample `n` is named by its own
/// index (`BLANK3`), not the sample's.
pub fn build_queue(
    batch: &SampleBatch,
    ms: &MsDefaults,
    layout: RackLayout,
    insert_blanks: bool,
) -> Vec<QueueRecord> {
    let mut records = Vec::new();
    let mut index = 0u32;

    for sample in &batch.samples {
        if insert_blanks {
            index += 1;
            records.push(QueueRecord {
                index,
                file_name: format!("BLANK{index}"),
                file_text: String::new(),
                ms_file: ms.ms_file.clone(),
                ms_tune_file: ms.ms_tune_file.clone(),
                inlet_file: ms.inlet_file.clone(),
                sample_location: BLANK_LOCATION.to_string(),
                inj_vol: ms.injection_volume,
            });
        }
        index += 1;
        records.push(QueueRecord {
            index,
            file_name: sample.label(),
            file_text: sample.label(),
            ms_file: ms.ms_file.clone(),
            ms_tune_file: ms.ms_tune_file.clone(),
            inlet_file: ms.inlet_file.clone(),
            sample_location: layout.location(sample.position),
            inj_vol: ms.injection_volume,
        });
    }
    records
}

pub fn write_queue<P: AsRef<Path>>(
    path: P,
    records: &[QueueRecord],
) -> Result<(), AssayerError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(path.as_ref())
        .map_err(|e| AssayerError::Io(std::io::Error::other(e)))?;
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AssayerError::Io(std::io::Error::other(e)))?;
    }
    writer
        .flush()
        .map_err(|e| AssayerError::Io(std::io::Error::other(e)))?;
    Ok(())
}

pub fn read_queue<P: AsRef<Path>>(path: P) -> Result<Vec<QueueRecord>, AssayerError> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|_| AssayerError::InputMissing(path.to_path_buf()))?;
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: QueueRecord =
            result.map_err(|e| AssayerError::Io(std::io::Error::other(e)))?;
        records.push(record);
    }
    Ok(records)
}
