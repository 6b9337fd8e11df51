//! Common routines for handling input data.
use crate::rate::RawRateRecord;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Format the error message for an input file
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().to_string_lossy())
}

/// Read a series of type `T`s from a CSV file.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<impl Iterator<Item = T>> {
    let reader = csv::Reader::from_path(file_path).with_context(|| input_err_msg(file_path))?;
    let records: Vec<T> = reader
        .into_deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| input_err_msg(file_path))?;

    ensure!(
        !records.is_empty(),
        "{}: CSV file cannot be empty",
        file_path.to_string_lossy()
    );

    Ok(records.into_iter())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    toml::from_str(&contents).with_context(|| input_err_msg(file_path))
}

/// Read the rate database from a JSON file: an array of rate records.
///
/// Individual records that fail to decode are skipped with a warning rather than aborting the
/// run; the upstream database gives no schema guarantees, and one malformed record should not
/// prevent the rest of the set from being processed. The result is keyed by rate id, in file
/// order.
pub fn read_rate_database(file_path: &Path) -> Result<IndexMap<String, RawRateRecord>> {
    let contents = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let raw: Vec<serde_json::Value> =
        serde_json::from_str(&contents).with_context(|| input_err_msg(file_path))?;

    let mut rates = IndexMap::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<RawRateRecord>(value) {
            Ok(record) => {
                rates.insert(record.id.oid.clone(), record);
            }
            Err(err) => warn!("Skipping undecodable rate record at index {index}: {err}"),
        }
    }

    ensure!(
        !rates.is_empty(),
        "{}: No valid rate records found",
        file_path.to_string_lossy()
    );

    Ok(rates)
}
