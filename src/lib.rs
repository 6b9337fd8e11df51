//! Common functionality for the electricity rate calculator.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod billing;
pub mod cli;
pub mod filter;
pub mod input;
pub mod log;
pub mod normalize;
pub mod output;
pub mod rate;
pub mod settings;
pub mod tier;
pub mod usage;

#[cfg(test)]
mod fixture;

/// Get the folder in which user configuration is stored
pub fn get_ratecalc_config_dir() -> PathBuf {
    dirs::config_dir().unwrap_or_default().join("ratecalc")
}
