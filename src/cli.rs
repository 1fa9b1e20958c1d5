//! Command-line interface parsing for adhan
//!
//! The only argument is an optional positional index into the configured
//! city list.

use clap::Parser;
use thiserror::Error;

use crate::config::{CityConfig, Config};

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// The city index is past the end of the configured list
    #[error("Invalid city index: {index}. {count} cities configured (valid: 0..{count})")]
    InvalidCity { index: usize, count: usize },
}

/// adhan - Show the next prayer and the time remaining until it
#[derive(Parser, Debug)]
#[command(name = "adhan")]
#[command(about = "Next prayer time and today's prayer schedule")]
#[command(version)]
pub struct Cli {
    /// Index of the city in the configured list (default: 0)
    ///
    /// Examples:
    ///   adhan       # First configured city
    ///   adhan 2     # Third configured city
    #[arg(value_name = "CITY_INDEX")]
    pub city: Option<usize>,
}

impl Cli {
    /// Picks the selected city from the configuration
    ///
    /// # Returns
    /// * `Ok(&CityConfig)` for a valid index (0 when none was given)
    /// * `Err(CliError::InvalidCity)` if the index is out of range
    pub fn select_city<'a>(&self, config: &'a Config) -> Result<&'a CityConfig, CliError> {
        let index = self.city.unwrap_or(0);
        config.cities.get(index).ok_or(CliError::InvalidCity {
            index,
            count: config.cities.len(),
        })
    }
}
