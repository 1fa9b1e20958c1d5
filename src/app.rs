//! One invocation of adhan, from configuration to the printed report
//!
//! Wires the configured city, cache store, fetcher and resolver together and
//! maps every failure to an exit code.

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::debug;

use crate::cache::{cache_key, CacheStore};
use crate::cli::{Cli, CliError};
use crate::config::{Config, ConfigError};
use crate::data::Fetcher;
use crate::present;
use crate::resolver::next_prayer;
use crate::schedule::{ScheduleError, ScheduleService};

/// Everything that can end an invocation early
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// A schedule with no entries cannot name a next prayer
    #[error("Schedule for {0} has no prayer times")]
    EmptySchedule(chrono::NaiveDate),
}

impl AppError {
    /// Exit code: 2 for configuration and usage errors, 1 for missing data
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Cli(_) => 2,
            AppError::Schedule(_) | AppError::EmptySchedule(_) => 1,
        }
    }
}

/// Runs one invocation at the current local time and returns the report
pub async fn run(cli: &Cli) -> Result<String, AppError> {
    let config = Config::load()?;
    run_with(cli, &config, Local::now().naive_local()).await
}

/// Runs one invocation against an explicit configuration and clock
pub async fn run_with(cli: &Cli, config: &Config, now: NaiveDateTime) -> Result<String, AppError> {
    let city = cli.select_city(config)?;
    debug!(city = %city.name, source = ?config.source, "selected city");

    let fetcher = Fetcher::from_config(config, city)?;
    let store = CacheStore::new(config.cache_dir(), &cache_key(&city.name), config.cache_format);
    let service = ScheduleService::new(store, fetcher).with_iqamah(config.iqamah_delays()?);

    let schedule = service.today(now.date()).await?;
    let next = next_prayer(&schedule, now).ok_or(AppError::EmptySchedule(schedule.date))?;

    Ok(present::render(&schedule, &next, config.clock))
}
