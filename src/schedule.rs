//! Today's schedule: from the cache when present, otherwise fetched and cached
//!
//! A cache miss (or an unreadable cache) triggers exactly one fetch. A failed
//! fetch is a hard stop for the invocation and writes nothing.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::cache::CacheStore;
use crate::data::{FetchError, Fetcher, MinuteOffsets, PrayerSchedule};

/// Errors from resolving today's schedule
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Nothing cached and the upstream gave no usable data
    #[error("No prayer times available: {0}")]
    NoData(#[from] FetchError),
}

/// Reads today's schedule from the store, fetching and appending on a miss
#[derive(Debug, Clone)]
pub struct ScheduleService {
    store: CacheStore,
    fetcher: Fetcher,
    iqamah: MinuteOffsets,
}

impl ScheduleService {
    pub fn new(store: CacheStore, fetcher: Fetcher) -> Self {
        Self {
            store,
            fetcher,
            iqamah: MinuteOffsets::new(),
        }
    }

    /// Derive Iqamah entries with these per-prayer delays
    pub fn with_iqamah(mut self, iqamah: MinuteOffsets) -> Self {
        self.iqamah = iqamah;
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Returns the schedule for `date`, including derived Iqamah entries
    ///
    /// # Returns
    /// * `Ok(PrayerSchedule)` from the cache, or freshly fetched and appended
    /// * `Err(ScheduleError::NoData)` if a fetch was needed and failed
    pub async fn today(&self, date: NaiveDate) -> Result<PrayerSchedule, ScheduleError> {
        let schedule = match self.store.lookup(date) {
            Ok(Some(schedule)) => {
                debug!(%date, "using cached schedule");
                schedule
            }
            Ok(None) => {
                info!(%date, "no cached schedule, fetching");
                self.refresh(date).await?
            }
            Err(e) => {
                warn!(error = %e, path = %self.store.path().display(), "unreadable cache, fetching");
                self.refresh(date).await?
            }
        };

        if !schedule.is_chronological() {
            warn!(%date, "prayer times are out of order");
        }

        Ok(schedule.with_iqamah(&self.iqamah))
    }

    /// Fetches `date` and appends it to the store
    ///
    /// A failed append is logged; the fetched schedule is still returned.
    async fn refresh(&self, date: NaiveDate) -> Result<PrayerSchedule, FetchError> {
        let schedule = match self.fetcher.fetch_schedule(date).await {
            Ok(schedule) => schedule,
            Err(e) => {
                error!(error = %e, %date, "fetch failed");
                return Err(e);
            }
        };

        if let Err(e) = self.store.append(&schedule) {
            warn!(error = %e, path = %self.store.path().display(), "could not cache schedule");
        }

        Ok(schedule)
    }
}
