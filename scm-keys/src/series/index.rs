use super::{RawSample, ReferenceSeries, TimestampRaw, day::DayKey, fetch::SeriesFetcher};
use crate::error::KeyError;
use fnv::FnvHashMap;
use itertools::Itertools;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-day representative key price.
///
/// Every value is the element at index `floor(n/2)` of the ascending-sorted
/// prices sampled on that day. Built once per fetch and never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayMedianTable {
    medians: FnvHashMap<DayKey, f64>,
}

impl DayMedianTable {
    /// Group samples by UTC day and keep each day's median.
    ///
    /// Samples with a non-finite price or an unparseable timestamp are skipped.
    pub fn build<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = RawSample>,
    {
        let medians = samples
            .into_iter()
            .filter(|sample| sample.price.is_finite())
            .filter_map(|sample| Some((DayKey::from_raw(&sample.timestamp)?, sample.price)))
            .into_group_map()
            .into_iter()
            .filter_map(|(day, prices)| Some((day, median(prices)?)))
            .collect();

        Self { medians }
    }

    /// Median for the calendar day of `date`, parsed exactly like build-time keys.
    pub fn median_for(&self, date: impl Into<TimestampRaw>) -> Option<f64> {
        let day = DayKey::from_raw(&date.into())?;
        self.get(&day)
    }

    pub fn get(&self, day: &DayKey) -> Option<f64> {
        self.medians.get(day).copied()
    }

    pub fn len(&self) -> usize {
        self.medians.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medians.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DayKey, &f64)> {
        self.medians.iter()
    }

    /// Most recent day in the table.
    pub fn latest(&self) -> Option<(DayKey, f64)> {
        self.medians
            .iter()
            .max_by_key(|(day, _)| **day)
            .map(|(day, price)| (*day, *price))
    }
}

impl FromIterator<RawSample> for DayMedianTable {
    fn from_iter<T: IntoIterator<Item = RawSample>>(iter: T) -> Self {
        Self::build(iter)
    }
}

/// Index `floor(n/2)` of the ascending-sorted prices.
fn median(mut prices: Vec<f64>) -> Option<f64> {
    prices.sort_by(f64::total_cmp);
    prices.get(prices.len() / 2).copied()
}

/// Shared handle to the current [`DayMedianTable`].
///
/// Readers take a cheap snapshot; a reload swaps a freshly built table in
/// wholesale, so a reader never observes a partially built table.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    table: Arc<RwLock<Option<Arc<DayMedianTable>>>>,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that already holds `table`.
    pub fn with_table(table: DayMedianTable) -> Self {
        let index = Self::new();
        index.replace(table);
        index
    }

    /// Current table, `None` until a load has succeeded.
    pub fn snapshot(&self) -> Option<Arc<DayMedianTable>> {
        self.table.read().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.table.read().is_some()
    }

    pub fn replace(&self, table: DayMedianTable) {
        *self.table.write() = Some(Arc::new(table));
    }

    /// Fetch, decode and build a new table, then swap it in.
    ///
    /// On error the previous table, if any, stays in place.
    pub async fn load<F>(&self, fetcher: &F) -> Result<Arc<DayMedianTable>, KeyError>
    where
        F: SeriesFetcher + ?Sized,
    {
        let body = fetcher.fetch_raw().await?;
        let series = ReferenceSeries::from_json(&body)?;
        let samples = series.len();

        let table = Arc::new(DayMedianTable::build(series));
        if table.is_empty() {
            warn!(samples, "Key price history produced an empty median table");
        } else {
            info!(samples, days = table.len(), "Key price history loaded");
        }

        *self.table.write() = Some(Arc::clone(&table));
        Ok(table)
    }
}
