use crate::error::KeyError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Tolerant calendar day parsing shared by the build and the lookup paths.
pub mod day;

/// Day indexed median price table and the shared handle the synchronizer reads.
pub mod index;

/// Fetch capability for the raw reference series.
pub mod fetch;

/// Timestamp as it appears in a reference series row or a tooltip.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampRaw {
    Text(String),
    EpochMillis(f64),
    Date(DateTime<Utc>),
}

impl From<&str> for TimestampRaw {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TimestampRaw {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for TimestampRaw {
    fn from(value: f64) -> Self {
        Self::EpochMillis(value)
    }
}

impl From<i64> for TimestampRaw {
    fn from(value: i64) -> Self {
        Self::EpochMillis(value as f64)
    }
}

impl From<DateTime<Utc>> for TimestampRaw {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDate> for TimestampRaw {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

/// One (timestamp, price) sample of the reference series.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    pub timestamp: TimestampRaw,
    pub price: f64,
}

impl RawSample {
    pub fn new(timestamp: impl Into<TimestampRaw>, price: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            price,
        }
    }

    /// Interpret one `[timestamp, price, ...]` row; anything else is `None`.
    fn from_row(row: &Value) -> Option<Self> {
        let fields = row.as_array()?;
        let timestamp = match fields.first()? {
            Value::String(text) => TimestampRaw::Text(text.clone()),
            Value::Number(number) => TimestampRaw::EpochMillis(number.as_f64()?),
            _ => return None,
        };
        let price = fields.get(1)?.as_f64()?;
        Some(Self { timestamp, price })
    }
}

/// ### Raw Payload Example
/// See `https://steamcommunity.com/market/pricehistory/?appid=440&market_hash_name=...`
///```json
/// {
///     "success": true,
///     "price_prefix": "",
///     "price_suffix": "€",
///     "prices": [
///         ["Nov 30 2013 01: +0", 2.153, "1102"],
///         ["Dec 01 2013 01: +0", 2.169, "1433"]
///     ]
/// }
/// ```
#[derive(Debug, Deserialize)]
struct PriceHistoryResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    prices: Option<Vec<Value>>,
}

/// The decoded reference series, malformed rows already dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceSeries {
    pub samples: Vec<RawSample>,
}

impl ReferenceSeries {
    /// Decode the price history endpoint's JSON body.
    ///
    /// A missing or null `prices` field is an empty series. Rows that are not
    /// `[timestamp, price, ...]` arrays are dropped here; rows whose timestamp
    /// does not parse as a day are dropped when the table is built.
    pub fn from_json(body: &str) -> Result<Self, KeyError> {
        let response: PriceHistoryResponse = serde_json::from_str(body)?;

        if response.success == Some(false) {
            warn!("Price history response reported success=false");
        }

        let rows = response.prices.unwrap_or_default();
        let total = rows.len();
        let samples: Vec<RawSample> = rows.iter().filter_map(RawSample::from_row).collect();

        if samples.len() < total {
            debug!(
                dropped = total - samples.len(),
                total, "Dropped malformed price history rows"
            );
        }

        Ok(Self { samples })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl IntoIterator for ReferenceSeries {
    type Item = RawSample;
    type IntoIter = std::vec::IntoIter<RawSample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.into_iter()
    }
}
