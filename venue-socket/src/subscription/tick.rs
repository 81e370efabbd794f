use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Normalised tick pushed on a `ticks` stream.
///
/// ### Raw Payload Examples
/// ```json
/// {
///     "ask": 2456.88,
///     "bid": 2456.68,
///     "epoch": 1700000000,
///     "id": "b4c7e3a1-5f3c-a7b2-6d47-71c4b2b3e0f1",
///     "pip_size": 2,
///     "quote": 2456.78,
///     "symbol": "R_10"
/// }
/// ```
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct TickData {
    pub symbol: SmolStr,

    #[serde(default)]
    pub bid: Option<f64>,

    #[serde(default)]
    pub ask: Option<f64>,

    pub quote: f64,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub epoch: DateTime<Utc>,

    #[serde(default)]
    pub pip_size: Option<u32>,

    #[serde(rename = "id", default)]
    pub tick_id: Option<SmolStr>,
}
