//! Security identity and price bar types.

use chrono::NaiveDate;
use serde::Serialize;

/// Canonical record for one tradable instrument, keyed by symbol. The `id`
/// is assigned by the store on first upsert and never changes afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Security {
    pub id: i64,
    pub symbol: String,
    pub company_name: String,
    pub exchange: String,
    pub sector: String,
    pub industry: String,
    pub currency: String,
    pub is_active: bool,
}

/// A security as constructed before the store has assigned an id.
#[derive(Debug, Clone)]
pub struct NewSecurity {
    pub symbol: String,
    pub company_name: String,
    pub exchange: String,
    pub sector: String,
    pub industry: String,
    pub currency: String,
    pub is_active: bool,
}

/// One day's OHLCV observation plus the provider's derived change stats.
#[derive(Debug, Clone, Serialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub vwap: f64,
    pub change: f64,
    pub pct_change: f64,
}
