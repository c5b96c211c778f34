//! Provider gateway port trait.
//!
//! Records cross this boundary in provider-native form: dates are the
//! provider's strings, numeric fields default to zero when absent (the wire
//! format omits fields freely). Parsing and normalization belong to the
//! ingestion orchestrator, which decides per record what to do with a value
//! that does not parse.

use crate::domain::error::StockpickError;
use crate::domain::evidence::PeriodKind;
use chrono::NaiveDate;
use serde::Deserialize;

/// One raw daily price record.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderBar {
    pub date: String,
    #[serde(default)]
    pub open: f64,
    #[serde(default)]
    pub high: f64,
    #[serde(default)]
    pub low: f64,
    #[serde(default)]
    pub close: f64,
    #[serde(default)]
    pub volume: i64,
    #[serde(default)]
    pub vwap: f64,
    #[serde(default)]
    pub change: f64,
    #[serde(default, rename = "changePercent")]
    pub pct_change: f64,
}

/// Company identity record, used to create a [`crate::domain::security::Security`]
/// the first time a symbol is ingested.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyProfile {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub industry: String,
}

/// One reporting-period fundamentals record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatement {
    pub date: String,
    #[serde(default)]
    pub period: String,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub net_income: f64,
    #[serde(default)]
    pub eps: f64,
    #[serde(default)]
    pub total_assets: f64,
    #[serde(default)]
    pub total_liabilities: f64,
    #[serde(default)]
    pub total_equity: f64,
    #[serde(default)]
    pub free_cash_flow: f64,
    #[serde(default)]
    pub debt_to_equity_ratio: f64,
    #[serde(default)]
    pub pe_ratio: f64,
    #[serde(default)]
    pub pb_ratio: f64,
    #[serde(default)]
    pub roic: f64,
}

/// One analyst consensus snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderTarget {
    pub date: String,
    #[serde(default)]
    pub target_consensus: f64,
    #[serde(default)]
    pub target_high: f64,
    #[serde(default)]
    pub target_low: f64,
    #[serde(default)]
    pub consensus_rating: String,
    #[serde(default)]
    pub consensus_rating_value: f64,
    #[serde(default)]
    pub buy_ratings: i64,
    #[serde(default)]
    pub hold_ratings: i64,
    #[serde(default)]
    pub sell_ratings: i64,
    #[serde(default)]
    pub total_analysts: i64,
}

/// One social sentiment observation from one source.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSentiment {
    pub date: String,
    #[serde(default)]
    pub absolute_index: f64,
    #[serde(default)]
    pub relative_index: f64,
    #[serde(default)]
    pub sentiment: f64,
    #[serde(default)]
    pub general_perception: String,
    #[serde(default)]
    pub source: String,
}

pub trait ProviderPort: Send + Sync {
    /// Currency the provider reports prices in. New securities are created
    /// with this currency.
    fn reporting_currency(&self) -> &str {
        "USD"
    }

    /// Zero-or-one profile for the symbol. An unknown symbol is `Ok(None)`,
    /// not an error.
    fn fetch_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>, StockpickError>;

    fn fetch_price_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProviderBar>, StockpickError>;

    fn fetch_statements(
        &self,
        symbol: &str,
        period: PeriodKind,
    ) -> Result<Vec<ProviderStatement>, StockpickError>;

    fn fetch_analyst_targets(&self, symbol: &str) -> Result<Vec<ProviderTarget>, StockpickError>;

    fn fetch_sentiment(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProviderSentiment>, StockpickError>;
}
