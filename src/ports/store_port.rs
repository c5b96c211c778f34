//! Security store port trait.
//!
//! All writes are upserts keyed by the entity's natural key; re-running an
//! ingestion converges to the same stored state. Evidence getters return rows
//! most-recent-first, matching the ordering contract the scoring engine
//! relies on.

use crate::domain::error::StockpickError;
use crate::domain::evidence::{AnalystTarget, FinancialStatement, PeriodKind, SentimentSample};
use crate::domain::security::{NewSecurity, PriceBar, Security};
use chrono::{NaiveDate, NaiveDateTime};

pub trait StorePort: Send + Sync {
    fn get_security_by_symbol(&self, symbol: &str) -> Result<Option<Security>, StockpickError>;

    /// Insert-or-refresh keyed by symbol. Returns the security id, which is
    /// assigned on first insert and stable for the life of the record.
    fn upsert_security(&self, security: &NewSecurity) -> Result<i64, StockpickError>;

    fn list_securities(&self) -> Result<Vec<Security>, StockpickError>;

    fn upsert_price_bar(&self, security_id: i64, bar: &PriceBar) -> Result<(), StockpickError>;

    /// Bars in `[from, to]`, ascending by date.
    fn get_price_bars(
        &self,
        security_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, StockpickError>;

    /// The most recent stored bar, if any.
    fn latest_price_bar(&self, security_id: i64) -> Result<Option<PriceBar>, StockpickError>;

    fn upsert_statement(
        &self,
        security_id: i64,
        statement: &FinancialStatement,
    ) -> Result<(), StockpickError>;

    /// Statements for one period kind, most recent first.
    fn get_statements(
        &self,
        security_id: i64,
        period: PeriodKind,
    ) -> Result<Vec<FinancialStatement>, StockpickError>;

    fn upsert_analyst_target(
        &self,
        security_id: i64,
        target: &AnalystTarget,
    ) -> Result<(), StockpickError>;

    /// Consensus snapshots, most recent first.
    fn get_analyst_targets(&self, security_id: i64) -> Result<Vec<AnalystTarget>, StockpickError>;

    fn upsert_sentiment(
        &self,
        security_id: i64,
        sample: &SentimentSample,
    ) -> Result<(), StockpickError>;

    /// Sentiment samples from one source within `[from, to]`, most recent first.
    fn get_sentiment(
        &self,
        security_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        source: &str,
    ) -> Result<Vec<SentimentSample>, StockpickError>;
}
