//! Ingestion orchestrator: fetch, normalize, idempotent persist.
//!
//! One malformed or unpersistable record never discards the rest of a window.
//! The orchestrator records a per-record outcome instead of logging inline;
//! callers decide how to report partial results.

use crate::domain::error::StockpickError;
use crate::domain::evidence::{AnalystTarget, FinancialStatement, PeriodKind, SentimentSample};
use crate::domain::security::{NewSecurity, PriceBar};
use crate::ports::provider_port::{ProviderBar, ProviderPort};
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveDateTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inclusive date window for a fetch.
#[derive(Debug, Clone, Copy)]
pub struct IngestWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl IngestWindow {
    /// The `days`-day window ending at `today`.
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        IngestWindow {
            from: today - chrono::Duration::days(days),
            to: today,
        }
    }
}

/// What happened to one raw bar.
#[derive(Debug, Clone)]
pub enum BarOutcome {
    Upserted {
        date: NaiveDate,
    },
    /// The provider's date string did not parse; the bar was dropped.
    SkippedDate {
        raw_date: String,
        reason: String,
    },
    /// The store rejected this bar; the batch continued.
    Failed {
        date: NaiveDate,
        reason: String,
    },
}

/// Result of one price-history ingestion. Partial ingestion is a terminal
/// success state, not a failure; the outcome list is the full account.
#[derive(Debug)]
pub struct IngestReport {
    pub security_id: i64,
    pub symbol: String,
    pub outcomes: Vec<BarOutcome>,
}

impl IngestReport {
    pub fn upserted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BarOutcome::Upserted { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BarOutcome::SkippedDate { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, BarOutcome::Failed { .. }))
            .count()
    }
}

/// Per-kind tally for an evidence ingestion.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordTally {
    pub upserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of one evidence ingestion (statements, targets, sentiment).
#[derive(Debug)]
pub struct EvidenceReport {
    pub security_id: i64,
    pub symbol: String,
    pub statements: RecordTally,
    pub targets: RecordTally,
    pub sentiment: RecordTally,
}

/// Ingest a window of daily price bars for `symbol`.
///
/// Identity resolution must succeed before anything else happens: an unknown
/// symbol whose profile cannot be fetched fails the whole operation with
/// [`StockpickError::NotFound`] and persists nothing. After that, a failed
/// bar fetch aborts with [`StockpickError::TransientFetch`], while individual
/// bad bars are skipped and accounted for in the report.
pub fn ingest_price_history(
    provider: &dyn ProviderPort,
    store: &dyn StorePort,
    symbol: &str,
    window: IngestWindow,
) -> Result<IngestReport, StockpickError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(StockpickError::Validation {
            reason: "symbol must not be empty".into(),
        });
    }

    let security_id = resolve_security(provider, store, symbol)?;

    let raw_bars = provider.fetch_price_bars(symbol, window.from, window.to)?;

    let mut outcomes = Vec::with_capacity(raw_bars.len());
    for raw in &raw_bars {
        outcomes.push(persist_bar(store, security_id, raw));
    }

    Ok(IngestReport {
        security_id,
        symbol: symbol.to_string(),
        outcomes,
    })
}

/// Ingest fundamentals, analyst consensus and social sentiment for `symbol`,
/// with the same per-record tolerance as the price path.
pub fn ingest_evidence(
    provider: &dyn ProviderPort,
    store: &dyn StorePort,
    symbol: &str,
    window: IngestWindow,
) -> Result<EvidenceReport, StockpickError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(StockpickError::Validation {
            reason: "symbol must not be empty".into(),
        });
    }

    let security_id = resolve_security(provider, store, symbol)?;

    let mut statements = RecordTally::default();
    for raw in provider.fetch_statements(symbol, PeriodKind::Annual)? {
        let Ok(date) = NaiveDate::parse_from_str(raw.date.trim(), DATE_FORMAT) else {
            statements.skipped += 1;
            continue;
        };
        let statement = FinancialStatement {
            date,
            period: PeriodKind::parse(&raw.period).unwrap_or(PeriodKind::Annual),
            revenue: raw.revenue,
            net_income: raw.net_income,
            eps: raw.eps,
            total_assets: raw.total_assets,
            total_liabilities: raw.total_liabilities,
            total_equity: raw.total_equity,
            free_cash_flow: raw.free_cash_flow,
            debt_to_equity: raw.debt_to_equity_ratio,
            pe_ratio: raw.pe_ratio,
            pb_ratio: raw.pb_ratio,
            roic: raw.roic,
        };
        match store.upsert_statement(security_id, &statement) {
            Ok(()) => statements.upserted += 1,
            Err(_) => statements.failed += 1,
        }
    }

    let mut targets = RecordTally::default();
    for raw in provider.fetch_analyst_targets(symbol)? {
        let Ok(date) = NaiveDate::parse_from_str(raw.date.trim(), DATE_FORMAT) else {
            targets.skipped += 1;
            continue;
        };
        let target = AnalystTarget {
            date,
            consensus_target: raw.target_consensus,
            high_target: raw.target_high,
            low_target: raw.target_low,
            rating: raw.consensus_rating,
            rating_value: raw.consensus_rating_value,
            buy_ratings: raw.buy_ratings,
            hold_ratings: raw.hold_ratings,
            sell_ratings: raw.sell_ratings,
            total_analysts: raw.total_analysts,
        };
        match store.upsert_analyst_target(security_id, &target) {
            Ok(()) => targets.upserted += 1,
            Err(_) => targets.failed += 1,
        }
    }

    let mut sentiment = RecordTally::default();
    for raw in provider.fetch_sentiment(symbol, window.from, window.to)? {
        let Some(timestamp) = parse_timestamp(&raw.date) else {
            sentiment.skipped += 1;
            continue;
        };
        let sample = SentimentSample {
            timestamp,
            absolute_index: raw.absolute_index,
            relative_index: raw.relative_index,
            sentiment: raw.sentiment,
            perception: raw.general_perception,
            source: raw.source,
        };
        match store.upsert_sentiment(security_id, &sample) {
            Ok(()) => sentiment.upserted += 1,
            Err(_) => sentiment.failed += 1,
        }
    }

    Ok(EvidenceReport {
        security_id,
        symbol: symbol.to_string(),
        statements,
        targets,
        sentiment,
    })
}

/// Look the symbol up; create it from a provider profile when absent.
/// A provider that cannot produce a profile means the identity cannot be
/// fabricated, so the operation fails before any record is written.
fn resolve_security(
    provider: &dyn ProviderPort,
    store: &dyn StorePort,
    symbol: &str,
) -> Result<i64, StockpickError> {
    if let Some(existing) = store.get_security_by_symbol(symbol)? {
        return Ok(existing.id);
    }

    let profile = match provider.fetch_profile(symbol) {
        Ok(Some(profile)) => profile,
        Ok(None) | Err(_) => {
            return Err(StockpickError::NotFound {
                symbol: symbol.to_string(),
            });
        }
    };

    store.upsert_security(&NewSecurity {
        symbol: symbol.to_string(),
        company_name: profile.company_name,
        exchange: profile.exchange,
        sector: profile.sector,
        industry: profile.industry,
        currency: provider.reporting_currency().to_string(),
        is_active: true,
    })
}

fn persist_bar(store: &dyn StorePort, security_id: i64, raw: &ProviderBar) -> BarOutcome {
    let date = match NaiveDate::parse_from_str(raw.date.trim(), DATE_FORMAT) {
        Ok(date) => date,
        Err(err) => {
            return BarOutcome::SkippedDate {
                raw_date: raw.date.clone(),
                reason: err.to_string(),
            };
        }
    };

    let bar = PriceBar {
        date,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.volume,
        vwap: raw.vwap,
        change: raw.change,
        pct_change: raw.pct_change,
    };

    match store.upsert_price_bar(security_id, &bar) {
        Ok(()) => BarOutcome::Upserted { date },
        Err(err) => BarOutcome::Failed {
            date,
            reason: err.to_string(),
        },
    }
}

/// Sentiment timestamps arrive either as `YYYY-MM-DD HH:MM:SS` or as a bare
/// date, which reads as midnight.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
