//! Batch undervaluation scan.
//!
//! Reads every stored security, gathers its evidence and drives the scoring
//! engine. Evaluations are independent and the engine is pure, so the scan
//! fans out over a bounded worker pool. A security with no usable data or a
//! failed evaluation is logged and skipped; the batch always completes.

use crate::domain::error::StockpickError;
use crate::domain::evidence::{LatestFirst, PeriodKind};
use crate::domain::scoring::{self, ScoringWeights, UndervaluationScore};
use crate::domain::security::Security;
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::NaiveDate;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Minimum composite score for a security to appear in the result.
    pub threshold: f64,
    /// Statement period consulted for the fundamental sub-score.
    pub period: PeriodKind,
    /// Sentiment source name to query.
    pub sentiment_source: String,
    /// How far back to look for sentiment samples.
    pub sentiment_lookback_days: i64,
    /// Worker pool size.
    pub workers: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            threshold: 50.0,
            period: PeriodKind::Annual,
            sentiment_source: "Overall".into(),
            sentiment_lookback_days: 7,
            workers: 4,
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = Self::default();
        let period = config
            .get_string("scan", "period")
            .and_then(|p| PeriodKind::parse(&p))
            .unwrap_or(defaults.period);
        ScanOptions {
            threshold: config.get_double("scan", "threshold", defaults.threshold),
            period,
            sentiment_source: config
                .get_string("scan", "sentiment_source")
                .unwrap_or(defaults.sentiment_source),
            sentiment_lookback_days: config.get_int(
                "scan",
                "sentiment_lookback_days",
                defaults.sentiment_lookback_days,
            ),
            workers: config.get_int("scan", "workers", defaults.workers as i64).max(1) as usize,
        }
    }
}

/// Score every stored security as of `today` and return those at or above
/// the threshold, highest composite first (ties broken by symbol).
pub fn scan_for_undervalued(
    store: &dyn StorePort,
    weights: &ScoringWeights,
    options: &ScanOptions,
    today: NaiveDate,
) -> Result<Vec<UndervaluationScore>, StockpickError> {
    let securities = store.list_securities()?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()
        .map_err(|e| StockpickError::ConfigInvalid {
            section: "scan".into(),
            key: "workers".into(),
            reason: e.to_string(),
        })?;

    let scores: Vec<Option<UndervaluationScore>> = pool.install(|| {
        securities
            .par_iter()
            .map(|security| evaluate_security(store, weights, options, today, security))
            .collect()
    });

    let mut hits: Vec<UndervaluationScore> = scores
        .into_iter()
        .flatten()
        .filter(|s| s.score >= options.threshold)
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    Ok(hits)
}

/// Evaluate one security; `None` means it was skipped, never that the batch
/// should stop. A failed evidence read degrades to an empty collection; the
/// engine scores whatever evidence actually exists.
fn evaluate_security(
    store: &dyn StorePort,
    weights: &ScoringWeights,
    options: &ScanOptions,
    today: NaiveDate,
    security: &Security,
) -> Option<UndervaluationScore> {
    let latest_bar = match store.latest_price_bar(security.id) {
        Ok(Some(bar)) => bar,
        Ok(None) => {
            tracing::debug!(symbol = %security.symbol, "no price data, skipping");
            return None;
        }
        Err(err) => {
            tracing::warn!(symbol = %security.symbol, error = %err, "price lookup failed, skipping");
            return None;
        }
    };

    let statements = store
        .get_statements(security.id, options.period)
        .unwrap_or_else(|err| {
            tracing::warn!(symbol = %security.symbol, error = %err, "statement read failed");
            Vec::new()
        });

    let targets = store.get_analyst_targets(security.id).unwrap_or_else(|err| {
        tracing::warn!(symbol = %security.symbol, error = %err, "analyst target read failed");
        Vec::new()
    });

    let since = (today - chrono::Duration::days(options.sentiment_lookback_days))
        .and_hms_opt(0, 0, 0)?;
    let until = today.and_hms_opt(23, 59, 59)?;
    let sentiment = store
        .get_sentiment(security.id, since, until, &options.sentiment_source)
        .unwrap_or_else(|err| {
            tracing::warn!(symbol = %security.symbol, error = %err, "sentiment read failed");
            Vec::new()
        });

    // Store getters return rows most-recent-first.
    let statements = LatestFirst::assume_sorted(statements);
    let targets = LatestFirst::assume_sorted(targets);
    let sentiment = LatestFirst::assume_sorted(sentiment);

    match scoring::score(
        security,
        latest_bar.close,
        &statements,
        &targets,
        &sentiment,
        weights,
    ) {
        Ok(score) => Some(score),
        Err(err) => {
            tracing::warn!(symbol = %security.symbol, error = %err, "scoring failed, skipping");
            None
        }
    }
}
