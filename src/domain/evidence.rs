//! Scoring evidence types: fundamentals, analyst consensus, social sentiment.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Reporting period granularity for financial statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Annual,
    Quarterly,
}

impl PeriodKind {
    /// Stable encoding used in storage and provider query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Annual => "annual",
            PeriodKind::Quarterly => "quarterly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "annual" => Some(PeriodKind::Annual),
            "quarterly" | "quarter" => Some(PeriodKind::Quarterly),
            _ => None,
        }
    }
}

/// One reporting-period fundamentals snapshot.
/// Natural key: (security, date, period).
#[derive(Debug, Clone)]
pub struct FinancialStatement {
    pub date: NaiveDate,
    pub period: PeriodKind,
    pub revenue: f64,
    pub net_income: f64,
    pub eps: f64,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
    pub free_cash_flow: f64,
    pub debt_to_equity: f64,
    pub pe_ratio: f64,
    pub pb_ratio: f64,
    pub roic: f64,
}

/// One analyst consensus snapshot. Rating value runs 1 (strong sell) to
/// 5 (strong buy). Natural key: (security, date).
#[derive(Debug, Clone)]
pub struct AnalystTarget {
    pub date: NaiveDate,
    pub consensus_target: f64,
    pub high_target: f64,
    pub low_target: f64,
    pub rating: String,
    pub rating_value: f64,
    pub buy_ratings: i64,
    pub hold_ratings: i64,
    pub sell_ratings: i64,
    pub total_analysts: i64,
}

/// One sentiment observation from one source.
/// Natural key: (security, timestamp, source).
#[derive(Debug, Clone, Serialize)]
pub struct SentimentSample {
    pub timestamp: NaiveDateTime,
    pub absolute_index: f64,
    pub relative_index: f64,
    pub sentiment: f64,
    pub perception: String,
    pub source: String,
}

/// An evidence collection ordered most-recent-first.
///
/// The scoring engine reads only the head of each collection and never sorts,
/// so the ordering is part of the type's contract rather than a documentation
/// footnote. [`LatestFirst::sorted_desc_by`] establishes the order;
/// [`LatestFirst::assume_sorted`] adopts a vec unchecked for callers whose
/// source already orders descending (for example a `ORDER BY date DESC`
/// query). An `assume_sorted` caller that hands over ascending data gets the
/// oldest observation scored: deterministic, but wrong.
#[derive(Debug, Clone)]
pub struct LatestFirst<T>(Vec<T>);

impl<T> LatestFirst<T> {
    pub fn empty() -> Self {
        LatestFirst(Vec::new())
    }

    /// Adopt `items` as already descending by recency.
    pub fn assume_sorted(items: Vec<T>) -> Self {
        LatestFirst(items)
    }

    /// Sort `items` descending by `key` (most recent first).
    pub fn sorted_desc_by<K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Self {
        items.sort_by(|a, b| key(b).cmp(&key(a)));
        LatestFirst(items)
    }

    /// The current observation: the head of the collection.
    pub fn latest(&self) -> Option<&T> {
        self.0.first()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> Default for LatestFirst<T> {
    fn default() -> Self {
        Self::empty()
    }
}
