#![allow(dead_code)]

use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use stockpick::domain::error::StockpickError;
use stockpick::domain::evidence::PeriodKind;
use stockpick::ports::provider_port::{
    CompanyProfile, ProviderBar, ProviderPort, ProviderSentiment, ProviderStatement,
    ProviderTarget,
};

/// Scriptable provider gateway: serves canned records, counts profile
/// fetches, and can be told to fail.
pub struct MockProvider {
    pub profile: Option<CompanyProfile>,
    pub profile_err: bool,
    pub bars: Result<Vec<ProviderBar>, String>,
    pub statements: Vec<ProviderStatement>,
    pub targets: Vec<ProviderTarget>,
    pub sentiment: Vec<ProviderSentiment>,
    pub profile_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(symbol: &str) -> Self {
        MockProvider {
            profile: Some(CompanyProfile {
                symbol: symbol.to_string(),
                company_name: format!("{symbol} Inc"),
                exchange: "NYSE".into(),
                sector: "Industrials".into(),
                industry: "Machinery".into(),
            }),
            profile_err: false,
            bars: Ok(Vec::new()),
            statements: Vec::new(),
            targets: Vec::new(),
            sentiment: Vec::new(),
            profile_calls: AtomicUsize::new(0),
        }
    }

    pub fn without_profile(mut self) -> Self {
        self.profile = None;
        self
    }

    pub fn with_bars(mut self, bars: Vec<ProviderBar>) -> Self {
        self.bars = Ok(bars);
        self
    }

    pub fn profile_fetches(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }
}

impl ProviderPort for MockProvider {
    fn fetch_profile(&self, _symbol: &str) -> Result<Option<CompanyProfile>, StockpickError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if self.profile_err {
            return Err(StockpickError::TransientFetch {
                symbol: "MOCK".into(),
                reason: "simulated outage".into(),
            });
        }
        Ok(self.profile.clone())
    }

    fn fetch_price_bars(
        &self,
        symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<ProviderBar>, StockpickError> {
        match &self.bars {
            Ok(bars) => Ok(bars.clone()),
            Err(reason) => Err(StockpickError::TransientFetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            }),
        }
    }

    fn fetch_statements(
        &self,
        _symbol: &str,
        _period: PeriodKind,
    ) -> Result<Vec<ProviderStatement>, StockpickError> {
        Ok(self.statements.clone())
    }

    fn fetch_analyst_targets(&self, _symbol: &str) -> Result<Vec<ProviderTarget>, StockpickError> {
        Ok(self.targets.clone())
    }

    fn fetch_sentiment(
        &self,
        _symbol: &str,
        _from: NaiveDate,
        _to: NaiveDate,
    ) -> Result<Vec<ProviderSentiment>, StockpickError> {
        Ok(self.sentiment.clone())
    }
}

pub fn raw_bar(date: &str, close: f64) -> ProviderBar {
    ProviderBar {
        date: date.into(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 25_000,
        vwap: close - 0.3,
        change: 0.5,
        pct_change: 0.5,
    }
}

/// `count` consecutive daily bars starting at `start`, drifting upward.
pub fn generate_bars(start: NaiveDate, count: usize, base_close: f64) -> Vec<ProviderBar> {
    (0..count)
        .map(|i| {
            let date = start + chrono::Duration::days(i as i64);
            raw_bar(&date.format("%Y-%m-%d").to_string(), base_close + i as f64)
        })
        .collect()
}

/// Statement that triggers every fundamental contribution (component 0.85).
pub fn strong_statement(date: &str) -> ProviderStatement {
    ProviderStatement {
        date: date.into(),
        period: "annual".into(),
        revenue: 1_000.0,
        net_income: 120.0,
        eps: 2.0,
        total_assets: 5_000.0,
        total_liabilities: 2_000.0,
        total_equity: 3_000.0,
        free_cash_flow: 500.0,
        debt_to_equity_ratio: 0.66,
        pe_ratio: 8.0,
        pb_ratio: 1.2,
        roic: 0.20,
    }
}

/// Target with >20% upside over a price of 100 and a strong-buy rating
/// (component 0.70).
pub fn strong_target(date: &str) -> ProviderTarget {
    ProviderTarget {
        date: date.into(),
        target_consensus: 130.0,
        target_high: 150.0,
        target_low: 110.0,
        consensus_rating: "Buy".into(),
        consensus_rating_value: 4.2,
        buy_ratings: 12,
        hold_ratings: 3,
        sell_ratings: 0,
        total_analysts: 15,
    }
}

/// Sentiment sample above both thresholds (component 0.30).
pub fn strong_sentiment(date: &str) -> ProviderSentiment {
    ProviderSentiment {
        date: date.into(),
        absolute_index: 150_000.0,
        relative_index: 2.0,
        sentiment: 0.8,
        general_perception: "bullish".into(),
        source: "Overall".into(),
    }
}
