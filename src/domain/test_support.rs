//! Shared in-memory fakes for domain unit tests.

use crate::domain::error::StockpickError;
use crate::domain::evidence::{AnalystTarget, FinancialStatement, PeriodKind, SentimentSample};
use crate::domain::security::{NewSecurity, PriceBar, Security};
use crate::ports::provider_port::{
    CompanyProfile, ProviderBar, ProviderPort, ProviderSentiment, ProviderStatement,
    ProviderTarget,
};
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn raw_bar(date: &str, close: f64) -> ProviderBar {
    ProviderBar {
        date: date.into(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 10_000,
        vwap: close - 0.5,
        change: 1.0,
        pct_change: 1.0,
    }
}

pub struct FakeProvider {
    pub profile: Option<CompanyProfile>,
    pub profile_err: bool,
    pub bars: Result<Vec<ProviderBar>, String>,
    pub profile_calls: AtomicUsize,
    pub statements: Vec<ProviderStatement>,
    pub targets: Vec<ProviderTarget>,
    pub sentiment: Vec<ProviderSentiment>,
}

impl FakeProvider {
    pub fn with_bars(bars: Vec<ProviderBar>) -> Self {
        FakeProvider {
            profile: Some(CompanyProfile {
                symbol: "ACME".into(),
                company_name: "Acme Corp".into(),
                exchange: "NYSE".into(),
                sector: "Industrials".into(),
                industry: "Machinery".into(),
            }),
            profile_err: false,
            bars: Ok(bars),
            profile_calls: AtomicUsize::new(0),
            statements: Vec::new(),
            targets: Vec::new(),
            sentiment: Vec::new(),
        }
    }
}

impl ProviderPort for FakeProvider {
    fn fetch_profile(&self, _symbol: &str) -> Result<Option<CompanyProfile>, StockpickError> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        if self.profile_err {
            return Err(StockpickError::TransientFetch {
                symbol: "ACME".into(),
                reason: "boom".into(),
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

#[derive(Default)]
pub struct FakeStoreInner {
    pub securities: HashMap<String, Security>,
    pub bars: HashMap<(i64, NaiveDate), PriceBar>,
    pub statements: HashMap<(i64, NaiveDate, &'static str), FinancialStatement>,
    pub targets: HashMap<(i64, NaiveDate), AnalystTarget>,
    pub sentiment: HashMap<(i64, NaiveDateTime, String), SentimentSample>,
    pub next_id: i64,
}

#[derive(Default)]
pub struct FakeStore {
    pub inner: Mutex<FakeStoreInner>,
    pub fail_bar_dates: Vec<NaiveDate>,
}

impl FakeStore {
    /// Seed a security directly, returning its id.
    pub fn seed_security(&self, symbol: &str) -> i64 {
        self.upsert_security(&NewSecurity {
            symbol: symbol.to_string(),
            company_name: format!("{symbol} Inc"),
            exchange: "NYSE".into(),
            sector: "Industrials".into(),
            industry: "Machinery".into(),
            currency: "USD".into(),
            is_active: true,
        })
        .unwrap()
    }
}

impl StorePort for FakeStore {
    fn get_security_by_symbol(&self, symbol: &str) -> Result<Option<Security>, StockpickError> {
        Ok(self.inner.lock().unwrap().securities.get(symbol).cloned())
    }

    fn upsert_security(&self, security: &NewSecurity) -> Result<i64, StockpickError> {
        let mut inner = self.inner.lock().unwrap();
        let id = match inner.securities.get(&security.symbol) {
            Some(existing) => existing.id,
            None => {
                inner.next_id += 1;
                inner.next_id
            }
        };
        inner.securities.insert(
            security.symbol.clone(),
            Security {
                id,
                symbol: security.symbol.clone(),
                company_name: security.company_name.clone(),
                exchange: security.exchange.clone(),
                sector: security.sector.clone(),
                industry: security.industry.clone(),
                currency: security.currency.clone(),
                is_active: security.is_active,
            },
        );
        Ok(id)
    }

    fn list_securities(&self) -> Result<Vec<Security>, StockpickError> {
        let inner = self.inner.lock().unwrap();
        let mut all: Vec<Security> = inner.securities.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(all)
    }

    fn upsert_price_bar(&self, security_id: i64, bar: &PriceBar) -> Result<(), StockpickError> {
        if self.fail_bar_dates.contains(&bar.date) {
            return Err(StockpickError::Persistence {
                entity: "price bar".into(),
                reason: "constraint violation".into(),
            });
        }
        self.inner
            .lock()
            .unwrap()
            .bars
            .insert((security_id, bar.date), bar.clone());
        Ok(())
    }

    fn get_price_bars(
        &self,
        security_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, StockpickError> {
        let inner = self.inner.lock().unwrap();
        let mut bars: Vec<PriceBar> = inner
            .bars
            .iter()
            .filter(|((id, date), _)| *id == security_id && *date >= from && *date <= to)
            .map(|(_, bar)| bar.clone())
            .collect();
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn latest_price_bar(&self, security_id: i64) -> Result<Option<PriceBar>, StockpickError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .bars
            .iter()
            .filter(|((id, _), _)| *id == security_id)
            .max_by_key(|((_, date), _)| *date)
            .map(|(_, bar)| bar.clone()))
    }

    fn upsert_statement(
        &self,
        security_id: i64,
        statement: &FinancialStatement,
    ) -> Result<(), StockpickError> {
        self.inner.lock().unwrap().statements.insert(
            (security_id, statement.date, statement.period.as_str()),
            statement.clone(),
        );
        Ok(())
    }

    fn get_statements(
        &self,
        security_id: i64,
        period: PeriodKind,
    ) -> Result<Vec<FinancialStatement>, StockpickError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<FinancialStatement> = inner
            .statements
            .iter()
            .filter(|((id, _, p), _)| *id == security_id && *p == period.as_str())
            .map(|(_, s)| s.clone())
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.date));
        Ok(rows)
    }

    fn upsert_analyst_target(
        &self,
        security_id: i64,
        target: &AnalystTarget,
    ) -> Result<(), StockpickError> {
        self.inner
            .lock()
            .unwrap()
            .targets
            .insert((security_id, target.date), target.clone());
        Ok(())
    }

    fn get_analyst_targets(&self, security_id: i64) -> Result<Vec<AnalystTarget>, StockpickError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<AnalystTarget> = inner
            .targets
            .iter()
            .filter(|((id, _), _)| *id == security_id)
            .map(|(_, t)| t.clone())
            .collect();
        rows.sort_by_key(|t| std::cmp::Reverse(t.date));
        Ok(rows)
    }

    fn upsert_sentiment(
        &self,
        security_id: i64,
        sample: &SentimentSample,
    ) -> Result<(), StockpickError> {
        self.inner.lock().unwrap().sentiment.insert(
            (security_id, sample.timestamp, sample.source.clone()),
            sample.clone(),
        );
        Ok(())
    }

    fn get_sentiment(
        &self,
        security_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        source: &str,
    ) -> Result<Vec<SentimentSample>, StockpickError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<SentimentSample> = inner
            .sentiment
            .iter()
            .filter(|((id, ts, src), _)| {
                *id == security_id && *ts >= from && *ts <= to && src == source
            })
            .map(|(_, s)| s.clone())
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.timestamp));
        Ok(rows)
    }
}
