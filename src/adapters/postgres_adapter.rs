//! PostgreSQL security store adapter.
//!
//! Same contract as the SQLite adapter; dates land in native DATE/TIMESTAMP
//! columns instead of ISO text.

use crate::domain::error::StockpickError;
use crate::domain::evidence::{AnalystTarget, FinancialStatement, PeriodKind, SentimentSample};
use crate::domain::security::{NewSecurity, PriceBar, Security};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveDateTime};
use postgres::NoTls;
use postgres::types::ToSql;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;

pub struct PostgresAdapter {
    pool: Pool<PostgresConnectionManager<NoTls>>,
}

fn pool_err(e: r2d2::Error) -> StockpickError {
    StockpickError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: postgres::Error) -> StockpickError {
    StockpickError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn persist_err(entity: &str) -> impl Fn(postgres::Error) -> StockpickError + '_ {
    move |e| StockpickError::Persistence {
        entity: entity.to_string(),
        reason: e.to_string(),
    }
}

impl PostgresAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockpickError> {
        let conninfo = config.require_string("database", "conninfo")?;

        let pool_size = config.get_int("database", "pool_size", 4) as u32;

        let parsed = conninfo
            .parse::<postgres::Config>()
            .map_err(|e| StockpickError::ConfigInvalid {
                section: "database".into(),
                key: "conninfo".into(),
                reason: e.to_string(),
            })?;
        let manager = PostgresConnectionManager::new(parsed, NoTls);

        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        conn.batch_execute(
            "CREATE TABLE IF NOT EXISTS securities (
                id BIGSERIAL PRIMARY KEY,
                symbol TEXT NOT NULL UNIQUE,
                company_name TEXT NOT NULL,
                exchange TEXT NOT NULL,
                sector TEXT NOT NULL,
                industry TEXT NOT NULL,
                currency TEXT NOT NULL,
                is_active BOOLEAN NOT NULL
            );
            CREATE TABLE IF NOT EXISTS price_bars (
                security_id BIGINT NOT NULL REFERENCES securities(id),
                date DATE NOT NULL,
                open DOUBLE PRECISION NOT NULL,
                high DOUBLE PRECISION NOT NULL,
                low DOUBLE PRECISION NOT NULL,
                close DOUBLE PRECISION NOT NULL,
                volume BIGINT NOT NULL,
                vwap DOUBLE PRECISION NOT NULL,
                change DOUBLE PRECISION NOT NULL,
                pct_change DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (security_id, date)
            );
            CREATE INDEX IF NOT EXISTS idx_price_bars_date ON price_bars(date);
            CREATE TABLE IF NOT EXISTS financial_statements (
                security_id BIGINT NOT NULL REFERENCES securities(id),
                date DATE NOT NULL,
                period TEXT NOT NULL,
                revenue DOUBLE PRECISION NOT NULL,
                net_income DOUBLE PRECISION NOT NULL,
                eps DOUBLE PRECISION NOT NULL,
                total_assets DOUBLE PRECISION NOT NULL,
                total_liabilities DOUBLE PRECISION NOT NULL,
                total_equity DOUBLE PRECISION NOT NULL,
                free_cash_flow DOUBLE PRECISION NOT NULL,
                debt_to_equity DOUBLE PRECISION NOT NULL,
                pe_ratio DOUBLE PRECISION NOT NULL,
                pb_ratio DOUBLE PRECISION NOT NULL,
                roic DOUBLE PRECISION NOT NULL,
                PRIMARY KEY (security_id, date, period)
            );
            CREATE TABLE IF NOT EXISTS analyst_targets (
                security_id BIGINT NOT NULL REFERENCES securities(id),
                date DATE NOT NULL,
                consensus_target DOUBLE PRECISION NOT NULL,
                high_target DOUBLE PRECISION NOT NULL,
                low_target DOUBLE PRECISION NOT NULL,
                rating TEXT NOT NULL,
                rating_value DOUBLE PRECISION NOT NULL,
                buy_ratings BIGINT NOT NULL,
                hold_ratings BIGINT NOT NULL,
                sell_ratings BIGINT NOT NULL,
                total_analysts BIGINT NOT NULL,
                PRIMARY KEY (security_id, date)
            );
            CREATE TABLE IF NOT EXISTS sentiment_samples (
                security_id BIGINT NOT NULL REFERENCES securities(id),
                timestamp TIMESTAMP NOT NULL,
                source TEXT NOT NULL,
                absolute_index DOUBLE PRECISION NOT NULL,
                relative_index DOUBLE PRECISION NOT NULL,
                sentiment DOUBLE PRECISION NOT NULL,
                perception TEXT NOT NULL,
                PRIMARY KEY (security_id, timestamp, source)
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }
}

fn security_from_row(row: &postgres::Row) -> Security {
    Security {
        id: row.get(0),
        symbol: row.get(1),
        company_name: row.get(2),
        exchange: row.get(3),
        sector: row.get(4),
        industry: row.get(5),
        currency: row.get(6),
        is_active: row.get(7),
    }
}

fn bar_from_row(row: &postgres::Row) -> PriceBar {
    PriceBar {
        date: row.get(0),
        open: row.get(1),
        high: row.get(2),
        low: row.get(3),
        close: row.get(4),
        volume: row.get(5),
        vwap: row.get(6),
        change: row.get(7),
        pct_change: row.get(8),
    }
}

impl StorePort for PostgresAdapter {
    fn get_security_by_symbol(&self, symbol: &str) -> Result<Option<Security>, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let row = conn
            .query_opt(
                "SELECT id, symbol, company_name, exchange, sector, industry, currency, is_active
                 FROM securities WHERE symbol = $1",
                &[&symbol],
            )
            .map_err(query_err)?;

        Ok(row.as_ref().map(security_from_row))
    }

    fn upsert_security(&self, security: &NewSecurity) -> Result<i64, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let row = conn
            .query_one(
                "INSERT INTO securities (symbol, company_name, exchange, sector, industry, currency, is_active)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 ON CONFLICT (symbol) DO UPDATE SET
                    company_name = EXCLUDED.company_name, exchange = EXCLUDED.exchange,
                    sector = EXCLUDED.sector, industry = EXCLUDED.industry,
                    currency = EXCLUDED.currency, is_active = EXCLUDED.is_active
                 RETURNING id",
                &[
                    &security.symbol,
                    &security.company_name,
                    &security.exchange,
                    &security.sector,
                    &security.industry,
                    &security.currency,
                    &security.is_active,
                ],
            )
            .map_err(query_err)?;

        Ok(row.get(0))
    }

    fn list_securities(&self) -> Result<Vec<Security>, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let rows = conn
            .query(
                "SELECT id, symbol, company_name, exchange, sector, industry, currency, is_active
                 FROM securities ORDER BY symbol ASC",
                &[],
            )
            .map_err(query_err)?;

        Ok(rows.iter().map(security_from_row).collect())
    }

    fn upsert_price_bar(&self, security_id: i64, bar: &PriceBar) -> Result<(), StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO price_bars (security_id, date, open, high, low, close, volume, vwap, change, pct_change)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (security_id, date) DO UPDATE SET
                open = EXCLUDED.open, high = EXCLUDED.high, low = EXCLUDED.low,
                close = EXCLUDED.close, volume = EXCLUDED.volume, vwap = EXCLUDED.vwap,
                change = EXCLUDED.change, pct_change = EXCLUDED.pct_change",
            &[
                &security_id,
                &bar.date,
                &bar.open,
                &bar.high,
                &bar.low,
                &bar.close,
                &bar.volume,
                &bar.vwap,
                &bar.change,
                &bar.pct_change,
            ],
        )
        .map(|_| ())
        .map_err(persist_err("price bar"))
    }

    fn get_price_bars(
        &self,
        security_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let rows = conn
            .query(
                "SELECT date, open, high, low, close, volume, vwap, change, pct_change
                 FROM price_bars
                 WHERE security_id = $1 AND date >= $2 AND date <= $3
                 ORDER BY date ASC",
                &[&security_id, &from, &to],
            )
            .map_err(query_err)?;

        Ok(rows.iter().map(bar_from_row).collect())
    }

    fn latest_price_bar(&self, security_id: i64) -> Result<Option<PriceBar>, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let row = conn
            .query_opt(
                "SELECT date, open, high, low, close, volume, vwap, change, pct_change
                 FROM price_bars WHERE security_id = $1
                 ORDER BY date DESC LIMIT 1",
                &[&security_id],
            )
            .map_err(query_err)?;

        Ok(row.as_ref().map(bar_from_row))
    }

    fn upsert_statement(
        &self,
        security_id: i64,
        statement: &FinancialStatement,
    ) -> Result<(), StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let params: &[&(dyn ToSql + Sync)] = &[
            &security_id,
            &statement.date,
            &statement.period.as_str(),
            &statement.revenue,
            &statement.net_income,
            &statement.eps,
            &statement.total_assets,
            &statement.total_liabilities,
            &statement.total_equity,
            &statement.free_cash_flow,
            &statement.debt_to_equity,
            &statement.pe_ratio,
            &statement.pb_ratio,
            &statement.roic,
        ];

        conn.execute(
            "INSERT INTO financial_statements (security_id, date, period, revenue, net_income,
                eps, total_assets, total_liabilities, total_equity, free_cash_flow,
                debt_to_equity, pe_ratio, pb_ratio, roic)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (security_id, date, period) DO UPDATE SET
                revenue = EXCLUDED.revenue, net_income = EXCLUDED.net_income,
                eps = EXCLUDED.eps, total_assets = EXCLUDED.total_assets,
                total_liabilities = EXCLUDED.total_liabilities,
                total_equity = EXCLUDED.total_equity,
                free_cash_flow = EXCLUDED.free_cash_flow,
                debt_to_equity = EXCLUDED.debt_to_equity, pe_ratio = EXCLUDED.pe_ratio,
                pb_ratio = EXCLUDED.pb_ratio, roic = EXCLUDED.roic",
            params,
        )
        .map(|_| ())
        .map_err(persist_err("financial statement"))
    }

    fn get_statements(
        &self,
        security_id: i64,
        period: PeriodKind,
    ) -> Result<Vec<FinancialStatement>, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let rows = conn
            .query(
                "SELECT date, period, revenue, net_income, eps, total_assets, total_liabilities,
                        total_equity, free_cash_flow, debt_to_equity, pe_ratio, pb_ratio, roic
                 FROM financial_statements
                 WHERE security_id = $1 AND period = $2
                 ORDER BY date DESC",
                &[&security_id, &period.as_str()],
            )
            .map_err(query_err)?;

        Ok(rows
            .iter()
            .map(|row| {
                let period_str: String = row.get(1);
                FinancialStatement {
                    date: row.get(0),
                    period: PeriodKind::parse(&period_str).unwrap_or(PeriodKind::Annual),
                    revenue: row.get(2),
                    net_income: row.get(3),
                    eps: row.get(4),
                    total_assets: row.get(5),
                    total_liabilities: row.get(6),
                    total_equity: row.get(7),
                    free_cash_flow: row.get(8),
                    debt_to_equity: row.get(9),
                    pe_ratio: row.get(10),
                    pb_ratio: row.get(11),
                    roic: row.get(12),
                }
            })
            .collect())
    }

    fn upsert_analyst_target(
        &self,
        security_id: i64,
        target: &AnalystTarget,
    ) -> Result<(), StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let params: &[&(dyn ToSql + Sync)] = &[
            &security_id,
            &target.date,
            &target.consensus_target,
            &target.high_target,
            &target.low_target,
            &target.rating,
            &target.rating_value,
            &target.buy_ratings,
            &target.hold_ratings,
            &target.sell_ratings,
            &target.total_analysts,
        ];

        conn.execute(
            "INSERT INTO analyst_targets (security_id, date, consensus_target, high_target,
                low_target, rating, rating_value, buy_ratings, hold_ratings, sell_ratings,
                total_analysts)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (security_id, date) DO UPDATE SET
                consensus_target = EXCLUDED.consensus_target,
                high_target = EXCLUDED.high_target, low_target = EXCLUDED.low_target,
                rating = EXCLUDED.rating, rating_value = EXCLUDED.rating_value,
                buy_ratings = EXCLUDED.buy_ratings, hold_ratings = EXCLUDED.hold_ratings,
                sell_ratings = EXCLUDED.sell_ratings, total_analysts = EXCLUDED.total_analysts",
            params,
        )
        .map(|_| ())
        .map_err(persist_err("analyst target"))
    }

    fn get_analyst_targets(&self, security_id: i64) -> Result<Vec<AnalystTarget>, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let rows = conn
            .query(
                "SELECT date, consensus_target, high_target, low_target, rating, rating_value,
                        buy_ratings, hold_ratings, sell_ratings, total_analysts
                 FROM analyst_targets WHERE security_id = $1
                 ORDER BY date DESC",
                &[&security_id],
            )
            .map_err(query_err)?;

        Ok(rows
            .iter()
            .map(|row| AnalystTarget {
                date: row.get(0),
                consensus_target: row.get(1),
                high_target: row.get(2),
                low_target: row.get(3),
                rating: row.get(4),
                rating_value: row.get(5),
                buy_ratings: row.get(6),
                hold_ratings: row.get(7),
                sell_ratings: row.get(8),
                total_analysts: row.get(9),
            })
            .collect())
    }

    fn upsert_sentiment(
        &self,
        security_id: i64,
        sample: &SentimentSample,
    ) -> Result<(), StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO sentiment_samples (security_id, timestamp, source, absolute_index,
                relative_index, sentiment, perception)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (security_id, timestamp, source) DO UPDATE SET
                absolute_index = EXCLUDED.absolute_index,
                relative_index = EXCLUDED.relative_index,
                sentiment = EXCLUDED.sentiment, perception = EXCLUDED.perception",
            &[
                &security_id,
                &sample.timestamp,
                &sample.source,
                &sample.absolute_index,
                &sample.relative_index,
                &sample.sentiment,
                &sample.perception,
            ],
        )
        .map(|_| ())
        .map_err(persist_err("sentiment sample"))
    }

    fn get_sentiment(
        &self,
        security_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
        source: &str,
    ) -> Result<Vec<SentimentSample>, StockpickError> {
        let mut conn = self.pool.get().map_err(pool_err)?;

        let rows = conn
            .query(
                "SELECT timestamp, source, absolute_index, relative_index, sentiment, perception
                 FROM sentiment_samples
                 WHERE security_id = $1 AND timestamp >= $2 AND timestamp <= $3 AND source = $4
                 ORDER BY timestamp DESC",
                &[&security_id, &from, &to, &source],
            )
            .map_err(query_err)?;

        Ok(rows
            .iter()
            .map(|row| SentimentSample {
                timestamp: row.get(0),
                source: row.get(1),
                absolute_index: row.get(2),
                relative_index: row.get(3),
                sentiment: row.get(4),
                perception: row.get(5),
            })
            .collect())
    }
}
