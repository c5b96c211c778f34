//! SQLite security store adapter.

use crate::domain::error::StockpickError;
use crate::domain::evidence::{AnalystTarget, FinancialStatement, PeriodKind, SentimentSample};
use crate::domain::security::{NewSecurity, PriceBar, Security};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::StorePort;
use chrono::{NaiveDate, NaiveDateTime};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug)]
pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> StockpickError {
    StockpickError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> StockpickError {
    StockpickError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn persist_err(entity: &str) -> impl Fn(rusqlite::Error) -> StockpickError + '_ {
    move |e| StockpickError::Persistence {
        entity: entity.to_string(),
        reason: e.to_string(),
    }
}

fn parse_date_column(index: usize, value: String) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp_column(index: usize, value: String) -> Result<NaiveDateTime, rusqlite::Error> {
    NaiveDateTime::parse_from_str(&value, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockpickError> {
        let db_path = config.require_string("database", "path")?;

        let pool_size = config.get_int("database", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, StockpickError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;
        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS securities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL UNIQUE,
                company_name TEXT NOT NULL,
                exchange TEXT NOT NULL,
                sector TEXT NOT NULL,
                industry TEXT NOT NULL,
                currency TEXT NOT NULL,
                is_active INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS price_bars (
                security_id INTEGER NOT NULL REFERENCES securities(id),
                date TEXT NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume INTEGER NOT NULL,
                vwap REAL NOT NULL,
                change REAL NOT NULL,
                pct_change REAL NOT NULL,
                PRIMARY KEY (security_id, date)
            );
            CREATE INDEX IF NOT EXISTS idx_price_bars_date ON price_bars(date);
            CREATE TABLE IF NOT EXISTS financial_statements (
                security_id INTEGER NOT NULL REFERENCES securities(id),
                date TEXT NOT NULL,
                period TEXT NOT NULL,
                revenue REAL NOT NULL,
                net_income REAL NOT NULL,
                eps REAL NOT NULL,
                total_assets REAL NOT NULL,
                total_liabilities REAL NOT NULL,
                total_equity REAL NOT NULL,
                free_cash_flow REAL NOT NULL,
                debt_to_equity REAL NOT NULL,
                pe_ratio REAL NOT NULL,
                pb_ratio REAL NOT NULL,
                roic REAL NOT NULL,
                PRIMARY KEY (security_id, date, period)
            );
            CREATE TABLE IF NOT EXISTS analyst_targets (
                security_id INTEGER NOT NULL REFERENCES securities(id),
                date TEXT NOT NULL,
                consensus_target REAL NOT NULL,
                high_target REAL NOT NULL,
                low_target REAL NOT NULL,
                rating TEXT NOT NULL,
                rating_value REAL NOT NULL,
                buy_ratings INTEGER NOT NULL,
                hold_ratings INTEGER NOT NULL,
                sell_ratings INTEGER NOT NULL,
                total_analysts INTEGER NOT NULL,
                PRIMARY KEY (security_id, date)
            );
            CREATE TABLE IF NOT EXISTS sentiment_samples (
                security_id INTEGER NOT NULL REFERENCES securities(id),
                timestamp TEXT NOT NULL,
                source TEXT NOT NULL,
                absolute_index REAL NOT NULL,
                relative_index REAL NOT NULL,
                sentiment REAL NOT NULL,
                perception TEXT NOT NULL,
                PRIMARY KEY (security_id, timestamp, source)
            );",
        )
        .map_err(query_err)?;

        Ok(())
    }
}

fn bar_from_row(row: &rusqlite::Row<'_>) -> Result<PriceBar, rusqlite::Error> {
    let date_str: String = row.get(0)?;
    Ok(PriceBar {
        date: parse_date_column(0, date_str)?,
        open: row.get(1)?,
        high: row.get(2)?,
        low: row.get(3)?,
        close: row.get(4)?,
        volume: row.get(5)?,
        vwap: row.get(6)?,
        change: row.get(7)?,
        pct_change: row.get(8)?,
    })
}

impl StorePort for SqliteAdapter {
    fn get_security_by_symbol(&self, symbol: &str) -> Result<Option<Security>, StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT id, symbol, company_name, exchange, sector, industry, currency, is_active
             FROM securities WHERE symbol = ?1",
            params![symbol],
            |row| {
                Ok(Security {
                    id: row.get(0)?,
                    symbol: row.get(1)?,
                    company_name: row.get(2)?,
                    exchange: row.get(3)?,
                    sector: row.get(4)?,
                    industry: row.get(5)?,
                    currency: row.get(6)?,
                    is_active: row.get(7)?,
                })
            },
        )
        .optional()
        .map_err(query_err)
    }

    fn upsert_security(&self, security: &NewSecurity) -> Result<i64, StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "INSERT INTO securities (symbol, company_name, exchange, sector, industry, currency, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(symbol) DO UPDATE SET
                company_name = excluded.company_name,
                exchange = excluded.exchange,
                sector = excluded.sector,
                industry = excluded.industry,
                currency = excluded.currency,
                is_active = excluded.is_active
             RETURNING id",
            params![
                security.symbol,
                security.company_name,
                security.exchange,
                security.sector,
                security.industry,
                security.currency,
                security.is_active
            ],
            |row| row.get(0),
        )
        .map_err(query_err)
    }

    fn list_securities(&self) -> Result<Vec<Security>, StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT id, symbol, company_name, exchange, sector, industry, currency, is_active
                 FROM securities ORDER BY symbol ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(Security {
                    id: row.get(0)?,
                    symbol: row.get(1)?,
                    company_name: row.get(2)?,
                    exchange: row.get(3)?,
                    sector: row.get(4)?,
                    industry: row.get(5)?,
                    currency: row.get(6)?,
                    is_active: row.get(7)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn upsert_price_bar(&self, security_id: i64, bar: &PriceBar) -> Result<(), StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO price_bars (security_id, date, open, high, low, close, volume, vwap, change, pct_change)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(security_id, date) DO UPDATE SET
                open = excluded.open, high = excluded.high, low = excluded.low,
                close = excluded.close, volume = excluded.volume, vwap = excluded.vwap,
                change = excluded.change, pct_change = excluded.pct_change",
            params![
                security_id,
                bar.date.format(DATE_FORMAT).to_string(),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume,
                bar.vwap,
                bar.change,
                bar.pct_change
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
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT date, open, high, low, close, volume, vwap, change, pct_change
                 FROM price_bars
                 WHERE security_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    security_id,
                    from.format(DATE_FORMAT).to_string(),
                    to.format(DATE_FORMAT).to_string()
                ],
                bar_from_row,
            )
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn latest_price_bar(&self, security_id: i64) -> Result<Option<PriceBar>, StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT date, open, high, low, close, volume, vwap, change, pct_change
             FROM price_bars WHERE security_id = ?1
             ORDER BY date DESC LIMIT 1",
            params![security_id],
            bar_from_row,
        )
        .optional()
        .map_err(query_err)
    }

    fn upsert_statement(
        &self,
        security_id: i64,
        statement: &FinancialStatement,
    ) -> Result<(), StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO financial_statements (security_id, date, period, revenue, net_income, eps,
                total_assets, total_liabilities, total_equity, free_cash_flow, debt_to_equity,
                pe_ratio, pb_ratio, roic)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(security_id, date, period) DO UPDATE SET
                revenue = excluded.revenue, net_income = excluded.net_income, eps = excluded.eps,
                total_assets = excluded.total_assets, total_liabilities = excluded.total_liabilities,
                total_equity = excluded.total_equity, free_cash_flow = excluded.free_cash_flow,
                debt_to_equity = excluded.debt_to_equity, pe_ratio = excluded.pe_ratio,
                pb_ratio = excluded.pb_ratio, roic = excluded.roic",
            params![
                security_id,
                statement.date.format(DATE_FORMAT).to_string(),
                statement.period.as_str(),
                statement.revenue,
                statement.net_income,
                statement.eps,
                statement.total_assets,
                statement.total_liabilities,
                statement.total_equity,
                statement.free_cash_flow,
                statement.debt_to_equity,
                statement.pe_ratio,
                statement.pb_ratio,
                statement.roic
            ],
        )
        .map(|_| ())
        .map_err(persist_err("financial statement"))
    }

    fn get_statements(
        &self,
        security_id: i64,
        period: PeriodKind,
    ) -> Result<Vec<FinancialStatement>, StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT date, period, revenue, net_income, eps, total_assets, total_liabilities,
                        total_equity, free_cash_flow, debt_to_equity, pe_ratio, pb_ratio, roic
                 FROM financial_statements
                 WHERE security_id = ?1 AND period = ?2
                 ORDER BY date DESC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![security_id, period.as_str()], |row| {
                let date_str: String = row.get(0)?;
                let period_str: String = row.get(1)?;
                Ok(FinancialStatement {
                    date: parse_date_column(0, date_str)?,
                    period: PeriodKind::parse(&period_str).unwrap_or(PeriodKind::Annual),
                    revenue: row.get(2)?,
                    net_income: row.get(3)?,
                    eps: row.get(4)?,
                    total_assets: row.get(5)?,
                    total_liabilities: row.get(6)?,
                    total_equity: row.get(7)?,
                    free_cash_flow: row.get(8)?,
                    debt_to_equity: row.get(9)?,
                    pe_ratio: row.get(10)?,
                    pb_ratio: row.get(11)?,
                    roic: row.get(12)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn upsert_analyst_target(
        &self,
        security_id: i64,
        target: &AnalystTarget,
    ) -> Result<(), StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO analyst_targets (security_id, date, consensus_target, high_target,
                low_target, rating, rating_value, buy_ratings, hold_ratings, sell_ratings,
                total_analysts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT(security_id, date) DO UPDATE SET
                consensus_target = excluded.consensus_target, high_target = excluded.high_target,
                low_target = excluded.low_target, rating = excluded.rating,
                rating_value = excluded.rating_value, buy_ratings = excluded.buy_ratings,
                hold_ratings = excluded.hold_ratings, sell_ratings = excluded.sell_ratings,
                total_analysts = excluded.total_analysts",
            params![
                security_id,
                target.date.format(DATE_FORMAT).to_string(),
                target.consensus_target,
                target.high_target,
                target.low_target,
                target.rating,
                target.rating_value,
                target.buy_ratings,
                target.hold_ratings,
                target.sell_ratings,
                target.total_analysts
            ],
        )
        .map(|_| ())
        .map_err(persist_err("analyst target"))
    }

    fn get_analyst_targets(&self, security_id: i64) -> Result<Vec<AnalystTarget>, StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT date, consensus_target, high_target, low_target, rating, rating_value,
                        buy_ratings, hold_ratings, sell_ratings, total_analysts
                 FROM analyst_targets WHERE security_id = ?1
                 ORDER BY date DESC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(params![security_id], |row| {
                let date_str: String = row.get(0)?;
                Ok(AnalystTarget {
                    date: parse_date_column(0, date_str)?,
                    consensus_target: row.get(1)?,
                    high_target: row.get(2)?,
                    low_target: row.get(3)?,
                    rating: row.get(4)?,
                    rating_value: row.get(5)?,
                    buy_ratings: row.get(6)?,
                    hold_ratings: row.get(7)?,
                    sell_ratings: row.get(8)?,
                    total_analysts: row.get(9)?,
                })
            })
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }

    fn upsert_sentiment(
        &self,
        security_id: i64,
        sample: &SentimentSample,
    ) -> Result<(), StockpickError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT INTO sentiment_samples (security_id, timestamp, source, absolute_index,
                relative_index, sentiment, perception)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(security_id, timestamp, source) DO UPDATE SET
                absolute_index = excluded.absolute_index,
                relative_index = excluded.relative_index,
                sentiment = excluded.sentiment, perception = excluded.perception",
            params![
                security_id,
                sample.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                sample.source,
                sample.absolute_index,
                sample.relative_index,
                sample.sentiment,
                sample.perception
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
        let conn = self.pool.get().map_err(pool_err)?;

        let mut stmt = conn
            .prepare(
                "SELECT timestamp, source, absolute_index, relative_index, sentiment, perception
                 FROM sentiment_samples
                 WHERE security_id = ?1 AND timestamp >= ?2 AND timestamp <= ?3 AND source = ?4
                 ORDER BY timestamp DESC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    security_id,
                    from.format(TIMESTAMP_FORMAT).to_string(),
                    to.format(TIMESTAMP_FORMAT).to_string(),
                    source
                ],
                |row| {
                    let ts_str: String = row.get(0)?;
                    Ok(SentimentSample {
                        timestamp: parse_timestamp_column(0, ts_str)?,
                        source: row.get(1)?,
                        absolute_index: row.get(2)?,
                        relative_index: row.get(3)?,
                        sentiment: row.get(4)?,
                        perception: row.get(5)?,
                    })
                },
            )
            .map_err(query_err)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_err)
    }
}
