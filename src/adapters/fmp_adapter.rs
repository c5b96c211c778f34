//! Provider gateway adapter for the FMP-style REST API.
//!
//! Blocking HTTP client; the configured timeout is the deadline for every
//! provider call. All transport and decode failures surface as
//! [`StockpickError::TransientFetch`]. Retrying is the caller's decision,
//! never taken here.

use crate::domain::error::StockpickError;
use crate::domain::evidence::PeriodKind;
use crate::ports::config_port::ConfigPort;
use crate::ports::provider_port::{
    CompanyProfile, ProviderBar, ProviderPort, ProviderSentiment, ProviderStatement,
    ProviderTarget,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct FmpAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    currency: String,
}

/// The price-history endpoint wraps its records in an envelope.
#[derive(Debug, Deserialize)]
struct HistoricalEnvelope {
    #[serde(default)]
    historical: Vec<ProviderBar>,
}

impl FmpAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockpickError> {
        let api_key = config.require_string("provider", "api_key")?;

        let base_url = config
            .get_string("provider", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let timeout = config.get_int(
            "provider",
            "timeout_secs",
            DEFAULT_TIMEOUT_SECS as i64,
        );

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout.max(1) as u64))
            .build()
            .map_err(|e| StockpickError::ConfigInvalid {
                section: "provider".into(),
                key: "timeout_secs".into(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            currency: config
                .get_string("provider", "currency")
                .unwrap_or_else(|| "USD".to_string()),
        })
    }

    fn endpoint_url(&self, path: &str, params: &[(&str, &str)]) -> Result<reqwest::Url, String> {
        let mut url = reqwest::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| format!("bad provider url: {e}"))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
            query.append_pair("apikey", &self.api_key);
        }
        Ok(url)
    }

    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String, String> {
        let url = self.endpoint_url(path, params)?;
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| format!("failed to read response body: {e}"))?;

        if !status.is_success() {
            return Err(format!("provider returned {status}: {body}"));
        }

        Ok(body)
    }

    fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        symbol: &str,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, StockpickError> {
        let body = self.get(path, params).map_err(|reason| transient(symbol, reason))?;
        serde_json::from_str(&body)
            .map_err(|e| transient(symbol, format!("failed to decode response: {e}")))
    }
}

fn transient(symbol: &str, reason: String) -> StockpickError {
    StockpickError::TransientFetch {
        symbol: symbol.to_string(),
        reason,
    }
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ProviderPort for FmpAdapter {
    fn reporting_currency(&self) -> &str {
        &self.currency
    }

    fn fetch_profile(&self, symbol: &str) -> Result<Option<CompanyProfile>, StockpickError> {
        // The profile endpoint answers with a zero-or-one element array.
        let profiles: Vec<CompanyProfile> =
            self.fetch(symbol, &format!("/profile/{symbol}"), &[])?;
        Ok(profiles.into_iter().next())
    }

    fn fetch_price_bars(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProviderBar>, StockpickError> {
        let envelope: HistoricalEnvelope = self.fetch(
            symbol,
            &format!("/historical-price-full/{symbol}"),
            &[("from", iso(from).as_str()), ("to", iso(to).as_str())],
        )?;
        Ok(envelope.historical)
    }

    fn fetch_statements(
        &self,
        symbol: &str,
        period: PeriodKind,
    ) -> Result<Vec<ProviderStatement>, StockpickError> {
        self.fetch(
            symbol,
            &format!("/income-statement/{symbol}"),
            &[("period", period.as_str())],
        )
    }

    fn fetch_analyst_targets(&self, symbol: &str) -> Result<Vec<ProviderTarget>, StockpickError> {
        self.fetch(symbol, &format!("/price-target-consensus/{symbol}"), &[])
    }

    fn fetch_sentiment(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ProviderSentiment>, StockpickError> {
        self.fetch(
            symbol,
            &format!("/historical/social-sentiment/{symbol}"),
            &[("from", iso(from).as_str()), ("to", iso(to).as_str())],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn adapter() -> FmpAdapter {
        let config = FileConfigAdapter::from_string(
            "[provider]\napi_key = k123\nbase_url = https://example.test/api/v3/\n",
        )
        .unwrap();
        FmpAdapter::from_config(&config).unwrap()
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = FileConfigAdapter::from_string("[provider]\n").unwrap();
        assert!(matches!(
            FmpAdapter::from_config(&config),
            Err(StockpickError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn endpoint_url_carries_params_and_key() {
        let adapter = adapter();
        let url = adapter
            .endpoint_url("/historical-price-full/AAPL", &[("from", "2024-01-01")])
            .unwrap();
        assert_eq!(url.host_str(), Some("example.test"));
        assert_eq!(url.path(), "/api/v3/historical-price-full/AAPL");
        let query = url.query().unwrap();
        assert!(query.contains("from=2024-01-01"));
        assert!(query.contains("apikey=k123"));
    }

    #[test]
    fn decodes_historical_envelope() {
        let body = r#"{
            "symbol": "AAPL",
            "historical": [
                {"date": "2024-01-03", "open": 184.2, "high": 185.9, "low": 183.4,
                 "close": 184.3, "volume": 58414500, "vwap": 184.5,
                 "change": 0.1, "changePercent": 0.054},
                {"date": "2024-01-02", "close": 185.6}
            ]
        }"#;
        let envelope: HistoricalEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.historical.len(), 2);
        assert_eq!(envelope.historical[0].date, "2024-01-03");
        assert_eq!(envelope.historical[0].pct_change, 0.054);
        // Omitted numeric fields decode as zero, like the provider sends them.
        assert_eq!(envelope.historical[1].open, 0.0);
        assert_eq!(envelope.historical[1].volume, 0);
    }

    #[test]
    fn decodes_profile_array_ignoring_extra_fields() {
        let body = r#"[{
            "symbol": "AAPL",
            "price": 184.3,
            "companyName": "Apple Inc.",
            "exchange": "NASDAQ",
            "sector": "Technology",
            "industry": "Consumer Electronics",
            "ceo": "Tim Cook"
        }]"#;
        let profiles: Vec<CompanyProfile> = serde_json::from_str(body).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].company_name, "Apple Inc.");
        assert_eq!(profiles[0].exchange, "NASDAQ");
    }

    #[test]
    fn decodes_consensus_and_sentiment_records() {
        let targets: Vec<ProviderTarget> = serde_json::from_str(
            r#"[{"date": "2025-01-15", "targetConsensus": 130.0, "targetHigh": 150.0,
                 "targetLow": 110.0, "consensusRating": "Buy",
                 "consensusRatingValue": 4.2, "buyRatings": 12, "holdRatings": 3,
                 "sellRatings": 0, "totalAnalysts": 15}]"#,
        )
        .unwrap();
        assert_eq!(targets[0].target_consensus, 130.0);
        assert_eq!(targets[0].consensus_rating_value, 4.2);

        let sentiment: Vec<ProviderSentiment> = serde_json::from_str(
            r#"[{"date": "2025-01-20 07:00:00", "absoluteIndex": 150000.0,
                 "relativeIndex": 2.0, "sentiment": 0.8,
                 "generalPerception": "bullish", "source": "stocktwits"}]"#,
        )
        .unwrap();
        assert_eq!(sentiment[0].absolute_index, 150_000.0);
        assert_eq!(sentiment[0].source, "stocktwits");
    }

    #[test]
    fn decodes_statement_records() {
        let statements: Vec<ProviderStatement> = serde_json::from_str(
            r#"[{"date": "2024-12-31", "period": "annual", "revenue": 1000.0,
                 "netIncome": 120.0, "eps": 2.0, "totalAssets": 5000.0,
                 "totalLiabilities": 2000.0, "totalEquity": 3000.0,
                 "freeCashFlow": 400.0, "debtToEquityRatio": 0.66,
                 "peRatio": 8.0, "pbRatio": 1.2, "roic": 0.2}]"#,
        )
        .unwrap();
        assert_eq!(statements[0].eps, 2.0);
        assert_eq!(statements[0].pe_ratio, 8.0);
        assert_eq!(statements[0].free_cash_flow, 400.0);
    }
}
