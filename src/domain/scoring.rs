//! Undervaluation scoring engine.
//!
//! Pure and deterministic: maps a security, its latest price, and three
//! evidence collections to a composite score with a per-source breakdown.
//! No I/O, no shared state, safe to call concurrently for different
//! securities. Evidence arrives as [`LatestFirst`] collections; only the head
//! of each is consulted.

use crate::domain::error::StockpickError;
use crate::domain::evidence::{AnalystTarget, FinancialStatement, LatestFirst, SentimentSample};
use crate::domain::security::Security;
use crate::ports::config_port::ConfigPort;
use serde::Serialize;

/// Blend weights for the three evidence sources. Passed in explicitly so
/// tests and deployments can override without touching global state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub fundamental: f64,
    pub analyst: f64,
    pub sentiment: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            fundamental: 0.50,
            analyst: 0.30,
            sentiment: 0.20,
        }
    }
}

impl ScoringWeights {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = Self::default();
        ScoringWeights {
            fundamental: config.get_double("scoring", "fundamental_weight", defaults.fundamental),
            analyst: config.get_double("scoring", "analyst_weight", defaults.analyst),
            sentiment: config.get_double("scoring", "sentiment_weight", defaults.sentiment),
        }
    }
}

/// Composite undervaluation score, 0–100, with sub-scores scaled the same
/// way for reporting. Ephemeral: computed fresh on every call, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct UndervaluationScore {
    pub security_id: i64,
    pub symbol: String,
    pub score: f64,
    pub fundamental_score: f64,
    pub analyst_score: f64,
    pub sentiment_score: f64,
}

/// Compute the composite undervaluation score for one security.
///
/// Fails with [`StockpickError::InvalidInput`] when `latest_price` is not
/// strictly positive. Empty evidence collections contribute zero; the
/// composite for all-empty evidence is exactly zero.
pub fn score(
    security: &Security,
    latest_price: f64,
    statements: &LatestFirst<FinancialStatement>,
    targets: &LatestFirst<AnalystTarget>,
    sentiments: &LatestFirst<SentimentSample>,
    weights: &ScoringWeights,
) -> Result<UndervaluationScore, StockpickError> {
    if !(latest_price > 0.0) {
        return Err(StockpickError::InvalidInput {
            reason: format!(
                "latest price for {} must be positive, got {latest_price}",
                security.symbol
            ),
        });
    }

    let fundamental = fundamental_component(statements);
    let analyst = analyst_component(targets, latest_price);
    let sentiment = sentiment_component(sentiments);

    let composite = (fundamental * weights.fundamental
        + analyst * weights.analyst
        + sentiment * weights.sentiment)
        * 100.0;

    Ok(UndervaluationScore {
        security_id: security.id,
        symbol: security.symbol.clone(),
        // Every component is non-negative, so only the upper bound needs a cap.
        score: composite.min(100.0),
        fundamental_score: fundamental * 100.0,
        analyst_score: analyst * 100.0,
        sentiment_score: sentiment * 100.0,
    })
}

/// Fundamental evidence contribution. Ceiling is 0.85, not 1.0; the
/// thresholds are the contract, the remaining headroom stays unused.
fn fundamental_component(statements: &LatestFirst<FinancialStatement>) -> f64 {
    let Some(latest) = statements.latest() else {
        return 0.0;
    };

    let mut component = 0.0;

    if latest.pe_ratio > 0.0 {
        if latest.pe_ratio < 10.0 {
            component += 0.30;
        } else if latest.pe_ratio < 20.0 {
            component += 0.15;
        }
    }

    if latest.eps > 0.0 {
        component += 0.20;
    }

    if latest.roic > 0.15 {
        component += 0.20;
    }

    if latest.free_cash_flow > 0.0 {
        component += 0.15;
    }

    component
}

/// Analyst consensus contribution. Ceiling 0.70.
fn analyst_component(targets: &LatestFirst<AnalystTarget>, latest_price: f64) -> f64 {
    let Some(latest) = targets.latest() else {
        return 0.0;
    };

    let mut component = 0.0;

    if latest.consensus_target > 0.0 {
        let upside = (latest.consensus_target - latest_price) / latest_price;
        if upside > 0.20 {
            component += 0.40;
        } else if upside > 0.10 {
            component += 0.20;
        }
    }

    if latest.rating_value >= 4.0 {
        component += 0.30;
    } else if latest.rating_value >= 3.0 {
        component += 0.15;
    }

    component
}

/// Sentiment contribution. Ceiling 0.30.
///
/// Sources disagree on scale: some report sentiment on [-1, 1], others on a
/// 0-100 percentage. Any value with magnitude above 1 is assumed
/// percentage-scaled and divided by 100. Fragile: a unit-scale feed can
/// never legitimately exceed 1, and this heuristic is what enforces that.
fn sentiment_component(sentiments: &LatestFirst<SentimentSample>) -> f64 {
    let Some(latest) = sentiments.latest() else {
        return 0.0;
    };

    let mut component = 0.0;

    let mut normalized = latest.sentiment;
    if normalized.abs() > 1.0 {
        normalized /= 100.0;
    }

    if normalized > 0.7 {
        component += 0.20;
    } else if normalized > 0.5 {
        component += 0.10;
    }

    if latest.absolute_index > 100_000.0 {
        component += 0.10;
    }

    component
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    fn security() -> Security {
        Security {
            id: 7,
            symbol: "ACME".into(),
            company_name: "Acme Corp".into(),
            exchange: "NYSE".into(),
            sector: "Industrials".into(),
            industry: "Machinery".into(),
            currency: "USD".into(),
            is_active: true,
        }
    }

    fn statement(date: NaiveDate, pe: f64, eps: f64, roic: f64, fcf: f64) -> FinancialStatement {
        FinancialStatement {
            date,
            period: crate::domain::evidence::PeriodKind::Annual,
            revenue: 1_000.0,
            net_income: 120.0,
            eps,
            total_assets: 5_000.0,
            total_liabilities: 2_000.0,
            total_equity: 3_000.0,
            free_cash_flow: fcf,
            debt_to_equity: 0.66,
            pe_ratio: pe,
            pb_ratio: 1.2,
            roic,
        }
    }

    fn target(date: NaiveDate, consensus: f64, rating_value: f64) -> AnalystTarget {
        AnalystTarget {
            date,
            consensus_target: consensus,
            high_target: consensus * 1.2,
            low_target: consensus * 0.8,
            rating: "Buy".into(),
            rating_value,
            buy_ratings: 10,
            hold_ratings: 4,
            sell_ratings: 1,
            total_analysts: 15,
        }
    }

    fn sentiment(ts: NaiveDateTime, value: f64, absolute_index: f64) -> SentimentSample {
        SentimentSample {
            timestamp: ts,
            absolute_index,
            relative_index: 1.5,
            sentiment: value,
            perception: "bullish".into(),
            source: "Overall".into(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        day(y, m, d).and_hms_opt(12, 0, 0).unwrap()
    }

    #[test]
    fn full_evidence_scores_69_5() {
        // P/E 8, EPS 2, ROIC 0.20, FCF 500 → 0.85; 30% upside + rating 4.2 →
        // 0.70; sentiment 0.8 + volume 150k → 0.30.
        // (0.85*0.5 + 0.70*0.3 + 0.30*0.2) * 100 = 69.5
        let statements = LatestFirst::assume_sorted(vec![statement(
            day(2024, 12, 31),
            8.0,
            2.0,
            0.20,
            500.0,
        )]);
        let targets = LatestFirst::assume_sorted(vec![target(day(2025, 1, 15), 130.0, 4.2)]);
        let sentiments =
            LatestFirst::assume_sorted(vec![sentiment(ts(2025, 1, 20), 0.8, 150_000.0)]);

        let result = score(
            &security(),
            100.0,
            &statements,
            &targets,
            &sentiments,
            &ScoringWeights::default(),
        )
        .unwrap();

        approx::assert_relative_eq!(result.fundamental_score, 85.0, epsilon = 1e-9);
        approx::assert_relative_eq!(result.analyst_score, 70.0, epsilon = 1e-9);
        approx::assert_relative_eq!(result.sentiment_score, 30.0, epsilon = 1e-9);
        approx::assert_relative_eq!(result.score, 69.5, epsilon = 1e-9);
    }

    #[test]
    fn empty_evidence_scores_exactly_zero() {
        let result = score(
            &security(),
            42.0,
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &ScoringWeights::default(),
        )
        .unwrap();

        assert_eq!(result.score, 0.0);
        assert_eq!(result.fundamental_score, 0.0);
        assert_eq!(result.analyst_score, 0.0);
        assert_eq!(result.sentiment_score, 0.0);
    }

    #[test]
    fn percentage_scaled_sentiment_matches_unit_scaled() {
        let unit = LatestFirst::assume_sorted(vec![sentiment(ts(2025, 1, 20), 0.8, 150_000.0)]);
        let percent = LatestFirst::assume_sorted(vec![sentiment(ts(2025, 1, 20), 80.0, 150_000.0)]);

        let weights = ScoringWeights::default();
        let a = score(
            &security(),
            100.0,
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &unit,
            &weights,
        )
        .unwrap();
        let b = score(
            &security(),
            100.0,
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &percent,
            &weights,
        )
        .unwrap();

        approx::assert_relative_eq!(a.sentiment_score, b.sentiment_score, epsilon = 1e-9);
        approx::assert_relative_eq!(a.sentiment_score, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn non_positive_price_is_invalid_input() {
        for bad in [0.0, -5.0, f64::NAN] {
            let result = score(
                &security(),
                bad,
                &LatestFirst::empty(),
                &LatestFirst::empty(),
                &LatestFirst::empty(),
                &ScoringWeights::default(),
            );
            assert!(matches!(
                result,
                Err(StockpickError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn pe_bands() {
        let weights = ScoringWeights::default();
        let cases = [
            (8.0, 0.30),
            (10.0, 0.15),
            (19.99, 0.15),
            (20.0, 0.0),
            (-4.0, 0.0),
            (0.0, 0.0),
        ];
        for (pe, expected) in cases {
            let statements =
                LatestFirst::assume_sorted(vec![statement(day(2024, 12, 31), pe, -1.0, 0.0, -1.0)]);
            let result = score(
                &security(),
                100.0,
                &statements,
                &LatestFirst::empty(),
                &LatestFirst::empty(),
                &weights,
            )
            .unwrap();
            approx::assert_relative_eq!(result.fundamental_score, expected * 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn upside_and_rating_bands() {
        let weights = ScoringWeights::default();
        // (consensus, rating, expected component)
        let cases = [
            (121.0, 4.0, 0.40 + 0.30), // >20% upside, strong buy
            (115.0, 3.5, 0.20 + 0.15), // >10% upside, hold-ish
            (105.0, 2.0, 0.0),         // 5% upside, sell
            (0.0, 4.5, 0.30),          // no usable target, rating only
        ];
        for (consensus, rating, expected) in cases {
            let targets =
                LatestFirst::assume_sorted(vec![target(day(2025, 1, 15), consensus, rating)]);
            let result = score(
                &security(),
                100.0,
                &LatestFirst::empty(),
                &targets,
                &LatestFirst::empty(),
                &weights,
            )
            .unwrap();
            approx::assert_relative_eq!(result.analyst_score, expected * 100.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn stale_first_input_scores_the_stale_record() {
        // The engine trusts the head of the collection. A caller that hands
        // over ascending data gets the oldest snapshot scored: deterministic,
        // but not what it wanted.
        let old_good = statement(day(2020, 12, 31), 8.0, 2.0, 0.20, 500.0);
        let new_bad = statement(day(2024, 12, 31), 50.0, -1.0, 0.01, -10.0);

        let violated = LatestFirst::assume_sorted(vec![old_good.clone(), new_bad.clone()]);
        let respected =
            LatestFirst::sorted_desc_by(vec![old_good, new_bad], |s| s.date);

        let weights = ScoringWeights::default();
        let wrong = score(
            &security(),
            100.0,
            &violated,
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &weights,
        )
        .unwrap();
        let right = score(
            &security(),
            100.0,
            &respected,
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &weights,
        )
        .unwrap();

        // Violated contract scores the 2020 statement (all conditions hold).
        approx::assert_relative_eq!(wrong.fundamental_score, 85.0, epsilon = 1e-9);
        // Respected contract scores the 2024 statement (nothing holds).
        approx::assert_relative_eq!(right.fundamental_score, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn weight_overrides_rescale_the_composite() {
        let statements = LatestFirst::assume_sorted(vec![statement(
            day(2024, 12, 31),
            8.0,
            2.0,
            0.20,
            500.0,
        )]);
        let all_fundamental = ScoringWeights {
            fundamental: 1.0,
            analyst: 0.0,
            sentiment: 0.0,
        };
        let result = score(
            &security(),
            100.0,
            &statements,
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &all_fundamental,
        )
        .unwrap();
        approx::assert_relative_eq!(result.score, 85.0, epsilon = 1e-9);
    }

    #[test]
    fn oversized_weights_are_capped_at_100() {
        let statements = LatestFirst::assume_sorted(vec![statement(
            day(2024, 12, 31),
            8.0,
            2.0,
            0.20,
            500.0,
        )]);
        let inflated = ScoringWeights {
            fundamental: 5.0,
            analyst: 0.0,
            sentiment: 0.0,
        };
        let result = score(
            &security(),
            100.0,
            &statements,
            &LatestFirst::empty(),
            &LatestFirst::empty(),
            &inflated,
        )
        .unwrap();
        assert_eq!(result.score, 100.0);
    }

    proptest! {
        #[test]
        fn composite_stays_within_bounds(
            pe in -50.0_f64..200.0,
            eps in -20.0_f64..20.0,
            roic in -1.0_f64..1.0,
            fcf in -1e6_f64..1e6,
            consensus in 0.0_f64..500.0,
            rating in 0.0_f64..6.0,
            raw_sentiment in -150.0_f64..150.0,
            volume_index in 0.0_f64..1e7,
            price in 0.01_f64..1000.0,
        ) {
            let statements = LatestFirst::assume_sorted(vec![statement(
                day(2024, 12, 31), pe, eps, roic, fcf,
            )]);
            let targets = LatestFirst::assume_sorted(vec![target(
                day(2025, 1, 15), consensus, rating,
            )]);
            let sentiments = LatestFirst::assume_sorted(vec![sentiment(
                ts(2025, 1, 20), raw_sentiment, volume_index,
            )]);

            let result = score(
                &security(),
                price,
                &statements,
                &targets,
                &sentiments,
                &ScoringWeights::default(),
            ).unwrap();

            prop_assert!(result.score >= 0.0);
            prop_assert!(result.score <= 100.0);
            // Sub-score ceilings, with room for float noise in the sums.
            prop_assert!(result.fundamental_score <= 85.0 + 1e-9);
            prop_assert!(result.analyst_score <= 70.0 + 1e-9);
            prop_assert!(result.sentiment_score <= 30.0 + 1e-9);
        }
    }
}
