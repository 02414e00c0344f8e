//! Per-kind alert evaluation (§4.5).

use crate::alerts::subscription::{AlertKind, AlertSubscription, ChangeDirection};
use crate::catalog::{Operator, CATALOG};
use crate::dsl::Rule;
use crate::store::{DataStore, InstrumentSnapshot, StoreError};
use crate::validation::{validate, ValidatorSettings};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown field '{0}' in alert condition")]
    UnknownField(String),
    #[error("unrecognized operator '{0}'")]
    UnknownOperator(String),
    #[error("custom_dsl alert rule failed validation: {0:?}")]
    InvalidCustomRule(Vec<crate::validation::Diagnostic>),
    #[error("custom_dsl alert compilation failed: {0}")]
    CompileFailed(#[from] crate::compile::CompileError),
}

/// Legacy operator spellings the evaluator accepts directly, mirroring
/// the Validator's canonicalization (§4.3 phase 3) for alert conditions
/// that bypass the DSL entirely.
fn canonical_operator(s: &str) -> &str {
    match s {
        "above" => ">",
        "below" => "<",
        other => other,
    }
}

fn compare_numbers(op: Operator, lhs: f64, rhs: f64) -> bool {
    match op {
        Operator::Lt => lhs < rhs,
        Operator::Gt => lhs > rhs,
        Operator::Le => lhs <= rhs,
        Operator::Ge => lhs >= rhs,
        Operator::Eq => (lhs - rhs).abs() < f64::EPSILON,
        Operator::Ne => (lhs - rhs).abs() >= f64::EPSILON,
        _ => false,
    }
}

fn field_value(snapshot: &InstrumentSnapshot, field: &str) -> Option<Value> {
    macro_rules! num {
        ($e:expr) => {
            $e.map(|v| serde_json::json!(v))
        };
    }
    match field {
        "market_cap" => num!(snapshot.market_cap),
        "price" => num!(snapshot.price),
        "rsi" => num!(snapshot.rsi),
        "pe_ratio" => num!(snapshot.pe_ratio),
        "revenue" => num!(snapshot.revenue),
        "revenue_growth_yoy" => num!(snapshot.revenue_growth_yoy),
        "net_income" => num!(snapshot.net_income),
        "net_income_growth_yoy" => num!(snapshot.net_income_growth_yoy),
        "dividend_yield" => num!(snapshot.dividend_yield),
        "free_cash_flow" => num!(snapshot.free_cash_flow),
        "total_debt" => num!(snapshot.total_debt),
        "price_target_avg" => num!(snapshot.price_target_avg),
        "is_profitable" => snapshot.is_profitable.map(|v| serde_json::json!(v)),
        "debt_to_fcf" => match (snapshot.total_debt, snapshot.free_cash_flow) {
            (Some(debt), Some(fcf)) if fcf != 0.0 => Some(serde_json::json!(debt / fcf)),
            _ => None,
        },
        _ => None,
    }
}

fn evaluate_threshold(field: &str, operator: &str, threshold: &Value, snapshot: &InstrumentSnapshot) -> Result<bool, EvaluatorError> {
    CATALOG.resolve(field).ok_or_else(|| EvaluatorError::UnknownField(field.to_string()))?;
    let op = Operator::from_str(canonical_operator(operator))
        .ok_or_else(|| EvaluatorError::UnknownOperator(operator.to_string()))?;
    let Some(actual) = field_value(snapshot, field) else {
        return Ok(false);
    };
    match (actual.as_f64(), threshold.as_f64()) {
        (Some(a), Some(t)) => Ok(compare_numbers(op, a, t)),
        _ => Ok(actual == *threshold && matches!(op, Operator::Eq)),
    }
}

/// Evaluate one subscription against the current store state, returning
/// whether it should fire.
pub async fn evaluate(
    sub: &AlertSubscription,
    store: &dyn DataStore,
    validator_settings: &ValidatorSettings,
) -> Result<bool, EvaluatorError> {
    match &sub.kind {
        AlertKind::PriceThreshold { operator, value } => {
            let snapshot = store.latest_snapshot(&sub.ticker).await?;
            evaluate_threshold("price", operator, &serde_json::json!(value), &snapshot)
        }
        AlertKind::Fundamental { field, operator, value } => {
            let snapshot = store.latest_snapshot(&sub.ticker).await?;
            evaluate_threshold(field, operator, value, &snapshot)
        }
        AlertKind::Technical { field, operator, value } => {
            let snapshot = store.latest_snapshot(&sub.ticker).await?;
            evaluate_threshold(field, operator, value, &snapshot)
        }
        AlertKind::PriceChange { direction, pct_change, window_hours } => {
            let snapshot = store.latest_snapshot(&sub.ticker).await?;
            let Some(current) = snapshot.price else { return Ok(false) };
            let Some(past) = store.price_at_or_before(&sub.ticker, *window_hours).await? else {
                return Ok(false);
            };
            if past.close == 0.0 {
                return Ok(false);
            }
            let change = (current - past.close) / past.close;
            Ok(match direction {
                ChangeDirection::Up => change >= *pct_change,
                ChangeDirection::Down => change <= -*pct_change,
                ChangeDirection::Either => change.abs() >= *pct_change,
            })
        }
        AlertKind::Event { field, within_days } => {
            let snapshot = store.latest_snapshot(&sub.ticker).await?;
            let date = match field.as_str() {
                "earnings_date" => snapshot.earnings_date,
                "buyback_announced_date" => snapshot.buyback_announced_date,
                other => return Err(EvaluatorError::UnknownField(other.to_string())),
            };
            Ok(match date {
                Some(d) => {
                    let days = (d - chrono::Utc::now().date_naive()).num_days();
                    (0..=*within_days as i64).contains(&days)
                }
                None => false,
            })
        }
        AlertKind::CustomDsl { rule } => evaluate_custom_dsl(rule, &sub.ticker, store, validator_settings).await,
    }
}

async fn evaluate_custom_dsl(
    rule: &Rule,
    ticker: &str,
    store: &dyn DataStore,
    validator_settings: &ValidatorSettings,
) -> Result<bool, EvaluatorError> {
    let validated = validate(rule.clone(), &CATALOG, validator_settings)
        .map_err(EvaluatorError::InvalidCustomRule)?;

    let ticker_filter = crate::dsl::Node::Cond(crate::dsl::Cond {
        field: "ticker".to_string(),
        operator: "=".to_string(),
        value: serde_json::json!(ticker),
        period: None,
        null_handling: None,
        value_is_field: false,
    });
    let scoped = Rule {
        meta: None,
        filter: crate::dsl::Node::And(vec![ticker_filter, validated.rule.filter]),
        sort: None,
        limit: Some(1),
    };

    let compiled = crate::compile::compile(&scoped, &CATALOG, &crate::config::CompilerSettings::default())?;
    let rows = store.run_screen(&compiled).await?;
    Ok(!rows.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ScreenResultRow;
    use async_trait::async_trait;

    struct FakeStore {
        snapshot: InstrumentSnapshot,
        past_price: Option<crate::store::PricePoint>,
    }

    #[async_trait]
    impl DataStore for FakeStore {
        async fn run_screen(&self, _query: &crate::compile::CompiledQuery) -> Result<Vec<ScreenResultRow>, StoreError> {
            Ok(vec![])
        }
        async fn latest_snapshot(&self, _ticker: &str) -> Result<InstrumentSnapshot, StoreError> {
            Ok(self.snapshot.clone())
        }
        async fn price_at_or_before(&self, _ticker: &str, _window_hours: u32) -> Result<Option<crate::store::PricePoint>, StoreError> {
            Ok(self.past_price)
        }
    }

    fn blank_snapshot() -> InstrumentSnapshot {
        InstrumentSnapshot {
            ticker: "ACME".to_string(),
            sector: None,
            industry: None,
            exchange: None,
            market_cap: None,
            price: None,
            price_at: None,
            rsi: None,
            pe_ratio: None,
            revenue: None,
            revenue_growth_yoy: None,
            net_income: None,
            net_income_growth_yoy: None,
            dividend_yield: None,
            free_cash_flow: None,
            buyback_announced_date: None,
            total_debt: None,
            price_target_avg: None,
            earnings_date: None,
            is_profitable: None,
        }
    }

    #[tokio::test]
    async fn price_threshold_fires_above_value() {
        let mut snapshot = blank_snapshot();
        snapshot.price = Some(150.0);
        let store = FakeStore { snapshot, past_price: None };
        let sub = AlertSubscription::new(
            "user-1",
            "ACME",
            AlertKind::PriceThreshold { operator: "above".to_string(), value: 100.0 },
            crate::alerts::subscription::Cadence::Hourly,
        );
        let fired = evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap();
        assert!(fired);
    }

    #[tokio::test]
    async fn price_change_respects_direction() {
        let mut snapshot = blank_snapshot();
        snapshot.price = Some(110.0);
        let store = FakeStore {
            snapshot,
            past_price: Some(crate::store::PricePoint { close: 100.0, time: chrono::Utc::now() }),
        };
        let sub = AlertSubscription::new(
            "user-1",
            "ACME",
            AlertKind::PriceChange { direction: ChangeDirection::Up, pct_change: 0.05, window_hours: 24 },
            crate::alerts::subscription::Cadence::Daily,
        );
        assert!(evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap());

        let sub_down = AlertSubscription::new(
            "user-1",
            "ACME",
            AlertKind::PriceChange { direction: ChangeDirection::Down, pct_change: 0.05, window_hours: 24 },
            crate::alerts::subscription::Cadence::Daily,
        );
        assert!(!evaluate(&sub_down, &store, &ValidatorSettings::default()).await.unwrap());
    }

    #[tokio::test]
    async fn fundamental_alert_missing_data_does_not_fire() {
        let store = FakeStore { snapshot: blank_snapshot(), past_price: None };
        let sub = AlertSubscription::new(
            "user-1",
            "ACME",
            AlertKind::Fundamental { field: "pe_ratio".to_string(), operator: "<".to_string(), value: serde_json::json!(15) },
            crate::alerts::subscription::Cadence::Daily,
        );
        assert!(!evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap());
    }
}
