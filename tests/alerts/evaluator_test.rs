use async_trait::async_trait;
use chrono::{Duration, Utc};
use screener::alerts::{evaluate, AlertKind, AlertSubscription, Cadence, ChangeDirection};
use screener::compile::CompiledQuery;
use screener::dsl::{Cond, Node, Rule};
use screener::store::{DataStore, InstrumentSnapshot, PricePoint, ScreenResultRow, StoreError};
use screener::validation::ValidatorSettings;

struct FakeStore {
    snapshot: InstrumentSnapshot,
    past_price: Option<PricePoint>,
    screen_rows: Vec<ScreenResultRow>,
}

#[async_trait]
impl DataStore for FakeStore {
    async fn run_screen(&self, _query: &CompiledQuery) -> Result<Vec<ScreenResultRow>, StoreError> {
        Ok(self.screen_rows.clone())
    }
    async fn latest_snapshot(&self, _ticker: &str) -> Result<InstrumentSnapshot, StoreError> {
        Ok(self.snapshot.clone())
    }
    async fn price_at_or_before(&self, _ticker: &str, _window_hours: u32) -> Result<Option<PricePoint>, StoreError> {
        Ok(self.past_price)
    }
}

fn blank_snapshot(ticker: &str) -> InstrumentSnapshot {
    InstrumentSnapshot {
        ticker: ticker.to_string(),
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
async fn custom_dsl_alert_fires_when_the_screen_matches_the_ticker() {
    let store = FakeStore {
        snapshot: blank_snapshot("ACME"),
        past_price: None,
        screen_rows: vec![ScreenResultRow {
            ticker: "ACME".to_string(),
            sector: None,
            industry: None,
            exchange: None,
            market_cap: None,
            price: None,
        }],
    };
    let rule = Rule {
        meta: None,
        filter: Node::Cond(Cond {
            field: "market_cap".to_string(),
            operator: ">".to_string(),
            value: serde_json::json!(1e9),
            period: None,
            null_handling: None,
            value_is_field: false,
        }),
        sort: None,
        limit: None,
    };
    let sub = AlertSubscription::new("user-1", "ACME", AlertKind::CustomDsl { rule }, Cadence::Daily);
    let fired = evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap();
    assert!(fired);
}

#[tokio::test]
async fn custom_dsl_alert_does_not_fire_when_the_screen_returns_no_rows() {
    let store = FakeStore { snapshot: blank_snapshot("ACME"), past_price: None, screen_rows: vec![] };
    let rule = Rule {
        meta: None,
        filter: Node::Cond(Cond {
            field: "market_cap".to_string(),
            operator: ">".to_string(),
            value: serde_json::json!(1e9),
            period: None,
            null_handling: None,
            value_is_field: false,
        }),
        sort: None,
        limit: None,
    };
    let sub = AlertSubscription::new("user-1", "ACME", AlertKind::CustomDsl { rule }, Cadence::Daily);
    assert!(!evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap());
}

#[tokio::test]
async fn event_alert_fires_within_the_configured_window() {
    let mut snapshot = blank_snapshot("ACME");
    snapshot.earnings_date = Some((Utc::now() + Duration::days(5)).date_naive());
    let store = FakeStore { snapshot, past_price: None, screen_rows: vec![] };
    let sub = AlertSubscription::new(
        "user-1",
        "ACME",
        AlertKind::Event { field: "earnings_date".to_string(), within_days: 30 },
        Cadence::Daily,
    );
    assert!(evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap());
}

#[tokio::test]
async fn event_alert_does_not_fire_outside_the_window() {
    let mut snapshot = blank_snapshot("ACME");
    snapshot.earnings_date = Some((Utc::now() + Duration::days(90)).date_naive());
    let store = FakeStore { snapshot, past_price: None, screen_rows: vec![] };
    let sub = AlertSubscription::new(
        "user-1",
        "ACME",
        AlertKind::Event { field: "earnings_date".to_string(), within_days: 30 },
        Cadence::Daily,
    );
    assert!(!evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap());
}

#[tokio::test]
async fn rate_limit_blocks_firing_until_the_window_elapses() {
    let mut sub = AlertSubscription::new(
        "user-1",
        "ACME",
        AlertKind::PriceThreshold { operator: ">".to_string(), value: 100.0 },
        Cadence::Hourly,
    );
    let now = Utc::now();
    sub.last_fired_at = Some(now - Duration::hours(30));
    assert!(!sub.rate_limit_elapsed(now, 48), "30h since last firing has not cleared a 48h window");
    assert!(sub.rate_limit_elapsed(now, 24), "30h since last firing has cleared a 24h window");
}

#[tokio::test]
async fn technical_alert_evaluates_against_the_latest_snapshot() {
    let mut snapshot = blank_snapshot("ACME");
    snapshot.rsi = Some(82.0);
    let store = FakeStore { snapshot, past_price: None, screen_rows: vec![] };
    let sub = AlertSubscription::new(
        "user-1",
        "ACME",
        AlertKind::Technical { field: "rsi".to_string(), operator: ">=".to_string(), value: serde_json::json!(70) },
        Cadence::EveryFiveMinutes,
    );
    assert!(evaluate(&sub, &store, &ValidatorSettings::default()).await.unwrap());
}
