//! Alert subscription types (§3.5).

use crate::dsl::Rule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The six alert kinds a subscription can carry (§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// Fires once price crosses a fixed threshold.
    PriceThreshold { operator: String, value: f64 },
    /// Fires on a percentage move over a trailing window.
    PriceChange { direction: ChangeDirection, pct_change: f64, window_hours: u32 },
    /// Fires when a fundamentals field crosses a threshold.
    Fundamental { field: String, operator: String, value: Value },
    /// Fires on a dated event (earnings, buyback announcement) landing
    /// within `within_days` of now.
    Event { field: String, within_days: u32 },
    /// Fires when a technical indicator (rsi, trend) crosses a threshold.
    Technical { field: String, operator: String, value: Value },
    /// Fires when an arbitrary screen rule matches the subscription's
    /// ticker — full DSL tree reused rather than a bespoke condition.
    CustomDsl { rule: Rule },
}

impl AlertKind {
    /// A short human-readable label for this kind, used to build a
    /// notification's title (§6.4).
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::PriceThreshold { .. } => "price threshold",
            AlertKind::PriceChange { .. } => "price change",
            AlertKind::Fundamental { .. } => "fundamental",
            AlertKind::Event { .. } => "event",
            AlertKind::Technical { .. } => "technical",
            AlertKind::CustomDsl { .. } => "custom screen",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Up,
    Down,
    Either,
}

/// How often a subscription's cadence group is evaluated (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Realtime,
    EveryFiveMinutes,
    Hourly,
    Daily,
}

/// A standing request to notify `user_id` when `kind` becomes true for
/// `ticker` (§3.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSubscription {
    pub id: Uuid,
    pub user_id: String,
    pub ticker: String,
    pub kind: AlertKind,
    pub cadence: Cadence,
    pub created_at: DateTime<Utc>,
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Set on every evaluation, firing or not (§4.5 "on non-trigger,
    /// update only `last_evaluated`").
    pub last_evaluated: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    pub active: bool,
}

impl AlertSubscription {
    pub fn new(user_id: impl Into<String>, ticker: impl Into<String>, kind: AlertKind, cadence: Cadence) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            ticker: ticker.into(),
            kind,
            cadence,
            created_at: Utc::now(),
            last_fired_at: None,
            last_evaluated: None,
            trigger_count: 0,
            active: true,
        }
    }

    /// Whether the rate-limit window has elapsed since the last firing
    /// (§4.6: default 24h, configurable via `scheduler.rate_limit_window_hours`).
    pub fn rate_limit_elapsed(&self, now: DateTime<Utc>, window_hours: u64) -> bool {
        match self.last_fired_at {
            None => true,
            Some(last) => now.signed_duration_since(last) >= chrono::Duration::hours(window_hours as i64),
        }
    }
}
