//! The alert scheduler (§4.6, §5): a periodic loop per cadence group,
//! bounded parallelism across subscriptions, rate-limited firing, and
//! graceful cancellation.

use crate::alerts::evaluator::{evaluate, EvaluatorError};
use crate::alerts::subscription::{AlertSubscription, Cadence};
use crate::notify::NotificationSink;
use crate::store::DataStore;
use crate::validation::ValidatorSettings;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// A scheduled subscription's firing is recorded through this trait so
/// the scheduler doesn't need to know how subscriptions are persisted.
#[async_trait::async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn due(&self, cadence: Cadence) -> Vec<AlertSubscription>;
    async fn record_fired(&self, id: uuid::Uuid, at: chrono::DateTime<Utc>);
    /// Record a non-firing evaluation — `last_evaluated` only (§4.5).
    async fn record_evaluated(&self, id: uuid::Uuid, at: chrono::DateTime<Utc>);
}

pub struct Scheduler {
    store: Arc<dyn DataStore>,
    repo: Arc<dyn SubscriptionRepository>,
    sink: Arc<dyn NotificationSink>,
    cadence: Cadence,
    cadence_seconds: u64,
    rate_limit_window_hours: u64,
    max_parallel: usize,
    validator_settings: ValidatorSettings,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn DataStore>,
        repo: Arc<dyn SubscriptionRepository>,
        sink: Arc<dyn NotificationSink>,
        cadence: Cadence,
        settings: &crate::config::SchedulerSettings,
        validator_settings: ValidatorSettings,
    ) -> Self {
        Self {
            store,
            repo,
            sink,
            cadence,
            cadence_seconds: settings.cadence_seconds,
            rate_limit_window_hours: settings.rate_limit_window_hours,
            max_parallel: settings.max_parallel_groups,
            validator_settings,
        }
    }

    /// Run until `shutdown` resolves. Each tick evaluates every due
    /// subscription concurrently, bounded by a semaphore, and skips
    /// ticks missed while a previous one was still running rather than
    /// bursting to catch up.
    pub async fn run(&self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        let mut ticker = interval(std::time::Duration::from_secs(self.cadence_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = &mut shutdown => {
                    info!(cadence = ?self.cadence, "scheduler shutting down");
                    return;
                }
            }
        }
    }

    async fn run_once(&self) {
        let due = self.repo.due(self.cadence).await;
        if due.is_empty() {
            return;
        }
        info!(count = due.len(), cadence = ?self.cadence, "evaluating due subscriptions");

        // Group by ticker (§4.6 step 2) so the bounded parallelism the
        // semaphore enforces is across ticker groups, not individual
        // subscriptions, and a data-source outage for one ticker can't
        // starve the permits every other ticker's alerts need.
        let mut groups: std::collections::HashMap<String, Vec<AlertSubscription>> = std::collections::HashMap::new();
        for sub in due {
            groups.entry(sub.ticker.clone()).or_default().push(sub);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut handles = Vec::with_capacity(groups.len());

        for (ticker, subs) in groups {
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let store = self.store.clone();
            let repo = self.repo.clone();
            let sink = self.sink.clone();
            let validator_settings = self.validator_settings;
            let rate_limit_window_hours = self.rate_limit_window_hours;

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let now = Utc::now();
                for sub in subs {
                    if !sub.rate_limit_elapsed(now, rate_limit_window_hours) {
                        continue;
                    }
                    match evaluate(&sub, store.as_ref(), &validator_settings).await {
                        Ok(true) => {
                            let title = format!("{} alert triggered for {}", sub.kind.label(), sub.ticker);
                            let message = format!("Subscription {} fired for {}", sub.id, sub.ticker);
                            let payload = serde_json::to_value(&sub).unwrap_or(serde_json::Value::Null);
                            sink.emit(&sub.user_id, sub.id, &title, &message, payload).await;
                            repo.record_fired(sub.id, Utc::now()).await;
                        }
                        Ok(false) => {
                            repo.record_evaluated(sub.id, Utc::now()).await;
                        }
                        // Per-source failures (§4.6 step 3) don't abort the
                        // ticker group; the next subscription still runs.
                        Err(EvaluatorError::Store(e)) => {
                            warn!(ticker = %ticker, subscription = %sub.id, error = %e, "alert evaluation hit a store error");
                        }
                        Err(e) => {
                            error!(ticker = %ticker, subscription = %sub.id, error = %e, "alert evaluation failed");
                        }
                    }
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "alert evaluation task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::subscription::AlertKind;
    use crate::notify::LoggingSink;
    use crate::store::{InstrumentSnapshot, PricePoint, ScreenResultRow, StoreError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeStore;
    #[async_trait]
    impl DataStore for FakeStore {
        async fn run_screen(&self, _q: &crate::compile::CompiledQuery) -> Result<Vec<ScreenResultRow>, StoreError> {
            Ok(vec![])
        }
        async fn latest_snapshot(&self, ticker: &str) -> Result<InstrumentSnapshot, StoreError> {
            Ok(InstrumentSnapshot {
                ticker: ticker.to_string(),
                sector: None,
                industry: None,
                exchange: None,
                market_cap: None,
                price: Some(200.0),
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
            })
        }
        async fn price_at_or_before(&self, _t: &str, _w: u32) -> Result<Option<PricePoint>, StoreError> {
            Ok(None)
        }
    }

    struct FakeRepo {
        subs: Vec<AlertSubscription>,
        fired: Mutex<Vec<uuid::Uuid>>,
        evaluated: Mutex<Vec<uuid::Uuid>>,
    }
    #[async_trait]
    impl SubscriptionRepository for FakeRepo {
        async fn due(&self, _cadence: Cadence) -> Vec<AlertSubscription> {
            self.subs.clone()
        }
        async fn record_fired(&self, id: uuid::Uuid, _at: chrono::DateTime<Utc>) {
            self.fired.lock().unwrap().push(id);
        }
        async fn record_evaluated(&self, id: uuid::Uuid, _at: chrono::DateTime<Utc>) {
            self.evaluated.lock().unwrap().push(id);
        }
    }

    #[tokio::test]
    async fn run_once_records_firings_for_matching_subscriptions() {
        let sub = AlertSubscription::new(
            "user-1",
            "ACME",
            AlertKind::PriceThreshold { operator: ">".to_string(), value: 100.0 },
            Cadence::Hourly,
        );
        let sub_id = sub.id;
        let repo = Arc::new(FakeRepo { subs: vec![sub], fired: Mutex::new(vec![]), evaluated: Mutex::new(vec![]) });

        let scheduler = Scheduler::new(
            Arc::new(FakeStore),
            repo.clone(),
            Arc::new(LoggingSink),
            Cadence::Hourly,
            &crate::config::SchedulerSettings::default(),
            ValidatorSettings::default(),
        );
        scheduler.run_once().await;
        assert_eq!(repo.fired.lock().unwrap().as_slice(), &[sub_id]);
    }
}
