//! Alerts: standing subscriptions evaluated on a schedule (§3.5, §4.5, §4.6).

pub mod evaluator;
pub mod repository;
pub mod scheduler;
pub mod subscription;

pub use evaluator::{evaluate, EvaluatorError};
pub use repository::{AlertRepository, InMemoryAlertRepository};
pub use scheduler::{Scheduler, SubscriptionRepository};
pub use subscription::{AlertKind, AlertSubscription, Cadence, ChangeDirection};
