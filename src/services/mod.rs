//! Engine services: stop-loss, settlement, and the polling scheduler

pub mod scheduler;
pub mod settlement;
pub mod stop_loss;

pub use scheduler::{PollingScheduler, SchedulerState};
pub use settlement::{ResolutionSettler, SettleOutcome};
pub use stop_loss::{StopLossEvaluator, StopLossOutcome};
