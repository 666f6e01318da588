//! Polymarket Paper-Trading Bot Library
//!
//! Simulates automated trading against binary-outcome prediction
//! markets. Positions are opened against a fixed budget from a list
//! of scanner-discovered opportunities, then polled against live
//! market data until each one either stops out on an adverse
//! probability move or settles at the market's terminal outcome.

pub mod allocator;
pub mod api;
pub mod config;
pub mod gateway;
pub mod ledger;
pub mod services;
pub mod sink;
pub mod types;

pub use config::Config;
pub use gateway::{HttpGateway, MarketData, MarketState, OrderBook};
pub use ledger::Ledger;
pub use services::{PollingScheduler, ResolutionSettler, SchedulerState, StopLossEvaluator};
pub use sink::{CsvSink, LedgerSink, TradeRow};
pub use types::{Opportunity, Position, PositionStatus, Resolution, ScannerOutput, Side};
