//! Polling scheduler
//!
//! Drives the stop-loss evaluator and resolution settler over every
//! open position at a fixed interval until nothing remains open.
//! Ticks never overlap: a sweep runs to completion before the next
//! interval starts. Market fetches fan out concurrently; the
//! decision-and-mutation phase runs under a single write lock.

use crate::gateway::{GatewayError, MarketData, MarketState};
use crate::ledger::Ledger;
use crate::services::settlement::ResolutionSettler;
use crate::services::stop_loss::{StopLossEvaluator, StopLossOutcome};
use crate::sink::LedgerSink;
use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Scheduler lifecycle; `Done` is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Done,
}

pub struct PollingScheduler {
    gateway: Arc<dyn MarketData>,
    sink: Arc<dyn LedgerSink>,
    ledger: Arc<RwLock<Ledger>>,
    stop_loss: StopLossEvaluator,
    settler: ResolutionSettler,
    interval: Duration,
}

impl PollingScheduler {
    pub fn new(
        gateway: Arc<dyn MarketData>,
        sink: Arc<dyn LedgerSink>,
        ledger: Arc<RwLock<Ledger>>,
        stop_loss: StopLossEvaluator,
        settler: ResolutionSettler,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            sink,
            ledger,
            stop_loss,
            settler,
            interval,
        }
    }

    /// Poll until every position is closed, then dump the trade log.
    pub async fn run(&self) -> Result<()> {
        info!("Watching market resolutions (interval: {:?})", self.interval);

        loop {
            match self.tick().await? {
                SchedulerState::Running => {
                    tokio::time::sleep(self.interval).await;
                }
                SchedulerState::Done => {
                    info!("All markets resolved. Paper trading complete.");
                    if let Err(e) = self.sink.dump_log() {
                        warn!("Trade log dump failed: {}", e);
                    }
                    return Ok(());
                }
            }
        }
    }

    /// One full sweep over all open positions.
    ///
    /// Per-position fetch or evaluation failures are isolated: they
    /// skip that position for this tick and never abort the sweep.
    pub async fn tick(&self) -> Result<SchedulerState> {
        // Fetch phase: concurrent, read-only
        let targets: Vec<(usize, String)> = {
            let ledger = self.ledger.read().await;
            ledger
                .open_indices()
                .into_iter()
                .map(|i| (i, ledger.positions()[i].market_id.clone()))
                .collect()
        };

        let fetches = targets
            .iter()
            .map(|(_, market_id)| self.gateway.fetch_market(market_id));
        let states: Vec<Result<MarketState, GatewayError>> = join_all(fetches).await;

        // Mutation phase: serialized behind the write lock
        let mut ledger = self.ledger.write().await;

        for ((index, market_id), state) in targets.into_iter().zip(states) {
            let market = match state {
                Ok(market) => market,
                Err(e) => {
                    warn!("Market {} fetch failed, skipping this tick: {}", market_id, e);
                    continue;
                }
            };

            // Stop-loss first; if it fully closes the position,
            // settlement is skipped for this tick
            match self
                .stop_loss
                .evaluate(
                    self.gateway.as_ref(),
                    &mut ledger,
                    index,
                    &market,
                    self.sink.as_ref(),
                )
                .await
            {
                Ok(StopLossOutcome::Exited { closed: true }) => continue,
                Ok(_) => {}
                Err(e) => {
                    warn!("Stop-loss evaluation failed for {}: {}", market_id, e);
                    continue;
                }
            }

            if let Err(e) = self.settler.settle(&mut ledger, index, &market, self.sink.as_ref()) {
                warn!("Settlement failed for {}: {}", market_id, e);
            }
        }

        if ledger.all_closed() {
            Ok(SchedulerState::Done)
        } else {
            Ok(SchedulerState::Running)
        }
    }
}
