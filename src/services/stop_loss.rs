//! Stop-loss evaluator
//!
//! Runs once per open position per tick, before the resolution
//! settler. Triggers when the side's implied probability has dropped
//! from entry by at least the configured threshold, then exits as
//! much of the position as the best bid can absorb.

use crate::gateway::{MarketData, MarketState};
use crate::ledger::Ledger;
use crate::sink::{LedgerSink, TradeRow};
use crate::types::{PositionStatus, Resolution, Side};
use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Remaining size at or below this is treated as fully exited
const SIZE_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Outcome of one stop-loss evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLossOutcome {
    /// Threshold not breached this tick
    NotTriggered,
    /// Breached, but no usable exit liquidity; retry next tick
    Skipped,
    /// Exited against the best bid; `closed` when the fill exhausted
    /// the position
    Exited { closed: bool },
}

pub struct StopLossEvaluator {
    /// Probability drop from entry that triggers an exit
    stop_prob_drop: f64,
    fee_rate: Decimal,
}

impl StopLossEvaluator {
    pub fn new(stop_prob_drop: f64, fee_rate: Decimal) -> Self {
        Self {
            stop_prob_drop,
            fee_rate,
        }
    }

    /// Evaluate one open position against current market state.
    ///
    /// Fetches the exit-side order book only when the threshold is
    /// breached. Mutation (wallet credit, size/cost draw-down) is
    /// done inline; the caller serializes access to the ledger.
    pub async fn evaluate(
        &self,
        gateway: &dyn MarketData,
        ledger: &mut Ledger,
        index: usize,
        market: &MarketState,
        sink: &dyn LedgerSink,
    ) -> Result<StopLossOutcome> {
        let Some(position) = ledger.position_mut(index) else {
            return Ok(StopLossOutcome::NotTriggered);
        };
        if position.is_closed() {
            return Ok(StopLossOutcome::NotTriggered);
        }

        // Current implied probability of the held side
        let Some(yes_prob) = market.yes_prob() else {
            // Unparseable prices are a transient condition
            return Ok(StopLossOutcome::Skipped);
        };
        let current_prob = match position.side {
            Side::Yes => yes_prob,
            Side::No => 1.0 - yes_prob,
        };

        let prob_drop = position.entry_probability - current_prob;
        if prob_drop < self.stop_prob_drop {
            return Ok(StopLossOutcome::NotTriggered);
        }

        let slug = position.slug.clone();
        let token_id = position.token_id.clone();

        info!(
            "Stop check {} | Entry prob: {:.3} | Current prob: {:.3} | Drop: {:.3}",
            slug, position.entry_probability, current_prob, prob_drop
        );

        // Exiting a long is a sell: liquidity is the bid book
        let book = match gateway.fetch_order_book(&token_id).await {
            Ok(book) => book,
            Err(e) => {
                warn!("Stop {}: order book fetch failed: {}", slug, e);
                return Ok(StopLossOutcome::Skipped);
            }
        };

        let Some((best_bid, bid_size)) = book.best_bid_depth() else {
            warn!("Stop {}: no bids available", slug);
            return Ok(StopLossOutcome::Skipped);
        };

        let Some(position) = ledger.position_mut(index) else {
            return Ok(StopLossOutcome::Skipped);
        };

        if position.size <= Decimal::ZERO {
            return Ok(StopLossOutcome::Skipped);
        }

        let exit_size = position.size.min(bid_size);
        if exit_size <= Decimal::ZERO {
            return Ok(StopLossOutcome::Skipped);
        }

        let payout = exit_size * best_bid;
        // Cost is drawn down proportionally to the fraction of size
        // exited, not at entry price
        let cost_portion = exit_size / position.size * position.cost;

        let now = Utc::now();
        let pnl_no_fees = payout - cost_portion;
        let pnl_with_fees = payout - cost_portion - payout * self.fee_rate;

        position.size -= exit_size;
        position.cost -= cost_portion;

        position.resolution = Some(Resolution::StopLoss);
        position.resolved_at = Some(now);
        position.payout = Some(payout);
        position.pnl_no_fees = Some(pnl_no_fees);
        position.pnl_with_fees = Some(pnl_with_fees);

        let closed = position.size <= SIZE_EPSILON;
        if closed {
            position.size = Decimal::ZERO;
            position.cost = Decimal::ZERO;
            position.status = PositionStatus::Closed;
        } else {
            position.status = PositionStatus::PartiallyExited;
        }

        let row = TradeRow {
            trade_date: now,
            slug: slug.clone(),
            side: position.side,
            entry_price: position.entry_price,
            size: exit_size,
            cost: cost_portion,
            hours_to_close_at_entry: position.hours_to_close_at_entry,
            bought_at: position.bought_at,
            resolution: Resolution::StopLoss,
            resolved_at: now,
            payout,
            pnl_no_fees,
            pnl_with_fees,
        };
        let remaining = position.size;

        ledger.credit(payout);
        sink.append_row(&row)?;

        info!(
            "Stop exit {} | Exited size: {:.4} @ {} | Remaining size: {:.4}",
            slug, exit_size, best_bid, remaining
        );

        Ok(StopLossOutcome::Exited { closed })
    }
}
