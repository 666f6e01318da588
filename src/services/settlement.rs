//! Resolution settler
//!
//! Runs once per still-open position per tick, after the stop-loss
//! evaluator. Detects market closure with a determined terminal
//! outcome and settles whatever size remains at unit value or zero.

use crate::gateway::MarketState;
use crate::ledger::Ledger;
use crate::sink::{LedgerSink, TradeRow};
use crate::types::{PositionStatus, Resolution};
use anyhow::Result;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

/// Outcome of one settlement check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    /// Market still trading
    StillOpen,
    /// Market closed but no outcome price is exactly "1" yet; valid
    /// transient state, retry next tick
    Unresolved,
    /// Settled and closed at this terminal outcome
    Settled(Resolution),
}

pub struct ResolutionSettler {
    fee_rate: Decimal,
}

impl ResolutionSettler {
    pub fn new(fee_rate: Decimal) -> Self {
        Self { fee_rate }
    }

    /// Settle one position against current market state. Idempotent:
    /// closed positions are never touched again.
    pub fn settle(
        &self,
        ledger: &mut Ledger,
        index: usize,
        market: &MarketState,
        sink: &dyn LedgerSink,
    ) -> Result<SettleOutcome> {
        let Some(position) = ledger.position_mut(index) else {
            return Ok(SettleOutcome::StillOpen);
        };
        if position.is_closed() {
            return Ok(SettleOutcome::StillOpen);
        }

        if !market.closed {
            return Ok(SettleOutcome::StillOpen);
        }

        // Terminal outcome only counts once a price is exactly "1"
        let resolution = if market.outcome_prices.first().map(String::as_str) == Some("1") {
            Resolution::Yes
        } else if market.outcome_prices.get(1).map(String::as_str) == Some("1") {
            Resolution::No
        } else {
            return Ok(SettleOutcome::Unresolved);
        };

        // Contracts settle at unit value or zero
        let payout = if resolution.pays(position.side) {
            position.size
        } else {
            Decimal::ZERO
        };

        let fee = payout * self.fee_rate;
        let pnl_no_fees = payout - position.cost;
        let pnl_with_fees = pnl_no_fees - fee;
        let now = Utc::now();

        position.resolution = Some(resolution);
        position.resolved_at = Some(now);
        position.payout = Some(payout);
        position.pnl_no_fees = Some(pnl_no_fees);
        position.pnl_with_fees = Some(pnl_with_fees);
        position.status = PositionStatus::Closed;

        let row = TradeRow {
            trade_date: now,
            slug: position.slug.clone(),
            side: position.side,
            entry_price: position.entry_price,
            size: position.size,
            cost: position.cost,
            hours_to_close_at_entry: position.hours_to_close_at_entry,
            bought_at: position.bought_at,
            resolution,
            resolved_at: now,
            payout,
            pnl_no_fees,
            pnl_with_fees,
        };

        info!(
            "Resolved {} | Side: {} | Result: {} | P&L (no fees): ${:.2} | P&L (with fees): ${:.2}",
            row.slug, row.side, resolution, pnl_no_fees, pnl_with_fees
        );

        ledger.credit(payout);
        sink.append_row(&row)?;

        Ok(SettleOutcome::Settled(resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Position, Side};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        rows: Mutex<Vec<TradeRow>>,
    }

    impl LedgerSink for RecordingSink {
        fn append_row(&self, row: &TradeRow) -> Result<()> {
            self.rows.lock().unwrap().push(row.clone());
            Ok(())
        }

        fn export_snapshot(&self, _positions: &[Position]) -> Result<()> {
            Ok(())
        }

        fn dump_log(&self) -> Result<()> {
            Ok(())
        }
    }

    fn market(closed: bool, yes: &str, no: &str) -> MarketState {
        MarketState {
            closed,
            outcome_prices: vec![yes.to_string(), no.to_string()],
        }
    }

    fn seeded_ledger(side: Side) -> Ledger {
        // Remaining size 6, remaining cost 5.4 (post partial exit)
        let mut ledger = Ledger::new(dec!(9));
        ledger.open_position(Position {
            slug: "test-market".to_string(),
            market_id: "1".to_string(),
            token_id: "11".to_string(),
            side,
            entry_price: dec!(0.90),
            size: dec!(6),
            cost: dec!(5.4),
            entry_probability: 0.90,
            hours_to_close_at_entry: 2.0,
            bought_at: Utc::now(),
            status: PositionStatus::PartiallyExited,
            resolution: None,
            resolved_at: None,
            payout: None,
            pnl_no_fees: None,
            pnl_with_fees: None,
        });
        ledger
    }

    fn settler() -> ResolutionSettler {
        ResolutionSettler::new(dec!(0.01))
    }

    #[test]
    fn test_open_market_no_action() {
        let sink = RecordingSink::default();
        let mut ledger = seeded_ledger(Side::Yes);

        let outcome = settler()
            .settle(&mut ledger, 0, &market(false, "0.95", "0.05"), &sink)
            .unwrap();

        assert_eq!(outcome, SettleOutcome::StillOpen);
        assert!(ledger.positions()[0].is_open());
    }

    #[test]
    fn test_closed_but_unresolved_skips() {
        let sink = RecordingSink::default();
        let mut ledger = seeded_ledger(Side::Yes);

        let outcome = settler()
            .settle(&mut ledger, 0, &market(true, "0.99", "0.01"), &sink)
            .unwrap();

        assert_eq!(outcome, SettleOutcome::Unresolved);
        assert!(ledger.positions()[0].is_open());
        assert!(sink.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_winning_settlement() {
        let sink = RecordingSink::default();
        let mut ledger = seeded_ledger(Side::Yes);
        let balance_before = ledger.balance;

        let outcome = settler()
            .settle(&mut ledger, 0, &market(true, "1", "0"), &sink)
            .unwrap();

        assert_eq!(outcome, SettleOutcome::Settled(Resolution::Yes));

        let p = &ledger.positions()[0];
        assert_eq!(p.status, PositionStatus::Closed);
        assert_eq!(p.payout, Some(dec!(6)));
        assert_eq!(p.pnl_no_fees, Some(dec!(0.6)));
        assert_eq!(p.pnl_with_fees, Some(dec!(0.54)));
        assert_eq!(ledger.balance, balance_before + dec!(6));

        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].payout, dec!(6));
        assert_eq!(rows[0].resolution, Resolution::Yes);
    }

    #[test]
    fn test_losing_settlement_pays_zero() {
        let sink = RecordingSink::default();
        let mut ledger = seeded_ledger(Side::No);
        let balance_before = ledger.balance;

        let outcome = settler()
            .settle(&mut ledger, 0, &market(true, "1", "0"), &sink)
            .unwrap();

        assert_eq!(outcome, SettleOutcome::Settled(Resolution::Yes));

        let p = &ledger.positions()[0];
        assert_eq!(p.status, PositionStatus::Closed);
        assert_eq!(p.payout, Some(Decimal::ZERO));
        assert_eq!(p.pnl_no_fees, Some(dec!(-5.4)));
        assert_eq!(p.pnl_with_fees, Some(dec!(-5.4)));
        assert_eq!(ledger.balance, balance_before);
    }

    #[test]
    fn test_no_resolution_pays_no_side() {
        let sink = RecordingSink::default();
        let mut ledger = seeded_ledger(Side::No);

        let outcome = settler()
            .settle(&mut ledger, 0, &market(true, "0", "1"), &sink)
            .unwrap();

        assert_eq!(outcome, SettleOutcome::Settled(Resolution::No));
        assert_eq!(ledger.positions()[0].payout, Some(dec!(6)));
    }

    #[test]
    fn test_settlement_is_idempotent() {
        let sink = RecordingSink::default();
        let mut ledger = seeded_ledger(Side::Yes);

        settler()
            .settle(&mut ledger, 0, &market(true, "1", "0"), &sink)
            .unwrap();
        let snapshot = ledger.positions()[0].clone();
        let balance = ledger.balance;

        // A later tick must not mutate the position or emit rows
        let outcome = settler()
            .settle(&mut ledger, 0, &market(true, "1", "0"), &sink)
            .unwrap();

        assert_eq!(outcome, SettleOutcome::StillOpen);
        assert_eq!(ledger.balance, balance);
        assert_eq!(sink.rows.lock().unwrap().len(), 1);

        let p = &ledger.positions()[0];
        assert_eq!(p.resolved_at, snapshot.resolved_at);
        assert_eq!(p.payout, snapshot.payout);
    }
}
