//! In-memory wallet and position ledger
//!
//! Single source of truth for the balance and all positions. The
//! allocator debits it once at startup; the stop-loss evaluator and
//! resolution settler credit it as positions wind down. Mutation is
//! serialized by the scheduler (one write lock per tick); the status
//! and snapshot surfaces only ever take read access.

use crate::types::Position;
use rust_decimal::Decimal;

/// Wallet plus ordered position collection (insertion order =
/// allocation order)
#[derive(Debug)]
pub struct Ledger {
    pub starting_balance: Decimal,
    pub balance: Decimal,
    positions: Vec<Position>,
}

impl Ledger {
    pub fn new(starting_balance: Decimal) -> Self {
        Self {
            starting_balance,
            balance: starting_balance,
            positions: Vec::new(),
        }
    }

    /// Record an opening fill: debit its cost and append the position
    pub fn open_position(&mut self, position: Position) {
        self.balance -= position.cost;
        self.positions.push(position);
    }

    /// Credit the wallet with an exit or settlement payout
    pub fn credit(&mut self, payout: Decimal) {
        self.balance += payout;
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position_mut(&mut self, index: usize) -> Option<&mut Position> {
        self.positions.get_mut(index)
    }

    /// Indices of positions that are not yet closed
    pub fn open_indices(&self) -> Vec<usize> {
        self.positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_open())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn open_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_open()).count()
    }

    pub fn all_closed(&self) -> bool {
        self.positions.iter().all(|p| p.is_closed())
    }

    /// Realized P&L (after fees) across closed positions
    pub fn realized_pnl(&self) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.is_closed())
            .filter_map(|p| p.pnl_with_fees)
            .sum()
    }
}
