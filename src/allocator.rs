//! Budget allocation and simulated opening fills
//!
//! Splits the total budget equally across opportunities and fills
//! each against its best ask. Opening fills never produce trade log
//! rows; only closing events do.

use crate::ledger::Ledger;
use crate::types::{Opportunity, Position, PositionStatus};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

/// Seed the ledger with one position per fillable opportunity.
///
/// Returns the number of positions opened. An empty opportunity list
/// is a clean no-op, not an error.
pub fn seed_positions(ledger: &mut Ledger, opportunities: &[Opportunity]) -> usize {
    if opportunities.is_empty() {
        info!("No eligible markets from scanner, nothing to allocate");
        return 0;
    }

    let allocation = ledger.starting_balance / Decimal::from(opportunities.len());

    info!(
        "Total budget: ${:.2} | Markets: {} | Allocation per market: ${:.2}",
        ledger.starting_balance,
        opportunities.len(),
        allocation
    );

    let mut opened = 0;

    for opp in opportunities {
        let price = opp.best_ask;
        let available = opp.ask_size;

        if price <= Decimal::ZERO || available <= Decimal::ZERO {
            info!("Skipping {}: no usable ask", opp.slug);
            continue;
        }

        let max_affordable = allocation / price;
        let fill_size = max_affordable.min(available);
        if fill_size <= Decimal::ZERO {
            continue;
        }

        let cost = fill_size * price;

        info!(
            "Opened {} | Side: {} | Price: {} | Size: {:.2} | Cost: ${:.2} | Hours to close: {}",
            opp.slug, opp.side, price, fill_size, cost, opp.hours_to_close
        );

        ledger.open_position(Position {
            slug: opp.slug.clone(),
            market_id: opp.market_id.clone(),
            token_id: opp.token_id.clone(),
            side: opp.side,
            entry_price: price,
            size: fill_size,
            cost,
            entry_probability: opp.probability,
            hours_to_close_at_entry: opp.hours_to_close,
            bought_at: Utc::now(),
            status: PositionStatus::Open,
            resolution: None,
            resolved_at: None,
            payout: None,
            pnl_no_fees: None,
            pnl_with_fees: None,
        });

        opened += 1;
    }

    opened
}
