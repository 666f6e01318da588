//! Trade log and snapshot export
//!
//! The engine writes through a two-method sink: one append-only row
//! per closing/partial-exit event, plus a point-in-time snapshot of
//! closed positions that is fully rewritten on each export. Opening
//! fills are deliberately never written here.

use crate::types::{Position, Resolution, Side};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use rust_decimal::Decimal;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use tracing::info;

/// One closing/partial-exit event for the trade log
#[derive(Debug, Clone)]
pub struct TradeRow {
    pub trade_date: DateTime<Utc>,
    pub slug: String,
    pub side: Side,
    pub entry_price: Decimal,
    /// Size closed by this event (not the position's full size)
    pub size: Decimal,
    /// Cost basis attributed to this event
    pub cost: Decimal,
    pub hours_to_close_at_entry: f64,
    pub bought_at: DateTime<Utc>,
    pub resolution: Resolution,
    pub resolved_at: DateTime<Utc>,
    pub payout: Decimal,
    pub pnl_no_fees: Decimal,
    pub pnl_with_fees: Decimal,
}

/// Destination for trade rows and snapshots
pub trait LedgerSink: Send + Sync {
    fn append_row(&self, row: &TradeRow) -> Result<()>;
    fn export_snapshot(&self, positions: &[Position]) -> Result<()>;
    /// Dump the full trade log to the logs (run-complete marker)
    fn dump_log(&self) -> Result<()>;
}

const TRADE_LOG_HEADER: [&str; 13] = [
    "trade_date",
    "slug",
    "side",
    "entry_price",
    "size",
    "cost",
    "hours_to_close_at_entry",
    "bought_at",
    "resolution",
    "resolved_at",
    "payout",
    "pnl_no_fees",
    "pnl_with_fees",
];

const SNAPSHOT_HEADER: [&str; 11] = [
    "slug",
    "side",
    "entry_price",
    "size_remaining",
    "cost_remaining",
    "resolved",
    "resolution",
    "resolved_at",
    "payout",
    "pnl_no_fees",
    "pnl_with_fees",
];

/// CSV sink backed by two files: an append-only trade log and a
/// rewritten-on-export snapshot
pub struct CsvSink {
    csv_path: PathBuf,
    snapshot_path: PathBuf,
}

impl CsvSink {
    pub fn new(csv_path: impl Into<PathBuf>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Header is written once, only when the log is new or empty
    fn needs_header(&self) -> bool {
        match std::fs::metadata(&self.csv_path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        }
    }
}

impl LedgerSink for CsvSink {
    fn append_row(&self, row: &TradeRow) -> Result<()> {
        let write_header = self.needs_header();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Failed to open trade log: {}", self.csv_path.display()))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if write_header {
            writer.write_record(TRADE_LOG_HEADER)?;
        }

        writer.write_record(&[
            row.trade_date.format("%Y-%m-%d").to_string(),
            row.slug.clone(),
            row.side.to_string(),
            row.entry_price.to_string(),
            row.size.round_dp(4).to_string(),
            row.cost.round_dp(2).to_string(),
            row.hours_to_close_at_entry.to_string(),
            row.bought_at.to_rfc3339(),
            row.resolution.to_string(),
            row.resolved_at.to_rfc3339(),
            row.payout.round_dp(2).to_string(),
            row.pnl_no_fees.round_dp(2).to_string(),
            row.pnl_with_fees.round_dp(2).to_string(),
        ])?;

        writer.flush()?;
        Ok(())
    }

    fn export_snapshot(&self, positions: &[Position]) -> Result<()> {
        let file = File::create(&self.snapshot_path).with_context(|| {
            format!("Failed to create snapshot: {}", self.snapshot_path.display())
        })?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        writer.write_record(SNAPSHOT_HEADER)?;

        let closed: Vec<&Position> = positions.iter().filter(|p| p.is_closed()).collect();

        for p in &closed {
            writer.write_record(&[
                p.slug.clone(),
                p.side.to_string(),
                p.entry_price.to_string(),
                p.size.round_dp(4).to_string(),
                p.cost.round_dp(2).to_string(),
                "true".to_string(),
                p.resolution.map(|r| r.to_string()).unwrap_or_default(),
                p.resolved_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
                p.payout.map(|v| v.round_dp(2).to_string()).unwrap_or_default(),
                p.pnl_no_fees
                    .map(|v| v.round_dp(2).to_string())
                    .unwrap_or_default(),
                p.pnl_with_fees
                    .map(|v| v.round_dp(2).to_string())
                    .unwrap_or_default(),
            ])?;
        }

        writer.flush()?;

        let total_pnl: Decimal = closed.iter().filter_map(|p| p.pnl_with_fees).sum();
        info!(
            "Snapshot exported ({} trades) | Realized P&L: ${:.2} -> {}",
            closed.len(),
            total_pnl,
            self.snapshot_path.display()
        );

        Ok(())
    }

    fn dump_log(&self) -> Result<()> {
        let csv = std::fs::read_to_string(&self.csv_path)
            .with_context(|| format!("Trade log not found: {}", self.csv_path.display()))?;

        info!("===CSV_START===\n{}===CSV_END===", csv);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PositionStatus;
    use rust_decimal_macros::dec;

    fn sample_row() -> TradeRow {
        TradeRow {
            trade_date: Utc::now(),
            slug: "will-it-rain".to_string(),
            side: Side::Yes,
            entry_price: dec!(0.90),
            size: dec!(4),
            cost: dec!(3.6),
            hours_to_close_at_entry: 1.5,
            bought_at: Utc::now(),
            resolution: Resolution::StopLoss,
            resolved_at: Utc::now(),
            payout: dec!(2.8),
            pnl_no_fees: dec!(-0.8),
            pnl_with_fees: dec!(-0.828),
        }
    }

    fn closed_position() -> Position {
        Position {
            slug: "will-it-rain".to_string(),
            market_id: "1".to_string(),
            token_id: "11".to_string(),
            side: Side::Yes,
            entry_price: dec!(0.90),
            size: dec!(6),
            cost: dec!(5.4),
            entry_probability: 0.90,
            hours_to_close_at_entry: 1.5,
            bought_at: Utc::now(),
            status: PositionStatus::Closed,
            resolution: Some(Resolution::Yes),
            resolved_at: Some(Utc::now()),
            payout: Some(dec!(6)),
            pnl_no_fees: Some(dec!(0.6)),
            pnl_with_fees: Some(dec!(0.54)),
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("trades.csv");
        let sink = CsvSink::new(&log, dir.path().join("snapshot.csv"));

        sink.append_row(&sample_row()).unwrap();
        sink.append_row(&sample_row()).unwrap();

        let contents = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("trade_date,slug,side,entry_price"));
        assert!(lines[1].contains("STOP_LOSS"));
        assert!(lines[2].contains("will-it-rain"));
    }

    #[test]
    fn test_row_rounding() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("trades.csv");
        let sink = CsvSink::new(&log, dir.path().join("snapshot.csv"));

        let mut row = sample_row();
        row.size = dec!(27.77777778);
        row.cost = dec!(24.999999);
        sink.append_row(&row).unwrap();

        let contents = std::fs::read_to_string(&log).unwrap();
        assert!(contents.contains("27.7778"));
        assert!(contents.contains(",25.00,") || contents.contains(",25,"));
    }

    #[test]
    fn test_snapshot_includes_closed_positions_only() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("snapshot.csv");
        let sink = CsvSink::new(dir.path().join("trades.csv"), &snapshot);

        let closed = closed_position();
        let mut open = closed_position();
        open.status = PositionStatus::Open;
        open.slug = "still-open".to_string();

        sink.export_snapshot(&[closed, open]).unwrap();

        let contents = std::fs::read_to_string(&snapshot).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("slug,side,entry_price,size_remaining"));
        assert!(lines[1].contains("will-it-rain"));
        assert!(!contents.contains("still-open"));
    }

    #[test]
    fn test_snapshot_rewritten_on_each_export() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("snapshot.csv");
        let sink = CsvSink::new(dir.path().join("trades.csv"), &snapshot);

        sink.export_snapshot(&[closed_position()]).unwrap();
        sink.export_snapshot(&[]).unwrap();

        let contents = std::fs::read_to_string(&snapshot).unwrap();
        assert_eq!(contents.lines().count(), 1); // header only
    }
}
