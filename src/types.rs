//! Core types for the paper-trading engine

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Trading side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

/// How a position (or part of it) was closed out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Yes,
    No,
    StopLoss,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Yes => write!(f, "YES"),
            Resolution::No => write!(f, "NO"),
            Resolution::StopLoss => write!(f, "STOP_LOSS"),
        }
    }
}

impl Resolution {
    /// Whether a held side wins at this terminal outcome
    pub fn pays(&self, side: Side) -> bool {
        matches!(
            (self, side),
            (Resolution::Yes, Side::Yes) | (Resolution::No, Side::No)
        )
    }
}

/// A tradeable contract side produced by the upstream scanner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub slug: String,
    pub market_id: String,
    /// Token ID of the side being bought (needed to sell it back)
    pub token_id: String,
    pub side: Side,
    pub best_ask: Decimal,
    pub ask_size: Decimal,
    /// Implied probability of the side at discovery time
    pub probability: f64,
    pub hours_to_close: f64,
}

/// Scanner output file: `{ "markets": [...] }`
#[derive(Debug, Deserialize)]
pub struct ScannerOutput {
    #[serde(default)]
    pub markets: Vec<Opportunity>,
}

impl ScannerOutput {
    /// Load opportunities from a scanner-output JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Opportunity>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scanner output: {}", path.display()))?;
        let output: ScannerOutput = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse scanner output: {}", path.display()))?;
        Ok(output.markets)
    }
}

/// Position lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    /// Still open, but stop-loss exits have reduced the size
    PartiallyExited,
    /// Fully settled, by stop-loss exhaustion or by resolution
    Closed,
}

/// A simulated holding of contract units on one side of one market
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub slug: String,
    pub market_id: String,
    pub token_id: String,
    pub side: Side,
    pub entry_price: Decimal,
    /// Contract units still held
    pub size: Decimal,
    /// Cost basis still carried (diverges from size * entry_price
    /// after partial exits, since cost is drawn down proportionally)
    pub cost: Decimal,
    pub entry_probability: f64,
    pub hours_to_close_at_entry: f64,
    pub bought_at: DateTime<Utc>,
    pub status: PositionStatus,
    /// Settlement fields, set on closing events. Each stop-loss
    /// partial exit overwrites them: the last exit's figures win.
    pub resolution: Option<Resolution>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub payout: Option<Decimal>,
    pub pnl_no_fees: Option<Decimal>,
    pub pnl_with_fees: Option<Decimal>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.status != PositionStatus::Closed
    }

    pub fn is_closed(&self) -> bool {
        self.status == PositionStatus::Closed
    }
}
