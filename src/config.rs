//! Configuration management for the paper trader

use anyhow::Result;
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

/// Trader configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// Total budget to split across opportunities in USDC
    pub total_budget: Decimal,

    /// Probability drop from entry that triggers a stop-loss exit
    pub stop_prob_drop: f64,

    /// Fee rate applied to payouts (default: 0.01 = 1%)
    pub fee_rate: Decimal,

    /// Poll interval in seconds
    pub poll_interval_seconds: u64,

    /// Path to the scanner output JSON file
    pub scanner_input: String,

    /// Path to the append-only trade log CSV
    pub csv_file: String,

    /// Path to the snapshot export CSV
    pub snapshot_file: String,

    /// Port for the control server
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let total_budget = env::var("TOTAL_BUDGET")
            .ok()
            .and_then(|v| Decimal::from_str(&v).ok())
            .unwrap_or_else(|| Decimal::from(50));

        let stop_prob_drop = env::var("STOP_PROB_DROP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.15);

        let fee_rate = env::var("FEE_RATE")
            .ok()
            .and_then(|v| Decimal::from_str(&v).ok())
            .unwrap_or_else(|| Decimal::from_str("0.01").unwrap_or_default());

        let poll_interval_seconds = env::var("POLL_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let scanner_input = env::var("SCANNER_INPUT")
            .unwrap_or_else(|_| "scanner-output.json".to_string());

        let csv_file = env::var("CSV_FILE")
            .unwrap_or_else(|_| "paper-trades.csv".to_string());

        let snapshot_file = env::var("SNAPSHOT_FILE")
            .unwrap_or_else(|_| "paper-trades-snapshot.csv".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        // Validate configuration
        if total_budget <= Decimal::ZERO {
            anyhow::bail!("TOTAL_BUDGET must be positive");
        }
        if !(0.0..=1.0).contains(&stop_prob_drop) {
            anyhow::bail!("STOP_PROB_DROP must be a fraction between 0 and 1");
        }

        Ok(Self {
            total_budget,
            stop_prob_drop,
            fee_rate,
            poll_interval_seconds,
            scanner_input,
            csv_file,
            snapshot_file,
            port,
        })
    }
}

/// Gamma API configuration
pub struct GammaApi;

impl GammaApi {
    pub const BASE_URL: &'static str = "https://gamma-api.polymarket.com";

    pub fn market_url(market_id: &str) -> String {
        format!("{}/markets?id={}", Self::BASE_URL, market_id)
    }
}

/// CLOB API configuration
pub struct ClobApi;

impl ClobApi {
    pub const BASE_URL: &'static str = "https://clob.polymarket.com";

    pub fn book_url(token_id: &str) -> String {
        format!("{}/book?token_id={}", Self::BASE_URL, token_id)
    }
}
