//! Market data gateway for the Polymarket Gamma and CLOB APIs
//!
//! Every call can fail transiently (non-2xx, network, malformed
//! payload). Callers are expected to skip the affected position for
//! the current tick and retry on the next one.

use crate::config::{ClobApi, GammaApi};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Gateway error. All variants are treated as transient by callers.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("market not found: {0}")]
    NotFound(String),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Current state of a market, as needed by the engine
#[derive(Debug, Clone)]
pub struct MarketState {
    pub closed: bool,
    /// Terminal outcome prices `[yes, no]`, kept as the API's raw
    /// strings: resolution detection compares against exactly "1"
    pub outcome_prices: Vec<String>,
}

impl MarketState {
    /// Current implied probability of the YES side
    pub fn yes_prob(&self) -> Option<f64> {
        self.outcome_prices.first().and_then(|p| p.parse().ok())
    }
}

/// One price level of an order book
#[derive(Debug, Clone, Deserialize)]
pub struct BookLevel {
    pub price: Decimal,
    pub size: Decimal,
}

/// Order book for a single token
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

impl OrderBook {
    /// Best bid price and the total size available at it.
    ///
    /// Aggregates every level quoted at the best price, not just the
    /// first one the API happens to list.
    pub fn best_bid_depth(&self) -> Option<(Decimal, Decimal)> {
        let best = self.bids.iter().map(|b| b.price).max()?;
        let size: Decimal = self
            .bids
            .iter()
            .filter(|b| b.price == best)
            .map(|b| b.size)
            .sum();
        Some((best, size))
    }
}

/// Source of market state and order-book data
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch_market(&self, market_id: &str) -> Result<MarketState, GatewayError>;
    async fn fetch_order_book(&self, token_id: &str) -> Result<OrderBook, GatewayError>;
}

/// Raw market response from the Gamma API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GammaMarket {
    #[serde(default)]
    closed: bool,
    /// Outcome prices as a JSON string like "[\"0.95\", \"0.05\"]"
    #[serde(default)]
    outcome_prices: Option<String>,
}

/// HTTP gateway against the public Gamma and CLOB endpoints
pub struct HttpGateway {
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketData for HttpGateway {
    async fn fetch_market(&self, market_id: &str) -> Result<MarketState, GatewayError> {
        let url = GammaApi::market_url(market_id);
        debug!("Fetching market from: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let markets: Vec<GammaMarket> = response.json().await?;
        let market = markets
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(market_id.to_string()))?;

        let prices_str = market
            .outcome_prices
            .ok_or_else(|| GatewayError::Malformed("missing outcomePrices".to_string()))?;

        // Nested JSON: the field is itself a JSON-encoded string array
        let outcome_prices: Vec<String> = serde_json::from_str(&prices_str)
            .map_err(|e| GatewayError::Malformed(format!("outcomePrices: {}", e)))?;

        if outcome_prices.len() < 2 {
            return Err(GatewayError::Malformed(format!(
                "expected two outcome prices, got {}",
                outcome_prices.len()
            )));
        }

        Ok(MarketState {
            closed: market.closed,
            outcome_prices,
        })
    }

    async fn fetch_order_book(&self, token_id: &str) -> Result<OrderBook, GatewayError> {
        let url = ClobApi::book_url(token_id);
        debug!("Fetching order book from: {}", url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body });
        }

        let book: OrderBook = response.json().await?;
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_best_bid_aggregates_levels_at_best_price() {
        let book = OrderBook {
            bids: vec![
                BookLevel { price: dec!(0.70), size: dec!(3) },
                BookLevel { price: dec!(0.65), size: dec!(50) },
                BookLevel { price: dec!(0.70), size: dec!(1) },
            ],
            asks: vec![],
        };

        let (best, size) = book.best_bid_depth().unwrap();
        assert_eq!(best, dec!(0.70));
        assert_eq!(size, dec!(4));
    }

    #[test]
    fn test_best_bid_empty_book() {
        let book = OrderBook::default();
        assert!(book.best_bid_depth().is_none());
    }

    #[test]
    fn test_yes_prob_parses_first_price() {
        let state = MarketState {
            closed: false,
            outcome_prices: vec!["0.85".to_string(), "0.15".to_string()],
        };
        assert!((state.yes_prob().unwrap() - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_yes_prob_unparseable() {
        let state = MarketState {
            closed: false,
            outcome_prices: vec!["n/a".to_string(), "0.15".to_string()],
        };
        assert!(state.yes_prob().is_none());
    }

    #[test]
    fn test_parse_clob_book_payload() {
        let raw = r#"{
            "bids": [{"price": "0.70", "size": "4"}],
            "asks": [{"price": "0.72", "size": "10"}]
        }"#;

        let book: OrderBook = serde_json::from_str(raw).unwrap();
        assert_eq!(book.bids.len(), 1);
        assert_eq!(book.bids[0].price, dec!(0.70));
        assert_eq!(book.asks[0].size, dec!(10));
    }
}
