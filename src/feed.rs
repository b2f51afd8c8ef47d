//! Live-feed data: the quote updates a streaming collaborator hands to the core
//!
//! The socket itself is external. This module parses trade messages into
//! [`LiveQuote`]s, keeps the latest quote per symbol and computes reconnect delays.

use crate::shape::coerce_number;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub symbol: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Exchange timestamp in milliseconds, when the feed sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

fn field<'a>(item: &'a Value, short: &str, long: &str) -> Option<&'a Value> {
    item.get(short)
        .filter(|v| !v.is_null())
        .or_else(|| item.get(long).filter(|v| !v.is_null()))
}

/// Quotes carried by a trade message of the form `{"data": [{"s", "p", "v", "t"}, ...]}`
///
/// Long field names (`symbol`, `price`, `volume`, `timestamp`) are accepted as well.
/// Entries without a symbol or a numeric price are skipped.
pub fn parse_trades(message: &Value) -> Vec<LiveQuote> {
    let Some(Value::Array(items)) = message.get("data") else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let symbol = field(item, "s", "symbol")?.as_str()?.to_string();
            let price = field(item, "p", "price").and_then(coerce_number)?;
            Some(LiveQuote {
                symbol,
                price,
                volume: field(item, "v", "volume").and_then(coerce_number),
                timestamp: field(item, "t", "timestamp").and_then(Value::as_i64),
            })
        })
        .collect()
}

pub fn subscribe_message(symbol: &str) -> Value {
    json!({"type": "subscribe", "symbol": symbol})
}

pub fn unsubscribe_message(symbol: &str) -> Value {
    json!({"type": "unsubscribe", "symbol": symbol})
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEntry {
    pub quote: LiveQuote,
    pub last_update: DateTime<Utc>,
}

/// Latest quote per symbol
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuoteBoard {
    latest: BTreeMap<String, BoardEntry>,
}

impl QuoteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, quotes: Vec<LiveQuote>, received_at: DateTime<Utc>) -> usize {
        let count = quotes.len();
        for quote in quotes {
            self.latest.insert(
                quote.symbol.clone(),
                BoardEntry {
                    quote,
                    last_update: received_at,
                },
            );
        }
        count
    }

    /// Parse a raw socket message and record its quotes
    pub fn apply_message(&mut self, text: &str, received_at: DateTime<Utc>) -> usize {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => self.apply(parse_trades(&message), received_at),
            Err(_) => {
                debug!(len = text.len(), "ignoring non-JSON feed message");
                0
            }
        }
    }

    pub fn get(&self, symbol: &str) -> Option<&BoardEntry> {
        self.latest.get(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.latest.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

/// Exponential reconnect backoff with a cap and an attempt limit
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect `attempt` (1-based), or `None` once attempts are exhausted
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        Some(
            self.base_delay
                .checked_mul(factor)
                .map_or(self.max_delay, |d| d.min(self.max_delay)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trades() {
        let message = json!({
            "type": "trade",
            "data": [
                {"s": "BINANCE:BTCUSDT", "p": 64000.5, "v": 0.01, "t": 1700000000000i64},
                {"symbol": "AAPL", "price": "189.5"},
                {"s": "NOPRICE", "v": 3},
                {"p": 10}
            ]
        });
        let quotes = parse_trades(&message);
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].volume, Some(0.01));
        assert_eq!(quotes[0].timestamp, Some(1_700_000_000_000));
        assert_eq!(quotes[1].symbol, "AAPL");
        assert_eq!(quotes[1].price, 189.5);

        assert!(parse_trades(&json!({"type": "ping"})).is_empty());
    }

    #[test]
    fn test_board_keeps_latest_per_symbol() {
        let mut board = QuoteBoard::new();
        let now = Utc::now();
        let first = r#"{"data": [{"s": "AAPL", "p": 1}, {"s": "MSFT", "p": 2}]}"#;
        let second = r#"{"data": [{"s": "AAPL", "p": 3}]}"#;

        assert_eq!(board.apply_message(first, now), 2);
        assert_eq!(board.apply_message(second, now), 1);
        assert_eq!(board.apply_message("pong", now), 0);

        assert_eq!(board.len(), 2);
        assert_eq!(board.get("AAPL").unwrap().quote.price, 3.0);
        assert_eq!(board.symbols().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_reconnect_backoff() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(1), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay(4), Some(Duration::from_secs(16)));
        assert_eq!(policy.delay(5), Some(Duration::from_secs(30)));
        assert_eq!(policy.delay(6), None);
        assert_eq!(policy.delay(0), None);
    }

    #[test]
    fn test_subscription_messages() {
        assert_eq!(
            subscribe_message("AAPL"),
            json!({"type": "subscribe", "symbol": "AAPL"})
        );
        assert_eq!(unsubscribe_message("AAPL")["type"], "unsubscribe");
    }
}
