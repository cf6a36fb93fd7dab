//! Raw feed message parsing.
//!
//! Only `ticker` messages carry prices. Everything else on the socket
//! (subscription acks, heartbeats) is skipped without error.

use crate::tick_buffer::TickBuffer;
use serde::Deserialize;
use serde_json::Value;
use tickcast_core::{Error, Price, Result};
use tracing::debug;

/// The parts of an exchange message the pipeline looks at.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "type")]
    kind: Option<String>,
    price: Option<Value>,
}

/// Extract the price from a raw ticker message.
///
/// Returns `Ok(None)` for messages that are not tickers and
/// `Err(MalformedTick)` for tickers without a usable price.
pub fn parse_tick(raw: &str) -> Result<Option<Price>> {
    let msg: RawMessage = serde_json::from_str(raw)
        .map_err(|e| Error::malformed_tick(format!("invalid JSON: {e}")))?;

    if msg.kind.as_deref() != Some("ticker") {
        return Ok(None);
    }

    let price = match msg.price {
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::malformed_tick(format!("non-numeric price {s:?}")))?,
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::malformed_tick(format!("unrepresentable price {n}")))?,
        Some(other) => return Err(Error::malformed_tick(format!("unexpected price value {other}"))),
        None => return Err(Error::malformed_tick("ticker without price")),
    };

    if !(price.is_finite() && price > 0.0) {
        return Err(Error::malformed_tick(format!("price out of range: {price}")));
    }

    Ok(Some(price))
}

/// Parse a raw message and append its price to the buffer.
///
/// Malformed ticks are dropped. Returns whether a price was pushed.
pub fn ingest(buffer: &TickBuffer, raw: &str) -> bool {
    match parse_tick(raw) {
        Ok(Some(price)) => buffer.push(price),
        Ok(None) => false,
        Err(e) => {
            debug!("Dropping tick: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TICKER: &str = r#"{"type":"ticker","sequence":37475248783,"product_id":"BTC-USD","price":"27123.45","open_24h":"26800.00","side":"buy"}"#;

    #[test]
    fn test_parse_ticker() {
        let price = parse_tick(TICKER).unwrap().unwrap();
        assert_relative_eq!(price, 27123.45);
    }

    #[test]
    fn test_numeric_price_accepted() {
        let price = parse_tick(r#"{"type":"ticker","price":101.5}"#).unwrap();
        assert_eq!(price, Some(101.5));
    }

    #[test]
    fn test_non_ticker_skipped() {
        let ack = r#"{"type":"subscriptions","channels":[{"name":"ticker","product_ids":["BTC-USD"]}]}"#;
        assert_eq!(parse_tick(ack).unwrap(), None);
        assert_eq!(parse_tick(r#"{"type":"heartbeat"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_ticks() {
        assert!(matches!(parse_tick("not json"), Err(Error::MalformedTick(_))));
        assert!(matches!(
            parse_tick(r#"{"type":"ticker","price":"abc"}"#),
            Err(Error::MalformedTick(_))
        ));
        assert!(matches!(parse_tick(r#"{"type":"ticker"}"#), Err(Error::MalformedTick(_))));
        assert!(matches!(
            parse_tick(r#"{"type":"ticker","price":"-3"}"#),
            Err(Error::MalformedTick(_))
        ));
    }

    #[test]
    fn test_ingest_leaves_buffer_unchanged_on_bad_input() {
        let buffer = TickBuffer::new(10);
        assert!(ingest(&buffer, TICKER));
        assert!(!ingest(&buffer, r#"{"type":"ticker","price":"oops"}"#));
        assert!(!ingest(&buffer, r#"{"type":"heartbeat"}"#));

        assert_eq!(buffer.len(), 1);
    }
}
