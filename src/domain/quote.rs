//! Normalized quote types published on `quote.<alias>` (§3 "Quote Tick").

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A normalized last-trade tick. `symbol` is always the client-facing
/// alias, never the exchange code (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteTick {
    pub symbol: String,
    pub exchange_code: String,
    pub last_price: Decimal,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub last_volume: u64,
    pub cumulative_volume: u64,
    pub upstream_timestamp: DateTime<Utc>,
}

/// A normalized best bid/ask update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidAsk {
    pub symbol: String,
    pub exchange_code: String,
    pub best_bid: Decimal,
    pub best_bid_volume: u64,
    pub best_ask: Decimal,
    pub best_ask_volume: u64,
    pub upstream_timestamp: DateTime<Utc>,
}

/// The event published on the bus for a symbol; `quote_type` discriminates
/// on the wire (§4.E "Normalization and publish").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "quote_type", rename_all = "snake_case")]
pub enum QuoteEvent {
    Tick(QuoteTick),
    BidAsk(BidAsk),
}

impl QuoteEvent {
    pub fn symbol(&self) -> &str {
        match self {
            QuoteEvent::Tick(t) => &t.symbol,
            QuoteEvent::BidAsk(b) => &b.symbol,
        }
    }
}
