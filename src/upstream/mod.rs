//! The seam between this crate and the upstream brokerage SDK (§1, §2
//! component H). The spec treats the brokerage client library as a pure
//! collaborator; this trait is the minimal surface the Worker Session
//! Manager (§4.B) and Quote Manager (§4.E) need from it, modeled the way
//! the gateway codebase keeps its external dependencies
//! (`TDengineClient`, `Database`) behind thin constructor-injected
//! handles rather than a global singleton (§9 DESIGN NOTES).

pub mod fake;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::audit::{MarginRow, ProfitLossRow, SettlementRow, SymbolSummary, TradeRow, UsageRow};
use crate::domain::order::{OrderKind, PriceType, UpstreamSide};
use crate::domain::quote::{BidAsk, QuoteTick};

/// An opaque handle to a resolved upstream contract (§3 "Subscription
/// Table"). Two handles are equal iff they refer to the same exchange
/// code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractHandle {
    pub exchange_code: String,
    pub product_family: String,
    pub tick_size: Decimal,
}

/// Raw status the upstream reports for a previously-placed order.
#[derive(Debug, Clone)]
pub struct UpstreamOrderStatus {
    pub upstream_order_id: String,
    pub filled_quantity: u32,
    pub average_fill_price: Option<Decimal>,
    pub terminal: bool,
    pub rejection_message: Option<String>,
}

/// A raw error surfaced by the upstream SDK, before classification.
///
/// `code` is whatever the SDK reports (a numeric or string code); the
/// classification table in [`classify`] maps known codes/substrings to
/// an [`UpstreamErrorClass`] instead of handlers matching on substrings
/// themselves (§9 Open Question (c)).
#[derive(Debug, Clone, thiserror::Error)]
#[error("upstream error {code}: {message}")]
pub struct UpstreamError {
    pub code: String,
    pub message: String,
}

impl UpstreamError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// The classification an [`UpstreamError`] falls into (§7, §9 (c)).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorClass {
    /// Drives the worker into `Reconnecting` (§4.B).
    TokenExpired,
    SocketDropped,
    TimestampSkew,
    /// A business rejection (insufficient margin, market closed, price
    /// out of range): surfaced verbatim, does not affect worker state.
    BusinessRejected,
    /// Unrecognized code; treated conservatively as a business error so
    /// a single bad classification never traps the worker in a reconnect
    /// loop for something it can't fix by reconnecting.
    Unknown,
}

impl UpstreamErrorClass {
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            UpstreamErrorClass::TokenExpired
                | UpstreamErrorClass::SocketDropped
                | UpstreamErrorClass::TimestampSkew
        )
    }
}

/// Explicit classification table, replacing the substring-matching the
/// distilled spec's source used (§9 Open Question (c)).
pub fn classify(err: &UpstreamError) -> UpstreamErrorClass {
    match err.code.as_str() {
        "TOKEN_EXPIRED" | "SESSION_EXPIRED" => UpstreamErrorClass::TokenExpired,
        "SOCKET_CLOSED" | "CONNECTION_RESET" | "DISCONNECTED" => UpstreamErrorClass::SocketDropped,
        "TIMESTAMP_OUT_OF_RANGE" | "SIGNATURE_TIMESTAMP_SKEW" => UpstreamErrorClass::TimestampSkew,
        "INSUFFICIENT_MARGIN" | "MARKET_CLOSED" | "PRICE_OUT_OF_RANGE" | "ORDER_REJECTED" => {
            UpstreamErrorClass::BusinessRejected
        }
        _ => UpstreamErrorClass::Unknown,
    }
}

/// The exclusive upstream brokerage session (§2 component B, §5 "Shared
/// resources": exclusively the worker's).
#[async_trait]
pub trait UpstreamSession: Send + Sync {
    /// Credentialed login; waits for the contract catalog to be ready.
    async fn login(&self) -> Result<(), UpstreamError>;
    async fn logout(&self) -> Result<(), UpstreamError>;

    /// Snapshot of the contract catalog loaded at login, grouped by
    /// product family (§4.D "list_symbols / symbol_info").
    fn contract_catalog(&self) -> Vec<SymbolSummary>;

    /// Resolve a client-facing alias to a contract handle.
    async fn resolve_symbol(&self, alias: &str) -> Result<ContractHandle, UpstreamError>;

    /// Signed net position for a resolved contract's exchange code:
    /// positive = long, negative = short, zero = flat (§4.D "place_order").
    /// Callers pass `ContractHandle::exchange_code`, not the client-facing
    /// alias, since positions roll with the contract, not the role name.
    async fn net_position(&self, exchange_code: &str) -> Result<i64, UpstreamError>;

    async fn place_order(
        &self,
        contract: &ContractHandle,
        side: UpstreamSide,
        quantity: u32,
        price_type: PriceType,
        price: Option<Decimal>,
        order_kind: OrderKind,
    ) -> Result<String, UpstreamError>;

    async fn cancel_order(&self, upstream_order_id: &str) -> Result<(), UpstreamError>;

    async fn recheck_order(
        &self,
        upstream_order_id: &str,
    ) -> Result<UpstreamOrderStatus, UpstreamError>;

    async fn query_positions(&self) -> Result<Vec<crate::domain::audit::PositionRow>, UpstreamError>;
    async fn query_margin(&self) -> Result<MarginRow, UpstreamError>;
    async fn query_profit_loss(&self) -> Result<ProfitLossRow, UpstreamError>;
    async fn query_trades(&self) -> Result<Vec<TradeRow>, UpstreamError>;
    async fn query_settlements(&self) -> Result<Vec<SettlementRow>, UpstreamError>;
    async fn query_usage(&self) -> Result<UsageRow, UpstreamError>;

    /// One-shot market snapshot (§4.D "symbol_snapshot").
    async fn symbol_snapshot(&self, contract: &ContractHandle) -> Result<QuoteTick, UpstreamError>;

    /// Place the upstream tick subscription for a contract. Called only
    /// on a 0->1 refcount transition (§4.E). Split from
    /// [`Self::subscribe_bidask`] rather than one combined call so a
    /// partial failure (tick placed, bid/ask refused) is observable and
    /// can be rolled back instead of being architecturally invisible.
    async fn subscribe_tick(&self, contract: &ContractHandle) -> Result<(), UpstreamError>;
    /// Place the upstream bid/ask subscription for a contract.
    async fn subscribe_bidask(&self, contract: &ContractHandle) -> Result<(), UpstreamError>;
    /// Remove the upstream tick subscription. Called only on a 1->0
    /// transition.
    async fn unsubscribe_tick(&self, contract: &ContractHandle) -> Result<(), UpstreamError>;
    /// Remove the upstream bid/ask subscription.
    async fn unsubscribe_bidask(&self, contract: &ContractHandle) -> Result<(), UpstreamError>;

    /// Install the process-wide tick and bid/ask callbacks, exactly once
    /// per session (§4.E "Callback installation"). Each callback should
    /// do nothing but push onto `sink` — see [`RawCallbackEvent`].
    fn install_callbacks(&self, sink: tokio::sync::mpsc::Sender<RawCallbackEvent>);
}

/// What an upstream callback hands to the ingestion channel before any
/// alias resolution or normalization happens (§9 "Callback-based quote
/// ingestion"): the callback's only job is to push this and return.
#[derive(Debug, Clone)]
pub enum RawCallbackEvent {
    Tick {
        exchange_code: String,
        last_price: Decimal,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        change: Decimal,
        change_percent: Decimal,
        last_volume: u64,
        cumulative_volume: u64,
        timestamp: DateTime<Utc>,
    },
    BidAsk {
        exchange_code: String,
        best_bid: Decimal,
        best_bid_volume: u64,
        best_ask: Decimal,
        best_ask_volume: u64,
        timestamp: DateTime<Utc>,
    },
}

impl RawCallbackEvent {
    pub fn exchange_code(&self) -> &str {
        match self {
            RawCallbackEvent::Tick { exchange_code, .. } => exchange_code,
            RawCallbackEvent::BidAsk { exchange_code, .. } => exchange_code,
        }
    }

    pub fn into_tick(self, alias: String) -> Option<QuoteTick> {
        match self {
            RawCallbackEvent::Tick {
                exchange_code,
                last_price,
                open,
                high,
                low,
                change,
                change_percent,
                last_volume,
                cumulative_volume,
                timestamp,
            } => Some(QuoteTick {
                symbol: alias,
                exchange_code,
                last_price,
                open,
                high,
                low,
                change,
                change_percent,
                last_volume,
                cumulative_volume,
                upstream_timestamp: timestamp,
            }),
            _ => None,
        }
    }

    pub fn into_bidask(self, alias: String) -> Option<BidAsk> {
        match self {
            RawCallbackEvent::BidAsk {
                exchange_code,
                best_bid,
                best_bid_volume,
                best_ask,
                best_ask_volume,
                timestamp,
            } => Some(BidAsk {
                symbol: alias,
                exchange_code,
                best_bid,
                best_bid_volume,
                best_ask,
                best_ask_volume,
                upstream_timestamp: timestamp,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_codes() {
        assert_eq!(
            classify(&UpstreamError::new("TOKEN_EXPIRED", "x")),
            UpstreamErrorClass::TokenExpired
        );
        assert_eq!(
            classify(&UpstreamError::new("SOCKET_CLOSED", "x")),
            UpstreamErrorClass::SocketDropped
        );
        assert_eq!(
            classify(&UpstreamError::new("SIGNATURE_TIMESTAMP_SKEW", "x")),
            UpstreamErrorClass::TimestampSkew
        );
        assert_eq!(
            classify(&UpstreamError::new("INSUFFICIENT_MARGIN", "x")),
            UpstreamErrorClass::BusinessRejected
        );
    }

    #[test]
    fn unknown_codes_are_not_transient() {
        let class = classify(&UpstreamError::new("SOMETHING_NEW", "x"));
        assert_eq!(class, UpstreamErrorClass::Unknown);
        assert!(!class.is_transient());
    }
}
