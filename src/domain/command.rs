//! The request/response envelope that crosses the Correlation Bus.
//!
//! Wire shape matches §6: requests carry `request_id`, `command`, `payload`,
//! `simulation`, `submitted_at`; responses carry `request_id`, `status`,
//! `data`, `message`. Internally the payload and data are closed enums keyed
//! off `CommandKind` rather than untyped JSON objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::audit::OrderAuditRow;
use super::order::OrderCommand;
use super::quote::QuoteTick;

/// Stable, globally unique identifier for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of command kinds the bus will route (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    PlaceOrder,
    CancelOrder,
    RecheckOrder,
    ListPositions,
    QueryMargin,
    QueryProfitLoss,
    ListTrades,
    ListSettlements,
    ListSymbols,
    SymbolInfo,
    SymbolSnapshot,
    QueryUsage,
    SubscribeQuote,
    UnsubscribeQuote,
}

impl CommandKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::PlaceOrder => "place_order",
            CommandKind::CancelOrder => "cancel_order",
            CommandKind::RecheckOrder => "recheck_order",
            CommandKind::ListPositions => "list_positions",
            CommandKind::QueryMargin => "query_margin",
            CommandKind::QueryProfitLoss => "query_profit_loss",
            CommandKind::ListTrades => "list_trades",
            CommandKind::ListSettlements => "list_settlements",
            CommandKind::ListSymbols => "list_symbols",
            CommandKind::SymbolInfo => "symbol_info",
            CommandKind::SymbolSnapshot => "symbol_snapshot",
            CommandKind::QueryUsage => "query_usage",
            CommandKind::SubscribeQuote => "subscribe_quote",
            CommandKind::UnsubscribeQuote => "unsubscribe_quote",
        }
    }
}

/// Per-command typed payload. One variant per `CommandKind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum CommandPayload {
    PlaceOrder(OrderCommand),
    CancelOrder { order_id: String },
    RecheckOrder { order_id: String },
    ListPositions,
    QueryMargin,
    QueryProfitLoss,
    ListTrades,
    ListSettlements,
    ListSymbols,
    SymbolInfo { symbol: String },
    SymbolSnapshot { symbol: String },
    QueryUsage,
    SubscribeQuote { symbol: String },
    UnsubscribeQuote { symbol: String },
}

impl CommandPayload {
    pub fn kind(&self) -> CommandKind {
        match self {
            CommandPayload::PlaceOrder(_) => CommandKind::PlaceOrder,
            CommandPayload::CancelOrder { .. } => CommandKind::CancelOrder,
            CommandPayload::RecheckOrder { .. } => CommandKind::RecheckOrder,
            CommandPayload::ListPositions => CommandKind::ListPositions,
            CommandPayload::QueryMargin => CommandKind::QueryMargin,
            CommandPayload::QueryProfitLoss => CommandKind::QueryProfitLoss,
            CommandPayload::ListTrades => CommandKind::ListTrades,
            CommandPayload::ListSettlements => CommandKind::ListSettlements,
            CommandPayload::ListSymbols => CommandKind::ListSymbols,
            CommandPayload::SymbolInfo { .. } => CommandKind::SymbolInfo,
            CommandPayload::SymbolSnapshot { .. } => CommandKind::SymbolSnapshot,
            CommandPayload::QueryUsage => CommandKind::QueryUsage,
            CommandPayload::SubscribeQuote { .. } => CommandKind::SubscribeQuote,
            CommandPayload::UnsubscribeQuote { .. } => CommandKind::UnsubscribeQuote,
        }
    }
}

/// A command envelope enqueued onto the bus (§3 "Request").
///
/// Invariant: a request is enqueued exactly once; a consumed request is
/// never re-queued. Failures are encoded in the `Response`, not retried
/// by re-enqueueing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub payload: CommandPayload,
    pub simulation: bool,
    pub submitted_at: DateTime<Utc>,
    /// How long the facade is willing to wait for a reply; also bounds
    /// how long the reply key survives on the bus.
    pub response_ttl_ms: u64,
}

impl Request {
    pub fn new(payload: CommandPayload, simulation: bool, response_ttl_ms: u64) -> Self {
        Self {
            request_id: RequestId::new(),
            payload,
            simulation,
            submitted_at: Utc::now(),
            response_ttl_ms,
        }
    }
}

/// Outcome discriminator for a `Response` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    Failed,
    NoAction,
}

/// Which row of the §7 error taxonomy a `Failed` response falls into.
/// Carried alongside `retryable` so a caller (the facade, §4.G) can
/// reproduce the documented status-code mapping instead of collapsing
/// every non-retryable failure into one HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller-supplied command was malformed. Never retried.
    Validation,
    /// Worker is `Reconnecting` or `Degraded`. Retryable.
    SessionNotReady,
    /// Upstream returned a business rejection. Not retryable.
    UpstreamRefused,
    /// Timeout, disconnect, token skew. Retryable; drove a worker state
    /// transition already.
    UpstreamTransient,
}

/// Typed response data, one variant per relevant `CommandKind`.
///
/// `Unit` covers commands whose success carries no payload beyond status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseData {
    Unit,
    OrderAccepted {
        upstream_order_id: String,
    },
    OrderRecheck {
        audit: OrderAuditRow,
    },
    Positions(Vec<super::audit::PositionRow>),
    Margin(super::audit::MarginRow),
    ProfitLoss(super::audit::ProfitLossRow),
    Trades(Vec<super::audit::TradeRow>),
    Settlements(Vec<super::audit::SettlementRow>),
    Symbols(Vec<super::audit::SymbolSummary>),
    SymbolInfo(super::audit::SymbolSummary),
    Snapshot(QuoteTick),
    Usage(super::audit::UsageRow),
}

/// The answer the worker writes back for a `Request` (§3 "Response").
///
/// Invariant: the reply is written at most once per request; a reader
/// that observes it deletes it (or lets it expire past TTL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub request_id: RequestId,
    pub status: ResponseStatus,
    pub data: Option<ResponseData>,
    pub message: Option<String>,
    /// Whether the caller should consider retrying the same command
    /// (§7 "Session-not-ready", "Upstream-transient": both are
    /// "surfaced as `failed` with a retryable marker"). Always `false`
    /// outside `Failed`.
    #[serde(default)]
    pub retryable: bool,
    /// Which §7 taxonomy row a `Failed` response falls into. `None`
    /// outside `Failed`.
    #[serde(default)]
    pub error_kind: Option<ErrorKind>,
}

impl Response {
    pub fn ok(request_id: RequestId, data: ResponseData) -> Self {
        Self {
            request_id,
            status: ResponseStatus::Ok,
            data: Some(data),
            message: None,
            retryable: false,
            error_kind: None,
        }
    }

    /// Build a `Failed` response carrying the §7 taxonomy row it belongs
    /// to, so the facade can reproduce the documented status-code
    /// mapping (§4.G) instead of branching on `retryable` alone.
    pub fn failed_with_kind(request_id: RequestId, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            request_id,
            status: ResponseStatus::Failed,
            data: None,
            message: Some(message.into()),
            retryable: matches!(kind, ErrorKind::SessionNotReady | ErrorKind::UpstreamTransient),
            error_kind: Some(kind),
        }
    }

    /// Non-retryable business rejection (§7 "Upstream-refused").
    pub fn failed(request_id: RequestId, message: impl Into<String>) -> Self {
        Self::failed_with_kind(request_id, message, ErrorKind::UpstreamRefused)
    }

    /// Retryable failure (§7 "Session-not-ready" / "Upstream-transient").
    pub fn failed_retryable(request_id: RequestId, message: impl Into<String>) -> Self {
        Self::failed_with_kind(request_id, message, ErrorKind::UpstreamTransient)
    }

    pub fn no_action(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id,
            status: ResponseStatus::NoAction,
            data: None,
            message: Some(message.into()),
            retryable: false,
            error_kind: None,
        }
    }
}
