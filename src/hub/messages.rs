//! Wire frames exchanged with browser clients over the streaming hub's
//! WebSocket (§4.F, §6 "Streaming socket path"). Named after what they
//! carry, not after the gateway codebase's `WsMessage`/`WsCommand` split
//! it's modeled on.

use serde::{Deserialize, Serialize};

use crate::domain::quote::QuoteEvent;

fn default_simulation() -> bool {
    true
}

/// A frame a browser client sends in: `{type, symbol, simulation}`
/// (§4.F, §6). One symbol per message — batching is left to the client
/// sending multiple frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe {
        symbol: String,
        #[serde(default = "default_simulation")]
        simulation: bool,
    },
    Unsubscribe {
        symbol: String,
        #[serde(default = "default_simulation")]
        simulation: bool,
    },
    Ping,
}

/// A frame the hub pushes out, one of `{connected, subscribed,
/// unsubscribed, quote, pong, error}` (§4.F).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Connected { client_id: u64 },
    Subscribed { symbol: String },
    Unsubscribed { symbol: String },
    Quote(QuoteEvent),
    Pong,
    Error { symbol: Option<String>, message: String },
}
