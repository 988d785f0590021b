//! The streaming hub's client registry (§4.F): one entry per connected
//! browser, each with its own set of alias subscriptions, fanned out
//! from a single process-wide pattern listener on `quote.*`. Modeled on
//! the gateway codebase's `ConnectionManager`, generalized from
//! "per-user" to "per-client" since a streaming quote socket has no
//! notion of an authenticated user the way the order gateway does.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;

use crate::bus::Bus;
use crate::domain::command::{CommandPayload, Request, ResponseStatus};
use crate::domain::quote::QuoteEvent;

use super::messages::ServerFrame;

pub type ClientId = u64;
pub type ClientSender = mpsc::UnboundedSender<ServerFrame>;

/// How long the hub waits for the worker to answer a subscribe/unsubscribe
/// request before giving up on that one symbol.
const SUBSCRIPTION_REQUEST_TIMEOUT_MS: u64 = 3_000;

struct ClientState {
    tx: ClientSender,
    /// Aliases this client currently wants frames for.
    symbols: DashSet<String>,
}

/// Fans upstream quote broadcasts on the Correlation Bus out to however
/// many browser clients currently care, and submits subscribe/unsubscribe
/// commands through the bus so the worker's refcount stays accurate
/// (§4.F, §8 "shared subscription refcounting").
///
/// Runs exactly one pattern listener task on `quote.*` for the whole
/// process (§4.F "The hub runs a single pattern listener ... for the
/// whole process"), rather than one forwarder task per (client, alias)
/// pair — task count stays flat as clients and symbols grow.
pub struct Hub {
    bus: Bus,
    clients: DashMap<ClientId, ClientState>,
    next_client_id: AtomicU64,
}

impl Hub {
    pub fn new(bus: Bus) -> Arc<Self> {
        let hub = Arc::new(Self {
            bus,
            clients: DashMap::new(),
            next_client_id: AtomicU64::new(1),
        });
        let listener = hub.clone();
        tokio::spawn(async move { listener.run_pattern_listener().await });
        hub
    }

    /// The single process-wide `quote.*` listener: one `subscribe_pattern`
    /// registration, fanned out to every client whose subscription set
    /// contains the alias parsed from the channel name.
    async fn run_pattern_listener(self: Arc<Self>) {
        let mut rx = self.bus.subscribe_pattern("quote.");
        while let Some((channel, payload)) = rx.recv().await {
            let Some(alias) = channel.strip_prefix("quote.") else {
                continue;
            };
            let event = match serde_json::from_slice::<QuoteEvent>(&payload) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, channel, "dropping unparseable quote event");
                    continue;
                }
            };
            for entry in self.clients.iter() {
                if entry.value().symbols.contains(alias) {
                    let _ = entry.value().tx.send(ServerFrame::Quote(event.clone()));
                }
            }
        }
    }

    pub fn register(&self, tx: ClientSender) -> ClientId {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        self.clients.insert(
            id,
            ClientState {
                tx,
                symbols: DashSet::new(),
            },
        );
        id
    }

    /// Drop a client and unwind every subscription it held, each as an
    /// independent best-effort unsubscribe (a client that vanished mid
    /// subscribe shouldn't wedge the others).
    pub fn remove(self: &Arc<Self>, client_id: ClientId) {
        if let Some((_, state)) = self.clients.remove(&client_id) {
            let symbols: Vec<String> = state.symbols.iter().map(|e| e.clone()).collect();
            let hub = self.clone();
            tokio::spawn(async move {
                for symbol in symbols {
                    let _ = hub.request_unsubscribe(&symbol, true).await;
                }
            });
        }
    }

    /// Subscribe one client to one alias: ask the worker to place (or
    /// bump the refcount of) the upstream subscription, then add the
    /// alias to the client's set so the pattern listener starts
    /// delivering it.
    pub async fn subscribe(
        self: &Arc<Self>,
        client_id: ClientId,
        symbol: String,
        simulation: bool,
    ) -> Result<(), String> {
        self.request_subscribe(&symbol, simulation).await?;

        let Some(state) = self.clients.get(&client_id) else {
            return Err("client no longer connected".to_string());
        };
        state.symbols.insert(symbol);
        Ok(())
    }

    pub async fn unsubscribe(
        self: &Arc<Self>,
        client_id: ClientId,
        symbol: String,
        simulation: bool,
    ) -> Result<(), String> {
        if let Some(state) = self.clients.get(&client_id) {
            state.symbols.remove(&symbol);
        }
        self.request_unsubscribe(&symbol, simulation).await
    }

    async fn request_subscribe(&self, symbol: &str, simulation: bool) -> Result<(), String> {
        self.submit_and_await(CommandPayload::SubscribeQuote { symbol: symbol.to_string() }, simulation)
            .await
    }

    async fn request_unsubscribe(&self, symbol: &str, simulation: bool) -> Result<(), String> {
        self.submit_and_await(CommandPayload::UnsubscribeQuote { symbol: symbol.to_string() }, simulation)
            .await
    }

    async fn submit_and_await(&self, payload: CommandPayload, simulation: bool) -> Result<(), String> {
        let request = Request::new(payload, simulation, SUBSCRIPTION_REQUEST_TIMEOUT_MS);
        let request_id = self
            .bus
            .submit(request)
            .map_err(|e| format!("bus rejected request: {e}"))?;
        let response = self
            .bus
            .await_response(request_id, SUBSCRIPTION_REQUEST_TIMEOUT_MS)
            .await
            .map_err(|e| format!("no reply from worker: {e}"))?;
        match response.status {
            ResponseStatus::Ok => Ok(()),
            ResponseStatus::Failed | ResponseStatus::NoAction => {
                Err(response.message.unwrap_or_else(|| "request failed".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_remove_cleans_up() {
        let bus = Bus::new();
        let hub = Hub::new(bus);
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx);
        assert!(hub.clients.contains_key(&id));
        hub.remove(id);
        assert!(!hub.clients.contains_key(&id));
    }

    #[tokio::test]
    async fn pattern_listener_delivers_only_to_subscribed_clients() {
        let bus = Bus::new();
        let hub = Hub::new(bus.clone());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let client_a = hub.register(tx_a);
        let client_b = hub.register(tx_b);

        // Subscribe directly through the client state rather than via
        // `subscribe` (which would round-trip through a worker that
        // isn't running in this test).
        hub.clients.get(&client_a).unwrap().symbols.insert("TMFR1".to_string());

        let event = crate::domain::quote::QuoteEvent::Tick(crate::domain::quote::QuoteTick {
            symbol: "TMFR1".to_string(),
            exchange_code: "TMFB6".to_string(),
            last_price: rust_decimal::Decimal::ONE,
            open: rust_decimal::Decimal::ONE,
            high: rust_decimal::Decimal::ONE,
            low: rust_decimal::Decimal::ONE,
            change: rust_decimal::Decimal::ZERO,
            change_percent: rust_decimal::Decimal::ZERO,
            last_volume: 1,
            cumulative_volume: 1,
            upstream_timestamp: chrono::Utc::now(),
        });
        bus.publish("quote.TMFR1", &serde_json::to_vec(&event).unwrap());

        let frame = rx_a.recv().await.unwrap();
        assert!(matches!(frame, ServerFrame::Quote(_)));

        // client_b never subscribed, so nothing should arrive for it.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(rx_b.try_recv().is_err());
        let _ = client_b;
    }
}
