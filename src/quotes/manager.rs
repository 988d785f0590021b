//! The Quote Manager (§4.E): makes upstream push callbacks look like a
//! stable per-alias stream, refcounted across every subscriber.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::bus::Bus;
use crate::domain::subscription::SubscriptionEntry;
use crate::domain::quote::QuoteEvent;
use crate::error::HandlerError;
use crate::upstream::{ContractHandle, RawCallbackEvent, UpstreamSession};

use super::alias::{alias_family_prefix, exchange_code_family_prefix, is_pseudo_symbol};

/// Size of the channel the upstream SDK's callbacks push onto. A full
/// channel means the ingestion consumer is falling behind; callbacks
/// drop the event rather than block the SDK's callback thread (§9
/// "Callback-based quote ingestion").
const RAW_EVENT_CHANNEL_CAPACITY: usize = 4096;

pub struct QuoteManager<S: UpstreamSession> {
    session: Arc<S>,
    bus: Bus,
    /// alias -> subscription bookkeeping.
    table: DashMap<String, SubscriptionEntry>,
    /// exchange_code -> alias, the reverse map used for O(1) resolution
    /// once a callback has been bound once (§4.E).
    reverse: DashMap<String, String>,
}

impl<S: UpstreamSession + 'static> QuoteManager<S> {
    pub fn new(session: Arc<S>, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            session,
            bus,
            table: DashMap::new(),
            reverse: DashMap::new(),
        })
    }

    /// Install the upstream callbacks and spawn the single consumer task
    /// that normalizes and publishes (§9 "Callback-based quote
    /// ingestion"). Call once per session, after login.
    pub fn start_ingestion(self: &Arc<Self>) {
        let (tx, mut rx) = mpsc::channel::<RawCallbackEvent>(RAW_EVENT_CHANNEL_CAPACITY);
        self.session.install_callbacks(tx);
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                manager.handle_raw_event(event);
            }
        });
    }

    /// Number of distinct client sessions currently subscribed to
    /// `alias`, i.e. the refcount (§8 invariant).
    pub fn refcount(&self, alias: &str) -> u32 {
        self.table.get(alias).map(|e| e.refcount).unwrap_or(0)
    }

    /// `subscribe(alias)`: places the upstream subscription only on a
    /// 0->1 refcount transition (§4.E, §8 invariant).
    pub async fn subscribe(&self, alias: &str) -> Result<(), HandlerError> {
        if !self.table.contains_key(alias) {
            let contract = self
                .session
                .resolve_symbol(alias)
                .await
                .map_err(HandlerError::from)?;
            self.table
                .entry(alias.to_string())
                .or_insert_with(|| SubscriptionEntry::new(alias, contract));
        }

        let should_place_upstream = {
            let entry = self.table.get(alias).expect("just inserted above");
            entry.refcount == 0
        };

        if should_place_upstream {
            let contract = self.table.get(alias).unwrap().contract.clone();
            self.session.subscribe_tick(&contract).await.map_err(HandlerError::from)?;
            if let Err(e) = self.session.subscribe_bidask(&contract).await {
                // Partial failure: tick placed, bid/ask refused. Roll the
                // tick subscription back rather than leave a half-placed
                // pair standing (§4.E "partial failure ... is treated as
                // failure and rolled back").
                if let Err(rollback_err) = self.session.unsubscribe_tick(&contract).await {
                    tracing::warn!(
                        alias,
                        error = %rollback_err,
                        "failed to roll back tick subscription after bid/ask refusal"
                    );
                }
                return Err(e.into());
            }
            self.reverse
                .insert(contract.exchange_code.clone(), alias.to_string());
        }

        if let Some(mut entry) = self.table.get_mut(alias) {
            entry.refcount += 1;
            entry.known_exchange_codes.insert(entry.contract.exchange_code.clone());
        }
        Ok(())
    }

    /// `unsubscribe(alias)`: removes the upstream subscription only on a
    /// 1->0 refcount transition, and clears the reverse-map entries for
    /// every exchange code this alias has ever bound to.
    pub async fn unsubscribe(&self, alias: &str) -> Result<(), HandlerError> {
        let reached_zero = {
            match self.table.get_mut(alias) {
                Some(mut entry) if entry.refcount > 0 => {
                    entry.refcount -= 1;
                    entry.refcount == 0
                }
                _ => return Ok(()),
            }
        };

        if reached_zero {
            let (contract, known_codes) = {
                let entry = self.table.get(alias).expect("checked above");
                (entry.contract.clone(), entry.known_exchange_codes.clone())
            };
            self.session.unsubscribe_tick(&contract).await.map_err(HandlerError::from)?;
            self.session.unsubscribe_bidask(&contract).await.map_err(HandlerError::from)?;
            for code in known_codes {
                self.reverse.remove(&code);
            }
        }
        Ok(())
    }

    /// Handle one raw callback event: resolve the alias, normalize, and
    /// publish. Never panics out into the consumer task — any failure
    /// is logged and the event dropped (§4.E "Failure model", §7 "a
    /// single bad tick callback never kills the worker").
    fn handle_raw_event(&self, event: RawCallbackEvent) {
        let exchange_code = event.exchange_code().to_string();
        let alias = match self.resolve_alias(&exchange_code) {
            Some(alias) => alias,
            None => {
                tracing::warn!(exchange_code, "no alias binding for callback, dropping");
                return;
            }
        };

        let quote_event = match event {
            RawCallbackEvent::Tick { .. } => event.into_tick(alias.clone()).map(QuoteEvent::Tick),
            RawCallbackEvent::BidAsk { .. } => event.into_bidask(alias.clone()).map(QuoteEvent::BidAsk),
        };
        let Some(quote_event) = quote_event else {
            return;
        };

        match serde_json::to_vec(&quote_event) {
            Ok(bytes) => self.bus.publish(&format!("quote.{alias}"), &bytes),
            Err(e) => tracing::warn!(error = %e, "failed to serialize quote event"),
        }
    }

    /// Resolve an exchange code to its alias, attempting a dynamic
    /// binding if the reverse map doesn't know it yet (§4.E "Alias
    /// resolution on callback").
    fn resolve_alias(&self, exchange_code: &str) -> Option<String> {
        if let Some(alias) = self.reverse.get(exchange_code) {
            return Some(alias.clone());
        }

        let family = exchange_code_family_prefix(exchange_code);
        let candidate = self.table.iter().find_map(|entry| {
            let alias = entry.key();
            if is_pseudo_symbol(alias) && alias_family_prefix(alias) == family && entry.refcount > 0 {
                Some(alias.clone())
            } else {
                None
            }
        })?;

        if let Some(mut entry) = self.table.get_mut(&candidate) {
            entry.known_exchange_codes.insert(exchange_code.to_string());
        }
        self.reverse.insert(exchange_code.to_string(), candidate.clone());
        tracing::info!(exchange_code, alias = %candidate, "dynamically bound exchange code to alias");
        Some(candidate)
    }
}

#[allow(dead_code)]
fn _assert_contract_handle_is_clonable(_: &ContractHandle) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::fake::FakeUpstream;
    use rust_decimal::Decimal;

    fn manager() -> Arc<QuoteManager<FakeUpstream>> {
        QuoteManager::new(Arc::new(FakeUpstream::new()), Bus::new())
    }

    #[tokio::test]
    async fn first_subscribe_sets_refcount_to_one() {
        let mgr = manager();
        mgr.subscribe("TMFR1").await.unwrap();
        assert_eq!(mgr.refcount("TMFR1"), 1);
    }

    #[tokio::test]
    async fn second_subscribe_increments_without_duplicate_upstream_call() {
        let mgr = manager();
        mgr.subscribe("TMFR1").await.unwrap();
        mgr.subscribe("TMFR1").await.unwrap();
        assert_eq!(mgr.refcount("TMFR1"), 2);
    }

    #[tokio::test]
    async fn unsubscribe_down_to_zero_clears_binding() {
        let mgr = manager();
        mgr.subscribe("TMFR1").await.unwrap();
        mgr.subscribe("TMFR1").await.unwrap();
        mgr.unsubscribe("TMFR1").await.unwrap();
        assert_eq!(mgr.refcount("TMFR1"), 1);
        mgr.unsubscribe("TMFR1").await.unwrap();
        assert_eq!(mgr.refcount("TMFR1"), 0);
    }

    #[tokio::test]
    async fn subscribe_then_unsubscribe_is_byte_for_byte_idempotent() {
        let mgr = manager();
        mgr.subscribe("TMFR1").await.unwrap();
        mgr.unsubscribe("TMFR1").await.unwrap();
        assert_eq!(mgr.refcount("TMFR1"), 0);
        assert!(mgr.reverse.is_empty());
    }

    #[tokio::test]
    async fn bidask_refusal_rolls_back_tick_and_leaves_refcount_at_zero() {
        let mgr = manager();
        let err = mgr.subscribe("RJBR1").await.unwrap_err();
        assert!(matches!(err, HandlerError::UpstreamRefused(_)));
        assert_eq!(mgr.refcount("RJBR1"), 0);
        assert!(mgr.reverse.is_empty());

        // A subsequent subscribe attempt retries cleanly rather than being
        // wedged by bookkeeping left over from the failed attempt.
        let err = mgr.subscribe("RJBR1").await.unwrap_err();
        assert!(matches!(err, HandlerError::UpstreamRefused(_)));
        assert_eq!(mgr.refcount("RJBR1"), 0);
    }

    #[tokio::test]
    async fn dynamic_binding_resolves_unknown_exchange_code() {
        let mgr = manager();
        mgr.subscribe("TMFR1").await.unwrap();
        let bound = mgr.resolve_alias("TMFB6");
        assert_eq!(bound, Some("TMFR1".to_string()));
        // second lookup is O(1) via the reverse map, not re-derived
        assert_eq!(mgr.resolve_alias("TMFB6"), Some("TMFR1".to_string()));
    }

    #[tokio::test]
    async fn unknown_exchange_code_with_no_match_resolves_to_none() {
        let mgr = manager();
        mgr.subscribe("TMFR1").await.unwrap();
        assert_eq!(mgr.resolve_alias("ZZZB6"), None);
    }

    #[tokio::test]
    async fn raw_tick_is_published_under_alias_symbol() {
        let mgr = manager();
        mgr.subscribe("TMFR1").await.unwrap();
        let mut rx = mgr.bus.subscribe("quote.TMFR1");
        mgr.handle_raw_event(RawCallbackEvent::Tick {
            exchange_code: "TMFB6".to_string(),
            last_price: Decimal::new(101, 0),
            open: Decimal::new(100, 0),
            high: Decimal::new(102, 0),
            low: Decimal::new(99, 0),
            change: Decimal::ONE,
            change_percent: Decimal::ONE,
            last_volume: 1,
            cumulative_volume: 10,
            timestamp: chrono::Utc::now(),
        });
        let payload = rx.recv().await.unwrap();
        let event: QuoteEvent = serde_json::from_slice(&payload).unwrap();
        assert_eq!(event.symbol(), "TMFR1");
    }
}
