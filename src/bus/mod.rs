//! The Correlation Bus (§4.A): turns synchronous API calls into
//! correlated asynchronous jobs handed to exactly one worker.
//!
//! Implemented in-process with `crossbeam_queue::SegQueue` for the
//! request FIFO and `dashmap`/`tokio::sync` for reply slots and
//! pub/sub, the same scale of tool the gateway codebase reaches for
//! its own order-ingestion queue (`ArrayQueue`) and WebSocket fan-out
//! (`DashMap`) rather than an external broker. §6 leaves the backing
//! store to the implementer as long as it provides FIFO enqueue/dequeue,
//! TTL'd set-if-absent, and pattern pub/sub — this is that store, scoped
//! to a single process.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_queue::SegQueue;
use dashmap::DashMap;
use tokio::sync::{Notify, broadcast};
use tokio::time::timeout;

use crate::domain::{Request, RequestId, Response};
use crate::error::BusError;

/// A single reply slot. `notify` wakes any waiter once `value` is set.
/// The dispatcher is the only writer, so the mutex only ever sees
/// uncontended locks in practice; set-if-absent is enforced in
/// [`Bus::reply`] by checking before writing.
struct ReplySlot {
    value: std::sync::Mutex<Option<Response>>,
    notify: Notify,
    created_at: std::time::Instant,
    ttl: Duration,
}

/// The shared request/response + pub/sub bus (§4.A, §6 "Bus topology").
///
/// Cheap to clone: every field is `Arc`-backed, the same pattern the
/// gateway codebase's `AppState` uses for its shared handles.
#[derive(Clone)]
pub struct Bus {
    requests: Arc<SegQueue<Request>>,
    capacity: Option<usize>,
    depth: Arc<std::sync::atomic::AtomicUsize>,
    reply_slots: Arc<DashMap<RequestId, Arc<ReplySlot>>>,
    /// One broadcast sender per channel name (`quote.<alias>`), created
    /// lazily on first publish or subscribe.
    channels: Arc<DashMap<String, broadcast::Sender<Arc<[u8]>>>>,
    /// Single fan-out sender every `publish` also writes to, tagged with
    /// the channel name it was published on. [`Bus::subscribe_pattern`]
    /// is a filtered view over this one sender, giving the Streaming
    /// Hub's single process-wide `quote.*` listener (§4.F) without a
    /// dedicated broadcast channel per alias.
    pattern_fanout: Arc<broadcast::Sender<(String, Arc<[u8]>)>>,
}

impl Bus {
    pub fn new() -> Self {
        let (pattern_tx, _) = broadcast::channel(4096);
        let bus = Self {
            requests: Arc::new(SegQueue::new()),
            capacity: None,
            depth: Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            reply_slots: Arc::new(DashMap::new()),
            channels: Arc::new(DashMap::new()),
            pattern_fanout: Arc::new(pattern_tx),
        };
        bus.spawn_ttl_sweeper();
        bus
    }

    /// A bus with a bounded request queue, so a facade can reject new
    /// HTTP work instead of growing depth unboundedly (§4.A
    /// "Back-pressure").
    pub fn with_capacity(capacity: usize) -> Self {
        let mut bus = Self::new();
        bus.capacity = Some(capacity);
        bus
    }

    fn spawn_ttl_sweeper(&self) {
        let slots = self.reply_slots.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            loop {
                tick.tick().await;
                slots.retain(|_, slot| slot.created_at.elapsed() < slot.ttl);
            }
        });
    }

    /// Current queue depth, for back-pressure decisions and `/healthz`.
    pub fn depth(&self) -> usize {
        self.depth.load(std::sync::atomic::Ordering::Relaxed)
    }

    /// Enqueue a request onto the single named work queue (§4.A
    /// "submit"). Never blocks on the worker's liveness.
    pub fn submit(&self, request: Request) -> Result<RequestId, BusError> {
        if let Some(cap) = self.capacity
            && self.depth() >= cap
        {
            return Err(BusError::StoreUnreachable(
                "request queue is at capacity".to_string(),
            ));
        }
        let id = request.request_id;
        let ttl = Duration::from_millis(request.response_ttl_ms);
        self.reply_slots.insert(
            id,
            Arc::new(ReplySlot {
                value: std::sync::Mutex::new(None),
                notify: Notify::new(),
                created_at: std::time::Instant::now(),
                ttl,
            }),
        );
        self.requests.push(request);
        self.depth.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(id)
    }

    /// The worker's sole entry point for pulling work. There is exactly
    /// one authorized reader (the dispatcher); nothing enforces that at
    /// the type level beyond convention, matching §4.A's contract
    /// ("the worker is the only authorized reader").
    pub async fn next_request(&self) -> Request {
        loop {
            if let Some(req) = self.requests.pop() {
                self.depth.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
                return req;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Write the reply for a request, idempotently (§4.A "at-most-once
    /// reply"): a slot that already holds a value is left untouched and
    /// the duplicate write is silently dropped.
    pub fn reply(&self, response: Response) {
        if let Some(slot) = self.reply_slots.get(&response.request_id) {
            let mut guard = slot.value.lock().unwrap();
            if guard.is_none() {
                *guard = Some(response);
                drop(guard);
                slot.notify.notify_waiters();
            }
        }
    }

    /// Block until a reply appears for `request_id`, bounded by
    /// `timeout_ms` (which should be <= the request's own TTL per
    /// §4.A). Distinguishes timeout from "reply key absent" only in
    /// that both return `BusError::TimedOut` — by the time TTL has
    /// elapsed the outcome is unknown either way (§7 "Timed-out").
    pub async fn await_response(
        &self,
        request_id: RequestId,
        timeout_ms: u64,
    ) -> Result<Response, BusError> {
        let slot = match self.reply_slots.get(&request_id) {
            Some(slot) => slot.clone(),
            None => return Err(BusError::TimedOut),
        };
        let wait = async {
            loop {
                if let Some(resp) = slot.value.lock().unwrap().clone() {
                    return resp;
                }
                slot.notify.notified().await;
            }
        };
        match timeout(Duration::from_millis(timeout_ms), wait).await {
            Ok(resp) => {
                self.reply_slots.remove(&request_id);
                Ok(resp)
            }
            Err(_) => Err(BusError::TimedOut),
        }
    }

    /// Publish a message on a named channel (§4.A "publish"). Delivery
    /// is at-least-once from subscribers' perspective. Also fans the
    /// message out on the single pattern sender so a
    /// [`Bus::subscribe_pattern`] listener sees it without needing to
    /// know the channel name ahead of time.
    pub fn publish(&self, channel: &str, payload: &[u8]) {
        let payload: Arc<[u8]> = Arc::from(payload);
        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(1024).0)
            .clone();
        let _ = sender.send(payload.clone());
        let _ = self.pattern_fanout.send((channel.to_string(), payload));
    }

    /// Subscribe to a single exact channel name.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Arc<[u8]>> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(1024).0)
            .subscribe()
    }

    /// Subscribe to every channel whose name starts with `prefix`
    /// (§4.A "channel patterns", §4.F "single pattern listener"), via a
    /// filter over the one internal fan-out sender rather than one
    /// broadcast channel per matching name.
    pub fn subscribe_pattern(&self, prefix: &str) -> PatternReceiver {
        PatternReceiver {
            rx: self.pattern_fanout.subscribe(),
            prefix: prefix.to_string(),
        }
    }
}

/// A filtered view over the bus's pattern fan-out sender, yielding only
/// messages whose channel name starts with the registered prefix.
pub struct PatternReceiver {
    rx: broadcast::Receiver<(String, Arc<[u8]>)>,
    prefix: String,
}

impl PatternReceiver {
    /// Next matching `(channel, payload)` pair, or `None` once the bus
    /// itself has gone away. Lagged deliveries (a slow listener falling
    /// behind the fan-out's ring buffer) are skipped rather than treated
    /// as fatal — the spec tolerates at-least-once, not exactly-once,
    /// quote delivery (§4.A).
    pub async fn recv(&mut self) -> Option<(String, Arc<[u8]>)> {
        loop {
            match self.rx.recv().await {
                Ok((channel, payload)) if channel.starts_with(&self.prefix) => {
                    return Some((channel, payload));
                }
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommandPayload, ResponseData};

    fn noop_request() -> Request {
        Request::new(CommandPayload::ListSymbols, true, 2_000)
    }

    #[tokio::test]
    async fn submit_then_reply_round_trips() {
        let bus = Bus::new();
        let req = noop_request();
        let id = bus.submit(req).unwrap();

        let popped = bus.next_request().await;
        assert_eq!(popped.request_id, id);

        bus.reply(Response::ok(id, ResponseData::Unit));
        let resp = bus.await_response(id, 1_000).await.unwrap();
        assert_eq!(resp.request_id, id);
    }

    #[tokio::test]
    async fn duplicate_reply_is_dropped() {
        let bus = Bus::new();
        let req = noop_request();
        let id = bus.submit(req).unwrap();
        let _ = bus.next_request().await;

        bus.reply(Response::ok(id, ResponseData::Unit));
        bus.reply(Response::failed(id, "should not overwrite"));

        let resp = bus.await_response(id, 1_000).await.unwrap();
        assert!(resp.message.is_none());
    }

    #[tokio::test]
    async fn await_response_times_out_without_reply() {
        let bus = Bus::new();
        let req = noop_request();
        let id = bus.submit(req).unwrap();
        let _ = bus.next_request().await;

        let result = bus.await_response(id, 50).await;
        assert!(matches!(result, Err(BusError::TimedOut)));
    }

    #[tokio::test]
    async fn publish_subscribe_delivers_payload() {
        let bus = Bus::new();
        let mut rx = bus.subscribe("quote.TMFR1");
        bus.publish("quote.TMFR1", b"hello");
        let received = rx.recv().await.unwrap();
        assert_eq!(&*received, b"hello");
    }

    #[tokio::test]
    async fn pattern_subscriber_sees_every_matching_channel() {
        let bus = Bus::new();
        let mut rx = bus.subscribe_pattern("quote.");
        bus.publish("quote.TMFR1", b"one");
        bus.publish("quote.MXFR1", b"two");
        bus.publish("other.channel", b"ignored");

        let (channel, payload) = rx.recv().await.unwrap();
        assert_eq!(channel, "quote.TMFR1");
        assert_eq!(&*payload, b"one");

        let (channel, payload) = rx.recv().await.unwrap();
        assert_eq!(channel, "quote.MXFR1");
        assert_eq!(&*payload, b"two");
    }

    #[tokio::test]
    async fn bounded_bus_rejects_over_capacity() {
        let bus = Bus::with_capacity(1);
        bus.submit(noop_request()).unwrap();
        let result = bus.submit(noop_request());
        assert!(result.is_err());
    }
}
