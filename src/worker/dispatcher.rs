//! The dispatch loop (§4.C): pops one request at a time from the bus,
//! routes it to a handler, and writes exactly one reply. Nothing here
//! ever runs two upstream calls concurrently — that serialization is
//! the whole point of the single-session design (§5 "Concurrency
//! discipline").

use std::sync::Arc;

use crate::bus::Bus;
use crate::domain::audit::OrderAuditStore;
use crate::domain::command::{CommandPayload, Response};
use crate::error::HandlerError;
use crate::quotes::QuoteManager;
use crate::upstream::UpstreamSession;
use crate::worker::session::WorkerSessionManager;

use super::handlers::{self, HandlerContext, SymbolCache};

pub struct Dispatcher<S: UpstreamSession + 'static> {
    bus: Bus,
    ctx: HandlerContext<S>,
}

impl<S: UpstreamSession + 'static> Dispatcher<S> {
    pub fn new(
        bus: Bus,
        session_mgr: Arc<WorkerSessionManager<S>>,
        quotes: Arc<QuoteManager<S>>,
        audit: Arc<dyn OrderAuditStore>,
    ) -> Self {
        Self {
            bus,
            ctx: HandlerContext {
                session_mgr,
                quotes,
                audit,
                symbol_cache: Arc::new(SymbolCache::new()),
            },
        }
    }

    /// Run forever, serially: pop, dispatch, reply, repeat (§4.C).
    pub async fn run(&self) -> ! {
        loop {
            let request = self.bus.next_request().await;
            let request_id = request.request_id;
            let simulation = request.simulation;

            let result = if self.ctx.session_mgr.is_ready() {
                self.dispatch(request.payload, simulation).await
            } else {
                Err(HandlerError::SessionNotReady)
            };

            let response = match result {
                Ok(data) => Response::ok(request_id, data),
                Err(HandlerError::NoAction(msg)) => Response::no_action(request_id, msg),
                Err(e) => {
                    tracing::warn!(%request_id, error = %e, "command failed");
                    let kind = e.error_kind();
                    Response::failed_with_kind(request_id, e.to_string(), kind)
                }
            };
            self.bus.reply(response);
        }
    }

    async fn dispatch(
        &self,
        payload: CommandPayload,
        simulation: bool,
    ) -> Result<crate::domain::command::ResponseData, HandlerError> {
        match payload {
            CommandPayload::PlaceOrder(cmd) => handlers::place_order(&self.ctx, cmd, simulation).await,
            CommandPayload::CancelOrder { order_id } => handlers::cancel_order(&self.ctx, order_id).await,
            CommandPayload::RecheckOrder { order_id } => handlers::recheck_order(&self.ctx, order_id).await,
            CommandPayload::ListPositions => handlers::list_positions(&self.ctx).await,
            CommandPayload::QueryMargin => handlers::query_margin(&self.ctx).await,
            CommandPayload::QueryProfitLoss => handlers::query_profit_loss(&self.ctx).await,
            CommandPayload::ListTrades => handlers::list_trades(&self.ctx).await,
            CommandPayload::ListSettlements => handlers::list_settlements(&self.ctx).await,
            CommandPayload::ListSymbols => handlers::list_symbols(&self.ctx).await,
            CommandPayload::SymbolInfo { symbol } => handlers::symbol_info(&self.ctx, &symbol).await,
            CommandPayload::SymbolSnapshot { symbol } => handlers::symbol_snapshot(&self.ctx, &symbol).await,
            CommandPayload::QueryUsage => handlers::query_usage(&self.ctx).await,
            CommandPayload::SubscribeQuote { symbol } => handlers::subscribe_quote(&self.ctx, &symbol).await,
            CommandPayload::UnsubscribeQuote { symbol } => handlers::unsubscribe_quote(&self.ctx, &symbol).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::InMemoryAuditStore;
    use crate::domain::command::{CommandPayload, Request, ResponseStatus};
    use crate::domain::order::{Direction, OrderKind, PriceType};
    use crate::upstream::fake::FakeUpstream;
    use crate::worker::session::RetryPolicy;

    async fn spawn_dispatcher() -> Bus {
        let bus = Bus::new();
        let session_mgr = Arc::new(WorkerSessionManager::new(
            Arc::new(FakeUpstream::new()),
            RetryPolicy::default(),
        ));
        session_mgr.establish().await;
        let quotes = QuoteManager::new(Arc::new(FakeUpstream::new()), bus.clone());
        let audit: Arc<dyn OrderAuditStore> = Arc::new(InMemoryAuditStore::new());
        let dispatcher = Dispatcher::new(bus.clone(), session_mgr, quotes, audit);
        tokio::spawn(async move { dispatcher.run().await });
        bus
    }

    #[tokio::test]
    async fn happy_path_order_round_trips_through_the_bus() {
        let bus = spawn_dispatcher().await;
        let req = Request::new(
            CommandPayload::PlaceOrder(crate::domain::order::OrderCommand {
                direction: Direction::LongEntry,
                symbol: "TMFR1".into(),
                quantity: 1,
                price: None,
                price_type: PriceType::Market,
                order_kind: OrderKind::Day,
            }),
            true,
            2_000,
        );
        let id = bus.submit(req).unwrap();
        let resp = bus.await_response(id, 1_000).await.unwrap();
        assert_eq!(resp.status, ResponseStatus::Ok);
    }

    #[tokio::test]
    async fn exit_after_matching_entry_is_accepted_not_no_action() {
        // Regression test: the position check must key off the resolved
        // contract's exchange code, not the client-facing alias the
        // position table never actually stores under.
        let bus = spawn_dispatcher().await;
        let entry = Request::new(
            CommandPayload::PlaceOrder(crate::domain::order::OrderCommand {
                direction: Direction::LongEntry,
                symbol: "TMFR1".into(),
                quantity: 1,
                price: None,
                price_type: PriceType::Market,
                order_kind: OrderKind::Day,
            }),
            true,
            2_000,
        );
        let id = bus.submit(entry).unwrap();
        let resp = bus.await_response(id, 1_000).await.unwrap();
        assert_eq!(resp.status, ResponseStatus::Ok);

        let exit = Request::new(
            CommandPayload::PlaceOrder(crate::domain::order::OrderCommand {
                direction: Direction::LongExit,
                symbol: "TMFR1".into(),
                quantity: 1,
                price: None,
                price_type: PriceType::Market,
                order_kind: OrderKind::Day,
            }),
            true,
            2_000,
        );
        let id = bus.submit(exit).unwrap();
        let resp = bus.await_response(id, 1_000).await.unwrap();
        assert_eq!(resp.status, ResponseStatus::Ok);
    }

    #[tokio::test]
    async fn spurious_exit_resolves_as_no_action_without_reaching_upstream() {
        let bus = spawn_dispatcher().await;
        let req = Request::new(
            CommandPayload::PlaceOrder(crate::domain::order::OrderCommand {
                direction: Direction::LongExit,
                symbol: "TMFR1".into(),
                quantity: 1,
                price: None,
                price_type: PriceType::Market,
                order_kind: OrderKind::Day,
            }),
            true,
            2_000,
        );
        let id = bus.submit(req).unwrap();
        let resp = bus.await_response(id, 1_000).await.unwrap();
        assert_eq!(resp.status, ResponseStatus::NoAction);
    }

    #[tokio::test]
    async fn unknown_symbol_is_rejected() {
        let bus = spawn_dispatcher().await;
        let req = Request::new(CommandPayload::SymbolInfo { symbol: "NOPE".into() }, true, 2_000);
        let id = bus.submit(req).unwrap();
        let resp = bus.await_response(id, 1_000).await.unwrap();
        assert_eq!(resp.status, ResponseStatus::Failed);
    }
}
