//! An in-memory fake of [`UpstreamSession`], used by the crate's own
//! tests and as the backing session when no real brokerage credentials
//! are configured (so the binary can still start in a demo mode). The
//! gateway codebase takes the analogous approach of keeping a
//! `mock-api` surface separate from its real persistence/exchange code;
//! here the fake lives behind the same trait real sessions would
//! implement, rather than behind a feature flag, since tests need to
//! construct it directly.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::mpsc::Sender;

use crate::domain::audit::{MarginRow, PositionRow, ProfitLossRow, SettlementRow, SymbolSummary, TradeRow, UsageRow};
use crate::domain::order::{Direction, OrderKind, PriceType, UpstreamSide};
use crate::domain::quote::QuoteTick;

use super::{ContractHandle, RawCallbackEvent, UpstreamError, UpstreamOrderStatus, UpstreamSession};

struct FakeOrder {
    side: UpstreamSide,
    quantity: u32,
    filled_quantity: u32,
    average_fill_price: Option<Decimal>,
    terminal: bool,
}

/// A deterministic fake brokerage session for tests and demo runs.
///
/// Orders fill immediately and in full unless the symbol name contains
/// the literal substring `"REJECT"`, which is rejected as a business
/// error — a cheap way for tests to exercise the failure path without a
/// separate fake type.
pub struct FakeUpstream {
    catalog: Vec<SymbolSummary>,
    positions: DashMap<String, i64>,
    orders: DashMap<String, FakeOrder>,
    next_order_id: AtomicU64,
    callback_sink: Mutex<Option<Sender<RawCallbackEvent>>>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        let catalog = vec![
            SymbolSummary {
                symbol: "TMFR1".to_string(),
                exchange_code: "TMFB6".to_string(),
                product_family: "TMF".to_string(),
                tick_size: Decimal::new(1, 0),
            },
            SymbolSummary {
                symbol: "MXFR1".to_string(),
                exchange_code: "MXFB6".to_string(),
                product_family: "MXF".to_string(),
                tick_size: Decimal::new(1, 0),
            },
            // A contract whose bid/ask subscription always fails, so
            // tests can exercise the tick-succeeded / bid-ask-failed
            // partial-failure rollback path deterministically.
            SymbolSummary {
                symbol: "RJBR1".to_string(),
                exchange_code: "RJB_REJECT_BIDASK".to_string(),
                product_family: "RJB".to_string(),
                tick_size: Decimal::new(1, 0),
            },
        ];
        Self {
            catalog,
            positions: DashMap::new(),
            orders: DashMap::new(),
            next_order_id: AtomicU64::new(1),
            callback_sink: Mutex::new(None),
        }
    }

    /// Push a synthetic tick through the installed callback sink, as if
    /// the upstream SDK had delivered one. Used by quote-manager tests.
    pub async fn emit_tick(&self, exchange_code: &str, last_price: Decimal) {
        let sink = self.callback_sink.lock().unwrap().clone();
        if let Some(sink) = sink {
            let _ = sink
                .send(RawCallbackEvent::Tick {
                    exchange_code: exchange_code.to_string(),
                    last_price,
                    open: last_price,
                    high: last_price,
                    low: last_price,
                    change: Decimal::ZERO,
                    change_percent: Decimal::ZERO,
                    last_volume: 1,
                    cumulative_volume: 1,
                    timestamp: Utc::now(),
                })
                .await;
        }
    }

    pub fn set_position(&self, symbol: &str, signed_qty: i64) {
        self.positions.insert(symbol.to_string(), signed_qty);
    }
}

impl Default for FakeUpstream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpstreamSession for FakeUpstream {
    async fn login(&self) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn logout(&self) -> Result<(), UpstreamError> {
        Ok(())
    }

    fn contract_catalog(&self) -> Vec<SymbolSummary> {
        self.catalog.clone()
    }

    async fn resolve_symbol(&self, alias: &str) -> Result<ContractHandle, UpstreamError> {
        self.catalog
            .iter()
            .find(|s| s.symbol == alias)
            .map(|s| ContractHandle {
                exchange_code: s.exchange_code.clone(),
                product_family: s.product_family.clone(),
                tick_size: s.tick_size,
            })
            .ok_or_else(|| UpstreamError::new("UNKNOWN_SYMBOL", format!("no such symbol: {alias}")))
    }

    async fn net_position(&self, exchange_code: &str) -> Result<i64, UpstreamError> {
        Ok(self.positions.get(exchange_code).map(|v| *v).unwrap_or(0))
    }

    async fn place_order(
        &self,
        contract: &ContractHandle,
        side: UpstreamSide,
        quantity: u32,
        price_type: PriceType,
        price: Option<Decimal>,
        _order_kind: OrderKind,
    ) -> Result<String, UpstreamError> {
        if contract.exchange_code.contains("REJECT") {
            return Err(UpstreamError::new(
                "INSUFFICIENT_MARGIN",
                "not enough margin for this order",
            ));
        }
        let order_id = format!("FK-{}", self.next_order_id.fetch_add(1, Ordering::SeqCst));
        let fill_price = match price_type {
            PriceType::Market => Some(Decimal::new(100, 0)),
            PriceType::Limit => price,
        };
        self.orders.insert(
            order_id.clone(),
            FakeOrder {
                side,
                quantity,
                filled_quantity: quantity,
                average_fill_price: fill_price,
                terminal: true,
            },
        );
        let delta = match side {
            UpstreamSide::Buy => quantity as i64,
            UpstreamSide::Sell => -(quantity as i64),
        };
        *self.positions.entry(contract.exchange_code.clone()).or_insert(0) += delta;
        Ok(order_id)
    }

    async fn cancel_order(&self, upstream_order_id: &str) -> Result<(), UpstreamError> {
        if let Some(mut order) = self.orders.get_mut(upstream_order_id) {
            if !order.terminal {
                order.terminal = true;
            }
            Ok(())
        } else {
            Err(UpstreamError::new("ORDER_NOT_FOUND", "no such order"))
        }
    }

    async fn recheck_order(
        &self,
        upstream_order_id: &str,
    ) -> Result<UpstreamOrderStatus, UpstreamError> {
        let order = self
            .orders
            .get(upstream_order_id)
            .ok_or_else(|| UpstreamError::new("ORDER_NOT_FOUND", "no such order"))?;
        Ok(UpstreamOrderStatus {
            upstream_order_id: upstream_order_id.to_string(),
            filled_quantity: order.filled_quantity,
            average_fill_price: order.average_fill_price,
            terminal: order.terminal,
            rejection_message: None,
        })
    }

    async fn query_positions(&self) -> Result<Vec<PositionRow>, UpstreamError> {
        Ok(self
            .positions
            .iter()
            .filter(|e| *e.value() != 0)
            .map(|e| PositionRow {
                symbol: e.key().clone(),
                direction: if *e.value() > 0 {
                    Direction::LongEntry
                } else {
                    Direction::ShortEntry
                },
                quantity: e.value().unsigned_abs() as u32,
                average_price: Decimal::new(100, 0),
            })
            .collect())
    }

    async fn query_margin(&self) -> Result<MarginRow, UpstreamError> {
        Ok(MarginRow {
            equity: Decimal::new(1_000_000, 2),
            used_margin: Decimal::ZERO,
            available_margin: Decimal::new(1_000_000, 2),
        })
    }

    async fn query_profit_loss(&self) -> Result<ProfitLossRow, UpstreamError> {
        Ok(ProfitLossRow {
            realized: Decimal::ZERO,
            unrealized: Decimal::ZERO,
        })
    }

    async fn query_trades(&self) -> Result<Vec<TradeRow>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn query_settlements(&self) -> Result<Vec<SettlementRow>, UpstreamError> {
        Ok(Vec::new())
    }

    async fn query_usage(&self) -> Result<UsageRow, UpstreamError> {
        Ok(UsageRow {
            requests_today: 0,
            connection_attempts_today: 1,
            connection_budget: 10,
        })
    }

    async fn symbol_snapshot(&self, contract: &ContractHandle) -> Result<QuoteTick, UpstreamError> {
        Ok(QuoteTick {
            symbol: contract.exchange_code.clone(),
            exchange_code: contract.exchange_code.clone(),
            last_price: Decimal::new(100, 0),
            open: Decimal::new(100, 0),
            high: Decimal::new(100, 0),
            low: Decimal::new(100, 0),
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            last_volume: 0,
            cumulative_volume: 0,
            upstream_timestamp: Utc::now(),
        })
    }

    async fn subscribe_tick(&self, _contract: &ContractHandle) -> Result<(), UpstreamError> {
        Ok(())
    }

    /// Contracts whose exchange code contains `REJECT_BIDASK` fail only
    /// the bid/ask half, so tests can exercise the tick-succeeded /
    /// bid-ask-failed partial-failure path deterministically.
    async fn subscribe_bidask(&self, contract: &ContractHandle) -> Result<(), UpstreamError> {
        if contract.exchange_code.contains("REJECT_BIDASK") {
            return Err(UpstreamError::new(
                "MARKET_CLOSED",
                "bid/ask subscription refused",
            ));
        }
        Ok(())
    }

    async fn unsubscribe_tick(&self, _contract: &ContractHandle) -> Result<(), UpstreamError> {
        Ok(())
    }

    async fn unsubscribe_bidask(&self, _contract: &ContractHandle) -> Result<(), UpstreamError> {
        Ok(())
    }

    fn install_callbacks(&self, sink: Sender<RawCallbackEvent>) {
        *self.callback_sink.lock().unwrap() = Some(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_known_symbol() {
        let upstream = FakeUpstream::new();
        let handle = upstream.resolve_symbol("TMFR1").await.unwrap();
        assert_eq!(handle.exchange_code, "TMFB6");
    }

    #[tokio::test]
    async fn resolve_unknown_symbol_errors() {
        let upstream = FakeUpstream::new();
        assert!(upstream.resolve_symbol("NOPE").await.is_err());
    }

    #[tokio::test]
    async fn place_order_moves_net_position() {
        let upstream = FakeUpstream::new();
        let handle = upstream.resolve_symbol("TMFR1").await.unwrap();
        upstream
            .place_order(&handle, UpstreamSide::Buy, 2, PriceType::Market, None, OrderKind::Day)
            .await
            .unwrap();
        assert_eq!(upstream.net_position("TMFB6").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejecting_contract_returns_business_error() {
        let upstream = FakeUpstream::new();
        let handle = ContractHandle {
            exchange_code: "REJECTME".to_string(),
            product_family: "TMF".to_string(),
            tick_size: Decimal::new(1, 0),
        };
        let err = upstream
            .place_order(&handle, UpstreamSide::Buy, 1, PriceType::Market, None, OrderKind::Day)
            .await
            .unwrap_err();
        assert_eq!(super::super::classify(&err), super::super::UpstreamErrorClass::BusinessRejected);
    }
}
