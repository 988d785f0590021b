//! Order audit rows and the read-model shapes for the query handlers
//! (§3 "Order Audit Row", §6 "Persisted audit row fields").
//!
//! The storage engine itself is a Non-goal (§1); this module defines the
//! row shape and the `OrderAuditStore` seam, plus an in-memory reference
//! implementation so the crate runs without an external database. A
//! production deployment plugs in a `sqlx`-backed store behind the same
//! trait, the way the gateway codebase's `account::Database` sits behind
//! its repositories.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderMode {
    Live,
    Simulation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Append-only audit row (§6). The worker only writes rows and updates
/// status; the collaborator store owns actual persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAuditRow {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub mode: OrderMode,
    pub symbol: String,
    pub exchange_code: String,
    pub direction: Direction,
    pub quantity: u32,
    pub status: OrderStatus,
    pub fill_quantity: u32,
    pub fill_price: Option<Decimal>,
    pub upstream_order_id: String,
    pub failure_message: Option<String>,
}

/// Persistence seam for audit rows. Implementations must make `record`
/// visible to subsequent `get`/`update_status` calls; ordering across
/// concurrent writers for the *same* `upstream_order_id` is not
/// guaranteed by the trait (the dispatcher's serial loop is what
/// guarantees it in practice).
#[async_trait]
pub trait OrderAuditStore: Send + Sync {
    async fn record(&self, row: OrderAuditRow) -> anyhow::Result<()>;
    async fn get(&self, upstream_order_id: &str) -> anyhow::Result<Option<OrderAuditRow>>;
    async fn update_status(
        &self,
        upstream_order_id: &str,
        status: OrderStatus,
        fill_quantity: u32,
        fill_price: Option<Decimal>,
        failure_message: Option<String>,
    ) -> anyhow::Result<Option<OrderAuditRow>>;
    async fn list_trades(&self) -> anyhow::Result<Vec<TradeRow>>;
}

/// In-memory reference implementation, good enough for tests and for
/// running the crate without a configured database.
#[derive(Default)]
pub struct InMemoryAuditStore {
    rows: dashmap::DashMap<String, OrderAuditRow>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderAuditStore for InMemoryAuditStore {
    async fn record(&self, row: OrderAuditRow) -> anyhow::Result<()> {
        self.rows.insert(row.upstream_order_id.clone(), row);
        Ok(())
    }

    async fn get(&self, upstream_order_id: &str) -> anyhow::Result<Option<OrderAuditRow>> {
        Ok(self.rows.get(upstream_order_id).map(|r| r.clone()))
    }

    async fn update_status(
        &self,
        upstream_order_id: &str,
        status: OrderStatus,
        fill_quantity: u32,
        fill_price: Option<Decimal>,
        failure_message: Option<String>,
    ) -> anyhow::Result<Option<OrderAuditRow>> {
        if let Some(mut entry) = self.rows.get_mut(upstream_order_id) {
            entry.status = status;
            entry.fill_quantity = fill_quantity;
            entry.fill_price = fill_price;
            entry.failure_message = failure_message;
            Ok(Some(entry.clone()))
        } else {
            Ok(None)
        }
    }

    async fn list_trades(&self) -> anyhow::Result<Vec<TradeRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.fill_quantity > 0)
            .map(|r| TradeRow {
                upstream_order_id: r.upstream_order_id.clone(),
                symbol: r.symbol.clone(),
                direction: r.direction,
                fill_quantity: r.fill_quantity,
                fill_price: r.fill_price.unwrap_or_default(),
                filled_at: r.created_at,
            })
            .collect())
    }
}

// ---------------------------------------------------------------------
// Read-model row shapes for the query handlers (§4.D). The upstream
// brokerage SDK is the real source; these are the normalized shapes the
// handlers translate its responses into (§4.D "normalized into the
// fixed result schemas").
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRow {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: u32,
    pub average_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginRow {
    pub equity: Decimal,
    pub used_margin: Decimal,
    pub available_margin: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfitLossRow {
    pub realized: Decimal,
    pub unrealized: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRow {
    pub upstream_order_id: String,
    pub symbol: String,
    pub direction: Direction,
    pub fill_quantity: u32,
    pub fill_price: Decimal,
    pub filled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRow {
    pub settlement_date: DateTime<Utc>,
    pub symbol: String,
    pub realized_pnl: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub exchange_code: String,
    pub product_family: String,
    pub tick_size: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRow {
    pub requests_today: u64,
    pub connection_attempts_today: u32,
    pub connection_budget: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row(id: &str) -> OrderAuditRow {
        OrderAuditRow {
            id: id.to_string(),
            created_at: Utc::now(),
            mode: OrderMode::Simulation,
            symbol: "TMFR1".into(),
            exchange_code: "TMFB6".into(),
            direction: Direction::LongEntry,
            quantity: 1,
            status: OrderStatus::Submitted,
            fill_quantity: 0,
            fill_price: None,
            upstream_order_id: id.to_string(),
            failure_message: None,
        }
    }

    #[tokio::test]
    async fn record_then_get_round_trips() {
        let store = InMemoryAuditStore::new();
        store.record(sample_row("o-1")).await.unwrap();
        let fetched = store.get("o-1").await.unwrap().unwrap();
        assert_eq!(fetched.symbol, "TMFR1");
        assert_eq!(fetched.status, OrderStatus::Submitted);
    }

    #[tokio::test]
    async fn update_status_converges_to_filled() {
        let store = InMemoryAuditStore::new();
        store.record(sample_row("o-2")).await.unwrap();
        let updated = store
            .update_status("o-2", OrderStatus::Filled, 1, Some(Decimal::new(1234, 2)), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Filled);
        assert_eq!(updated.fill_quantity, 1);
        assert!(updated.status.is_terminal());
    }

    #[tokio::test]
    async fn update_status_on_missing_row_is_none() {
        let store = InMemoryAuditStore::new();
        let result = store
            .update_status("missing", OrderStatus::Filled, 1, None, None)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
