//! `/orders` endpoints (§4.G -> §4.D place_order/cancel_order/recheck_order).

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::domain::command::{CommandPayload, ResponseData};
use crate::domain::order::OrderCommand;
use crate::facade::FacadeState;
use crate::facade::types::{ApiResult, SimulationQuery, translate_response};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct PlaceOrderBody {
    #[serde(flatten)]
    pub command: OrderCommand,
    #[serde(default = "default_true")]
    pub simulation: bool,
}

#[utoipa::path(post, path = "/api/v1/order", request_body = PlaceOrderBody, responses((status = 200, description = "order accepted, rejected, or no_action")))]
pub async fn place_order(
    State(state): State<FacadeState>,
    Json(body): Json<PlaceOrderBody>,
) -> ApiResult<serde_json::Value> {
    let response = state.submit_command(CommandPayload::PlaceOrder(body.command), body.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::OrderAccepted { upstream_order_id } => {
            serde_json::json!({ "upstream_order_id": upstream_order_id })
        }
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(delete, path = "/api/v1/orders/{order_id}", params(("order_id" = String, Path)), responses((status = 200)))]
pub async fn cancel_order(
    State(state): State<FacadeState>,
    Path(order_id): Path<String>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<serde_json::Value> {
    let response = state.submit_command(CommandPayload::CancelOrder { order_id }, q.simulation).await?;
    translate_response(response, |_| serde_json::json!({}))
}

#[utoipa::path(post, path = "/api/v1/orders/{order_id}/recheck", params(("order_id" = String, Path)), responses((status = 200)))]
pub async fn recheck_order(
    State(state): State<FacadeState>,
    Path(order_id): Path<String>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<serde_json::Value> {
    let response = state.submit_command(CommandPayload::RecheckOrder { order_id }, q.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::OrderRecheck { audit } => serde_json::to_value(audit).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}
