//! Read-only account query endpoints (§4.G -> §4.D).

use axum::extract::{Query, State};
use serde_json::Value;

use crate::domain::command::{CommandPayload, ResponseData};
use crate::facade::FacadeState;
use crate::facade::types::{ApiResult, SimulationQuery, translate_response};

#[utoipa::path(get, path = "/api/v1/positions", responses((status = 200)))]
pub async fn list_positions(
    State(state): State<FacadeState>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::ListPositions, q.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::Positions(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(get, path = "/api/v1/margin", responses((status = 200)))]
pub async fn query_margin(
    State(state): State<FacadeState>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::QueryMargin, q.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::Margin(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(get, path = "/api/v1/profit-loss", responses((status = 200)))]
pub async fn query_profit_loss(
    State(state): State<FacadeState>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::QueryProfitLoss, q.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::ProfitLoss(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(get, path = "/api/v1/trades", responses((status = 200)))]
pub async fn list_trades(
    State(state): State<FacadeState>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::ListTrades, q.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::Trades(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(get, path = "/api/v1/settlements", responses((status = 200)))]
pub async fn list_settlements(
    State(state): State<FacadeState>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::ListSettlements, q.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::Settlements(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(get, path = "/api/v1/usage", responses((status = 200)))]
pub async fn query_usage(
    State(state): State<FacadeState>,
    Query(q): Query<SimulationQuery>,
) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::QueryUsage, q.simulation).await?;
    translate_response(response, |data| match data {
        ResponseData::Usage(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}
