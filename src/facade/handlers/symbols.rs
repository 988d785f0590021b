//! `/symbols` endpoints (§4.G -> §4.D list_symbols/symbol_info/symbol_snapshot).

use axum::extract::{Path, State};
use serde_json::Value;

use crate::domain::command::{CommandPayload, ResponseData};
use crate::facade::FacadeState;
use crate::facade::types::{ApiResult, translate_response};

#[utoipa::path(get, path = "/api/v1/symbols", responses((status = 200)))]
pub async fn list_symbols(State(state): State<FacadeState>) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::ListSymbols, false).await?;
    translate_response(response, |data| match data {
        ResponseData::Symbols(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(get, path = "/api/v1/symbols/{symbol}", params(("symbol" = String, Path)), responses((status = 200)))]
pub async fn symbol_info(State(state): State<FacadeState>, Path(symbol): Path<String>) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::SymbolInfo { symbol }, false).await?;
    translate_response(response, |data| match data {
        ResponseData::SymbolInfo(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}

#[utoipa::path(get, path = "/api/v1/symbols/{symbol}/snapshot", params(("symbol" = String, Path)), responses((status = 200)))]
pub async fn symbol_snapshot(State(state): State<FacadeState>, Path(symbol): Path<String>) -> ApiResult<Value> {
    let response = state.submit_command(CommandPayload::SymbolSnapshot { symbol }, false).await?;
    translate_response(response, |data| match data {
        ResponseData::Snapshot(v) => serde_json::to_value(v).unwrap_or_default(),
        _ => serde_json::json!({}),
    })
}
