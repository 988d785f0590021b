//! The thin HTTP facade (§4.G, §6): translates REST calls into
//! Correlation Bus requests and the eventual reply into an HTTP
//! response. Treated as an external collaborator — this module owns
//! only request/response shape and auth, never business logic.

pub mod auth;
pub mod handlers;
pub mod openapi;
pub mod types;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::bus::Bus;
use crate::domain::command::{CommandPayload, Request, Response};

use self::auth::AuthState;
use self::types::ApiError;

/// Default time the facade waits for the worker to answer before giving
/// up and reporting a timeout to the caller (§6 "response_ttl_ms").
pub const DEFAULT_RESPONSE_TTL_MS: u64 = 5_000;

#[derive(Clone)]
pub struct FacadeState {
    pub bus: Bus,
    pub response_ttl_ms: u64,
    /// Type-erased peek at the worker's readiness, so the facade doesn't
    /// need to be generic over the upstream session type.
    pub worker_ready: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl FacadeState {
    pub fn new(bus: Bus, worker_ready: Arc<dyn Fn() -> bool + Send + Sync>) -> Self {
        Self {
            bus,
            response_ttl_ms: DEFAULT_RESPONSE_TTL_MS,
            worker_ready,
        }
    }

    /// Submit a command and wait for the worker's reply (§4.A, §4.G).
    pub async fn submit_command(&self, payload: CommandPayload, simulation: bool) -> Result<Response, ApiError> {
        let request = Request::new(payload, simulation, self.response_ttl_ms);
        let request_id = request.request_id;
        self.bus.submit(request)?;
        let response = self.bus.await_response(request_id, self.response_ttl_ms).await?;
        Ok(response)
    }
}

pub fn router(state: FacadeState, auth: AuthState) -> Router {
    let private = Router::new()
        .route("/order", post(handlers::orders::place_order))
        .route("/orders/{order_id}", axum::routing::delete(handlers::orders::cancel_order))
        .route("/orders/{order_id}/recheck", post(handlers::orders::recheck_order))
        .route("/positions", get(handlers::queries::list_positions))
        .route("/margin", get(handlers::queries::query_margin))
        .route("/profit-loss", get(handlers::queries::query_profit_loss))
        .route("/trades", get(handlers::queries::list_trades))
        .route("/settlements", get(handlers::queries::list_settlements))
        .route("/usage", get(handlers::queries::query_usage))
        .route("/symbols", get(handlers::symbols::list_symbols))
        .route("/symbols/{symbol}", get(handlers::symbols::symbol_info))
        .route("/symbols/{symbol}/snapshot", get(handlers::symbols::symbol_snapshot))
        .layer(middleware::from_fn_with_state(auth, auth::auth_middleware));

    Router::new()
        .route("/healthz", get(handlers::health::healthz))
        .nest("/api/v1", private)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}
