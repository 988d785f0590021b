//! OpenAPI documentation for the thin HTTP facade (§4.G, §6).
//!
//! Scoped to the facade's own routes — the Correlation Bus, worker, and
//! quote pipeline have no HTTP surface of their own to document. Modeled
//! on the gateway codebase's `gateway::openapi::ApiDoc`, minus the
//! Ed25519 signature security scheme (this facade uses a single shared
//! `X-Auth-Key` header instead).

use utoipa::OpenApi;

use super::handlers::health::HealthBody;
use super::handlers::orders::PlaceOrderBody;
use crate::domain::order::{Direction, OrderCommand, OrderKind, PriceType, UpstreamSide};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "brokerd",
        version = "0.1.0",
        description = "Single-session brokerage bridge: request/response bus, worker session manager, quote fan-out.",
        license(name = "MIT")
    ),
    paths(
        super::handlers::health::healthz,
        super::handlers::orders::place_order,
        super::handlers::orders::cancel_order,
        super::handlers::orders::recheck_order,
        super::handlers::queries::list_positions,
        super::handlers::queries::query_margin,
        super::handlers::queries::query_profit_loss,
        super::handlers::queries::list_trades,
        super::handlers::queries::list_settlements,
        super::handlers::queries::query_usage,
        super::handlers::symbols::list_symbols,
        super::handlers::symbols::symbol_info,
        super::handlers::symbols::symbol_snapshot,
    ),
    components(schemas(
        HealthBody,
        PlaceOrderBody,
        OrderCommand,
        Direction,
        UpstreamSide,
        PriceType,
        OrderKind,
    ))
)]
pub struct ApiDoc;
