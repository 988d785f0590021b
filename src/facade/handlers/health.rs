//! `/healthz` (§6): a plain liveness/readiness probe, no auth required.

use axum::extract::State;
use serde::Serialize;

use crate::facade::FacadeState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthBody {
    pub worker_ready: bool,
    pub queue_depth: usize,
}

#[utoipa::path(get, path = "/healthz", responses((status = 200, body = HealthBody)))]
pub async fn healthz(State(state): State<FacadeState>) -> axum::Json<HealthBody> {
    axum::Json(HealthBody {
        worker_ready: (state.worker_ready)(),
        queue_depth: state.bus.depth(),
    })
}
