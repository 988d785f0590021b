//! Unified HTTP response envelope for the thin facade (§4.G, §6).
//!
//! Adapted from the gateway codebase's `ApiResponse`/`ApiResult`/`ApiError`
//! trio: same `code`/`msg`/`data` envelope, same `IntoResponse` plumbing,
//! generalized to wrap `Response`/`ResponseData` from the Correlation Bus
//! instead of the exchange's own DTOs.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::command::{ErrorKind, ResponseStatus};
use crate::error::BusError;

fn default_true() -> bool {
    true
}

/// The `?simulation=true|false` query flag every GET/DELETE endpoint
/// accepts (§6 "selects account mode ... passed through into the
/// command envelope"). Defaults to `true`, matching the `Request`
/// envelope's own default (§3 "simulation flag").
#[derive(Debug, Deserialize)]
pub struct SimulationQuery {
    #[serde(default = "default_true")]
    pub simulation: bool,
}

/// Unified API response wrapper: `code == 0` is success, anything else is
/// an error code from [`error_codes`]. `status` mirrors the bus
/// `Response::status` (`ok` / `failed` / `no_action`, §6) so a caller can
/// tell a business rejection (HTTP 200, `status: failed`) apart from
/// outright success without inspecting `code`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    #[schema(example = "ok")]
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            status: "ok",
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>, status: &'static str) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            status,
            data: None,
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

#[inline]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

#[inline]
pub fn accepted<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(data))))
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const NOT_FOUND: i32 = 4001;
    pub const UPSTREAM_REJECTED: i32 = 4002;
    pub const SESSION_NOT_READY: i32 = 5002;
    pub const NO_ACTION: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}

/// Unified error type with automatic `IntoResponse`. `outcome` carries
/// the business status (`failed` / `no_action`) separately from the HTTP
/// status code, since §4.G's mapping puts some failures (upstream
/// rejections) on HTTP 200.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
    pub outcome: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, message: impl Into<String>, outcome: &'static str) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            outcome,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg, "failed")
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED, msg, "failed")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg, "failed")
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
            "failed",
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR, msg, "failed")
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err((self.status, Json(ApiResponse::<()>::error(self.code, self.message, self.outcome))))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = Json(ApiResponse::<()>::error(self.code, self.message, self.outcome));
        (self.status, body).into_response()
    }
}

/// Enables `?` on `Result<_, ApiError>` inside handlers returning `ApiResult<T>`.
impl From<ApiError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(err: ApiError) -> Self {
        (err.status, Json(ApiResponse::<()>::error(err.code, err.message, err.outcome)))
    }
}

impl From<BusError> for ApiError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::TimedOut => ApiError::service_unavailable("no reply from worker within the deadline"),
            BusError::StoreUnreachable(msg) => ApiError::service_unavailable(msg),
        }
    }
}

/// Translate a bus `Response` (the worker's answer) into an `ApiResult`,
/// reproducing the §4.G status-code mapping via the `error_kind` the
/// dispatcher attached to the `Response`:
/// `validation` -> 400, `session-not-ready` -> 503, `upstream-refused` ->
/// 200 with `status: failed` in the body (per §7 "surfaced verbatim in
/// `message`" — the HTTP call itself succeeded, the order didn't),
/// `upstream-transient` -> 503 (retryable, same as session-not-ready).
pub fn translate_response<T: Serialize>(
    response: crate::domain::command::Response,
    map_ok: impl FnOnce(crate::domain::command::ResponseData) -> T,
) -> ApiResult<T> {
    match response.status {
        ResponseStatus::Ok => {
            let data = response
                .data
                .ok_or_else(|| ApiError::internal("worker reported success with no data"))?;
            ok(map_ok(data))
        }
        ResponseStatus::Failed => {
            let message = response.message.unwrap_or_else(|| "command failed".to_string());
            match response.error_kind {
                Some(ErrorKind::Validation) => {
                    ApiError::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, message, "failed")
                        .into_err()
                }
                Some(ErrorKind::SessionNotReady) | Some(ErrorKind::UpstreamTransient) => ApiError::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    error_codes::SESSION_NOT_READY,
                    message,
                    "failed",
                )
                .into_err(),
                Some(ErrorKind::UpstreamRefused) | None => {
                    ApiError::new(StatusCode::OK, error_codes::UPSTREAM_REJECTED, message, "failed").into_err()
                }
            }
        }
        ResponseStatus::NoAction => ApiError::new(
            StatusCode::CONFLICT,
            error_codes::NO_ACTION,
            response.message.unwrap_or_else(|| "no action taken".to_string()),
            "no_action",
        )
        .into_err(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::command::{RequestId, Response};

    fn status_of(result: ApiResult<serde_json::Value>) -> StatusCode {
        match result {
            Ok((status, _)) => status,
            Err((status, _)) => status,
        }
    }

    #[test]
    fn validation_failure_maps_to_bad_request() {
        let response = Response::failed_with_kind(RequestId::new(), "bad qty", ErrorKind::Validation);
        let result = translate_response(response, |_| serde_json::json!({}));
        assert_eq!(status_of(result), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn session_not_ready_maps_to_service_unavailable() {
        let response = Response::failed_with_kind(RequestId::new(), "not ready", ErrorKind::SessionNotReady);
        let result = translate_response(response, |_| serde_json::json!({}));
        assert_eq!(status_of(result), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn upstream_refused_maps_to_ok_with_failed_status() {
        let response = Response::failed_with_kind(RequestId::new(), "insufficient margin", ErrorKind::UpstreamRefused);
        let Err((status, Json(body))) = translate_response(response, |_| serde_json::json!({})) else {
            panic!("expected the Err channel for a failed response");
        };
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "failed");
    }

    #[test]
    fn no_action_carries_no_action_status() {
        let response = Response::no_action(RequestId::new(), "nothing to exit");
        let Err((status, Json(body))) = translate_response(response, |_| serde_json::json!({})) else {
            panic!("expected the Err channel for a no_action response");
        };
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body.status, "no_action");
    }
}
