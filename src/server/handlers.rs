//! Route handlers for the loopback API.
//!
//! Every core call runs on the blocking pool: unlock spends ~0.5 s in
//! PBKDF2 and the record operations do synchronous file I/O under the
//! session lock.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use zeroize::Zeroizing;

use super::ApiState;
use crate::errors::{ErrorKind, Result, VaultError};
use crate::vault::Records;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UnlockRequest {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SaveRecordRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeleteRecordRequest {
    #[serde(default)]
    name: Option<String>,
}

/// Parse a JSON body leniently: an empty or malformed body is treated as
/// having no fields, so field validation decides the response.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// A core error on its way to becoming an HTTP response.
///
/// Only the error class reaches the caller; details go to the log.
#[derive(Debug)]
pub(crate) struct ApiError(VaultError);

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match self.0.kind() {
            ErrorKind::Input => match self.0 {
                VaultError::MissingPassword => (StatusCode::BAD_REQUEST, "missing-password"),
                _ => (StatusCode::BAD_REQUEST, "missing-fields"),
            },
            ErrorKind::Auth => (StatusCode::UNAUTHORIZED, "invalid-password"),
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ErrorKind::Locked => (StatusCode::FORBIDDEN, "locked"),
            ErrorKind::EscrowUnavailable | ErrorKind::Persistence => {
                tracing::error!(error = %self.0, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal-error")
            }
        };

        (status, Json(json!({ "error": code }))).into_response()
    }
}

async fn blocking<T, F>(op: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| VaultError::ServerError(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

fn success() -> Json<serde_json::Value> {
    Json(json!({ "status": "success" }))
}

// ---------------------------------------------------------------------------
// Session routes
// ---------------------------------------------------------------------------

/// `POST /api/unlock` `{"password": "..."}`
pub(crate) async fn unlock(
    State(state): State<ApiState>,
    body: Bytes,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let request: UnlockRequest = parse_body(&body);
    let password = Zeroizing::new(request.password.unwrap_or_default());

    let session = state.session();
    blocking(move || session.unlock(&password)).await?;
    Ok(success())
}

/// `POST /api/lock`
pub(crate) async fn lock(
    State(state): State<ApiState>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let session = state.session();
    blocking(move || session.lock()).await?;
    Ok(success())
}

/// `GET /api/status`
pub(crate) async fn status(
    State(state): State<ApiState>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let session = state.session();
    let status = blocking(move || Ok(session.status())).await?;
    Ok(Json(json!({ "status": status })))
}

/// `POST /api/request-token`
pub(crate) async fn request_token(
    State(state): State<ApiState>,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let session = state.session();
    let token = blocking(move || session.request_token()).await?;
    Ok((
        [(header::CACHE_CONTROL, "no-store")],
        Json(json!({ "token": token.as_str() })),
    ))
}

// ---------------------------------------------------------------------------
// Record routes (bearer token required)
// ---------------------------------------------------------------------------

/// `GET|POST /api/get-all-passwords`
pub(crate) async fn all_records(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let auth = authorization(&headers);
    let gateway = state.gateway.clone();
    let records: Records = blocking(move || gateway.all_records(auth.as_deref())).await?;
    Ok(([(header::CACHE_CONTROL, "no-store")], Json(records)))
}

/// `POST /api/save-password` `{"name": "...", "password": "..."}`
pub(crate) async fn save_record(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let auth = authorization(&headers);
    let request: SaveRecordRequest = parse_body(&body);
    let name = request.name.unwrap_or_default();
    let secret = Zeroizing::new(request.password.unwrap_or_default());

    let gateway = state.gateway.clone();
    blocking(move || gateway.upsert_record(auth.as_deref(), &name, &secret)).await?;
    Ok(success())
}

/// `POST /api/delete-password` `{"name": "..."}`
pub(crate) async fn delete_record(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<impl IntoResponse, ApiError> {
    let auth = authorization(&headers);
    let request: DeleteRecordRequest = parse_body(&body);
    let name = request.name.unwrap_or_default();

    let gateway = state.gateway.clone();
    blocking(move || gateway.delete_record(auth.as_deref(), &name)).await?;
    Ok(success())
}
