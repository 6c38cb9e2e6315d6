//! Read-only JSON endpoints: health, tool catalog and model list.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::error;

use quranlens_core::provider::ToolDefinition;

use crate::{ErrorResponse, SharedState};

/// `{"success": true, "data": …}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { success: true, data })
    }
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub(crate) async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /api/tools`: the catalog the agent advertises to the model.
pub(crate) async fn tools_handler(
    State(state): State<SharedState>,
) -> Json<DataResponse<Vec<ToolDefinition>>> {
    DataResponse::ok(state.tools.definitions())
}

/// `GET /api/models`: models offered by the completion provider.
pub(crate) async fn models_handler(
    State(state): State<SharedState>,
) -> Result<Json<DataResponse<Vec<String>>>, (StatusCode, Json<ErrorResponse>)> {
    match state.provider.list_models().await {
        Ok(models) => Ok(DataResponse::ok(models)),
        Err(e) => {
            error!(provider = %state.provider.name(), error = %e, "Failed to fetch models");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            ))
        }
    }
}
