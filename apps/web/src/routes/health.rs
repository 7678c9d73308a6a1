use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::backend::{load_reference_data, ReferenceData};
use crate::errors::AppError;
use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "logbid-web"
    }))
}

/// GET /api/v1/catalog
/// Markets, companies and active certifications offered by the registration forms.
pub async fn catalog_handler(
    State(state): State<AppState>,
) -> Result<Json<ReferenceData>, AppError> {
    let reference = load_reference_data(state.backend.as_ref(), true).await?;
    Ok(Json(reference))
}
