//! Product resource handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};

use super::JsonBody;
use crate::error::{AppError, Result};
use crate::models::{Caller, ProductDetail, ProductSummary};
use crate::services::UpdateMode;
use crate::services::access::ProductAction;
use crate::services::catalog::require;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products/", get(list).post(create))
        .route(
            "/products/{sku}/",
            get(retrieve).put(replace).patch(update).delete(destroy),
        )
}

async fn list(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<ProductSummary>>> {
    Ok(Json(state.catalog().list(&caller).await?))
}

async fn retrieve(
    State(state): State<AppState>,
    caller: Caller,
    Path(sku): Path<String>,
) -> Result<Json<ProductDetail>> {
    Ok(Json(state.catalog().retrieve(&caller, &sku).await?))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<(StatusCode, Json<ProductDetail>)> {
    require(&caller, ProductAction::Create)?;
    let JsonBody(payload) = body?;
    let product = state.catalog().create(&caller, &payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn replace(
    State(state): State<AppState>,
    caller: Caller,
    Path(sku): Path<String>,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<Json<ProductDetail>> {
    require(&caller, ProductAction::Update)?;
    let JsonBody(payload) = body?;
    let product = state
        .catalog()
        .update(&caller, &sku, &payload, UpdateMode::Full)
        .await?;
    Ok(Json(product))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(sku): Path<String>,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<Json<ProductDetail>> {
    require(&caller, ProductAction::Update)?;
    let JsonBody(payload) = body?;
    let product = state
        .catalog()
        .update(&caller, &sku, &payload, UpdateMode::Partial)
        .await?;
    Ok(Json(product))
}

async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    Path(sku): Path<String>,
) -> Result<StatusCode> {
    state.catalog().delete(&caller, &sku).await?;
    Ok(StatusCode::NO_CONTENT)
}
