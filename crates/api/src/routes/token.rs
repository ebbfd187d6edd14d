//! API token exchange.

use axum::{Json, Router, extract::State, routing::post};
use serde::Serialize;

use super::JsonBody;
use crate::error::Result;
use crate::models::Credentials;
use crate::services::auth::obtain_token;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/token/", post(token))
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

async fn token(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody,
) -> Result<Json<TokenResponse>> {
    let credentials = Credentials::from_payload(&payload)?;
    let token = obtain_token(state.users(), &credentials).await?;
    Ok(Json(TokenResponse { token }))
}
