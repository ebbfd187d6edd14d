//! User resource handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use super::JsonBody;
use crate::error::{AppError, Result};
use crate::models::{Caller, UserView};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/users/", post(register)).route(
        "/users/{username}/",
        get(retrieve).patch(update).delete(destroy),
    )
}

async fn register(
    State(state): State<AppState>,
    caller: Caller,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<(StatusCode, Json<UserView>)> {
    if !caller.is_authenticated() {
        return Err(AppError::not_authenticated());
    }
    let JsonBody(payload) = body?;
    let user = state.accounts().register(&caller, &payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn retrieve(
    State(state): State<AppState>,
    caller: Caller,
    Path(username): Path<String>,
) -> Result<Json<UserView>> {
    Ok(Json(state.accounts().get(&caller, &username).await?))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path(username): Path<String>,
    body: std::result::Result<JsonBody, AppError>,
) -> Result<Json<UserView>> {
    if !caller.is_authenticated() {
        return Err(AppError::not_authenticated());
    }
    let JsonBody(payload) = body?;
    Ok(Json(
        state.accounts().update(&caller, &username, &payload).await?,
    ))
}

async fn destroy(
    State(state): State<AppState>,
    caller: Caller,
    Path(username): Path<String>,
) -> Result<StatusCode> {
    state.accounts().delete(&caller, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}
