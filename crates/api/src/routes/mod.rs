//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness probe
//! GET    /health/ready            - Readiness probe (checks storage)
//!
//! # Products (reads public, writes need ProductAdmin)
//! GET    /products/               - List products (sku, name)
//! POST   /products/               - Create product
//! GET    /products/{sku}/         - Product detail
//! PUT    /products/{sku}/         - Full update
//! PATCH  /products/{sku}/         - Partial update
//! DELETE /products/{sku}/         - Delete product
//!
//! # Users
//! POST   /users/                  - Register (UserAdmin)
//! GET    /users/{username}/       - Account detail (authenticated)
//! PATCH  /users/{username}/       - Update account (authenticated)
//! DELETE /users/{username}/       - Remove account (authenticated)
//!
//! # Auth
//! POST   /token/                  - Exchange credentials for an API token
//! ```

pub mod health;
pub mod products;
pub mod token;
pub mod users;

use axum::{
    Json, Router,
    extract::{FromRequest, Request, rejection::JsonRejection},
};

use crate::error::AppError;
use crate::models::Payload;
use crate::state::AppState;

/// Build the API router (without state).
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(products::routes())
        .merge(users::routes())
        .merge(token::routes())
}

/// JSON object body with rejections rendered as API errors.
///
/// Handlers that must check permissions before looking at the body take
/// `Result<JsonBody, AppError>` and unwrap it after the check.
#[derive(Debug)]
pub struct JsonBody(pub Payload);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Payload>::from_request(req, state).await {
            Ok(Json(payload)) => Ok(Self(payload)),
            Err(rejection) => Err(json_error(&rejection)),
        }
    }
}

fn json_error(rejection: &JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => AppError::UnsupportedMediaType(
            "Unsupported media type in request; expected application/json.".to_owned(),
        ),
        _ => AppError::BadRequest(format!("JSON parse error - {}", rejection.body_text())),
    }
}
