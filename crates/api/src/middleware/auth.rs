//! Token authentication extractor.
//!
//! Requests authenticate with `Authorization: Token <key>`. A missing header
//! or another scheme leaves the caller anonymous; a malformed header or an
//! unknown key is rejected with 401.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::{Caller, CurrentUser};
use crate::state::AppState;

const SCHEME: &str = "token";

const NO_CREDENTIALS: &str = "Invalid token header. No credentials provided.";
const HAS_SPACES: &str = "Invalid token header. Token string should not contain spaces.";
const BAD_CHARACTERS: &str =
    "Invalid token header. Token string should not contain invalid characters.";
const INVALID_TOKEN: &str = "Invalid token.";

/// Extract the token key from an `Authorization` header value.
///
/// `Ok(None)` means the header does not use the token scheme.
fn parse_token_header(value: &[u8]) -> Result<Option<&str>, &'static str> {
    let mut parts = value
        .split(u8::is_ascii_whitespace)
        .filter(|part| !part.is_empty());

    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(SCHEME.as_bytes()) => {}
        _ => return Ok(None),
    }
    let key = parts.next().ok_or(NO_CREDENTIALS)?;
    if parts.next().is_some() {
        return Err(HAS_SPACES);
    }
    std::str::from_utf8(key).map(Some).map_err(|_| BAD_CHARACTERS)
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self::Anonymous);
        };
        let key = match parse_token_header(header.as_bytes()) {
            Ok(Some(key)) => key,
            Ok(None) => return Ok(Self::Anonymous),
            Err(message) => return Err(AppError::Unauthorized(message.to_owned())),
        };

        let user = state
            .users()
            .get_by_token(key)
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_owned()))?;

        set_sentry_user(&user.id, &user.username);
        Ok(Self::User(CurrentUser::from(&user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_schemes_are_anonymous() {
        assert_eq!(parse_token_header(b"Bearer abc"), Ok(None));
        assert_eq!(parse_token_header(b""), Ok(None));
    }

    #[test]
    fn test_token_scheme_is_case_insensitive() {
        assert_eq!(parse_token_header(b"Token abc123"), Ok(Some("abc123")));
        assert_eq!(parse_token_header(b"token  abc123 "), Ok(Some("abc123")));
    }

    #[test]
    fn test_malformed_token_headers() {
        assert_eq!(parse_token_header(b"Token"), Err(NO_CREDENTIALS));
        assert_eq!(parse_token_header(b"Token a b"), Err(HAS_SPACES));
        assert_eq!(parse_token_header(b"Token \xff\xfe"), Err(BAD_CHARACTERS));
    }
}
