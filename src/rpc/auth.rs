//! Admin session gate and the login endpoints.

use super::response::json_input;
use super::session::{Credentials, IssuedSession, Session};
use super::AppState;
use crate::{Error, Result};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use chrono::Utc;

/// Require `Authorization: Bearer <session token>` and attach the [`Session`].
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(&request)?;
    let session = state.sessions.verify(token, Utc::now())?;

    tracing::debug!(email = %session.email, path = %request.uri().path(), "authenticated request");
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<&str> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("Missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| Error::unauthorized("Invalid Authorization header encoding"))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::unauthorized("Authorization header must use Bearer scheme"))?
        .trim();

    if token.is_empty() {
        return Err(Error::unauthorized("Empty Bearer token"));
    }
    Ok(token)
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    input: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<IssuedSession>> {
    let credentials = json_input(input)?;
    let issued = state.sessions.login(&credentials)?;
    tracing::info!(email = %issued.session.email, expires_at = %issued.session.expires_at, "admin signed in");
    Ok(Json(issued))
}

/// `GET /api/auth/session`
pub async fn current_session(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}
