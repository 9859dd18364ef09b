use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use log::info;

use super::{blocking, AppState};
use crate::error::{AuthError, ServiceError};

/// Rejects requests without a valid bearer token and attaches the caller's
/// [`AuthContext`](crate::models::AuthContext) to the request extensions.
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let presented = match request.headers().get(AUTHORIZATION) {
        None => String::new(),
        Some(value) => value
            .to_str()
            .map_err(|_| AuthError::InvalidCredential)?
            .to_string(),
    };

    let tokens = state.tokens.clone();
    let ctx = blocking(move || tokens.validate(&presented)).await?;
    request.extensions_mut().insert(ctx);

    Ok(next.run(request).await)
}

/// The route template a request matched, e.g. `/patient/search/:id`.
///
/// Raw paths carry national and passport IDs and are never logged.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "<unmatched>".to_string())
}

pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let route = route_label(&request);
    let started = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} -> {} in {:?}",
        method,
        route,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}
