//! HTTP surface.
//!
//! Handlers stay thin: they parse the request, hand the work to the services on
//! tokio's blocking pool (SQLite and bcrypt are both blocking), and map
//! [`ServiceError`] to a status code and an `{"error": ...}` body.

mod response;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use time::Duration;

use crate::db::CredentialStore;
use crate::error::{ServiceError, ServiceResult};
use crate::password::PasswordVerifier;
use crate::token::TokenService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub passwords: Arc<dyn PasswordVerifier>,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        passwords: Arc<dyn PasswordVerifier>,
        token_ttl: Duration,
    ) -> Self {
        let tokens = TokenService::new(store.clone(), token_ttl);
        Self {
            store,
            passwords,
            tokens,
        }
    }
}

/// Runs blocking service work off the async executor.
pub(crate) async fn blocking<F, T>(work: F) -> ServiceResult<T>
where
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(ServiceError::internal("Request processing failed"))?
}

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/patient/search", get(handlers::search_patients))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_token,
        ));

    Router::new()
        .route("/staff/create", post(handlers::create_staff))
        .route("/staff/login", post(handlers::login))
        .route("/patient/search/:id", get(handlers::get_patient))
        .merge(protected)
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .with_state(state)
}
