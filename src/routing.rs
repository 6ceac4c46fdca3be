//! Application router configuration.

use axum::{
    Json, Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;

use crate::{
    auth::log_in,
    current_user::get_current_user,
    download::download_transactions,
    endpoints,
    register_user::register_user,
    state::AppState,
    stores::{TransactionStore, UserStore},
    upload::upload_transactions,
};

/// Return a router with all the app's routes.
///
/// The register, login and health-check routes are unauthenticated; the
/// remaining routes extract and validate a bearer token before touching
/// the store.
pub fn build_router<U, T>(state: AppState<U, T>) -> Router
where
    U: UserStore + Clone + Send + Sync + 'static,
    T: TransactionStore + Clone + Send + Sync + 'static,
{
    Router::new()
        .route(endpoints::ROOT, get(get_health))
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(log_in))
        .route(endpoints::USER, get(get_current_user))
        .route(endpoints::UPLOAD_TRANSACTIONS, post(upload_transactions))
        .route(
            endpoints::DOWNLOAD_TRANSACTIONS,
            get(download_transactions),
        )
        .with_state(state)
}

/// The liveness check.
async fn get_health() -> Response {
    Json(json!({ "message": "ledgerbook backend is running" })).into_response()
}
