//! The endpoint for registering a new user account.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    models::{PasswordHash, UserProfile},
    state::AppState,
    stores::{TransactionStore, UserStore},
};

/// The data a client submits to create an account.
#[derive(Deserialize)]
pub struct RegisterData {
    /// The login name for the new account.
    pub username: String,
    /// The password for the new account.
    pub password: String,
}

/// The response body for a successful registration.
#[derive(Serialize, Deserialize)]
pub struct RegisterResponse {
    /// A human readable summary of the outcome.
    pub message: String,
    /// The newly created user.
    pub user: UserProfile,
}

/// A route handler for creating a new user.
///
/// The username is not checked for availability up front; the INSERT runs
/// and a uniqueness violation is reported as [Error::DuplicateUsername].
///
/// # Errors
///
/// This function will return an error if:
/// - the username or password is blank,
/// - the username is already taken,
/// - the password could not be hashed.
pub async fn register_user<U, T>(
    State(mut state): State<AppState<U, T>>,
    Json(data): Json<RegisterData>,
) -> Result<Response, Error>
where
    U: UserStore + Clone + Send + Sync,
    T: TransactionStore + Clone + Send + Sync,
{
    if data.username.is_empty() || data.password.is_empty() {
        return Err(Error::MissingCredentials);
    }

    let password_hash = PasswordHash::new(&data.password, PasswordHash::DEFAULT_COST)?;

    let user = state.user_store.create(&data.username, password_hash)?;

    tracing::info!("registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "registered".to_owned(),
            user: user.profile(),
        }),
    )
        .into_response())
}
