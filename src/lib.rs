//! Ledgerbook is a record-keeping backend for a personal finance app.
//!
//! Clients register an account, log in for a bearer token, and then
//! synchronize the transactions recorded on their device with the server:
//! uploads are reconciled against the existing rows by a client-chosen
//! id so that repeated uploads never create duplicates, and downloads
//! return the full ledger for the authenticated user.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod auth;
mod current_user;
mod db;
mod download;
mod endpoints;
mod logging;
mod models;
mod register_user;
mod routing;
mod state;
mod stores;
mod upload;

pub use auth::{AuthError, Claims, log_in};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use models::{PasswordHash, Transaction, TransactionKind, User, UserID, UserProfile};
pub use routing::build_router;
pub use state::AppState;
pub use stores::{SQLiteTransactionStore, SQLiteUserStore, TransactionStore, UserStore};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A blank username or password was submitted at registration or login.
    #[error("username and password are required")]
    MissingCredentials,

    /// The username chosen at registration already belongs to another user.
    #[error("the username is already taken")]
    DuplicateUsername,

    /// An integer that is not a valid transaction type was supplied.
    ///
    /// Valid types are 0 (expense) and 1 (income).
    #[error("{0} is not a valid transaction type")]
    InvalidTransactionKind(i64),

    /// The requested resource could not be found.
    ///
    /// For HTTP request handlers, this usually means the user referenced by
    /// a token no longer exists.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.contains("users.username") =>
            {
                Error::DuplicateUsername
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Error::MissingCredentials => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::DuplicateUsername => (StatusCode::CONFLICT, self.to_string()),
            Error::InvalidTransactionKind(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            Error::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            // Any errors that are not handled above are not intended to be
            // shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "an internal server error occurred".to_owned(),
                )
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn unique_username_violation_maps_to_duplicate_username() {
        let sql_error = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: 2067,
            },
            Some("UNIQUE constraint failed: users.username".to_owned()),
        );

        assert_eq!(Error::from(sql_error), Error::DuplicateUsername);
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }

    #[test]
    fn sql_error_responds_with_internal_server_error() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
