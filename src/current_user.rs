//! The endpoint for fetching the account behind a bearer token.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::Claims,
    models::UserProfile,
    state::AppState,
    stores::{TransactionStore, UserStore},
};

/// The response body for a current-user lookup.
#[derive(Serialize, Deserialize)]
pub struct CurrentUserResponse {
    /// The user the presented token belongs to.
    pub user: UserProfile,
}

/// A route handler for fetching the user a valid token was issued to.
///
/// The user row is re-resolved on every call, so a token whose account has
/// since disappeared gets a 404 rather than a stale snapshot.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user no longer exists.
pub async fn get_current_user<U, T>(
    State(state): State<AppState<U, T>>,
    claims: Claims,
) -> Result<Json<CurrentUserResponse>, Error>
where
    U: UserStore + Clone + Send + Sync,
    T: TransactionStore + Clone + Send + Sync,
{
    let user = state.user_store.get(claims.user_id)?;

    Ok(Json(CurrentUserResponse {
        user: user.profile(),
    }))
}

#[cfg(test)]
mod current_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        AppState,
        auth::LogInResponse,
        build_router,
        db::initialize,
        endpoints,
        stores::{SQLiteTransactionStore, SQLiteUserStore},
    };

    use super::CurrentUserResponse;

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&connection).expect("Could not initialize database.");
        let connection = Arc::new(Mutex::new(connection));

        let state = AppState::new(
            "foobar",
            SQLiteUserStore::new(connection.clone()),
            SQLiteTransactionStore::new(connection),
        );

        TestServer::new(build_router(state))
    }

    async fn register_and_log_in(server: &TestServer, username: &str) -> String {
        server
            .post(endpoints::REGISTER)
            .json(&json!({ "username": username, "password": "p1" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server
            .post(endpoints::LOG_IN)
            .json(&json!({ "username": username, "password": "p1" }))
            .await;

        response.assert_status_ok();
        response.json::<LogInResponse>().access_token
    }

    #[tokio::test]
    async fn get_current_user_succeeds_with_valid_token() {
        let server = get_test_server();
        let token = register_and_log_in(&server, "alice").await;

        let response = server
            .get(endpoints::USER)
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();

        let body = response.json::<CurrentUserResponse>();
        assert_eq!(body.user.username, "alice");
    }

    #[tokio::test]
    async fn get_current_user_fails_with_missing_header() {
        let server = get_test_server();

        server
            .get(endpoints::USER)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_current_user_fails_with_garbage_token() {
        let server = get_test_server();

        server
            .get(endpoints::USER)
            .authorization_bearer("not.a.token")
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn get_current_user_fails_when_user_was_deleted() {
        let connection = Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&connection).expect("Could not initialize database.");
        let connection = Arc::new(Mutex::new(connection));

        let state = AppState::new(
            "foobar",
            SQLiteUserStore::new(connection.clone()),
            SQLiteTransactionStore::new(connection.clone()),
        );

        let server = TestServer::new(build_router(state));
        let token = register_and_log_in(&server, "alice").await;

        connection
            .lock()
            .unwrap()
            .execute("DELETE FROM users WHERE username = 'alice'", ())
            .unwrap();

        server
            .get(endpoints::USER)
            .authorization_bearer(token)
            .await
            .assert_status_not_found();
    }
}
