//! This module defines the data structures, response handlers and functions
//! for authenticating a user and validating bearer tokens.

use axum::{
    Json,
    body::Body,
    extract::{FromRef, FromRequestParts, State},
    http::{Response, StatusCode, request::Parts},
    response::IntoResponse,
    RequestPartsExt,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    models::{UserID, UserProfile},
    state::{AppState, AuthState},
    stores::{TransactionStore, UserStore},
};

/// How long an issued token stays valid.
const TOKEN_DURATION_MINUTES: i64 = 15;

/// The contents of a bearer token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The expiry time of the token.
    pub exp: usize,
    /// The time the token was issued.
    pub iat: usize,
    /// The ID of the user the token was issued to.
    pub user_id: UserID,
}

impl<S> FromRequestParts<S> for Claims
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::InvalidToken)?;

        let auth_state = AuthState::from_ref(state);

        let token_data = decode_jwt(bearer.token(), &auth_state.decoding_key)?;

        Ok(token_data.claims)
    }
}

/// The credentials a client submits to log in.
#[derive(Deserialize)]
pub struct Credentials {
    /// Username entered during log-in.
    pub username: String,
    /// Password entered during log-in.
    pub password: String,
}

/// The errors that may occur while authenticating a request.
#[derive(Debug)]
pub enum AuthError {
    /// The username or password was wrong. The response does not say which.
    WrongCredentials,
    /// The username or password was blank.
    MissingCredentials,
    /// A token could not be signed.
    TokenCreation,
    /// The bearer token was missing, malformed, expired or forged.
    InvalidToken,
    /// An unexpected error occurred; the details are in the server log.
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response<Body> {
        let (status, message) = match self {
            AuthError::WrongCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid username or password")
            }
            AuthError::MissingCredentials => {
                (StatusCode::BAD_REQUEST, "username and password are required")
            }
            AuthError::TokenCreation => {
                (StatusCode::INTERNAL_SERVER_ERROR, "token creation error")
            }
            AuthError::InvalidToken => (StatusCode::BAD_REQUEST, "invalid token"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// The response body for a successful log-in.
#[derive(Serialize, Deserialize)]
pub struct LogInResponse {
    /// A human readable summary of the outcome.
    pub message: String,
    /// The bearer token to present on authenticated routes.
    pub access_token: String,
    /// The logged-in user.
    pub user: UserProfile,
}

/// Handler for log-in requests.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The username or password is blank.
/// - The username does not belong to a registered user.
/// - The password is not correct.
/// - An internal error occurred when verifying the password.
///
/// The response for a wrong password is identical to the response for an
/// unknown username.
pub async fn log_in<U, T>(
    State(state): State<AppState<U, T>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LogInResponse>, AuthError>
where
    U: UserStore + Clone + Send + Sync,
    T: TransactionStore + Clone + Send + Sync,
{
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let user = state
        .user_store
        .get_by_username(&credentials.username)
        .map_err(|e| match e {
            Error::NotFound => AuthError::WrongCredentials,
            _ => {
                tracing::error!("Error matching user: {e:?}");
                AuthError::InternalError
            }
        })?;

    let password_is_correct = user
        .password_hash
        .verify(&credentials.password)
        .map_err(|e| {
            tracing::error!("Error verifying password: {}", e);
            AuthError::InternalError
        })?;

    if !password_is_correct {
        return Err(AuthError::WrongCredentials);
    }

    let access_token = encode_jwt(user.id, &state.jwt_keys.encoding_key)?;

    Ok(Json(LogInResponse {
        message: "logged in".to_owned(),
        access_token,
        user: user.profile(),
    }))
}

fn encode_jwt(user_id: UserID, encoding_key: &EncodingKey) -> Result<String, AuthError> {
    let now = OffsetDateTime::now_utc();
    let exp = (now + Duration::minutes(TOKEN_DURATION_MINUTES)).unix_timestamp() as usize;
    let iat = now.unix_timestamp() as usize;
    let claims = Claims { exp, iat, user_id };

    encode(&Header::default(), &claims, encoding_key).map_err(|e| {
        tracing::error!("Error signing token: {}", e);
        AuthError::TokenCreation
    })
}

fn decode_jwt(token: &str, decoding_key: &DecodingKey) -> Result<TokenData<Claims>, AuthError> {
    decode(token, decoding_key, &Validation::default()).map_err(|_| AuthError::InvalidToken)
}
