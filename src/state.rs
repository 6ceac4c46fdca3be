//! Implements a struct that holds the state of the REST server.

use std::marker::{Send, Sync};

use axum::extract::FromRef;
use jsonwebtoken::{DecodingKey, EncodingKey};

use crate::stores::{TransactionStore, UserStore};

/// The keys used for signing and validating bearer tokens.
#[derive(Clone)]
pub struct JwtKeys {
    /// The key for signing new tokens.
    pub encoding_key: EncodingKey,
    /// The key for validating presented tokens.
    pub decoding_key: DecodingKey,
}

impl JwtKeys {
    /// Derive the signing and validation key pair from a shared `secret`.
    pub fn from_secret(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
        }
    }
}

/// The state of the REST server.
#[derive(Clone)]
pub struct AppState<U, T>
where
    U: UserStore + Send + Sync,
    T: TransactionStore + Send + Sync,
{
    /// The keys used for signing and validating bearer tokens.
    pub jwt_keys: JwtKeys,
    /// The store for managing [users](crate::models::User).
    pub user_store: U,
    /// The store for managing user [transactions](crate::models::Transaction).
    pub transaction_store: T,
}

impl<U, T> AppState<U, T>
where
    U: UserStore + Send + Sync,
    T: TransactionStore + Send + Sync,
{
    /// Create a new [AppState].
    pub fn new(jwt_secret: &str, user_store: U, transaction_store: T) -> Self {
        Self {
            jwt_keys: JwtKeys::from_secret(jwt_secret),
            user_store,
            transaction_store,
        }
    }
}

/// The state needed to validate bearer tokens.
#[derive(Clone)]
pub struct AuthState {
    /// The key for validating presented tokens.
    pub decoding_key: DecodingKey,
}

// this impl tells the `Claims` extractor how to access the decoding key from our state
impl<U, T> FromRef<AppState<U, T>> for AuthState
where
    U: UserStore + Clone + Send + Sync,
    T: TransactionStore + Clone + Send + Sync,
{
    fn from_ref(state: &AppState<U, T>) -> Self {
        Self {
            decoding_key: state.jwt_keys.decoding_key.clone(),
        }
    }
}
