//! The endpoint that returns the full ledger for the authenticated user.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::Claims,
    models::Transaction,
    state::AppState,
    stores::{TransactionStore, UserStore},
};

/// The response body for a transaction download.
#[derive(Serialize, Deserialize)]
pub struct TransactionsResponse {
    /// A human readable summary of the outcome.
    pub message: String,
    /// Every transaction owned by the caller, in no particular order.
    pub transactions: Vec<Transaction>,
}

/// A route handler for downloading all of the caller's transactions.
///
/// No pagination or ordering is applied; clients must not rely on the order
/// of the returned records.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user behind the token no longer exists,
/// or [Error::SqlError] if the query failed, in which case no partial
/// result is returned.
pub async fn download_transactions<U, T>(
    State(state): State<AppState<U, T>>,
    claims: Claims,
) -> Result<Json<TransactionsResponse>, Error>
where
    U: UserStore + Clone + Send + Sync,
    T: TransactionStore + Clone + Send + Sync,
{
    let user = state.user_store.get(claims.user_id)?;

    let transactions = state.transaction_store.get_by_user(user.id)?;

    Ok(Json(TransactionsResponse {
        message: format!("fetched {} transactions", transactions.len()),
        transactions,
    }))
}
