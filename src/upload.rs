//! The endpoint that accepts a batch of transaction records from a client
//! and merges them into the user's ledger.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::Claims,
    models::TransactionRecord,
    state::AppState,
    stores::{TransactionStore, UserStore},
};

/// The request body for a transaction upload.
#[derive(Deserialize)]
pub struct UploadRequest {
    /// The batch of records to merge, in the order the client produced them.
    ///
    /// Elements are decoded individually so that one malformed record does
    /// not reject the whole batch.
    pub transactions: Vec<serde_json::Value>,
}

/// The response body for a transaction upload.
#[derive(Serialize, Deserialize)]
pub struct UploadResponse {
    /// A human readable summary of the outcome.
    pub message: String,
    /// How many records were merged and committed.
    pub uploaded_count: usize,
}

/// A route handler for uploading a batch of transactions.
///
/// Each batch element is decoded into a [TransactionRecord] on its own;
/// elements that do not decode (e.g. a string where a number belongs) are
/// logged and skipped. The decoded records are then merged in one database
/// transaction by
/// [TransactionStore::upsert_batch], which applies the same skip-and-continue
/// policy to records that fail to stage. `uploaded_count` only ever reports
/// records that were committed.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user behind the token no longer exists,
/// or [Error::SqlError] if the batch could not be committed (in which case
/// none of its records were stored).
pub async fn upload_transactions<U, T>(
    State(mut state): State<AppState<U, T>>,
    claims: Claims,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, Error>
where
    U: UserStore + Clone + Send + Sync,
    T: TransactionStore + Clone + Send + Sync,
{
    let user = state.user_store.get(claims.user_id)?;

    let records: Vec<TransactionRecord> = request
        .transactions
        .into_iter()
        .filter_map(
            |value| match serde_json::from_value::<TransactionRecord>(value) {
                Ok(record) => Some(record),
                Err(error) => {
                    tracing::warn!(
                        "skipping malformed transaction record for user {}: {}",
                        user.id,
                        error
                    );
                    None
                }
            },
        )
        .collect();

    let uploaded_count = state.transaction_store.upsert_batch(user.id, records)?;

    Ok(Json(UploadResponse {
        message: format!("uploaded {uploaded_count} transactions"),
        uploaded_count,
    }))
}
