//! This file defines the `Transaction` type, the core type of the ledger,
//! along with the record format that clients upload.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, models::UserID};

/// Alias for the integer type used for database primary keys.
pub type DatabaseID = i64;

/// Whether a transaction recorded money being spent or earned.
///
/// Stored and serialized as an integer: 0 for expense, 1 for income, the
/// encoding the mobile client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    /// Money was spent.
    Expense,
    /// Money was earned.
    Income,
}

impl From<TransactionKind> for i64 {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Expense => 0,
            TransactionKind::Income => 1,
        }
    }
}

impl TryFrom<i64> for TransactionKind {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TransactionKind::Expense),
            1 => Ok(TransactionKind::Income),
            other => Err(Error::InvalidTransactionKind(other)),
        }
    }
}

impl Serialize for TransactionKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(i64::from(*self))
    }
}

impl<'de> Deserialize<'de> for TransactionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        TransactionKind::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(*self)))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_i64()?;
        TransactionKind::try_from(raw).map_err(|_| FromSqlError::OutOfRange(raw))
    }
}

/// A financial ledger entry: an event where money was either spent or earned.
///
/// Rows are only ever created or updated through
/// [TransactionStore::upsert_batch](crate::stores::TransactionStore::upsert_batch);
/// clients identify their records with `server_id`, so every field a client
/// may omit is optional here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction's ID in the application database. Assigned at insert
    /// time and never changed.
    pub id: DatabaseID,
    /// The ID of the user that owns this transaction.
    pub user_id: UserID,
    /// The id the client chose for this record, used to match repeated
    /// uploads to the same row. Unique per user.
    pub server_id: Option<i64>,
    /// The amount of money spent or earned, in currency units with two
    /// decimal places.
    pub amount: Option<f64>,
    /// Whether the transaction was an expense or income.
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    /// A client-defined category. Opaque to the server.
    pub category_id: Option<DatabaseID>,
    /// When the transaction happened, as the client formatted it. Not
    /// validated by the server.
    pub date: Option<String>,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// When the row was first inserted.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the row was last inserted or updated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A transaction record as uploaded by a client.
///
/// Every field is optional. On insert, missing fields are stored as NULL;
/// on update, missing fields keep the stored value (a partial update).
/// `null` and an omitted field are treated the same, which is what the
/// sync client sends.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionRecord {
    /// The client-chosen id used to match this record to an existing row.
    /// Records without one are always inserted as new rows.
    #[serde(default)]
    pub server_id: Option<i64>,
    /// The amount of money spent or earned.
    #[serde(default)]
    pub amount: Option<f64>,
    /// Whether the transaction was an expense or income.
    #[serde(default, rename = "type")]
    pub kind: Option<TransactionKind>,
    /// A client-defined category.
    #[serde(default)]
    pub category_id: Option<DatabaseID>,
    /// When the transaction happened.
    #[serde(default)]
    pub date: Option<String>,
    /// A text description of what the transaction was for.
    #[serde(default)]
    pub description: Option<String>,
}
