//! Defines the transaction store trait and an implementation for the SQLite
//! backend, including the upsert logic that reconciles uploaded batches
//! against the rows already in the database.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, OptionalExtension, Row, Transaction as SqlTransaction};
use time::OffsetDateTime;

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{DatabaseID, Transaction, TransactionRecord, UserID},
};

/// Handles the creation and retrieval of transactions.
pub trait TransactionStore {
    /// Merge a batch of client records into the user's transactions.
    ///
    /// Each record either updates the row that shares its `server_id` or
    /// inserts a new row. The whole batch is staged inside one database
    /// transaction: a record that fails to stage is skipped and the batch
    /// continues, but a failure to commit rolls back every staged change.
    ///
    /// Returns the number of records staged and committed.
    fn upsert_batch(
        &mut self,
        user_id: UserID,
        records: Vec<TransactionRecord>,
    ) -> Result<usize, Error>;

    /// Retrieve all transactions owned by `user_id`, in no particular order.
    fn get_by_user(&self, user_id: UserID) -> Result<Vec<Transaction>, Error>;
}

/// Stores transactions in a SQLite database.
///
/// Note that because a transaction row references the
/// [User](crate::models::User) that owns it, the user table must be set up
/// in the database.
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteTransactionStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl TransactionStore for SQLiteTransactionStore {
    /// Merge a batch of client records into the user's transactions.
    ///
    /// Records are processed in input order. A record with a `server_id`
    /// that matches one of the user's existing rows updates that row in
    /// place, keeping the stored value for every field the record omits.
    /// Anything else becomes a new row owned by `user_id`. `updated_at` is
    /// refreshed on every write; `created_at` only on insert. The owner of
    /// an existing row is never changed.
    ///
    /// A record that fails to stage (e.g. a constraint violation) is logged
    /// and skipped without aborting the batch. All staged rows become
    /// durable in a single commit; if that commit fails, none of them do.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is already acquired by the same thread or is poisoned.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the transaction could not be opened
    /// or committed.
    fn upsert_batch(
        &mut self,
        user_id: UserID,
        records: Vec<TransactionRecord>,
    ) -> Result<usize, Error> {
        let connection = self.connection.lock().unwrap();

        let tx = connection.unchecked_transaction()?;
        let now = OffsetDateTime::now_utc();
        let mut accepted_count = 0;

        for record in records {
            match stage_record(&tx, user_id, &record, now) {
                Ok(()) => accepted_count += 1,
                Err(error) => {
                    tracing::warn!(
                        "skipping transaction record {:?} for user {}: {}",
                        record.server_id,
                        user_id,
                        error
                    );
                }
            }
        }

        tx.commit()?;

        tracing::debug!("committed {} transactions for user {}", accepted_count, user_id);

        Ok(accepted_count)
    }

    /// Retrieve the transactions in the database that belong to `user_id`.
    ///
    /// An empty vector is returned if the specified user has no transactions.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is already acquired by the same thread or is poisoned.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if there is an SQL error.
    fn get_by_user(&self, user_id: UserID) -> Result<Vec<Transaction>, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare(
                "SELECT id, user_id, server_id, amount, kind, category_id, date, description,
                        created_at, updated_at
                 FROM transactions WHERE user_id = :user_id",
            )?
            .query_map(&[(":user_id", &user_id.as_i64())], Self::map_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::SqlError))
            .collect()
    }
}

/// Stage one client record inside the open transaction `tx`.
///
/// Matching is scoped to the owner: the lookup key is `(user_id, server_id)`,
/// so a client can never touch another user's rows, and records without a
/// `server_id` have nothing to match against and always insert.
fn stage_record(
    tx: &SqlTransaction<'_>,
    user_id: UserID,
    record: &TransactionRecord,
    now: OffsetDateTime,
) -> Result<(), rusqlite::Error> {
    let existing_id: Option<DatabaseID> = match record.server_id {
        Some(server_id) => tx
            .prepare(
                "SELECT id FROM transactions WHERE user_id = :user_id AND server_id = :server_id",
            )?
            .query_row(
                &[(":user_id", &user_id.as_i64()), (":server_id", &server_id)],
                |row| row.get(0),
            )
            .optional()?,
        None => None,
    };

    match existing_id {
        Some(id) => {
            // Partial update: fields the client omitted keep their stored
            // value. The owner column is left untouched.
            tx.execute(
                "UPDATE transactions SET
                    amount = COALESCE(?1, amount),
                    kind = COALESCE(?2, kind),
                    category_id = COALESCE(?3, category_id),
                    date = COALESCE(?4, date),
                    description = COALESCE(?5, description),
                    updated_at = ?6
                 WHERE id = ?7",
                (
                    record.amount,
                    record.kind,
                    record.category_id,
                    record.date.as_deref(),
                    record.description.as_deref(),
                    now,
                    id,
                ),
            )?;
        }
        None => {
            tx.execute(
                "INSERT INTO transactions
                    (user_id, server_id, amount, kind, category_id, date, description,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                (
                    user_id.as_i64(),
                    record.server_id,
                    record.amount,
                    record.kind,
                    record.category_id,
                    record.date.as_deref(),
                    record.description.as_deref(),
                    now,
                    now,
                ),
            )?;
        }
    }

    Ok(())
}

impl CreateTable for SQLiteTransactionStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS transactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    server_id INTEGER,
                    amount REAL,
                    kind INTEGER,
                    category_id INTEGER,
                    date TEXT,
                    description TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES users(id) ON UPDATE CASCADE ON DELETE CASCADE,
                    UNIQUE(user_id, server_id)
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteTransactionStore {
    type ReturnType = Transaction;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Transaction {
            id: row.get(offset)?,
            user_id: UserID::new(row.get(offset + 1)?),
            server_id: row.get(offset + 2)?,
            amount: row.get(offset + 3)?,
            kind: row.get(offset + 4)?,
            category_id: row.get(offset + 5)?,
            date: row.get(offset + 6)?,
            description: row.get(offset + 7)?,
            created_at: row.get(offset + 8)?,
            updated_at: row.get(offset + 9)?,
        })
    }
}

#[cfg(test)]
mod transaction_store_tests {
    use std::{
        sync::{Arc, Mutex},
        thread::sleep,
        time::Duration,
    };

    use rusqlite::Connection;

    use crate::{
        db::initialize,
        models::{PasswordHash, TransactionKind, TransactionRecord, UserID},
        stores::{SQLiteUserStore, UserStore},
    };

    use super::{SQLiteTransactionStore, TransactionStore};

    fn get_store_with_users(usernames: &[&str]) -> (SQLiteTransactionStore, Vec<UserID>) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let connection = Arc::new(Mutex::new(connection));

        let mut user_store = SQLiteUserStore::new(connection.clone());
        let user_ids = usernames
            .iter()
            .map(|username| {
                user_store
                    .create(username, PasswordHash::new_unchecked("hunter2"))
                    .unwrap()
                    .id
            })
            .collect();

        (SQLiteTransactionStore::new(connection), user_ids)
    }

    fn record(server_id: i64, amount: f64) -> TransactionRecord {
        TransactionRecord {
            server_id: Some(server_id),
            amount: Some(amount),
            kind: Some(TransactionKind::Expense),
            category_id: Some(3),
            date: Some("2024-01-01".to_owned()),
            description: Some("groceries".to_owned()),
        }
    }

    #[test]
    fn upsert_inserts_new_records() {
        let (mut store, user_ids) = get_store_with_users(&["alice"]);

        let accepted = store
            .upsert_batch(
                user_ids[0],
                vec![record(1, 1.0), record(2, 2.0), record(3, 3.0)],
            )
            .unwrap();

        assert_eq!(accepted, 3);

        let transactions = store.get_by_user(user_ids[0]).unwrap();
        assert_eq!(transactions.len(), 3);
    }

    #[test]
    fn upsert_empty_batch_returns_zero() {
        let (mut store, user_ids) = get_store_with_users(&["alice"]);

        let accepted = store.upsert_batch(user_ids[0], vec![]).unwrap();

        assert_eq!(accepted, 0);
        assert!(store.get_by_user(user_ids[0]).unwrap().is_empty());
    }

    #[test]
    fn reupload_updates_existing_row_in_place() {
        let (mut store, user_ids) = get_store_with_users(&["alice"]);

        store
            .upsert_batch(user_ids[0], vec![record(100, 12.50)])
            .unwrap();
        // Make sure the second write lands at a measurably later time.
        sleep(Duration::from_millis(5));
        let accepted = store
            .upsert_batch(user_ids[0], vec![record(100, 15.00)])
            .unwrap();

        assert_eq!(accepted, 1);

        let transactions = store.get_by_user(user_ids[0]).unwrap();
        assert_eq!(transactions.len(), 1);

        let transaction = &transactions[0];
        assert_eq!(transaction.server_id, Some(100));
        assert_eq!(transaction.amount, Some(15.00));
        assert!(transaction.updated_at > transaction.created_at);
    }

    #[test]
    fn identical_reupload_is_idempotent() {
        let (mut store, user_ids) = get_store_with_users(&["alice"]);

        store
            .upsert_batch(user_ids[0], vec![record(100, 12.50)])
            .unwrap();
        store
            .upsert_batch(user_ids[0], vec![record(100, 12.50)])
            .unwrap();

        let transactions = store.get_by_user(user_ids[0]).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, Some(12.50));
    }

    #[test]
    fn update_keeps_fields_the_record_omits() {
        let (mut store, user_ids) = get_store_with_users(&["alice"]);

        store
            .upsert_batch(user_ids[0], vec![record(100, 12.50)])
            .unwrap();
        store
            .upsert_batch(
                user_ids[0],
                vec![TransactionRecord {
                    server_id: Some(100),
                    amount: Some(20.00),
                    ..Default::default()
                }],
            )
            .unwrap();

        let transactions = store.get_by_user(user_ids[0]).unwrap();
        let transaction = &transactions[0];

        assert_eq!(transaction.amount, Some(20.00));
        assert_eq!(transaction.kind, Some(TransactionKind::Expense));
        assert_eq!(transaction.category_id, Some(3));
        assert_eq!(transaction.date.as_deref(), Some("2024-01-01"));
        assert_eq!(transaction.description.as_deref(), Some("groceries"));
    }

    #[test]
    fn records_without_server_id_always_insert() {
        let (mut store, user_ids) = get_store_with_users(&["alice"]);

        let no_id_record = TransactionRecord {
            amount: Some(5.00),
            ..Default::default()
        };

        store
            .upsert_batch(user_ids[0], vec![no_id_record.clone()])
            .unwrap();
        store.upsert_batch(user_ids[0], vec![no_id_record]).unwrap();

        assert_eq!(store.get_by_user(user_ids[0]).unwrap().len(), 2);
    }

    #[test]
    fn same_server_id_for_different_users_does_not_collide() {
        let (mut store, user_ids) = get_store_with_users(&["alice", "bob"]);

        store
            .upsert_batch(user_ids[0], vec![record(100, 12.50)])
            .unwrap();
        store
            .upsert_batch(user_ids[1], vec![record(100, 99.00)])
            .unwrap();

        let alice_transactions = store.get_by_user(user_ids[0]).unwrap();
        let bob_transactions = store.get_by_user(user_ids[1]).unwrap();

        assert_eq!(alice_transactions.len(), 1);
        assert_eq!(bob_transactions.len(), 1);
        assert_eq!(alice_transactions[0].amount, Some(12.50));
        assert_eq!(bob_transactions[0].amount, Some(99.00));
        assert_eq!(alice_transactions[0].user_id, user_ids[0]);
        assert_eq!(bob_transactions[0].user_id, user_ids[1]);
    }

    #[test]
    fn staging_failure_skips_record_without_failing_batch() {
        let (mut store, user_ids) = get_store_with_users(&["alice"]);

        // A record owned by a user that does not exist violates the foreign
        // key constraint when staged. The batch must report zero accepted
        // records rather than an error, and the store must stay usable.
        let accepted = store
            .upsert_batch(UserID::new(999), vec![record(1, 1.0)])
            .unwrap();
        assert_eq!(accepted, 0);

        let accepted = store
            .upsert_batch(user_ids[0], vec![record(2, 2.0)])
            .unwrap();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn get_by_user_returns_empty_for_user_without_transactions() {
        let (store, user_ids) = get_store_with_users(&["alice"]);

        assert!(store.get_by_user(user_ids[0]).unwrap().is_empty());
    }

    #[test]
    fn get_by_user_only_returns_own_rows() {
        let (mut store, user_ids) = get_store_with_users(&["alice", "bob"]);

        store
            .upsert_batch(user_ids[0], vec![record(1, 1.0), record(2, 2.0)])
            .unwrap();
        store
            .upsert_batch(user_ids[1], vec![record(3, 3.0)])
            .unwrap();

        assert_eq!(store.get_by_user(user_ids[0]).unwrap().len(), 2);
        assert_eq!(store.get_by_user(user_ids[1]).unwrap().len(), 1);
    }
}
