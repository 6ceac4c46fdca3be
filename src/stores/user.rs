//! Defines the user store trait and an implementation for the SQLite backend.
use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row};

use crate::{
    Error,
    db::{CreateTable, MapRow},
    models::{PasswordHash, User, UserID},
};

/// Handles the creation and retrieval of User objects.
pub trait UserStore {
    /// Create a new user.
    ///
    /// Returns [Error::DuplicateUsername] if `username` is already taken.
    fn create(&mut self, username: &str, password_hash: PasswordHash) -> Result<User, Error>;

    /// Get a user by their ID.
    ///
    /// Returns [Error::NotFound] if no user with the given ID exists.
    fn get(&self, id: UserID) -> Result<User, Error>;

    /// Get a user by their username.
    ///
    /// Returns [Error::NotFound] if no user with the given username exists.
    fn get_by_username(&self, username: &str) -> Result<User, Error>;
}

/// Stores users in a SQLite database.
#[derive(Debug, Clone)]
pub struct SQLiteUserStore {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteUserStore {
    /// Create a new user store.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl UserStore for SQLiteUserStore {
    /// Create and insert a new user into the database.
    ///
    /// There is no preliminary existence check. The INSERT runs
    /// unconditionally and the UNIQUE constraint on `username` is the single
    /// source of truth for duplicates.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is already acquired by the same thread or is poisoned.
    ///
    /// # Errors
    ///
    /// Returns [Error::DuplicateUsername] if `username` is already taken, or
    /// [Error::SqlError] if an SQL related error occurred.
    fn create(&mut self, username: &str, password_hash: PasswordHash) -> Result<User, Error> {
        let connection = self.connection.lock().unwrap();

        connection.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)",
            (username, password_hash.to_string()),
        )?;

        let id = UserID::new(connection.last_insert_rowid());

        Ok(User::new(id, username.to_owned(), password_hash))
    }

    /// Get the user from the database that has the specified `id`, or return [Error::NotFound] if such user does not exist.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is already acquired by the same thread or is poisoned.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no user with the specified ID or [Error::SqlError] if there are SQL related errors.
    fn get(&self, id: UserID) -> Result<User, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare("SELECT id, username, password FROM users WHERE id = :id")?
            .query_row(&[(":id", &id.as_i64())], SQLiteUserStore::map_row)
            .map_err(|e| e.into())
    }

    /// Get the user from the database that has the specified `username`, or return [Error::NotFound] if such user does not exist.
    ///
    /// # Panics
    ///
    /// Panics if the database lock is already acquired by the same thread or is poisoned.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if there is no user with the specified username or [Error::SqlError] if there are SQL related errors.
    fn get_by_username(&self, username: &str) -> Result<User, Error> {
        self.connection
            .lock()
            .unwrap()
            .prepare("SELECT id, username, password FROM users WHERE username = :username")?
            .query_row(&[(":username", &username)], SQLiteUserStore::map_row)
            .map_err(|e| e.into())
    }
}

impl CreateTable for SQLiteUserStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY,
                    username TEXT UNIQUE NOT NULL,
                    password TEXT NOT NULL
                    )",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for SQLiteUserStore {
    type ReturnType = User;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        let raw_id = row.get(offset)?;
        let username: String = row.get(offset + 1)?;
        let raw_password_hash: String = row.get(offset + 2)?;

        let id = UserID::new(raw_id);
        let password_hash = PasswordHash::new_unchecked(&raw_password_hash);

        Ok(User::new(id, username, password_hash))
    }
}
