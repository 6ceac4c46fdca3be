//! This file defines the `User` type and the snapshot of it that is safe to
//! send to clients.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::models::PasswordHash;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
///
/// Holds the password hash, so it must never be serialized into a response.
/// Use [User::profile] for the client-facing representation.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's unique login name.
    pub username: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

impl User {
    /// Create a new user.
    ///
    /// The caller should ensure that `id` is unique.
    pub fn new(id: UserID, username: String, password_hash: PasswordHash) -> Self {
        Self {
            id,
            username,
            password_hash,
        }
    }

    /// The client-facing snapshot of this user (no password hash).
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// The subset of a [User] that is safe to send to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The user's unique login name.
    pub username: String,
}
