//! Defines the domain types stored and served by the application.

mod password;
mod transaction;
mod user;

pub use password::PasswordHash;
pub use transaction::{DatabaseID, Transaction, TransactionKind, TransactionRecord};
pub use user::{User, UserID, UserProfile};
