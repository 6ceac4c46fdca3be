//! Contains traits and implementations for objects that store the domain [models](crate::models).

mod transaction;
mod user;

pub use transaction::{SQLiteTransactionStore, TransactionStore};
pub use user::{SQLiteUserStore, UserStore};
