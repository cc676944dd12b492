pub mod transaction;

pub use transaction::{Country, EntityRef, Transaction, TransactionStatus, INITIATING_MESSAGE};
