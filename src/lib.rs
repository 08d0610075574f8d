mod backend;
mod core;

pub use crate::core::{Account, BankError, BankResult, Ledger, Transaction, User};
pub use crate::core::{account, error, ledger, transaction, user};
pub use crate::backend::{json_store, JsonStore, LedgerStore, StoreError};
