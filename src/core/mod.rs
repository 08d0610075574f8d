pub mod account;
pub mod error;
pub mod ledger;
pub mod transaction;
pub mod user;

pub use account::Account;
pub use error::{BankError, BankResult};
pub use ledger::Ledger;
pub use transaction::Transaction;
pub use user::User;
