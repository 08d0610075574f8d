use rust_decimal::Decimal;
use thiserror::Error;

pub type BankResult<T> = Result<T, BankError>;

/// Domain errors for the ledger core. All of these are recoverable:
/// an operation that returns one has left no partial state behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BankError {
    /// A money-movement operation was given a zero or negative amount.
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// A withdrawal or transfer asked for more than the source holds.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    /// Source and destination of a transfer are the same account.
    #[error("cannot transfer from account {0} to itself")]
    SelfTransfer(String),

    /// Occurs when referencing an account number not present on the ledger.
    #[error("no such account: {0}")]
    AccountNotFound(String),

    /// Occurs when registering with a phone number another user already has.
    #[error("phone number already registered: {0}")]
    DuplicatePhone(String),

    /// Occurs when looking up a user (by phone or id) that does not exist.
    #[error("user not found: {0}")]
    UserNotFound(String),

    /// Password did not match the stored hash.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Too many failed logins; the user is locked out.
    #[error("account locked, try again in {remaining_secs} seconds")]
    AccountLocked { remaining_secs: i64 },
}
