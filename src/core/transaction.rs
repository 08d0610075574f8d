use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Amount = Decimal;
pub type AccountNumber = String;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    /// Both halves of a transfer carry this tag; which side a record
    /// represents follows from whether the owning account is the
    /// `from_account` or the `to_account`.
    Transfer,
}

/// One money movement. Created exactly once by an account operation,
/// appended to exactly one account's log, never mutated afterwards.
/// Fields stay private so the record really is immutable to callers.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Transaction {
    transaction_id: Uuid,
    #[serde(rename = "type")]
    kind: TransactionKind,
    amount: Amount,
    from_account: AccountNumber,
    to_account: Option<AccountNumber>,
    timestamp: DateTime<Utc>,
}

impl Transaction {
    pub(crate) fn new(
        kind: TransactionKind,
        amount: Amount,
        from_account: AccountNumber,
        to_account: Option<AccountNumber>,
    ) -> Transaction {
        Transaction {
            transaction_id: Uuid::new_v4(),
            kind,
            amount,
            from_account,
            to_account,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn deposit(amount: Amount, account: AccountNumber) -> Transaction {
        Transaction::new(TransactionKind::Deposit, amount, account, None)
    }

    pub(crate) fn withdraw(amount: Amount, account: AccountNumber) -> Transaction {
        Transaction::new(TransactionKind::Withdraw, amount, account, None)
    }

    pub(crate) fn transfer(
        amount: Amount,
        from: AccountNumber,
        to: AccountNumber,
    ) -> Transaction {
        Transaction::new(TransactionKind::Transfer, amount, from, Some(to))
    }

    pub fn transaction_id(&self) -> Uuid {
        self.transaction_id
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn from_account(&self) -> &str {
        &self.from_account
    }

    pub fn to_account(&self) -> Option<&str> {
        self.to_account.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    // Timestamps come from the clock, so ordering tests inject their own.
    #[cfg(test)]
    pub(crate) fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    /// Signed effect of this record on the given account's balance:
    /// positive for money coming in, negative for money going out,
    /// zero if the record does not involve the account at all.
    pub fn signed_amount(&self, account_number: &str) -> Amount {
        match self.kind {
            TransactionKind::Deposit if self.from_account == account_number => self.amount,
            TransactionKind::Withdraw if self.from_account == account_number => -self.amount,
            TransactionKind::Transfer if self.from_account == account_number => -self.amount,
            TransactionKind::Transfer if self.to_account.as_deref() == Some(account_number) => {
                self.amount
            }
            _ => Amount::ZERO,
        }
    }

    /// The other account involved in a transfer, from the given
    /// account's point of view. `None` for deposits and withdrawals.
    pub fn counterparty(&self, account_number: &str) -> Option<&str> {
        match self.kind {
            TransactionKind::Transfer if self.from_account == account_number => {
                self.to_account.as_deref()
            }
            TransactionKind::Transfer => Some(self.from_account.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let when = self.timestamp.format("%Y-%m-%d %H:%M:%S");
        match self.kind {
            TransactionKind::Deposit => write!(f, "[{}] DEPOSIT: +{}", when, self.amount),
            TransactionKind::Withdraw => write!(f, "[{}] WITHDRAW: -{}", when, self.amount),
            TransactionKind::Transfer => write!(
                f,
                "[{}] TRANSFER {} -> {}: {}",
                when,
                self.from_account,
                self.to_account.as_deref().unwrap_or("?"),
                self.amount
            ),
        }
    }
}
