use serde::{Deserialize, Serialize};

use crate::core::error::{BankError, BankResult};
use crate::core::transaction::{AccountNumber, Amount, Transaction};

/// A single bank account: a balance plus the append-only log of the
/// transactions that produced it. The balance always equals the sum of
/// the signed effects of the log (see [`Account::replayed_balance`])
/// and never goes negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_number: AccountNumber,
    pub user_id: u64,
    balance: Amount,
    pub currency: String,
    transactions: Vec<Transaction>,
}

impl Account {
    pub(crate) fn new(account_number: AccountNumber, user_id: u64, currency: &str) -> Account {
        Account {
            account_number,
            user_id,
            balance: Amount::ZERO,
            currency: currency.to_owned(),
            transactions: Vec::new(),
        }
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Transaction log in insertion order.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn deposit(&mut self, amount: Amount) -> BankResult<()> {
        if amount <= Amount::ZERO {
            return Err(BankError::InvalidAmount(amount));
        }
        self.balance += amount;
        self.transactions
            .push(Transaction::deposit(amount, self.account_number.clone()));
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Amount) -> BankResult<()> {
        if amount <= Amount::ZERO {
            return Err(BankError::InvalidAmount(amount));
        }
        if amount > self.balance {
            return Err(BankError::InsufficientFunds {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.transactions
            .push(Transaction::withdraw(amount, self.account_number.clone()));
        Ok(())
    }

    /// Moves `amount` from `source` to `destination` as one logical step:
    /// every check happens before either side is touched, so a failure
    /// leaves both accounts exactly as they were. Each side gets its own
    /// transfer record carrying the same amount and both account numbers.
    pub(crate) fn transfer(
        source: &mut Account,
        destination: &mut Account,
        amount: Amount,
    ) -> BankResult<()> {
        if amount <= Amount::ZERO {
            return Err(BankError::InvalidAmount(amount));
        }
        if amount > source.balance {
            return Err(BankError::InsufficientFunds {
                requested: amount,
                available: source.balance,
            });
        }

        source.balance -= amount;
        source.transactions.push(Transaction::transfer(
            amount,
            source.account_number.clone(),
            destination.account_number.clone(),
        ));

        destination.balance += amount;
        destination.transactions.push(Transaction::transfer(
            amount,
            source.account_number.clone(),
            destination.account_number.clone(),
        ));
        Ok(())
    }

    /// Transactions sorted by timestamp ascending; ties keep insertion
    /// order. An empty result is the empty-state signal — rendering a
    /// "no transactions" message is the presentation layer's job.
    pub fn statement(&self) -> Vec<&Transaction> {
        let mut sorted: Vec<&Transaction> = self.transactions.iter().collect();
        sorted.sort_by_key(|t| t.timestamp());
        sorted
    }

    /// Recomputes the balance from the log alone. Equals `balance()`
    /// after every operation; used to audit snapshots on load.
    pub fn replayed_balance(&self) -> Amount {
        self.transactions
            .iter()
            .map(|t| t.signed_amount(&self.account_number))
            .sum()
    }
}
