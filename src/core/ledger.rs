use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::account::Account;
use crate::core::error::{BankError, BankResult};
use crate::core::transaction::{AccountNumber, Amount};
use crate::core::user::User;

const FIRST_USER_ID: u64 = 1;
const FIRST_ACCOUNT_NUMBER: u64 = 10000;

/// The whole bank: every user, every account, and the id counters.
/// Counters only ever move forward, so ids and account numbers are
/// never reused. BTreeMaps keep the snapshot deterministic.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    next_user_id: u64,
    next_account_number: u64,
    users: BTreeMap<u64, User>,
    accounts: BTreeMap<AccountNumber, Account>,
}

impl Default for Ledger {
    fn default() -> Ledger {
        Ledger::new()
    }
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger {
            next_user_id: FIRST_USER_ID,
            next_account_number: FIRST_ACCOUNT_NUMBER,
            users: BTreeMap::new(),
            accounts: BTreeMap::new(),
        }
    }

    /// Registers a new user. Phone numbers are the login key, so a
    /// second registration with the same phone fails with
    /// [`BankError::DuplicatePhone`] and leaves the first user alone.
    pub fn register(&mut self, full_name: &str, phone: &str, password: &str) -> BankResult<&User> {
        if self.find_user_by_phone(phone).is_some() {
            return Err(BankError::DuplicatePhone(phone.to_owned()));
        }

        let user_id = self.next_user_id;
        self.next_user_id += 1;

        let user = User::new(user_id, full_name, phone, password);
        info!("registered user {} ({})", user_id, full_name);
        Ok(self.users.entry(user_id).or_insert(user))
    }

    /// Looks the user up by phone and runs their authentication state
    /// machine, passing its failure through unchanged.
    pub fn login(&mut self, phone: &str, password: &str) -> BankResult<&User> {
        let user = self
            .users
            .values_mut()
            .find(|user| user.phone == phone)
            .ok_or_else(|| BankError::UserNotFound(phone.to_owned()))?;

        if let Err(err) = user.authenticate(password) {
            warn!("failed login for user {}: {}", user.user_id, err);
            return Err(err);
        }
        Ok(user)
    }

    /// Opens an account for an existing user and returns its number.
    pub fn create_account(&mut self, user_id: u64, currency: &str) -> BankResult<AccountNumber> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or_else(|| BankError::UserNotFound(user_id.to_string()))?;

        let account_number = self.next_account_number.to_string();
        self.next_account_number += 1;

        user.add_account(account_number.clone());
        self.accounts.insert(
            account_number.clone(),
            Account::new(account_number.clone(), user_id, currency),
        );
        info!("opened account {} for user {}", account_number, user_id);
        Ok(account_number)
    }

    pub fn deposit(&mut self, account_number: &str, amount: Amount) -> BankResult<()> {
        self.account_mut(account_number)?.deposit(amount)
    }

    pub fn withdraw(&mut self, account_number: &str, amount: Amount) -> BankResult<()> {
        self.account_mut(account_number)?.withdraw(amount)
    }

    /// Coupled transfer between two accounts; see [`Account::transfer`]
    /// for the all-or-nothing contract. The menu layer screens out
    /// self-transfers already, but the core rejects them too.
    pub fn transfer(&mut self, from: &str, to: &str, amount: Amount) -> BankResult<()> {
        if from == to {
            return Err(BankError::SelfTransfer(from.to_owned()));
        }

        let mut source = None;
        let mut destination = None;
        for (number, account) in self.accounts.iter_mut() {
            if number == from {
                source = Some(account);
            } else if number == to {
                destination = Some(account);
            }
        }
        let source = source.ok_or_else(|| BankError::AccountNotFound(from.to_owned()))?;
        let destination = destination.ok_or_else(|| BankError::AccountNotFound(to.to_owned()))?;

        Account::transfer(source, destination, amount)
    }

    pub fn find_user_by_phone(&self, phone: &str) -> Option<&User> {
        self.users.values().find(|user| user.phone == phone)
    }

    pub fn get_user(&self, user_id: u64) -> Option<&User> {
        self.users.get(&user_id)
    }

    pub fn get_account(&self, account_number: &str) -> Option<&Account> {
        self.accounts.get(account_number)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    fn account_mut(&mut self, account_number: &str) -> BankResult<&mut Account> {
        self.accounts
            .get_mut(account_number)
            .ok_or_else(|| BankError::AccountNotFound(account_number.to_owned()))
    }
}
