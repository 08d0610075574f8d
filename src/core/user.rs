use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::error::{BankError, BankResult};
use crate::core::transaction::AccountNumber;

/// Consecutive failed logins before the account locks.
const MAX_FAILED_LOGINS: u8 = 3;
/// How long a lockout lasts.
const LOCKOUT_SECS: i64 = 30 * 60;

/// Lockout state machine. Kept as a tagged state in memory so that
/// "locked with a fail count" cannot be represented; the snapshot keeps
/// the flat `login_attempts`/`locked_until` pair via [`LockFields`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "LockFields", into = "LockFields")]
pub enum LockState {
    Unlocked { failed_attempts: u8 },
    Locked { until: DateTime<Utc> },
}

/// Wire form of [`LockState`], matching the snapshot schema.
#[derive(Serialize, Deserialize)]
struct LockFields {
    login_attempts: u8,
    locked_until: Option<DateTime<Utc>>,
}

impl From<LockFields> for LockState {
    fn from(fields: LockFields) -> LockState {
        match fields.locked_until {
            Some(until) => LockState::Locked { until },
            None => LockState::Unlocked {
                failed_attempts: fields.login_attempts.min(MAX_FAILED_LOGINS - 1),
            },
        }
    }
}

impl From<LockState> for LockFields {
    fn from(state: LockState) -> LockFields {
        match state {
            LockState::Unlocked { failed_attempts } => LockFields {
                login_attempts: failed_attempts,
                locked_until: None,
            },
            LockState::Locked { until } => LockFields {
                login_attempts: MAX_FAILED_LOGINS,
                locked_until: Some(until),
            },
        }
    }
}

/// A registered user: credentials plus the set of owned accounts.
/// The phone number is the login key and is unique across the ledger;
/// only a SHA-256 digest of the password is ever stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: u64,
    pub full_name: String,
    pub phone: String,
    #[serde(rename = "password")]
    password_hash: String,
    accounts: Vec<AccountNumber>,
    #[serde(flatten)]
    lock: LockState,
}

impl User {
    pub(crate) fn new(user_id: u64, full_name: &str, phone: &str, password: &str) -> User {
        User {
            user_id,
            full_name: full_name.to_owned(),
            phone: phone.to_owned(),
            password_hash: hash_password(password),
            accounts: Vec::new(),
            lock: LockState::Unlocked { failed_attempts: 0 },
        }
    }

    /// Owned account numbers in the order they were opened.
    pub fn accounts(&self) -> &[AccountNumber] {
        &self.accounts
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    /// Associates an account with this user. Idempotent.
    pub(crate) fn add_account(&mut self, account_number: AccountNumber) {
        if !self.accounts.contains(&account_number) {
            self.accounts.push(account_number);
        }
    }

    pub fn authenticate(&mut self, password: &str) -> BankResult<()> {
        self.authenticate_at(password, Utc::now())
    }

    /// Runs one step of the lockout state machine at the given instant.
    ///
    /// Attempts made while locked are ignored outright: they neither
    /// count as failures nor extend the lock. An expired lock clears
    /// lazily here, resetting the fail count before the password check.
    pub fn authenticate_at(&mut self, password: &str, now: DateTime<Utc>) -> BankResult<()> {
        if let LockState::Locked { until } = self.lock {
            if now < until {
                return Err(BankError::AccountLocked {
                    remaining_secs: (until - now).num_seconds(),
                });
            }
            self.lock = LockState::Unlocked { failed_attempts: 0 };
        }

        if hash_password(password) == self.password_hash {
            self.lock = LockState::Unlocked { failed_attempts: 0 };
            return Ok(());
        }

        let failed = match self.lock {
            LockState::Unlocked { failed_attempts } => failed_attempts + 1,
            // unreachable: a live lock returned above, an expired one was cleared
            LockState::Locked { .. } => MAX_FAILED_LOGINS,
        };
        if failed >= MAX_FAILED_LOGINS {
            self.lock = LockState::Locked {
                until: now + Duration::seconds(LOCKOUT_SECS),
            };
            Err(BankError::AccountLocked {
                remaining_secs: LOCKOUT_SECS,
            })
        } else {
            self.lock = LockState::Unlocked {
                failed_attempts: failed,
            };
            Err(BankError::InvalidCredentials)
        }
    }
}

fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
