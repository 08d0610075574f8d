use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::backend::interface::{LedgerStore, StoreError};
use crate::core::Ledger;

/// Flat-file JSON snapshot of the whole ledger. Saves go through a
/// temporary file and a rename, so the snapshot on disk is always a
/// complete state, never a half-written one.
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonStore {
        JsonStore { path: path.into() }
    }

    fn persistence_error(&self, source: io::Error) -> StoreError {
        StoreError::Persistence {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for JsonStore {
    fn load(&self) -> Result<Ledger, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no snapshot at {}, starting empty", self.path.display());
                return Ok(Ledger::new());
            }
            Err(err) => {
                return Err(StoreError::Load {
                    path: self.path.clone(),
                    source: err,
                })
            }
        };

        let ledger: Ledger = serde_json::from_str(&contents).map_err(|err| StoreError::Corrupt {
            path: self.path.clone(),
            source: err,
        })?;

        for account in ledger.accounts() {
            if account.replayed_balance() != account.balance() {
                warn!(
                    "account {}: stored balance {} does not match its transaction log",
                    account.account_number,
                    account.balance()
                );
            }
        }
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(ledger)
            .map_err(|err| self.persistence_error(err.into()))?;

        let tmp = tmp_path(&self.path);
        fs::write(&tmp, json).map_err(|err| self.persistence_error(err))?;
        fs::rename(&tmp, &self.path).map_err(|err| self.persistence_error(err))?;
        debug!("snapshot written to {}", self.path.display());
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BankError, User};

    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tempfile::TempDir;

    #[fixture]
    fn dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn populated_ledger() -> Ledger {
        let mut ledger = Ledger::new();
        ledger
            .register("Bilbo Baggins", "0700123456", "precious")
            .unwrap();
        ledger
            .register("Frodo Baggins", "0700654321", "ring")
            .unwrap();
        let x = ledger.create_account(1, "USD").unwrap();
        let y = ledger.create_account(2, "EUR").unwrap();
        ledger.deposit(&x, dec!(100)).unwrap();
        ledger.deposit(&y, dec!(50)).unwrap();
        ledger.transfer(&x, &y, dec!(25)).unwrap();
        ledger.withdraw(&x, dec!(10)).unwrap();
        ledger
    }

    #[rstest]
    fn round_trip_preserves_everything(dir: TempDir) {
        let store = JsonStore::new(dir.path().join("bank_data.json"));
        let mut ledger = populated_ledger();
        // Lock Frodo so the lock state crosses the snapshot too.
        for _ in 0..3 {
            let _ = ledger.login("0700654321", "wrong");
        }

        store.save(&ledger).unwrap();
        let restored = store.load().unwrap();

        assert_eq!(restored, ledger);
    }

    #[rstest]
    fn counters_survive_the_round_trip(dir: TempDir) {
        let store = JsonStore::new(dir.path().join("bank_data.json"));
        store.save(&populated_ledger()).unwrap();

        let mut restored = store.load().unwrap();
        let user = restored.register("Sam Gamgee", "0700111222", "po-ta-toes");
        assert_eq!(user.unwrap().user_id, 3);
        let account = restored.create_account(3, "GBP").unwrap();
        assert_eq!(account, "10002");
    }

    #[rstest]
    fn failed_logins_accumulate_across_restarts(dir: TempDir) {
        let store = JsonStore::new(dir.path().join("bank_data.json"));
        store.save(&populated_ledger()).unwrap();

        // Each attempt is a fresh process in the CLI: load, try the
        // password, save whether or not the login succeeded.
        for _ in 0..3 {
            let mut ledger = store.load().unwrap();
            assert!(ledger.login("0700123456", "wrong").is_err());
            store.save(&ledger).unwrap();
        }

        // The lock reached the snapshot, so even the right password
        // bounces on the next run.
        let mut ledger = store.load().unwrap();
        let res = ledger.login("0700123456", "precious");
        assert!(matches!(res, Err(BankError::AccountLocked { .. })));
    }

    #[rstest]
    fn missing_snapshot_loads_empty(dir: TempDir) {
        let store = JsonStore::new(dir.path().join("does_not_exist.json"));
        let ledger = store.load().unwrap();
        assert_eq!(ledger, Ledger::new());
    }

    #[rstest]
    fn corrupt_snapshot_is_reported_and_degrades_to_empty(dir: TempDir) {
        let path = dir.path().join("bank_data.json");
        // A user entry missing required fields (no phone, no password).
        let snapshot = json!({
            "next_user_id": 2,
            "next_account_number": 10000,
            "users": {
                "1": { "user_id": 1, "full_name": "Bilbo Baggins" }
            },
            "accounts": {}
        });
        fs::write(&path, snapshot.to_string()).unwrap();

        let store = JsonStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));

        let (ledger, err) = store.load_or_empty();
        assert_eq!(ledger, Ledger::new());
        assert!(matches!(err, Some(StoreError::Corrupt { .. })));
    }

    #[rstest]
    fn unparseable_snapshot_is_corrupt(dir: TempDir) {
        let path = dir.path().join("bank_data.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Corrupt { .. })));
    }

    #[rstest]
    fn save_leaves_no_temporary_behind(dir: TempDir) {
        let path = dir.path().join("bank_data.json");
        let store = JsonStore::new(&path);
        store.save(&populated_ledger()).unwrap();
        store.save(&populated_ledger()).unwrap();

        assert!(path.exists());
        assert!(!tmp_path(&path).exists());
    }

    #[rstest]
    fn save_to_unwritable_path_reports_persistence(dir: TempDir) {
        let store = JsonStore::new(dir.path().join("missing").join("bank_data.json"));
        let res = store.save(&Ledger::new());
        assert!(matches!(res, Err(StoreError::Persistence { .. })));
    }

    #[test]
    fn user_serializes_to_the_flat_snapshot_shape() {
        let mut user = User::new(1, "Bilbo Baggins", "0700123456", "precious");
        user_shape_roundtrip(&user);

        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(
            value,
            json!({
                "user_id": 1,
                "full_name": "Bilbo Baggins",
                "phone": "0700123456",
                // sha256("precious")
                "password": "157fc55121ab2c59852c35d78aca98d840047e5d9668c423e4d3b146e1577901",
                "accounts": [],
                "login_attempts": 0,
                "locked_until": null
            })
        );

        // A locked user keeps the flat pair on the wire.
        let _ = user.authenticate("wrong");
        let _ = user.authenticate("wrong");
        let _ = user.authenticate("wrong");
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value["login_attempts"], json!(3));
        assert!(value["locked_until"].is_string());
    }

    fn user_shape_roundtrip(user: &User) {
        let value = serde_json::to_value(user).unwrap();
        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(&back, user);
    }

    #[rstest]
    fn snapshot_has_the_documented_nesting(dir: TempDir) {
        let path = dir.path().join("bank_data.json");
        JsonStore::new(&path).save(&populated_ledger()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["next_user_id"], json!(3));
        assert_eq!(value["next_account_number"], json!(10002));
        assert_eq!(value["users"]["1"]["phone"], json!("0700123456"));
        assert_eq!(value["users"]["2"]["accounts"], json!(["10001"]));
        assert_eq!(value["accounts"]["10000"]["currency"], json!("USD"));

        let first = &value["accounts"]["10000"]["transactions"][0];
        assert_eq!(first["type"], json!("deposit"));
        assert_eq!(first["from_account"], json!("10000"));
        assert_eq!(first["to_account"], json!(null));
        assert!(first["transaction_id"].is_string());
        assert!(first["timestamp"].is_string());

        let out = &value["accounts"]["10000"]["transactions"][1];
        assert_eq!(out["type"], json!("transfer"));
        assert_eq!(out["to_account"], json!("10001"));
    }
}
