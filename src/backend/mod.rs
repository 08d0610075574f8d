pub mod interface;
pub mod json_store;

pub use interface::{LedgerStore, StoreError};
pub use json_store::JsonStore;
