pub mod error;
pub mod ledger;
pub mod persistence;
pub mod store;
pub mod types;

pub use error::{LedgerError, LedgerErrorKind};
pub use ledger::CreditLedger;
pub use persistence::LedgerPersistence;
pub use store::{
    InsertOutcome, MarkReferredOutcome, MemoryUsageStore, UpdateOutcome, UsageStore,
};
pub use types::{DebitSource, UsageRecord};
