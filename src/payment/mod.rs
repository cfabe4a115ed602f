pub mod error;
pub mod grant;
pub mod store;
pub mod types;

pub use error::{PaymentError, PaymentErrorKind};
pub use grant::{ConfirmOutcome, PaymentGrant};
pub use store::{MemoryTransactionStore, TransactionStore, TransitionOutcome};
pub use types::{PaymentPackage, PaymentStatus, PaymentTransaction, default_packages};
