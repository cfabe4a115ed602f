pub mod directory;
pub mod error;
pub mod log;
pub mod processor;
pub mod types;

pub use directory::{MemoryProfileDirectory, ProfileDirectory};
pub use error::{ReferralError, ReferralErrorKind};
pub use log::{MemoryReferralLog, ReferralLog};
pub use processor::ReferralProcessor;
pub use types::{ReferralGrant, ReferralRecord};
