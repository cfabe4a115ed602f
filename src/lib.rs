pub mod config;
pub mod gate;
pub mod interpreter;
pub mod ledger;
pub mod logging;
pub mod payment;
pub mod protocol;
pub mod referral;
pub mod server;
pub mod service;
pub mod types;
