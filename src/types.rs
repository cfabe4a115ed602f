use serde::{Deserialize, Serialize};

pub type UserId = String;
pub type TransactionId = String;

/// Number of free interpretations every account starts with.
pub const FREE_QUOTA: u32 = 5;

/// Credits granted to each side of a successful referral.
pub const REFERRAL_BONUS: u32 = 5;

/// Length of the user-id prefix that serves as a referral code.
pub const REFERRAL_CODE_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    Religious,
    Spiritual,
    Psychological,
}

impl Perspective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Religious => "religious",
            Perspective::Spiritual => "spiritual",
            Perspective::Psychological => "psychological",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    English,
    Arabic,
}

/// The three generated texts returned for a single dream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DreamInterpretation {
    pub religious: String,
    pub spiritual: String,
    pub psychological: String,
}
