pub mod error;
pub mod referral;
pub mod utils;
