//! # reputrust-ledger
//! Payment Ledger & Receipt Materializer, Vote & Endorsement Intake, and the
//! upto/subscription/batch payment-scheme accounting.

pub mod accounting;
pub mod error;
pub mod receipts;
pub mod votes;

pub use error::LedgerError;
pub use receipts::PaymentLedger;
pub use votes::VoteIntake;
