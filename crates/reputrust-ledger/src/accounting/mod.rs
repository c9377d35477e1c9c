//! Payment-scheme accounting: upto authorizations,
//! subscription lifecycle, and batch execution, on top of the shared
//! `PaymentLedger` exact-payment path.

pub mod batch;
pub mod subscription;
pub mod upto;

pub use batch::BatchLedger;
pub use subscription::SubscriptionLedger;
pub use upto::UptoLedger;
