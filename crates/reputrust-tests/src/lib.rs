//! End-to-end test suite for the reputation & trust core.
//!
//! Every consensus-adjacent invariant is exercised here against a full
//! in-process `Node`, not just the per-crate unit tests each collaborator
//! already carries.

pub mod helpers;
