//! Standin
//!
//! Test doubles for registered types and functions:
//!
//! - **Proxy synthesis**: one cached proxy type per target, substitutable for the target
//! - **Call interception**: configured literals, stand-ins, sequences and failures
//! - **Verification**: call counts and argument matching per member
//!
//! The engine lives in [`standin_core`] and is re-exported here. See
//! [`report`] for the inspection reports printed by the `standin` CLI.

#![allow(clippy::result_large_err)]

pub mod report;

pub use standin_core::*;
