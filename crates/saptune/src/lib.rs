//! # saptune
//!
//! Thin async client for the `saptune` CLI.
//!
//! Only the solution lifecycle is covered: version gate, reading the applied
//! solution, and apply/revert/change.

pub mod client;
pub mod error;

pub use client::{MIN_SUPPORTED_VERSION, SaptuneCli, SaptuneClient};
pub use error::{Error, Result};
