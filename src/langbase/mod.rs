//! Langbase Pipes client.
//!
//! The HTTP transport behind [`crate::oracle::LangbaseOracle`]: retrying pipe
//! calls with exponential backoff, plus pipe provisioning at startup.

mod client;
mod types;

pub use client::*;
pub use types::*;

#[cfg(test)]
mod types_tests;
