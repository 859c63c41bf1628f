//! Core engine for the short-link relay.
//!
//! This crate is framework-agnostic. Telegram and the HTTP stack live behind
//! ports (traits) implemented in adapter crates.

pub mod classify;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod relay;
pub mod resolve;
pub mod rewrite;
pub mod shorten;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
