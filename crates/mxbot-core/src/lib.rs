//! Core domain + application logic for the Matrix demo bot.
//!
//! This crate is intentionally transport-agnostic. The Matrix client-server HTTP
//! API lives behind the [`transport::Transport`] port, implemented in `mxbot-matrix`.

pub mod bot;
pub mod calc;
pub mod commands;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod responder;
pub mod router;
pub mod session;
pub mod stats;
pub mod sync;
pub mod transport;

pub use errors::{AuthError, Error, Result};

#[cfg(test)]
mod test_support;
