//! Core of the Messenger webhook adapter.
//!
//! Inbound: raw webhook bodies are classified into typed events and routed to
//! registered handlers. Outbound: typed envelopes are validated and serialized into
//! the Send API wire format. Transport and page metadata live behind ports (traits)
//! implemented by the embedding application.

pub mod callbacks;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod event;
pub mod logging;
pub mod page;
pub mod payload;
pub mod ports;
pub mod security;

pub use errors::{Error, Result};
