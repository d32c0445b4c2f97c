//! # PartyDJ Common Library
//!
//! Shared code for the PartyDJ services including:
//! - Error type
//! - Configuration loading (TOML, ENV, compiled defaults)
//! - Database pool initialization
//! - Event types and the EventBus
//! - SSE helpers
//! - Id and party code generation

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod ids;
pub mod sse;
pub mod time;

pub use error::{Error, Result};
