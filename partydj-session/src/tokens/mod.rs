//! Token accounting
//!
//! Per-message token costs and the per-session token budget. Everything in
//! here is pure given an encoder and a configuration.

pub mod accountant;
pub mod budget;

pub use accountant::{prompt_token_count, token_count, BpeEncoder, TokenEncoder, TOKENS_PER_MESSAGE};
pub use budget::TokenBudget;
