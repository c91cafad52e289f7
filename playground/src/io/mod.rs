//! Side-effecting building blocks: the print channel, the JavaScript
//! evaluator, configuration files, the catalog store and identity tokens.

pub mod channel;
pub mod config;
pub mod evaluator;
pub mod identity;
pub mod store;
