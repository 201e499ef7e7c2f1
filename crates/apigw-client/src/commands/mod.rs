//! Subcommand implementations.

pub mod call;
pub mod config;
pub mod extract;
pub mod sign;
