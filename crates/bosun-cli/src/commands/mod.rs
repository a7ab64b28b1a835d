//! CLI commands

pub mod check;
pub mod create;
pub mod migrate;
pub mod provision;
pub mod provisions;
