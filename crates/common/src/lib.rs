//! Shared runtime helpers: logging setup, startup environment checks and
//! small response types reused by the server and binaries.

pub mod types;
pub mod utils;
pub mod env;
