//! Configuration module
//!
//! Explicit configuration values handed to the fetch, normalize and persist
//! stages. Nothing in this crate reads the process environment.

pub mod fetch;
pub mod pipeline;

pub use fetch::*;
pub use pipeline::*;
