//! Data module
//!
//! Raw provider records, the normalized candle row, and timestamp parsing.

pub mod candle;
pub mod raw;
pub mod parse;

pub use candle::*;
pub use raw::*;
pub use parse::*;
