//! Flat-file storage
//!
//! Raw provider tables and the combined candle table as CSV files.

pub mod csv_files;

pub use csv_files::*;
