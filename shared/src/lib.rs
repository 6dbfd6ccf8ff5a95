pub mod config;
pub mod database;
pub mod entity;
pub mod models;

pub use config::Config;
pub use database::{get_db_connection, get_pool, DbPool};
pub use models::*;
