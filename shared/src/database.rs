use anyhow::{Context, Result};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

/// Connection attempts give up after this long
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn get_pool(database_url: &str) -> Result<MySqlPool> {
    info!("Connecting to database at: {}", redact(database_url));
    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(CONNECT_TIMEOUT)
        .connect(database_url)
        .await
        .context("failed to connect to the dashboard database")?;
    Ok(pool)
}

pub async fn get_db_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database via Sea-ORM at: {}", redact(database_url));
    let mut options = ConnectOptions::new(database_url.to_string());
    options
        .connect_timeout(CONNECT_TIMEOUT)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .context("failed to connect to the warehouse database")?;
    Ok(db)
}

/// Hide the password part of a connection URL before logging it
pub fn redact(database_url: &str) -> String {
    match (database_url.find("://"), database_url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            let userinfo = &database_url[scheme_end + 3..at];
            match userinfo.split_once(':') {
                Some((user, _)) => format!(
                    "{}{}:***{}",
                    &database_url[..scheme_end + 3],
                    user,
                    &database_url[at..]
                ),
                None => database_url.to_string(),
            }
        }
        _ => database_url.to_string(),
    }
}

pub type DbPool = MySqlPool;
