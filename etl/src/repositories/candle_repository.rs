use sea_orm::prelude::*;
use sea_orm::TransactionTrait;
use shared::entity::fact_price_candle;
use std::sync::Arc;
use tracing::{debug, info};
use trustboard::config::CANDLE_TABLE;
use trustboard::data::Candle;
use trustboard::error::PersistError;

/// Rows per INSERT statement, well under the MySQL placeholder limit
const INSERT_BATCH_SIZE: usize = 500;

pub struct CandleRepository {
    db: Arc<DatabaseConnection>,
}

impl CandleRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Replace the full table contents in one transaction.
    ///
    /// Readers see either the previous table or the new one, never a mix.
    pub async fn replace_all(&self, candles: &[Candle]) -> Result<u64, PersistError> {
        let txn = self.db.begin().await.map_err(db_error)?;

        let deleted = fact_price_candle::Entity::delete_many()
            .exec(&txn)
            .await
            .map_err(db_error)?
            .rows_affected;
        debug!("Deleted {} rows from {}", deleted, CANDLE_TABLE);

        for (i, batch) in candles.chunks(INSERT_BATCH_SIZE).enumerate() {
            let models = batch.iter().map(fact_price_candle::ActiveModel::from);
            fact_price_candle::Entity::insert_many(models)
                .exec(&txn)
                .await
                .map_err(db_error)?;
            debug!("Inserted batch {} ({} rows)", i + 1, batch.len());
        }

        txn.commit().await.map_err(db_error)?;
        info!("Replaced {} rows in {} with {} candles", deleted, CANDLE_TABLE, candles.len());
        Ok(candles.len() as u64)
    }

    pub async fn count(&self) -> Result<u64, PersistError> {
        fact_price_candle::Entity::find()
            .count(self.db.as_ref())
            .await
            .map_err(db_error)
    }
}

fn db_error(err: DbErr) -> PersistError {
    PersistError::database(CANDLE_TABLE, err)
}
