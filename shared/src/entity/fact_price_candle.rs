//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};
use trustboard::data::Candle;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fact_price_candle")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: u64,
    pub source: String,
    pub asset: String,
    pub interval_min: i32,
    pub ts_start: DateTimeUtc,
    #[sea_orm(column_type = "Double", nullable)]
    pub open: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub high: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub low: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub close: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub vwap: Option<f64>,
    #[sea_orm(column_type = "Double", nullable)]
    pub volume: Option<f64>,
    #[sea_orm(column_type = "BigInteger", nullable)]
    pub count: Option<i64>,
    pub is_missing: bool,
    pub bad_candle: bool,
    pub spike_flag: bool,
    pub anomaly_flag: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Candle> for ActiveModel {
    fn from(candle: &Candle) -> Self {
        ActiveModel {
            id: NotSet,
            source: Set(candle.source.as_str().to_string()),
            asset: Set(candle.asset.clone()),
            interval_min: Set(candle.interval_min as i32),
            ts_start: Set(candle.ts_start),
            open: Set(candle.open),
            high: Set(candle.high),
            low: Set(candle.low),
            close: Set(candle.close),
            vwap: Set(candle.vwap),
            volume: Set(candle.volume),
            count: Set(candle.count),
            is_missing: Set(candle.is_missing),
            bad_candle: Set(candle.bad_candle),
            spike_flag: Set(candle.spike_flag),
            anomaly_flag: Set(candle.anomaly_flag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use trustboard::data::Source;

    #[test]
    fn test_active_model_from_candle() {
        let candle = Candle {
            source: Source::Kraken,
            asset: "BITCOIN".to_string(),
            interval_min: 5,
            ts_start: DateTime::parse_from_rfc3339("2024-03-01T09:00:00Z").unwrap().with_timezone(&Utc),
            open: Some(1.0),
            high: Some(2.0),
            low: Some(0.5),
            close: Some(1.5),
            vwap: None,
            volume: Some(3.0),
            count: Some(12),
            is_missing: false,
            bad_candle: false,
            spike_flag: true,
            anomaly_flag: true,
        };

        let model = ActiveModel::from(&candle);
        assert_eq!(model.id, NotSet);
        assert_eq!(model.source, Set("kraken".to_string()));
        assert_eq!(model.interval_min, Set(5));
        assert_eq!(model.vwap, Set(None));
        assert_eq!(model.anomaly_flag, Set(true));
    }
}
