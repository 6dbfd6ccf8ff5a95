use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FactPriceCandle::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FactPriceCandle::Id).big_unsigned().auto_increment().primary_key())
                    .col(ColumnDef::new(FactPriceCandle::Source).string_len(32).not_null()) // "coingecko" or "kraken"
                    .col(ColumnDef::new(FactPriceCandle::Asset).string_len(64).not_null())
                    .col(ColumnDef::new(FactPriceCandle::IntervalMin).integer().not_null())
                    .col(ColumnDef::new(FactPriceCandle::TsStart).timestamp().not_null()) // UTC bucket start
                    .col(ColumnDef::new(FactPriceCandle::Open).double().null())
                    .col(ColumnDef::new(FactPriceCandle::High).double().null())
                    .col(ColumnDef::new(FactPriceCandle::Low).double().null())
                    .col(ColumnDef::new(FactPriceCandle::Close).double().null())
                    .col(ColumnDef::new(FactPriceCandle::Vwap).double().null())
                    .col(ColumnDef::new(FactPriceCandle::Volume).double().null())
                    .col(ColumnDef::new(FactPriceCandle::Count).big_integer().null())
                    .col(ColumnDef::new(FactPriceCandle::IsMissing).boolean().not_null().default(false))
                    .col(ColumnDef::new(FactPriceCandle::BadCandle).boolean().not_null().default(false))
                    .col(ColumnDef::new(FactPriceCandle::SpikeFlag).boolean().not_null().default(false))
                    .col(ColumnDef::new(FactPriceCandle::AnomalyFlag).boolean().not_null().default(false))
                    .index(
                        Index::create()
                            .name("uq_fact_price_candle_key")
                            .table(FactPriceCandle::Table)
                            .col(FactPriceCandle::Source)
                            .col(FactPriceCandle::Asset)
                            .col(FactPriceCandle::IntervalMin)
                            .col(FactPriceCandle::TsStart)
                            .unique()
                    )
                    .index(
                        Index::create()
                            .name("idx_fact_price_candle_ts")
                            .table(FactPriceCandle::Table)
                            .col(FactPriceCandle::TsStart)
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FactPriceCandle::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum FactPriceCandle {
    Table,
    Id,
    Source,
    Asset,
    IntervalMin,
    TsStart,
    Open,
    High,
    Low,
    Close,
    Vwap,
    Volume,
    Count,
    IsMissing,
    BadCandle,
    SpikeFlag,
    AnomalyFlag,
}
