//! `SeaORM` Entities

pub mod fact_price_candle;

pub use fact_price_candle::Entity as FactPriceCandle;
