pub mod candle_repository;

pub use candle_repository::CandleRepository;
