//! Market data client wrapper using reqwest

use crate::config::FetchConfig;
use crate::data::{OhlcRow, PriceTick, Source};
use crate::error::FetchError;
use crate::exchange::coingecko::{parse_market_chart, MarketChartResponse};
use crate::exchange::kraken::{parse_ohlc_response, KrakenOhlcResponse, KRAKEN_INTERVALS};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// HTTP client for both price providers
///
/// One request per call, no retries. Every request carries the configured
/// timeout.
#[derive(Debug, Clone)]
pub struct MarketDataClient {
    http: reqwest::Client,
    config: FetchConfig,
}

impl MarketDataClient {
    /// Create new market data client
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("trustboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch CoinGecko `market_chart` price ticks with their volume snapshots
    pub async fn fetch_coingecko_market_chart(
        &self,
        coin_id: &str,
        vs_currency: &str,
        days: u32,
    ) -> Result<Vec<PriceTick>, FetchError> {
        let url = format!(
            "{}/coins/{}/market_chart",
            self.config.coingecko_base_url.trim_end_matches('/'),
            coin_id
        );
        info!("Fetching CoinGecko market chart for {} ({} days)", coin_id, days);

        let mut request = self
            .http
            .get(&url)
            .query(&[("vs_currency", vs_currency.to_string()), ("days", days.to_string())]);
        if let Some(key) = &self.config.coingecko_api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let body: MarketChartResponse = self.send_json(Source::CoinGecko, request).await?;
        let ticks = parse_market_chart(body);
        info!("Fetched {} CoinGecko ticks", ticks.len());
        Ok(ticks)
    }

    /// Fetch Kraken OHLC candles for `pair` at `interval_min`
    pub async fn fetch_kraken_ohlc(
        &self,
        pair: &str,
        interval_min: u32,
        since: Option<i64>,
    ) -> Result<Vec<OhlcRow>, FetchError> {
        if !KRAKEN_INTERVALS.contains(&interval_min) {
            return Err(FetchError::UnsupportedInterval(interval_min));
        }

        let url = format!(
            "{}/0/public/OHLC",
            self.config.kraken_base_url.trim_end_matches('/')
        );
        info!("Fetching Kraken OHLC for {} at {}m", pair, interval_min);

        let mut params = vec![("pair", pair.to_string()), ("interval", interval_min.to_string())];
        if let Some(since) = since {
            params.push(("since", since.to_string()));
        }
        let request = self.http.get(&url).query(&params);

        let body: KrakenOhlcResponse = self.send_json(Source::Kraken, request).await?;
        let rows = parse_ohlc_response(pair, body)?;
        info!("Fetched {} Kraken candles", rows.len());
        Ok(rows)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        provider: Source,
        request: RequestBuilder,
    ) -> Result<T, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|source| FetchError::Http { provider, source })?;

        let status = response.status();
        debug!("{} responded with {}", provider, status);
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|source| FetchError::Http { provider, source })?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            provider,
            message: e.to_string(),
        })
    }
}
