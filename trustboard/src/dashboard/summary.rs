//! KPI summary over a window of candles

use crate::dashboard::{rate, time_ago, ChartSeries, Divergence};
use crate::data::{Candle, Source};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Data older than this is stale
pub const STALE_AFTER_HOURS: i64 = 2;
/// Missing-bucket rate above which a backfill is advised
pub const MISSING_RATE_ALERT: f64 = 0.10;
/// Anomaly rate above which source data should be checked
pub const ANOMALY_RATE_ALERT: f64 = 0.02;
/// Anomalies listed on the dashboard
pub const RECENT_ANOMALIES: usize = 10;

/// Overall data health bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthLabel {
    Healthy,
    Watch,
    Risk,
}

impl HealthLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            HealthLabel::Healthy
        } else if score >= 0.8 {
            HealthLabel::Watch
        } else {
            HealthLabel::Risk
        }
    }

    /// CSS modifier for the label chip
    pub fn css_class(&self) -> &'static str {
        match self {
            HealthLabel::Healthy => "good",
            HealthLabel::Watch => "warn",
            HealthLabel::Risk => "bad",
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthLabel::Healthy => "Healthy",
            HealthLabel::Watch => "Watch",
            HealthLabel::Risk => "Risk",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionLevel {
    Ok,
    Alert,
    Critical,
}

/// One card of the action panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionItem {
    pub level: ActionLevel,
    pub message: String,
}

impl ActionItem {
    fn new(level: ActionLevel, message: &str) -> Self {
        Self {
            level,
            message: message.to_string(),
        }
    }

    /// CSS modifier for the card
    pub fn css_class(&self) -> &'static str {
        match self.level {
            ActionLevel::Ok => "",
            ActionLevel::Alert => "alert",
            ActionLevel::Critical => "critical",
        }
    }
}

/// A flagged candle, for the anomaly list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyPoint {
    pub ts_start: DateTime<Utc>,
    pub source: Source,
    pub close: Option<f64>,
    pub bad_candle: bool,
    pub spike_flag: bool,
}

/// Dashboard KPIs for one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub rows: usize,
    pub sources: Vec<Source>,
    pub first_ts: DateTime<Utc>,
    pub last_ts: DateTime<Utc>,
    /// Mean over sources of each source's latest close
    pub latest_price: Option<f64>,
    /// Last close / first close - 1 over the window
    pub price_change: Option<f64>,
    pub freshness_secs: i64,
    pub freshness: String,
    pub missing_rate: f64,
    pub anomaly_rate: f64,
    pub bad_candle_rate: f64,
    pub spike_rate: f64,
    /// `1 - (0.6 * missing_rate + 0.4 * anomaly_rate)`, floored at 0
    pub health_score: f64,
    pub health: HealthLabel,
    pub actions: Vec<ActionItem>,
    pub divergence: Option<Divergence>,
    /// Most recent anomalies, newest first
    pub recent_anomalies: Vec<AnomalyPoint>,
    pub charts: ChartSeries,
}

impl DashboardSummary {
    /// `None` for an empty window. `candles` must be sorted by `(ts_start, source)`.
    pub fn compute(candles: &[Candle], now: DateTime<Utc>) -> Option<Self> {
        let first_ts = candles.first()?.ts_start;
        let last_ts = candles.iter().map(|c| c.ts_start).max()?;

        let mut latest_by_source: BTreeMap<Source, f64> = BTreeMap::new();
        for candle in candles {
            if let Some(close) = candle.close {
                latest_by_source.insert(candle.source, close);
            }
        }
        let latest_price = if latest_by_source.is_empty() {
            None
        } else {
            Some(latest_by_source.values().sum::<f64>() / latest_by_source.len() as f64)
        };

        let closes: Vec<f64> = candles.iter().filter_map(|c| c.close).collect();
        let price_change = match (closes.first(), closes.last()) {
            (Some(first), Some(last)) if closes.len() > 1 && *first != 0.0 => Some(last / first - 1.0),
            _ => None,
        };

        let freshness = now - last_ts;
        let missing_rate = rate(candles, |c| c.is_missing);
        let anomaly_rate = rate(candles, |c| c.anomaly_flag);
        let health_score = (1.0 - (missing_rate * 0.6 + anomaly_rate * 0.4)).max(0.0);

        let mut sources: Vec<Source> = candles.iter().map(|c| c.source).collect();
        sources.sort();
        sources.dedup();

        let recent_anomalies = candles
            .iter()
            .rev()
            .filter(|c| c.anomaly_flag)
            .take(RECENT_ANOMALIES)
            .map(|c| AnomalyPoint {
                ts_start: c.ts_start,
                source: c.source,
                close: c.close,
                bad_candle: c.bad_candle,
                spike_flag: c.spike_flag,
            })
            .collect();

        Some(Self {
            rows: candles.len(),
            sources,
            first_ts,
            last_ts,
            latest_price,
            price_change,
            freshness_secs: freshness.num_seconds(),
            freshness: time_ago(freshness),
            missing_rate,
            anomaly_rate,
            bad_candle_rate: rate(candles, |c| c.bad_candle),
            spike_rate: rate(candles, |c| c.spike_flag),
            health_score,
            health: HealthLabel::from_score(health_score),
            actions: action_panel(freshness, missing_rate, anomaly_rate),
            divergence: Divergence::compute(candles),
            recent_anomalies,
            charts: ChartSeries::compute(candles),
        })
    }

    /// Bars of the health breakdown chart
    pub fn health_breakdown(&self) -> [(&'static str, f64); 3] {
        [
            ("Missing", self.missing_rate),
            ("Bad candle", self.bad_candle_rate),
            ("Spike", self.spike_rate),
        ]
    }
}

fn action_panel(freshness: Duration, missing_rate: f64, anomaly_rate: f64) -> Vec<ActionItem> {
    let freshness_item = if freshness > Duration::hours(STALE_AFTER_HOURS) {
        ActionItem::new(ActionLevel::Critical, "Pipeline stale - investigate ETL run.")
    } else {
        ActionItem::new(ActionLevel::Ok, "Data is fresh and flowing.")
    };
    let coverage_item = if missing_rate > MISSING_RATE_ALERT {
        ActionItem::new(ActionLevel::Alert, "High missing rate - backfill recent window.")
    } else {
        ActionItem::new(ActionLevel::Ok, "Coverage is healthy.")
    };
    let anomaly_item = if anomaly_rate > ANOMALY_RATE_ALERT {
        ActionItem::new(ActionLevel::Alert, "Spike anomalies elevated - verify source data.")
    } else {
        ActionItem::new(ActionLevel::Ok, "Anomaly rate within normal range.")
    };
    vec![freshness_item, coverage_item, anomaly_item]
}
