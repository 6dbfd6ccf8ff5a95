//! HTML dashboard

use askama::Template;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use trustboard::dashboard::{DashboardSummary, Divergence, Series};
use trustboard::data::Source;

/// SVG viewBox of the time-series charts
const CHART_WIDTH: f64 = 640.0;
const CHART_HEIGHT: f64 = 200.0;
/// SVG viewBox of the health breakdown bars
const BARS_WIDTH: f64 = 300.0;
const BARS_HEIGHT: f64 = 200.0;
const PAD: f64 = 12.0;
/// Smallest rate the breakdown bars scale to, so near-zero rates stay short
const BARS_MIN_SCALE: f64 = 0.01;

#[derive(Template)]
#[template(path = "dashboard.html", escape = "html")]
pub struct DashboardTemplate {
    pub days: u32,
    pub sources: String,
    pub source_label: String,
    pub generated_at: String,
    pub summary: Option<SummaryView>,
    /// Shown instead of the KPIs when there is nothing to summarize
    pub notice: String,
}

impl DashboardTemplate {
    pub fn new(days: u32, sources: &[Source], now: DateTime<Utc>, summary: Option<&DashboardSummary>) -> Self {
        let names: Vec<&str> = sources.iter().map(Source::as_str).collect();
        Self {
            days,
            sources: names.join(","),
            source_label: source_label(sources),
            generated_at: now.format("%Y-%m-%d %H:%M UTC").to_string(),
            summary: summary.map(SummaryView::from),
            notice: "No data yet. Run the etl pipeline to populate the candle table.".to_string(),
        }
    }

    pub fn unavailable(days: u32, sources: &[Source], now: DateTime<Utc>) -> Self {
        Self {
            notice: "No data available: the candle store could not be read.".to_string(),
            ..Self::new(days, sources, now, None)
        }
    }
}

pub struct SummaryView {
    pub rows: usize,
    pub window: String,
    pub latest_price: String,
    pub price_change: String,
    pub freshness: String,
    pub missing_rate: String,
    pub anomaly_rate: String,
    pub bad_candle_rate: String,
    pub spike_rate: String,
    pub health_score: String,
    pub health_label: String,
    pub health_class: String,
    pub actions: Vec<ActionView>,
    pub divergence: Option<DivergenceView>,
    pub anomalies: Vec<AnomalyView>,
    /// Close, volume, anomaly and divergence charts that have data
    pub charts: Vec<ChartView>,
    pub health_bars: Vec<BarView>,
    pub bars_view_box: String,
}

pub struct ActionView {
    pub class: String,
    pub message: String,
}

pub struct DivergenceView {
    pub latest: String,
    pub latest_ts: String,
    pub mean_abs: String,
    pub max_abs: String,
    pub points: usize,
}

pub struct AnomalyView {
    pub ts: String,
    pub source: String,
    pub close: String,
    pub kind: String,
}

/// One inline SVG time-series chart, coordinates already scaled to `view_box`
pub struct ChartView {
    pub title: String,
    pub view_box: String,
    pub y_max: String,
    pub y_min: String,
    pub lines: Vec<LineView>,
    pub dots: Vec<DotView>,
}

pub struct LineView {
    pub label: String,
    pub class: String,
    /// SVG polyline `points`, empty for scatter charts
    pub points: String,
}

pub struct DotView {
    pub class: String,
    pub cx: String,
    pub cy: String,
}

pub struct BarView {
    pub label: String,
    pub value: String,
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
}

/// Time and value extent shared by every line of a chart
struct Frame {
    t0: i64,
    t1: i64,
    y0: f64,
    y1: f64,
}

impl Frame {
    fn fit<'a>(series: impl IntoIterator<Item = &'a Series>) -> Option<Self> {
        let mut frame: Option<Frame> = None;
        for (ts, value) in series.into_iter().flatten() {
            if !value.is_finite() {
                continue;
            }
            let t = ts.timestamp();
            frame = Some(match frame {
                None => Frame { t0: t, t1: t, y0: *value, y1: *value },
                Some(f) => Frame {
                    t0: f.t0.min(t),
                    t1: f.t1.max(t),
                    y0: f.y0.min(*value),
                    y1: f.y1.max(*value),
                },
            });
        }
        frame
    }

    fn x(&self, ts: DateTime<Utc>) -> f64 {
        if self.t1 == self.t0 {
            return CHART_WIDTH / 2.0;
        }
        let share = (ts.timestamp() - self.t0) as f64 / (self.t1 - self.t0) as f64;
        PAD + share * (CHART_WIDTH - 2.0 * PAD)
    }

    fn y(&self, value: f64) -> f64 {
        if self.y1 == self.y0 {
            return CHART_HEIGHT / 2.0;
        }
        let share = (value - self.y0) / (self.y1 - self.y0);
        CHART_HEIGHT - PAD - share * (CHART_HEIGHT - 2.0 * PAD)
    }

    fn point(&self, ts: DateTime<Utc>, value: f64) -> (String, String) {
        (format!("{:.1}", self.x(ts)), format!("{:.1}", self.y(value)))
    }
}

/// `(label, css class, series)` of one chart line
type LineInput<'a> = (String, String, &'a Series);

fn source_lines(map: &BTreeMap<Source, Series>) -> Vec<LineInput<'_>> {
    map.iter()
        .map(|(source, series)| (source.to_string(), source.as_str().to_string(), series))
        .collect()
}

/// `None` when no line has a finite point
fn chart(title: &str, inputs: Vec<LineInput<'_>>, fmt_y: fn(f64) -> String, scatter: bool) -> Option<ChartView> {
    let frame = Frame::fit(inputs.iter().map(|(_, _, series)| *series))?;
    let mut lines = Vec::with_capacity(inputs.len());
    let mut dots = Vec::new();
    for (label, class, series) in inputs {
        let finite = series.iter().filter(|(_, v)| v.is_finite());
        let points = if scatter {
            for (ts, value) in finite {
                let (cx, cy) = frame.point(*ts, *value);
                dots.push(DotView { class: class.clone(), cx, cy });
            }
            String::new()
        } else {
            finite
                .map(|(ts, value)| {
                    let (x, y) = frame.point(*ts, *value);
                    format!("{},{}", x, y)
                })
                .collect::<Vec<_>>()
                .join(" ")
        };
        lines.push(LineView { label, class, points });
    }
    Some(ChartView {
        title: title.to_string(),
        view_box: format!("0 0 {} {}", CHART_WIDTH, CHART_HEIGHT),
        y_max: fmt_y(frame.y1),
        y_min: fmt_y(frame.y0),
        lines,
        dots,
    })
}

fn health_bars(summary: &DashboardSummary) -> Vec<BarView> {
    let breakdown = summary.health_breakdown();
    let scale = breakdown.iter().map(|(_, rate)| *rate).fold(BARS_MIN_SCALE, f64::max);
    let slot = (BARS_WIDTH - 2.0 * PAD) / breakdown.len() as f64;
    // Room under the bars for their labels
    let plot_height = BARS_HEIGHT - 2.0 * PAD - 16.0;
    breakdown
        .iter()
        .enumerate()
        .map(|(i, (label, rate))| {
            let height = rate.clamp(0.0, scale) / scale * plot_height;
            BarView {
                label: label.to_string(),
                value: fmt_pct(*rate),
                x: format!("{:.1}", PAD + i as f64 * slot + slot * 0.2),
                y: format!("{:.1}", PAD + plot_height - height),
                width: format!("{:.1}", slot * 0.6),
                height: format!("{:.1}", height),
            }
        })
        .collect()
}

fn summary_charts(s: &DashboardSummary) -> Vec<ChartView> {
    let mut charts = Vec::new();
    charts.extend(chart("Close price", source_lines(&s.charts.close), |v| fmt_price(Some(v)), false));
    charts.extend(chart("Reported volume", source_lines(&s.charts.volume), fmt_amount, false));
    charts.extend(chart(
        "Anomalies over time",
        source_lines(&s.charts.anomalies),
        |v| fmt_price(Some(v)),
        true,
    ));
    if let Some(d) = &s.divergence {
        let line = vec![("Kraken vs CoinGecko".to_string(), "divergence".to_string(), &d.series)];
        charts.extend(chart("Price divergence (Kraken vs CoinGecko)", line, fmt_signed_pct, false));
    }
    charts
}

impl From<&DashboardSummary> for SummaryView {
    fn from(s: &DashboardSummary) -> Self {
        Self {
            rows: s.rows,
            window: format!("{} to {}", fmt_ts(s.first_ts), fmt_ts(s.last_ts)),
            latest_price: fmt_price(s.latest_price),
            price_change: s.price_change.map(fmt_signed_pct).unwrap_or_else(|| "n/a".to_string()),
            freshness: s.freshness.clone(),
            missing_rate: fmt_pct(s.missing_rate),
            anomaly_rate: fmt_pct(s.anomaly_rate),
            bad_candle_rate: fmt_pct(s.bad_candle_rate),
            spike_rate: fmt_pct(s.spike_rate),
            health_score: format!("{:.0}", s.health_score * 100.0),
            health_label: s.health.to_string(),
            health_class: s.health.css_class().to_string(),
            actions: s
                .actions
                .iter()
                .map(|a| ActionView {
                    class: a.css_class().to_string(),
                    message: a.message.clone(),
                })
                .collect(),
            divergence: s.divergence.as_ref().map(DivergenceView::from),
            anomalies: s
                .recent_anomalies
                .iter()
                .map(|a| AnomalyView {
                    ts: fmt_ts(a.ts_start),
                    source: a.source.to_string(),
                    close: fmt_price(a.close),
                    kind: match (a.bad_candle, a.spike_flag) {
                        (true, true) => "bad candle, spike",
                        (true, false) => "bad candle",
                        _ => "spike",
                    }
                    .to_string(),
                })
                .collect(),
            charts: summary_charts(s),
            health_bars: health_bars(s),
            bars_view_box: format!("0 0 {} {}", BARS_WIDTH, BARS_HEIGHT),
        }
    }
}

impl From<&Divergence> for DivergenceView {
    fn from(d: &Divergence) -> Self {
        Self {
            latest: fmt_signed_pct(d.latest_pct),
            latest_ts: fmt_ts(d.latest_ts),
            mean_abs: fmt_pct(d.mean_abs_pct),
            max_abs: fmt_pct(d.max_abs_pct),
            points: d.points,
        }
    }
}

fn source_label(sources: &[Source]) -> String {
    if sources.len() == Source::ALL.len() {
        "all sources".to_string()
    } else {
        sources.iter().map(Source::as_str).collect::<Vec<_>>().join(", ")
    }
}

fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

fn fmt_price(price: Option<f64>) -> String {
    price.map(|p| format!("${:.2}", p)).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_amount(value: f64) -> String {
    format!("{:.2}", value)
}

fn fmt_pct(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn fmt_signed_pct(fraction: f64) -> String {
    format!("{:+.2}%", fraction * 100.0)
}
