use std::num::NonZeroU32;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::MarketDataConfig;
use crate::error::ProviderError;
use crate::model::{PriceBar, PriceSeries};
use crate::provider::MarketDataProvider;

const PROVIDER_NAME: &str = "yahoo";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; stock-advisor/0.1)";
const NOT_FOUND_CODE: &str = "Not Found";

pub struct YahooFinanceProvider {
    client: reqwest::Client,
    base_url: String,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl YahooFinanceProvider {
    pub fn new(config: &MarketDataConfig) -> Result<Self, Report<ProviderError>> {
        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(5u32));
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .change_context(provider_error_request())?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
        })
    }
}

impl YahooFinanceProvider {
    /// `{base}/v8/finance/chart/{ticker}` with the ticker percent-encoded as one path segment.
    fn chart_url(&self, ticker: &str) -> Result<Url, Report<ProviderError>> {
        let mut url = Url::parse(&self.base_url)
            .change_context(provider_error_request())
            .attach_with(|| format!("base url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| {
                Report::new(provider_error_request())
                    .attach(format!("base url cannot hold a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        Ok(url)
    }
}

fn provider_error_request() -> ProviderError {
    ProviderError::Request {
        provider: PROVIDER_NAME.into(),
    }
}

fn provider_error_parse() -> ProviderError {
    ProviderError::ResponseParse {
        provider: PROVIDER_NAME.into(),
    }
}

impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> BoxFuture<'_, Result<PriceSeries, Report<ProviderError>>> {
        let ticker = ticker.to_owned();
        Box::pin(async move {
            self.rate_limiter.until_ready().await;

            let url = self.chart_url(&ticker)?;
            let period1 = day_start_timestamp(start).to_string();
            let period2 = day_start_timestamp(end).to_string();
            let params = [
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
                ("includeAdjustedClose", "true"),
            ];

            debug!(ticker = %ticker, %start, %end, "requesting yahoo chart");

            let response = self
                .client
                .get(url)
                .query(&params)
                .send()
                .await
                .change_context(provider_error_request())
                .attach_with(|| format!("ticker: {ticker}"))?;

            let status = response.status();
            if !status.is_success() && status != StatusCode::NOT_FOUND {
                return Err(Report::new(ProviderError::Upstream {
                    provider: PROVIDER_NAME.into(),
                    description: format!("HTTP status {status}"),
                })
                .attach(format!("ticker: {ticker}")));
            }

            let body: ChartResponse = response
                .json()
                .await
                .change_context(provider_error_parse())?;

            let bars = body.into_bars()?;

            info!(
                ticker = %ticker,
                %start,
                %end,
                fetched = bars.len(),
                "yahoo price history fetch complete"
            );

            Ok(PriceSeries::new(ticker, bars))
        })
    }
}

fn day_start_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

// ── Response types ────────────────────────────────────────────────────────────

/// `{ "chart": { "result": [...] | null, "error": {...} | null } }`
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    /// Absent when the requested range holds no trading days.
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds; bar dates are exchange-local.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
    /// Split- and dividend-adjusted closes, parallel to `quote`.
    #[serde(default)]
    adjclose: Vec<AdjCloseColumn>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseColumn {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Column-oriented OHLCV; any cell may be `null` for a halted session.
#[derive(Debug, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

impl ChartResponse {
    fn into_bars(self) -> Result<Vec<PriceBar>, Report<ProviderError>> {
        if let Some(error) = self.chart.error {
            if error.code == NOT_FOUND_CODE {
                return Ok(Vec::new());
            }
            return Err(Report::new(ProviderError::Upstream {
                provider: PROVIDER_NAME.into(),
                description: error.description.unwrap_or(error.code),
            }));
        }

        let Some(result) = self.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };
        let ChartIndicators { quote, adjclose } = result.indicators;
        let Some(quote) = quote.into_iter().next() else {
            return Ok(Vec::new());
        };
        let adjusted = adjclose
            .into_iter()
            .next()
            .map(|column| column.adjclose)
            .unwrap_or_default();

        let offset = result.meta.gmtoffset;
        let mut bars: Vec<PriceBar> = Vec::with_capacity(result.timestamp.len());
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let cells = (
                cell(&quote.open, i),
                cell(&quote.high, i),
                cell(&quote.low, i),
                cell(&quote.close, i),
            );
            let (Some(open), Some(high), Some(low), Some(close)) = cells else {
                debug!(timestamp = ts, "skipping yahoo row with missing prices");
                continue;
            };
            let date = DateTime::from_timestamp(ts + offset, 0)
                .ok_or_else(|| {
                    Report::new(provider_error_parse())
                        .attach(format!("timestamp out of range: {ts}"))
                })?
                .date_naive();

            if bars.last().is_some_and(|prev| prev.date >= date) {
                debug!(%date, "skipping out-of-order or duplicate yahoo row");
                continue;
            }

            // Rebase OHLC onto the adjusted close.
            let (ratio, close) = match cell(&adjusted, i) {
                Some(adj) if close != 0.0 => (adj / close, adj),
                _ => (1.0, close),
            };

            bars.push(PriceBar {
                date,
                open: open * ratio,
                high: high * ratio,
                low: low * ratio,
                close,
                volume: cell(&quote.volume, i).unwrap_or(0),
            });
        }

        Ok(bars)
    }
}

fn cell<T: Copy>(column: &[Option<T>], index: usize) -> Option<T> {
    column.get(index).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<PriceBar>, Report<ProviderError>> {
        serde_json::from_str::<ChartResponse>(json).unwrap().into_bars()
    }

    #[test]
    fn chart_response_parses_into_bars() {
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-14400},
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{
                "open":[187.15,184.22],
                "high":[188.44,185.88],
                "low":[183.89,183.43],
                "close":[185.64,184.25],
                "volume":[82488700,58414500]
            }]}
        }],"error":null}}"#;
        let bars = parse(json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[1].volume, 58414500);
    }

    #[test]
    fn rows_with_null_prices_are_skipped() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{
                "open":[null,184.22],
                "high":[null,185.88],
                "low":[null,183.43],
                "close":[null,184.25],
                "volume":[null,null]
            }]}
        }],"error":null}}"#;
        let bars = parse(json).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, 0);
    }

    #[test]
    fn not_found_error_is_empty_series() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn other_upstream_error_is_reported() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input - start date cannot be after end date"}}}"#;
        let report = parse(json).unwrap_err();
        assert!(matches!(
            report.current_context(),
            ProviderError::Upstream { .. }
        ));
    }

    #[test]
    fn empty_range_has_no_timestamps() {
        let json = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn split_is_rebased_onto_adjusted_close() {
        // AAPL around the 2020-08-31 4:1 split.
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-14400},
            "timestamp":[1598621400,1598880600],
            "indicators":{
                "quote":[{
                    "open":[504.05,127.58],
                    "high":[505.77,131.00],
                    "low":[498.31,126.00],
                    "close":[499.23,129.04],
                    "volume":[46907500,225702700]
                }],
                "adjclose":[{"adjclose":[124.81,129.04]}]
            }
        }],"error":null}}"#;
        let bars = parse(json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2020, 8, 28).unwrap());
        assert_eq!(bars[0].close, 124.81);
        assert_eq!(bars[1].close, 129.04);
        assert!((bars[0].open - 504.05 * 124.81 / 499.23).abs() < 1e-9);
        assert!((bars[0].high - 505.77 * 124.81 / 499.23).abs() < 1e-9);
        assert_eq!(bars[1].open, 127.58);
        assert_eq!(bars[0].volume, 46907500);
        assert!((bars[1].close / bars[0].close - 1.0).abs() < 0.05);
    }

    #[test]
    fn missing_adjusted_cell_keeps_raw_prices() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800],
            "indicators":{
                "quote":[{"open":[187.15],"high":[188.44],"low":[183.89],"close":[185.64],"volume":[1]}],
                "adjclose":[{"adjclose":[null]}]
            }
        }],"error":null}}"#;
        let bars = parse(json).unwrap();
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[0].open, 187.15);
    }

    #[test]
    fn chart_url_encodes_ticker_as_one_segment() {
        let provider = YahooFinanceProvider::new(&MarketDataConfig::default()).unwrap();

        let url = provider.chart_url("AAPL?interval=1m#").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/AAPL%3Finterval=1m%23");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = provider.chart_url("BRK/B").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/BRK%2FB");
    }

    #[test]
    fn chart_url_keeps_base_path_prefix() {
        let config = MarketDataConfig {
            base_url: "http://localhost:8080/yahoo/".into(),
            ..MarketDataConfig::default()
        };
        let provider = YahooFinanceProvider::new(&config).unwrap();
        let url = provider.chart_url("MSFT").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/yahoo/v8/finance/chart/MSFT");
    }

    #[test]
    fn day_start_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(day_start_timestamp(date), 1577836800);
    }

    /// Integration test: requires network access. Run with `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn integration_fetch_history() {
        let provider = YahooFinanceProvider::new(&MarketDataConfig::default()).unwrap();
        let series = provider
            .fetch(
                "AAPL",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            )
            .await
            .unwrap();
        assert!(!series.is_empty());
        assert!(series.bars.windows(2).all(|w| w[0].date < w[1].date));
    }
}
