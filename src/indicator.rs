pub mod ma;
pub mod rsi;

use std::num::NonZeroUsize;

use crate::model::{IndicatorPoint, IndicatorSet, PriceSeries};
use ma::Sma;
use rsi::Rsi;

pub const MA_SHORT_PERIOD: NonZeroUsize = period(50);
pub const MA_LONG_PERIOD: NonZeroUsize = period(200);
pub const RSI_PERIOD: NonZeroUsize = period(14);

const fn period(n: usize) -> NonZeroUsize {
    match NonZeroUsize::new(n) {
        Some(p) => p,
        None => panic!("indicator period must be > 0"),
    }
}

/// A technical analysis indicator over a close-price series.
///
/// Prices must be in ascending chronological order (oldest first).
pub trait Indicator: Send + Sync {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    #[allow(dead_code)]
    fn name(&self) -> &str;

    /// Number of bars needed before the first value is defined.
    fn required_bars(&self) -> usize;

    /// Calculate one value per input price.
    ///
    /// Positions where the trailing window is not yet full are `None`.
    fn series(&self, prices: &[f64]) -> Vec<Option<f64>>;
}

/// Place `values` at the tail of a `total_len` series, padding the head with `None`.
pub fn align_series(total_len: usize, values: Vec<f64>) -> Vec<Option<f64>> {
    let offset = total_len.saturating_sub(values.len());
    let mut output = vec![None; total_len];
    for (index, value) in values.into_iter().enumerate() {
        output[offset + index] = Some(value);
    }
    output
}

/// Computes MA50, MA200 and RSI14 for a price series.
pub struct IndicatorEngine {
    ma_short: Sma,
    ma_long: Sma,
    rsi: Rsi,
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self {
            ma_short: Sma::new(MA_SHORT_PERIOD),
            ma_long: Sma::new(MA_LONG_PERIOD),
            rsi: Rsi::new(RSI_PERIOD),
        }
    }

    /// Longest lookback among the engine's indicators.
    pub fn required_bars(&self) -> usize {
        [&self.ma_short as &dyn Indicator, &self.ma_long, &self.rsi]
            .iter()
            .map(|i| i.required_bars())
            .max()
            .unwrap_or(1)
    }

    /// Build a new `IndicatorSet` aligned with `series`. The input is not modified.
    pub fn compute(&self, series: &PriceSeries) -> IndicatorSet {
        let closes = series.closes();
        let ma50 = self.ma_short.series(&closes);
        let ma200 = self.ma_long.series(&closes);
        let rsi14 = self.rsi.series(&closes);

        let points = series
            .bars
            .iter()
            .zip(ma50)
            .zip(ma200)
            .zip(rsi14)
            .map(|(((bar, ma50), ma200), rsi14)| IndicatorPoint {
                date: bar.date,
                close: bar.close,
                ma50,
                ma200,
                rsi14,
            })
            .collect();

        IndicatorSet {
            ticker: series.ticker.clone(),
            points,
        }
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}
