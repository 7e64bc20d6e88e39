use std::num::NonZeroUsize;

use crate::indicator::{Indicator, align_series};

/// Simple Moving Average of the trailing `period` prices, current bar included.
pub struct Sma {
    period: NonZeroUsize,
}

impl Sma {
    pub fn new(period: NonZeroUsize) -> Self {
        Self { period }
    }

    /// Calculate SMA values for every full window in `prices` (internal helper).
    ///
    /// Returns an empty vector when fewer than `period` prices are available.
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        let period = self.period.get();
        prices
            .windows(period)
            .map(|w| w.iter().sum::<f64>() / period as f64)
            .collect()
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_bars(&self) -> usize {
        self.period.get()
    }

    fn series(&self, prices: &[f64]) -> Vec<Option<f64>> {
        align_series(prices.len(), self.calculate_prices(prices))
    }
}
