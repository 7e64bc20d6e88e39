use std::num::NonZeroUsize;

use crate::indicator::{Indicator, align_series};

/// RSI value reported when a window has neither gains nor losses.
pub const FLAT_RSI: f64 = 50.0;

/// RSI (Relative Strength Index) over simple rolling means of gains and losses.
///
/// Unlike Wilder's smoothing, each value only depends on the trailing
/// `period` price changes.
pub struct Rsi {
    period: NonZeroUsize,
}

impl Rsi {
    pub fn new(period: NonZeroUsize) -> Self {
        Self { period }
    }

    /// Calculate RSI for every full window of price changes (internal helper).
    pub fn calculate_prices(&self, prices: &[f64]) -> Vec<f64> {
        let period = self.period.get();
        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

        deltas
            .windows(period)
            .map(|w| {
                let avg_gain = w.iter().map(|&d| d.max(0.0)).sum::<f64>() / period as f64;
                let avg_loss = w.iter().map(|&d| (-d).max(0.0)).sum::<f64>() / period as f64;
                rsi_value(avg_gain, avg_loss)
            })
            .collect()
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "rsi"
    }

    fn required_bars(&self) -> usize {
        self.period.get() + 1
    }

    fn series(&self, prices: &[f64]) -> Vec<Option<f64>> {
        align_series(prices.len(), self.calculate_prices(prices))
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { FLAT_RSI } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nonzero_ext::nonzero;

    #[test]
    fn rsi_insufficient_data_is_all_undefined() {
        let rsi = Rsi::new(nonzero!(14usize));
        let values = rsi.series(&[1.0; 14]);
        assert_eq!(values, vec![None; 14]);
    }

    #[test]
    fn rsi_first_defined_after_period_deltas() {
        let rsi = Rsi::new(nonzero!(14usize));
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + (i % 3) as f64).collect();
        let values = rsi.series(&prices);
        assert!(values[13].is_none());
        assert!(values[14].is_some());
        assert_eq!(values.iter().flatten().count(), 20 - 14);
    }

    #[test]
    fn rsi_all_gains_returns_100() {
        let rsi = Rsi::new(nonzero!(3usize));
        let values = rsi.series(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(values[3], Some(100.0));
    }

    #[test]
    fn rsi_all_losses_returns_0() {
        let rsi = Rsi::new(nonzero!(3usize));
        let values = rsi.series(&[4.0, 3.0, 2.0, 1.0]);
        assert!((values[3].unwrap() - 0.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_flat_prices_use_flat_policy() {
        let rsi = Rsi::new(nonzero!(14usize));
        let values = rsi.series(&[25.0; 40]);
        let defined: Vec<f64> = values.into_iter().flatten().collect();
        assert_eq!(defined.len(), 40 - 14);
        assert!(defined.iter().all(|&v| v == FLAT_RSI));
    }

    #[test]
    fn rsi_known_value() {
        let rsi = Rsi::new(nonzero!(2usize));
        // deltas: +2, -1 -> avg_gain = 1.0, avg_loss = 0.5 -> RS = 2 -> RSI = 66.67
        let values = rsi.series(&[10.0, 12.0, 11.0]);
        assert!((values[2].unwrap() - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn rsi_window_forgets_old_losses() {
        let rsi = Rsi::new(nonzero!(2usize));
        // The single loss leaves the window after two more gains.
        let values = rsi.series(&[10.0, 9.0, 10.0, 11.0]);
        assert_eq!(values[3], Some(100.0));
    }
}
