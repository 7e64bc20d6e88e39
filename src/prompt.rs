use std::fmt;

use error_stack::{Report, bail};

use crate::error::AnalysisError;
use crate::indicator::{MA_LONG_PERIOD, RSI_PERIOD};
use crate::model::{IndicatorSet, IndicatorSnapshot};

impl IndicatorSnapshot {
    /// Take the most recent point of `set`, requiring every indicator to be defined.
    pub fn latest(set: &IndicatorSet) -> Result<Self, Report<AnalysisError>> {
        let required = MA_LONG_PERIOD.get().max(RSI_PERIOD.get() + 1);
        let Some(point) = set.last() else {
            bail!(AnalysisError::InsufficientHistory {
                ticker: set.ticker.clone(),
                missing: "close, MA50, MA200, RSI".into(),
                required,
                available: 0,
            });
        };

        match (point.ma50, point.ma200, point.rsi14) {
            (Some(ma50), Some(ma200), Some(rsi14)) => Ok(Self {
                date: point.date,
                close: point.close,
                ma50,
                ma200,
                rsi14,
            }),
            (ma50, ma200, rsi14) => {
                let missing: Vec<&str> = [("MA50", ma50), ("MA200", ma200), ("RSI", rsi14)]
                    .into_iter()
                    .filter(|(_, value)| value.is_none())
                    .map(|(name, _)| name)
                    .collect();
                bail!(AnalysisError::InsufficientHistory {
                    ticker: set.ticker.clone(),
                    missing: missing.join(", "),
                    required,
                    available: set.len(),
                })
            }
        }
    }
}

/// Recommendation request rendered from one snapshot. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationPrompt {
    snapshot: IndicatorSnapshot,
    text: String,
}

impl RecommendationPrompt {
    pub fn new(snapshot: IndicatorSnapshot) -> Self {
        let text = format!(
            "Analyze this stock data and provide investment advice.
Recent price: {:.2}
50-day MA: {:.2}
200-day MA: {:.2}
RSI: {:.2}

Consider the technical indicators and classify the stock as exactly one of: Buy, Hold, or Sell.
Explain your reasoning in 3-4 sentences.",
            snapshot.close, snapshot.ma50, snapshot.ma200, snapshot.rsi14,
        );
        Self { snapshot, text }
    }

    /// Build the prompt from the latest point of `set`.
    pub fn from_indicators(set: &IndicatorSet) -> Result<Self, Report<AnalysisError>> {
        IndicatorSnapshot::latest(set).map(Self::new)
    }

    #[allow(dead_code)]
    pub fn snapshot(&self) -> &IndicatorSnapshot {
        &self.snapshot
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for RecommendationPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
