use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Language model identifiers the advisor can be run against.
///
/// String representations match the model tags understood by the inference
/// service (e.g. `"llama3.1"`, `"phi4"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "llama3.1")]
    Llama31,
    #[default]
    #[serde(rename = "deepseek-r1:14b")]
    DeepseekR1_14b,
    #[serde(rename = "phi4")]
    Phi4,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [Self::Llama31, Self::DeepseekR1_14b, Self::Phi4];

    /// Parse a model tag into a `ModelId`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "llama3.1" => Some(Self::Llama31),
            "deepseek-r1:14b" => Some(Self::DeepseekR1_14b),
            "phi4" => Some(Self::Phi4),
            _ => None,
        }
    }

    /// Return the model tag sent to the inference service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llama31 => "llama3.1",
            Self::DeepseekR1_14b => "deepseek-r1:14b",
            Self::Phi4 => "phi4",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One dated OHLCV record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Daily bars for one ticker, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            ticker: ticker.into(),
            bars,
        }
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

/// Indicator values for one bar. `None` while the trailing window is not full.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub ma50: Option<f64>,
    pub ma200: Option<f64>,
    pub rsi14: Option<f64>,
}

/// Indicator rows aligned index-for-index with the source `PriceSeries`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSet {
    pub ticker: String,
    pub points: Vec<IndicatorPoint>,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&IndicatorPoint> {
        self.points.last()
    }
}

/// Fully-defined indicator state of the most recent bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub ma50: f64,
    pub ma200: f64,
    pub rsi14: f64,
}
