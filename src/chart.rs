//! Declarative chart description of the close price and moving averages.
//!
//! Nothing here renders; a [`ChartSpec`] serializes to JSON for whichever
//! front end draws it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::IndicatorSet;

const CLOSE_HOVER_TEMPLATE: &str = "Date: %{x}<br>Price: $%{y:.2f}<extra></extra>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineDash {
    Solid,
    Dot,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// Stable key: `"close"`, `"ma50"` or `"ma200"`.
    pub key: &'static str,
    /// Legend label.
    pub name: &'static str,
    pub dash: LineDash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover_template: Option<&'static str>,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartLayout {
    pub title: String,
    pub x_axis_title: &'static str,
    pub y_axis_title: &'static str,
    pub hover_mode: &'static str,
    pub show_legend: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub layout: ChartLayout,
    /// Shared date axis, one entry per bar.
    pub dates: Vec<NaiveDate>,
    pub series: Vec<ChartSeries>,
}

impl ChartSpec {
    /// Project `set` onto close/MA50/MA200 lines. Undefined MA values are left out.
    pub fn from_indicators(set: &IndicatorSet) -> Self {
        let points = &set.points;

        let close = points
            .iter()
            .map(|p| ChartPoint {
                date: p.date,
                value: p.close,
            })
            .collect();
        let ma50 = points
            .iter()
            .filter_map(|p| p.ma50.map(|value| ChartPoint { date: p.date, value }))
            .collect();
        let ma200 = points
            .iter()
            .filter_map(|p| p.ma200.map(|value| ChartPoint { date: p.date, value }))
            .collect();

        Self {
            layout: ChartLayout {
                title: format!("{} Price Analysis", set.ticker),
                x_axis_title: "Date",
                y_axis_title: "Price ($)",
                hover_mode: "x unified",
                show_legend: true,
            },
            dates: points.iter().map(|p| p.date).collect(),
            series: vec![
                ChartSeries {
                    key: "close",
                    name: "Close Price",
                    dash: LineDash::Solid,
                    hover_template: Some(CLOSE_HOVER_TEMPLATE),
                    points: close,
                },
                ChartSeries {
                    key: "ma50",
                    name: "50-day MA",
                    dash: LineDash::Dot,
                    hover_template: None,
                    points: ma50,
                },
                ChartSeries {
                    key: "ma200",
                    name: "200-day MA",
                    dash: LineDash::Dash,
                    hover_template: None,
                    points: ma200,
                },
            ],
        }
    }

    #[allow(dead_code)]
    pub fn series(&self, key: &str) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::IndicatorEngine;
    use crate::indicator::tests::{series_from_closes, synthetic_closes};

    fn chart_for(len: usize) -> (IndicatorSet, ChartSpec) {
        let series = series_from_closes("AAPL", &synthetic_closes(len));
        let set = IndicatorEngine::new().compute(&series);
        let chart = ChartSpec::from_indicators(&set);
        (set, chart)
    }

    #[test]
    fn close_series_covers_every_date() {
        let (set, chart) = chart_for(60);
        let close = chart.series("close").unwrap();
        assert_eq!(close.points.len(), set.len());
        assert_eq!(chart.dates.len(), set.len());
    }

    #[test]
    fn undefined_averages_are_gaps_not_zero() {
        let (set, chart) = chart_for(60);
        let ma50 = chart.series("ma50").unwrap();
        assert_eq!(ma50.points.len(), 60 - 49);
        assert_eq!(ma50.points[0].date, set.points[49].date);
        assert!(ma50.points.iter().all(|p| p.value != 0.0));
        assert!(chart.series("ma200").unwrap().points.is_empty());
    }

    #[test]
    fn layout_metadata() {
        let (_, chart) = chart_for(5);
        assert_eq!(chart.layout.title, "AAPL Price Analysis");
        assert_eq!(chart.layout.x_axis_title, "Date");
        assert_eq!(chart.layout.y_axis_title, "Price ($)");
        assert!(chart.layout.show_legend);
        assert_eq!(chart.series("ma50").unwrap().dash, LineDash::Dot);
        assert_eq!(chart.series("ma200").unwrap().dash, LineDash::Dash);
    }

    #[test]
    fn serializes_to_json() {
        let (_, chart) = chart_for(3);
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["series"][0]["key"], "close");
        assert_eq!(json["series"][1]["dash"], "dot");
        assert_eq!(json["dates"][0], "2020-01-01");
        assert!(json["series"][1].get("hover_template").is_none());
    }
}
