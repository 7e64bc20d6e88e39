use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_BORDERS_ONLY,
};

use crate::model::IndicatorSet;
use crate::pipeline::AnalysisResult;
use crate::presenter::Presenter;

const MISSING: &str = "-";
const OVERBOUGHT: f64 = 70.0;
const OVERSOLD: f64 = 30.0;

/// Prints the indicator table tail and the recommendation to stdout.
pub struct TerminalPresenter {
    rows: usize,
}

impl TerminalPresenter {
    pub fn new(rows: usize) -> Self {
        Self { rows }
    }
}

impl Presenter for TerminalPresenter {
    fn present(&self, result: &AnalysisResult) {
        match result {
            AnalysisResult::Success(output) => {
                println!("\n{}", render_table(&output.table, self.rows));
                println!("\nAI Recommendation ({})\n{}", output.table.ticker, output.recommendation);
            }
            AnalysisResult::Failure { message } => {
                println!("\n{message}");
            }
        }
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_owned(), |v| format!("{v:.2}"))
}

fn rsi_color(rsi: Option<f64>) -> Color {
    match rsi {
        Some(v) if v >= OVERBOUGHT => Color::Red,
        Some(v) if v <= OVERSOLD => Color::Green,
        Some(_) => Color::Reset,
        None => Color::DarkGrey,
    }
}

/// Render the last `rows` points of `set` as a table, oldest first.
pub fn render_table(set: &IndicatorSet, rows: usize) -> Table {
    let header = ["Date", "Close", "MA50", "MA200", "RSI"];
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().enumerate().map(|(i, name)| {
            let cell = Cell::new(name).add_attribute(Attribute::Bold);
            if i == 0 {
                cell
            } else {
                cell.set_alignment(CellAlignment::Right)
            }
        }));

    let skip = set.len().saturating_sub(rows);
    for point in set.points.iter().skip(skip) {
        table.add_row(vec![
            Cell::new(point.date).fg(Color::DarkGrey),
            Cell::new(format!("{:.2}", point.close)).set_alignment(CellAlignment::Right),
            Cell::new(format_value(point.ma50)).set_alignment(CellAlignment::Right),
            Cell::new(format_value(point.ma200)).set_alignment(CellAlignment::Right),
            Cell::new(format_value(point.rsi14))
                .fg(rsi_color(point.rsi14))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    table
}
