mod chart;
mod config;
mod error;
mod indicator;
mod llm;
mod model;
mod normalizer;
mod pipeline;
mod presenter;
mod prompt;
mod provider;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use llm::LanguageModelService;
use llm::ollama::OllamaClient;
use model::ModelId;
use pipeline::{AnalysisPipeline, AnalysisResult};
use presenter::Presenter;
use presenter::terminal::TerminalPresenter;
use provider::MarketDataProvider;
use provider::yahoo::YahooFinanceProvider;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("failed to initialise external services")]
    Setup,
    #[display("analysis failed")]
    Analysis,
    #[display("failed to write output")]
    Output,
}

#[derive(Parser)]
#[command(
    name = "stock-advisor",
    about = "Technical indicators and an AI buy/hold/sell recommendation for one stock"
)]
struct Cli {
    /// Stock ticker, e.g. AAPL
    #[arg(short, long, default_value = "AAPL")]
    ticker: String,

    /// First day of history (YYYY-MM-DD)
    #[arg(short, long, default_value = "2020-01-01")]
    start: String,

    /// Day after the last bar of history (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    end: Option<String>,

    /// Model tag; defaults to `llm.default_model` from the config
    #[arg(short, long, value_parser = parse_model)]
    model: Option<ModelId>,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Write the chart description as JSON to this file
    #[arg(long)]
    chart_out: Option<PathBuf>,

    /// Number of most recent indicator rows to print
    #[arg(long, default_value_t = 10)]
    rows: usize,
}

fn parse_model(s: &str) -> Result<ModelId, String> {
    ModelId::from_str(s).ok_or_else(|| {
        let known: Vec<&str> = ModelId::ALL.iter().map(|m| m.as_str()).collect();
        format!("unknown model \"{s}\", expected one of {known:?}")
    })
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(&cli.config).change_context(AppError::Config)?;

    init_tracing(&config);

    let provider: Arc<dyn MarketDataProvider> = Arc::new(
        YahooFinanceProvider::new(&config.market_data).change_context(AppError::Setup)?,
    );
    let model_service: Arc<dyn LanguageModelService> =
        Arc::new(OllamaClient::new(&config.llm).change_context(AppError::Setup)?);
    let pipeline = AnalysisPipeline::new(provider, model_service);

    let end = cli
        .end
        .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
    let model = cli.model.unwrap_or_else(|| config.llm.default_model_id());

    info!(ticker = %cli.ticker, start = %cli.start, %end, %model, "starting analysis");

    let result = pipeline.analyze(&cli.ticker, &cli.start, &end, model).await;

    let presenter = TerminalPresenter::new(cli.rows);
    presenter.present(&result);

    if let (Some(path), Some(chart)) = (&cli.chart_out, result.chart()) {
        write_chart(path, chart)?;
        info!(path = %path.display(), "chart description written");
    }

    outcome(&result)
}

/// Exit status only; the presenter has already shown the failure message.
fn outcome(result: &AnalysisResult) -> Result<(), Report<AppError>> {
    match result {
        AnalysisResult::Success(_) => Ok(()),
        AnalysisResult::Failure { .. } => Err(Report::new(AppError::Analysis)),
    }
}

fn write_chart(path: &Path, chart: &chart::ChartSpec) -> Result<(), Report<AppError>> {
    let json = serde_json::to_string_pretty(chart).change_context(AppError::Output)?;
    std::fs::write(path, json)
        .change_context(AppError::Output)
        .attach_with(|| format!("path: {}", path.display()))
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_analysis_message_is_not_repeated_in_error_report() {
        let message = "DataUnavailable: no data found for ZZZZ";
        let result = AnalysisResult::Failure {
            message: message.into(),
        };

        let report = outcome(&result).unwrap_err();

        assert!(matches!(report.current_context(), AppError::Analysis));
        assert!(!format!("{report:?}").contains(message));
    }

    #[test]
    fn model_tag_parses_or_lists_known_tags() {
        assert_eq!(parse_model("phi4"), Ok(ModelId::Phi4));
        let err = parse_model("gpt-4").unwrap_err();
        assert!(err.contains("llama3.1"));
    }
}
