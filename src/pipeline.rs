//! Single-ticker analysis: fetch, indicators, recommendation, chart.
//!
//! Each call to [`AnalysisPipeline::analyze`] owns all of its data; the
//! pipeline itself only holds shared handles to the two external services,
//! so concurrent analyses never observe each other.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use error_stack::{FrameKind, Report, ResultExt, bail};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::chart::ChartSpec;
use crate::error::AnalysisError;
use crate::indicator::IndicatorEngine;
use crate::llm::LanguageModelService;
use crate::model::{IndicatorSet, ModelId};
use crate::normalizer;
use crate::prompt::RecommendationPrompt;
use crate::provider::MarketDataProvider;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Fetching,
    Normalizing,
    ComputingIndicators,
    BuildingPrompt,
    AwaitingRecommendation,
    BuildingChart,
    Done,
    Failed(String),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetching => write!(f, "fetching"),
            Self::Normalizing => write!(f, "normalizing"),
            Self::ComputingIndicators => write!(f, "computing_indicators"),
            Self::BuildingPrompt => write!(f, "building_prompt"),
            Self::AwaitingRecommendation => write!(f, "awaiting_recommendation"),
            Self::BuildingChart => write!(f, "building_chart"),
            Self::Done => write!(f, "done"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Current step of one invocation. `Failed` is absorbing.
#[derive(Debug)]
struct StateTracker {
    state: PipelineState,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            state: PipelineState::Fetching,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        if matches!(self.state, PipelineState::Failed(_)) {
            return;
        }
        debug!(from = %self.state, to = %next, "pipeline transition");
        self.state = next;
    }

    fn fail(&mut self, reason: String) {
        if !matches!(self.state, PipelineState::Failed(_)) {
            self.state = PipelineState::Failed(reason);
        }
    }
}

/// Validated input of one analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub model: ModelId,
}

impl AnalysisRequest {
    /// Build a request from presentation-layer input; dates are `YYYY-MM-DD`.
    pub fn parse(
        ticker: &str,
        start: &str,
        end: &str,
        model: ModelId,
    ) -> Result<Self, Report<AnalysisError>> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            bail!(AnalysisError::InvalidRequest {
                reason: "ticker must not be empty".into(),
            });
        }

        Ok(Self {
            ticker: ticker.to_owned(),
            start: parse_date("start date", start)?,
            end: parse_date("end date", end)?,
            model,
        })
    }
}

fn parse_date(label: &str, value: &str) -> Result<NaiveDate, Report<AnalysisError>> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).change_context(
        AnalysisError::InvalidRequest {
            reason: format!("{label} \"{value}\" is not a YYYY-MM-DD date"),
        },
    )
}

/// Everything a successful analysis produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    pub table: IndicatorSet,
    pub chart: ChartSpec,
    pub recommendation: String,
}

/// Outcome handed to the presentation layer: all three outputs, or only a message.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Success(AnalysisOutput),
    Failure { message: String },
}

impl AnalysisResult {
    #[allow(dead_code)]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[allow(dead_code)]
    pub fn table(&self) -> Option<&IndicatorSet> {
        match self {
            Self::Success(output) => Some(&output.table),
            Self::Failure { .. } => None,
        }
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        match self {
            Self::Success(output) => Some(&output.chart),
            Self::Failure { .. } => None,
        }
    }

    /// Recommendation text on success, failure message otherwise.
    pub fn message(&self) -> &str {
        match self {
            Self::Success(output) => &output.recommendation,
            Self::Failure { message } => message,
        }
    }
}

impl From<Result<AnalysisOutput, Report<AnalysisError>>> for AnalysisResult {
    fn from(result: Result<AnalysisOutput, Report<AnalysisError>>) -> Self {
        match result {
            Ok(output) => Self::Success(output),
            Err(report) => Self::Failure {
                message: failure_message(&report),
            },
        }
    }
}

/// Top-level error kind, followed by the innermost cause when there is one.
fn failure_message(report: &Report<AnalysisError>) -> String {
    let summary = report.current_context().to_string();
    let root_cause = report
        .frames()
        .filter_map(|frame| match frame.kind() {
            FrameKind::Context(context) => Some(context.to_string()),
            FrameKind::Attachment(_) => None,
        })
        .last();

    match root_cause {
        Some(cause) if cause != summary => format!("{summary}: {cause}"),
        _ => summary,
    }
}

pub struct AnalysisPipeline {
    provider: Arc<dyn MarketDataProvider>,
    model_service: Arc<dyn LanguageModelService>,
    engine: IndicatorEngine,
}

impl AnalysisPipeline {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        model_service: Arc<dyn LanguageModelService>,
    ) -> Self {
        Self {
            provider,
            model_service,
            engine: IndicatorEngine::new(),
        }
    }

    /// Run one analysis and collapse any failure into a single message.
    pub async fn analyze(
        &self,
        ticker: &str,
        start: &str,
        end: &str,
        model: ModelId,
    ) -> AnalysisResult {
        let result = match AnalysisRequest::parse(ticker, start, end, model) {
            Ok(request) => self.run(&request).await,
            Err(report) => {
                warn!(error = ?report, "rejected analysis request");
                Err(report)
            }
        };
        result.into()
    }

    /// Run one analysis, keeping the structured error kind.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisOutput, Report<AnalysisError>> {
        let span = info_span!(
            "analysis",
            run_id = %Uuid::new_v4(),
            ticker = %request.ticker,
            model = %request.model,
        );

        async {
            let mut tracker = StateTracker::new();
            let result = self.execute(request, &mut tracker).await;
            match &result {
                Ok(_) => info!(state = %tracker.state, "analysis complete"),
                Err(report) => {
                    let failed_at = tracker.state.to_string();
                    tracker.fail(report.current_context().to_string());
                    warn!(failed_at = %failed_at, state = %tracker.state, error = ?report, "analysis failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        request: &AnalysisRequest,
        tracker: &mut StateTracker,
    ) -> Result<AnalysisOutput, Report<AnalysisError>> {
        info!(
            start = %request.start,
            end = %request.end,
            provider = self.provider.name(),
            "fetching price history"
        );
        let raw = self
            .provider
            .fetch(&request.ticker, request.start, request.end)
            .await
            .change_context(AnalysisError::Fetch {
                ticker: request.ticker.clone(),
            })?;

        tracker.advance(PipelineState::Normalizing);
        let series = normalizer::normalize(raw)?;

        tracker.advance(PipelineState::ComputingIndicators);
        let table = self.engine.compute(&series);
        debug!(
            bars = table.len(),
            required = self.engine.required_bars(),
            "indicators computed"
        );

        tracker.advance(PipelineState::BuildingPrompt);
        let prompt = RecommendationPrompt::from_indicators(&table)?;

        tracker.advance(PipelineState::AwaitingRecommendation);
        let recommendation = self
            .model_service
            .generate(request.model, prompt.as_str())
            .await
            .change_context(AnalysisError::ModelService {
                model: request.model.to_string(),
            })?;

        tracker.advance(PipelineState::BuildingChart);
        let chart = ChartSpec::from_indicators(&table);

        tracker.advance(PipelineState::Done);
        Ok(AnalysisOutput {
            table,
            chart,
            recommendation,
        })
    }
}
