use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum ProviderError {
    #[display("request to {provider} failed")]
    Request { provider: String },
    #[display("failed to parse response from {provider}")]
    ResponseParse { provider: String },
    #[display("{provider} reported an error: {description}")]
    Upstream {
        provider: String,
        description: String,
    },
}

#[derive(Debug, Display, Error)]
pub enum ModelServiceError {
    #[display("request to model service failed")]
    Request,
    #[display("failed to parse model service response")]
    ResponseParse,
    #[display("model {model} returned an empty response")]
    EmptyResponse { model: String },
    #[display("model service returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
}

/// Failure kinds of a single analysis run.
///
/// The rendered message of the top-level context is what the presentation
/// layer shows; the kind itself stays available for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum AnalysisError {
    #[display("DataUnavailable: no data found for {ticker}")]
    DataUnavailable { ticker: String },
    #[display(
        "InsufficientHistory: latest bar of {ticker} lacks {missing} (need at least {required} bars, got {available})"
    )]
    InsufficientHistory {
        ticker: String,
        missing: String,
        required: usize,
        available: usize,
    },
    #[display("FetchError: failed to fetch price history for {ticker}")]
    Fetch { ticker: String },
    #[display("ModelServiceError: model {model} failed to produce a recommendation")]
    ModelService { model: String },
    #[display("InvalidRequest: {reason}")]
    InvalidRequest { reason: String },
}
