pub mod terminal;

use crate::pipeline::AnalysisResult;

/// Sink for finished analyses.
pub trait Presenter: Send + Sync {
    fn present(&self, result: &AnalysisResult);
}
