pub mod ollama;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::ModelServiceError;
use crate::model::ModelId;

/// Text generation backend that turns a prompt into recommendation text.
pub trait LanguageModelService: Send + Sync {
    /// Run `prompt` through `model` and return the generated text.
    ///
    /// Blocks for as long as the backend takes, bounded only by the
    /// implementation's own timeout.
    fn generate(
        &self,
        model: ModelId,
        prompt: &str,
    ) -> BoxFuture<'_, Result<String, Report<ModelServiceError>>>;
}
