//! The seam between content generation and the inference service.

use crate::GenerateRequest;
use async_trait::async_trait;
use storyreel_error::StoryreelResult;

/// Anything that can answer generation requests from a local model.
///
/// Implemented by the lifecycle manager; test suites provide scripted fakes.
#[async_trait]
pub trait InferenceDriver: Send + Sync {
    /// Liveness probe. Never fails: any error means `false`.
    async fn is_online(&self) -> bool;

    /// Run one generation and return the raw response text. A request
    /// without a model runs on whatever model the implementation selects.
    async fn generate(&self, request: &GenerateRequest) -> StoryreelResult<String>;
}
