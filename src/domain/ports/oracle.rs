use crate::domain::error::DomainError;
use async_trait::async_trait;

/// Text-generation service used for screening and crowd analysis.
///
/// Output is free text that is expected, but not guaranteed, to hold a JSON
/// object. Parsing is the caller's job.
#[async_trait]
pub trait Oracle: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, DomainError>;
}
