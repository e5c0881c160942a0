use crate::domain::error::DomainError;
use crate::domain::ports::notifier::Notifier;
use async_trait::async_trait;
use tracing::info;

/// Writes messages to the log and never receives commands. Used when no
/// Telegram token is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<(), DomainError> {
        info!(target: "huntbot::notify", "{text}");
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<String>, DomainError> {
        Ok(Vec::new())
    }
}
