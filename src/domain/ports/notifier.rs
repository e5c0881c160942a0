use crate::domain::error::DomainError;
use async_trait::async_trait;

/// Outbound messages and inbound user commands.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// Send a message with lightweight HTML markup (`<b>`, `<i>`).
    async fn send(&self, text: &str) -> Result<(), DomainError>;

    /// Drain command messages received since the last call. Each message is
    /// delivered at most once.
    async fn receive(&self) -> Result<Vec<String>, DomainError>;
}
