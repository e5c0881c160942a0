use crate::domain::error::DomainError;
use crate::domain::values::bar::{Bar, BarWindow};
use async_trait::async_trait;

/// Price data collaborator.
#[async_trait]
pub trait MarketData: Send + Sync {
    fn name(&self) -> &str;

    /// Bars in chronological order. An empty vector means no data.
    async fn bars(&self, ticker: &str, window: BarWindow) -> Result<Vec<Bar>, DomainError>;

    /// Close of the most recent quote bar.
    async fn latest_price(&self, ticker: &str) -> Result<f64, DomainError> {
        let bars = self.bars(ticker, BarWindow::Quote).await?;
        bars.last()
            .map(|b| b.close)
            .ok_or_else(|| DomainError::DataUnavailable(format!("no quote for {ticker}")))
    }
}
