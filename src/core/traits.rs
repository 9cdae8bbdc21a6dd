use crate::core::{
    errors::ExchangeError,
    types::{FeedEvent, OrderRequest, OrderResponse},
};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Order-creation capability of the transport adapter
#[async_trait]
pub trait OrderTransport: Send + Sync {
    /// Send one order and return the decoded response. Never retried.
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError>;
}

/// A live ticker subscription handed back by a [`TickerFeed`]
#[derive(Debug)]
pub struct TickerSubscription {
    /// Events pushed by the delivery task
    pub events: mpsc::Receiver<FeedEvent>,
    /// The delivery task. It finishes once the token passed to
    /// `subscribe_ticker` is cancelled or the transport drops, and after it
    /// finishes nothing more is sent on `events`.
    pub delivery: JoinHandle<()>,
}

/// Streaming ticker capability of the transport adapter
#[async_trait]
pub trait TickerFeed: Send + Sync {
    /// Subscribe to ticker updates for `symbols`.
    ///
    /// Returns once the exchange has acknowledged the subscription. Cancelling
    /// `stop` is the only way to tear the subscription down from the caller's
    /// side.
    async fn subscribe_ticker(
        &self,
        symbols: &[String],
        stop: CancellationToken,
    ) -> Result<TickerSubscription, ExchangeError>;
}
