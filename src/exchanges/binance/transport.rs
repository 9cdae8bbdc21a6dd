use crate::core::{
    config::{ClientConfig, ConfigError},
    errors::ExchangeError,
    kernel::{
        HmacSigner, ReqwestRest, RestClientBuilder, RestClientConfig, TungsteniteWs, WsConfig,
        WsSession,
    },
    traits::{OrderTransport, TickerFeed, TickerSubscription},
    types::{FeedEvent, OrderRequest, OrderResponse},
};
use crate::exchanges::binance::codec::{
    combined_stream_url, ticker_stream_name, BinanceCodec, BinanceMessage,
};
use crate::exchanges::binance::converters::convert_binance_ticker;
use crate::exchanges::binance::rest::BinanceRestClient;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const EXCHANGE_NAME: &str = "binance";

/// Binance spot transport: signed REST orders and ticker streams
#[derive(Debug)]
pub struct BinanceTransport {
    rest: BinanceRestClient<ReqwestRest>,
    stream_base_url: String,
    ws_config: WsConfig,
    next_request_id: AtomicU64,
}

impl BinanceTransport {
    pub fn new(rest: BinanceRestClient<ReqwestRest>, stream_base_url: String) -> Self {
        Self {
            rest,
            stream_base_url,
            ws_config: WsConfig::default(),
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Build the REST client from configuration. A signer is attached only
    /// when both credential halves are present.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ExchangeError> {
        let rest_config =
            RestClientConfig::new(config.rest_base_url.clone(), EXCHANGE_NAME.to_string())
                .with_timeout(config.request_timeout);
        let mut rest_builder = RestClientBuilder::new(rest_config);

        if config.has_credentials() {
            let signer = Arc::new(HmacSigner::new(config.credential.clone()));
            rest_builder = rest_builder.with_signer(signer);
        }

        Ok(Self::new(
            BinanceRestClient::new(rest_builder.build()?),
            config.stream_base_url.clone(),
        ))
    }

    /// Set custom WebSocket configuration
    pub fn with_ws_config(mut self, ws_config: WsConfig) -> Self {
        self.ws_config = ws_config;
        self
    }

    pub fn rest(&self) -> &BinanceRestClient<ReqwestRest> {
        &self.rest
    }

    fn request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl OrderTransport for BinanceTransport {
    async fn create_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError> {
        self.rest.create_order(order).await
    }
}

#[async_trait]
impl TickerFeed for BinanceTransport {
    #[instrument(skip(self, stop), fields(exchange = EXCHANGE_NAME))]
    async fn subscribe_ticker(
        &self,
        symbols: &[String],
        stop: CancellationToken,
    ) -> Result<TickerSubscription, ExchangeError> {
        if symbols.is_empty() {
            return Err(ConfigError::InvalidConfiguration(
                "ticker subscription needs at least one symbol".to_string(),
            )
            .into());
        }

        let streams: Vec<String> = symbols.iter().map(|s| ticker_stream_name(s)).collect();
        let mut ws = TungsteniteWs::new(
            combined_stream_url(&self.stream_base_url),
            EXCHANGE_NAME.to_string(),
            BinanceCodec,
        )
        .with_config(self.ws_config.clone());

        ws.connect().await?;

        let request_id = self.request_id();
        let acknowledged = async {
            ws.subscribe(streams.as_slice(), request_id).await?;
            wait_for_ack(&mut ws, request_id).await
        };
        match tokio::time::timeout(self.ws_config.ack_timeout, acknowledged).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = ws.close().await;
                return Err(e);
            }
            Err(_) => {
                let _ = ws.close().await;
                return Err(ExchangeError::transport(
                    "subscribe ticker",
                    format!("no acknowledgement within {:?}", self.ws_config.ack_timeout),
                ));
            }
        }

        info!(streams = ?streams, "Ticker subscription acknowledged");

        let (tx, events) = mpsc::channel(self.ws_config.message_buffer_size);
        let delivery = tokio::spawn(deliver_tickers(ws, streams, self.request_id(), tx, stop));

        Ok(TickerSubscription { events, delivery })
    }
}

async fn wait_for_ack<W>(ws: &mut W, request_id: u64) -> Result<(), ExchangeError>
where
    W: WsSession<BinanceCodec>,
{
    loop {
        match ws.next_message().await {
            Some(Ok(BinanceMessage::SubscriptionAck { id })) if id == request_id => return Ok(()),
            Some(Ok(BinanceMessage::Error { code, message, .. })) => {
                return Err(ExchangeError::transport(
                    "subscribe ticker",
                    format!("code {}: {}", code, message),
                ));
            }
            Some(Ok(other)) => debug!(?other, "Ignoring frame while awaiting acknowledgement"),
            Some(Err(e)) => return Err(e),
            None => {
                return Err(ExchangeError::StreamDisconnected(
                    "connection closed before subscription was acknowledged".to_string(),
                ))
            }
        }
    }
}

/// Forward stream frames until `stop` fires, the receiver goes away or the
/// socket drops. A socket that is still open is unsubscribed, and the socket
/// is closed on every exit path.
async fn deliver_tickers<W>(
    mut ws: W,
    streams: Vec<String>,
    unsubscribe_id: u64,
    tx: mpsc::Sender<FeedEvent>,
    stop: CancellationToken,
) where
    W: WsSession<BinanceCodec>,
{
    loop {
        let event = tokio::select! {
            biased;
            () = stop.cancelled() => break,
            next = ws.next_message() => match next {
                Some(Ok(BinanceMessage::Ticker(ticker))) => {
                    FeedEvent::Update(convert_binance_ticker(ticker, Utc::now()))
                }
                Some(Ok(BinanceMessage::Error { code, message, .. })) => FeedEvent::Error(
                    ExchangeError::transport("ticker stream", format!("code {}: {}", code, message)),
                ),
                Some(Ok(_)) => continue,
                Some(Err(ExchangeError::StreamDisconnected(reason))) => {
                    let _ = tx.send(FeedEvent::Disconnected(reason)).await;
                    break;
                }
                Some(Err(e)) => FeedEvent::Error(e),
                None => {
                    let _ = tx
                        .send(FeedEvent::Disconnected("connection closed".to_string()))
                        .await;
                    break;
                }
            },
        };

        if tx.send(event).await.is_err() {
            debug!("Ticker receiver dropped");
            break;
        }
    }

    if ws.is_connected() {
        if let Err(e) = ws.unsubscribe(streams.as_slice(), unsubscribe_id).await {
            debug!(error = %e, "Failed to unsubscribe ticker streams");
        }
    }
    if let Err(e) = ws.close().await {
        warn!(error = %e, "Failed to close ticker stream");
    }
    debug!("Ticker delivery finished");
}
