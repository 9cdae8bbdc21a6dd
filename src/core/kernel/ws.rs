use crate::core::errors::ExchangeError;
use crate::core::kernel::codec::WsCodec;
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, instrument, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// How long to wait for the exchange to acknowledge a subscription
    pub ack_timeout: Duration,
    /// Capacity of the channel between the socket reader and its consumer
    pub message_buffer_size: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(5),
            message_buffer_size: 1024,
        }
    }
}

/// WebSocket session trait - pure transport layer
#[async_trait]
pub trait WsSession<C: WsCodec>: Send + Sync {
    /// Connect to the WebSocket
    async fn connect(&mut self) -> Result<(), ExchangeError>;

    /// Send a raw message
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError>;

    /// Receive the next data message; control frames are handled internally
    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ExchangeError>;

    /// Check if the connection is alive
    fn is_connected(&self) -> bool;

    /// Subscribe to streams using the codec
    async fn subscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<(), ExchangeError>;

    /// Unsubscribe from streams using the codec
    async fn unsubscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<(), ExchangeError>;

    /// Get the next decoded message
    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>>;
}

/// Tungstenite-based WebSocket implementation
pub struct TungsteniteWs<C: WsCodec> {
    url: String,
    write: Option<SplitSink<WsStream, Message>>,
    read: Option<SplitStream<WsStream>>,
    connected: bool,
    exchange_name: String,
    codec: C,
    config: WsConfig,
}

impl<C: WsCodec> TungsteniteWs<C> {
    /// Create a new WebSocket session with the given codec
    ///
    /// # Arguments
    /// * `url` - The WebSocket URL to connect to
    /// * `exchange_name` - Name of the exchange for logging/tracing
    /// * `codec` - The codec to handle message encoding/decoding
    pub fn new(url: String, exchange_name: String, codec: C) -> Self {
        Self {
            url,
            write: None,
            read: None,
            connected: false,
            exchange_name,
            codec,
            config: WsConfig::default(),
        }
    }

    /// Set custom WebSocket configuration
    pub fn with_config(mut self, config: WsConfig) -> Self {
        self.config = config;
        self
    }
}

#[async_trait]
impl<C: WsCodec> WsSession<C> for TungsteniteWs<C> {
    #[instrument(skip(self), fields(exchange = %self.exchange_name, url = %self.url))]
    async fn connect(&mut self) -> Result<(), ExchangeError> {
        let (ws_stream, _) = tokio::time::timeout(self.config.connect_timeout, connect_async(&self.url))
            .await
            .map_err(|_| {
                ExchangeError::transport("websocket connect", "connection timeout")
            })?
            .map_err(|e| {
                ExchangeError::transport("websocket connect", e.to_string())
            })?;

        let (write, read) = ws_stream.split();
        self.write = Some(write);
        self.read = Some(read);
        self.connected = true;

        debug!("WebSocket connected");
        Ok(())
    }

    #[instrument(skip(self, msg), fields(exchange = %self.exchange_name))]
    async fn send_raw(&mut self, msg: Message) -> Result<(), ExchangeError> {
        if !self.connected {
            return Err(ExchangeError::StreamDisconnected(
                "WebSocket not connected".to_string(),
            ));
        }

        let write = self.write.as_mut().ok_or_else(|| {
            ExchangeError::StreamDisconnected("WebSocket write stream not available".to_string())
        })?;

        write.send(msg).await.map_err(|e| {
            self.connected = false;
            ExchangeError::StreamDisconnected(format!("Failed to send WebSocket message: {}", e))
        })?;

        Ok(())
    }

    async fn next_raw(&mut self) -> Option<Result<Message, ExchangeError>> {
        loop {
            if !self.connected {
                return None;
            }

            let read = self.read.as_mut()?;

            match read.next().await {
                Some(Ok(Message::Ping(data))) => {
                    // Auto-respond to pings at transport level
                    if let Err(e) = self.send_raw(Message::Pong(data)).await {
                        warn!("Failed to send pong response: {}", e);
                    }
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {}
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "WebSocket closed by peer");
                    self.connected = false;
                    return None;
                }
                Some(Ok(message)) => return Some(Ok(message)),
                Some(Err(e)) => {
                    self.connected = false;
                    return Some(Err(ExchangeError::StreamDisconnected(format!(
                        "WebSocket error: {}",
                        e
                    ))));
                }
                None => {
                    self.connected = false;
                    return None;
                }
            }
        }
    }

    #[instrument(skip(self), fields(exchange = %self.exchange_name))]
    async fn close(&mut self) -> Result<(), ExchangeError> {
        if let Some(write) = self.write.as_mut() {
            if self.connected {
                let _ = write.send(Message::Close(None)).await;
            }
        }
        self.connected = false;
        self.write = None;
        self.read = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    #[instrument(skip(self, streams), fields(exchange = %self.exchange_name, stream_count = streams.len()))]
    async fn subscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<(), ExchangeError> {
        if streams.is_empty() {
            return Ok(());
        }

        let message = self.codec.encode_subscription(streams, request_id)?;
        self.send_raw(message).await
    }

    #[instrument(skip(self, streams), fields(exchange = %self.exchange_name, stream_count = streams.len()))]
    async fn unsubscribe(
        &mut self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<(), ExchangeError> {
        if streams.is_empty() {
            return Ok(());
        }

        let message = self.codec.encode_unsubscription(streams, request_id)?;
        self.send_raw(message).await
    }

    async fn next_message(&mut self) -> Option<Result<C::Message, ExchangeError>> {
        loop {
            match self.next_raw().await? {
                Ok(raw_msg) => match self.codec.decode_message(raw_msg) {
                    Ok(Some(decoded)) => return Some(Ok(decoded)),
                    Ok(None) => {} // Codec chose to ignore this message
                    Err(e) => return Some(Err(e)),
                },
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
