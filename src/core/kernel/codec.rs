use crate::core::errors::ExchangeError;
use tokio_tungstenite::tungstenite::Message;

/// Codec trait for handling exchange-specific WebSocket message encoding/decoding
///
/// Control frames (ping, pong, close) never reach the codec; they are handled
/// by the transport.
pub trait WsCodec: Send + Sync + 'static {
    /// The type representing parsed messages from this exchange
    type Message: Send + Sync;

    /// Encode a subscription request for the given stream names
    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<Message, ExchangeError>;

    /// Encode an unsubscription request for the given stream names
    fn encode_unsubscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<Message, ExchangeError>;

    /// Decode a raw WebSocket message into a typed message
    ///
    /// # Returns
    /// - `Ok(Some(message))` - Successfully decoded message
    /// - `Ok(None)` - Message was ignored/filtered by codec
    /// - `Err(error)` - Failed to decode message
    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError>;
}
