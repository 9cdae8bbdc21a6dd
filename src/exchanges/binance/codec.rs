use crate::core::errors::ExchangeError;
use crate::core::kernel::WsCodec;
use crate::exchanges::binance::types::{BinanceStreamError, BinanceWebSocketTicker};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone)]
pub enum BinanceMessage {
    Ticker(BinanceWebSocketTicker),
    /// `{"result":null,"id":n}` answering a SUBSCRIBE/UNSUBSCRIBE
    SubscriptionAck { id: u64 },
    Error {
        code: i64,
        message: String,
        id: Option<u64>,
    },
    Unknown,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BinanceCodec;

impl BinanceCodec {
    fn encode_request(
        method: &str,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Message {
        let stream_refs: Vec<&str> = streams.iter().map(|s| s.as_ref()).collect();
        let request = json!({
            "method": method,
            "params": stream_refs,
            "id": request_id
        });
        Message::Text(request.to_string())
    }

    fn decode_ticker(data: Value) -> Result<BinanceMessage, ExchangeError> {
        serde_json::from_value(data)
            .map(BinanceMessage::Ticker)
            .map_err(|e| ExchangeError::transport("decode ticker", e.to_string()))
    }
}

impl WsCodec for BinanceCodec {
    type Message = BinanceMessage;

    fn encode_subscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<Message, ExchangeError> {
        Ok(Self::encode_request("SUBSCRIBE", streams, request_id))
    }

    fn encode_unsubscription(
        &self,
        streams: &[impl AsRef<str> + Send + Sync],
        request_id: u64,
    ) -> Result<Message, ExchangeError> {
        Ok(Self::encode_request("UNSUBSCRIBE", streams, request_id))
    }

    fn decode_message(&self, message: Message) -> Result<Option<Self::Message>, ExchangeError> {
        let text = match message {
            Message::Text(text) => text,
            Message::Binary(data) => String::from_utf8(data).map_err(|e| {
                ExchangeError::transport("decode stream frame", format!("invalid UTF-8: {}", e))
            })?,
            _ => return Ok(None),
        };

        let mut value: Value = serde_json::from_str(&text)
            .map_err(|e| ExchangeError::transport("decode stream frame", e.to_string()))?;

        // Combined stream format
        if let Some(stream) = value.get("stream").and_then(Value::as_str) {
            if !stream.ends_with("@ticker") {
                return Ok(Some(BinanceMessage::Unknown));
            }
            let data = value.get_mut("data").map(Value::take).ok_or_else(|| {
                ExchangeError::transport("decode stream frame", "missing data field")
            })?;
            return Self::decode_ticker(data).map(Some);
        }

        // Raw stream format
        if let Some(event_type) = value.get("e").and_then(Value::as_str) {
            if event_type == "24hrTicker" {
                return Self::decode_ticker(value).map(Some);
            }
            return Ok(Some(BinanceMessage::Unknown));
        }

        if value.get("error").is_some() {
            let frame: BinanceStreamError = serde_json::from_value(value)
                .map_err(|e| ExchangeError::transport("decode stream error", e.to_string()))?;
            return Ok(Some(BinanceMessage::Error {
                code: frame.error.code,
                message: frame.error.msg,
                id: frame.id,
            }));
        }

        if value.get("result").is_some() {
            if let Some(id) = value.get("id").and_then(Value::as_u64) {
                return Ok(Some(BinanceMessage::SubscriptionAck { id }));
            }
        }

        Ok(Some(BinanceMessage::Unknown))
    }
}

/// `<symbol>@ticker`; stream names are lowercase
pub fn ticker_stream_name(symbol: &str) -> String {
    format!("{}@ticker", symbol.to_lowercase())
}

/// Combined-stream endpoint under a stream base URL
pub fn combined_stream_url(stream_base_url: &str) -> String {
    format!("{}/stream", stream_base_url.trim_end_matches('/'))
}
