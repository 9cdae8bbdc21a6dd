pub mod codec;
pub mod converters;
pub mod rest;
pub mod transport;
pub mod types;

use crate::core::config::ClientConfig;
use crate::core::errors::ExchangeError;

// Re-export main types for easier importing
pub use codec::{BinanceCodec, BinanceMessage};
pub use rest::BinanceRestClient;
pub use transport::BinanceTransport;
pub use types::{
    BinanceAccountStatus, BinanceExchangeInfo, BinanceMarket, BinancePriceTicker,
    BinanceServerTime, BinanceWebSocketTicker,
};

/// Create a Binance transport from explicit configuration
pub fn create_binance_transport(config: &ClientConfig) -> Result<BinanceTransport, ExchangeError> {
    BinanceTransport::from_config(config)
}
