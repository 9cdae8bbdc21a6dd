pub mod core;
pub mod exchanges;
pub mod trading;
pub mod utils;

pub use crate::core::{
    config::{ClientConfig, Credential, Environment},
    errors::ExchangeError,
    traits::{OrderTransport, TickerFeed, TickerSubscription},
    types::*,
};
pub use exchanges::binance::BinanceTransport;
pub use trading::{LoggingTickerHandler, OrderEngine, SessionConfig, TickerHandler, TickerSession};
