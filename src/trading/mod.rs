pub mod order_engine;
pub mod ticker_session;

pub use order_engine::OrderEngine;
pub use ticker_session::{LoggingTickerHandler, SessionConfig, TickerHandler, TickerSession};
