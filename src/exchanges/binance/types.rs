use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceServerTime {
    #[serde(rename = "serverTime")]
    pub server_time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceMarket {
    pub symbol: String,
    pub status: String,
    #[serde(rename = "baseAsset")]
    pub base_asset: String,
    #[serde(rename = "quoteAsset")]
    pub quote_asset: String,
    #[serde(rename = "quoteOrderQtyMarketAllowed", default)]
    pub quote_order_qty_market_allowed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceExchangeInfo {
    #[serde(default)]
    pub timezone: String,
    #[serde(rename = "serverTime")]
    pub server_time: u64,
    pub symbols: Vec<BinanceMarket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinancePriceTicker {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

/// `GET /sapi/v1/account/status` body, e.g. `{"data":"Normal"}`
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceAccountStatus {
    pub data: String,
}

// WebSocket Types
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceWebSocketTicker {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c", with = "rust_decimal::serde::str")]
    pub last_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceStreamErrorDetail {
    pub code: i64,
    pub msg: String,
}

/// Error frame answering a malformed or rejected request
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceStreamError {
    pub error: BinanceStreamErrorDetail,
    pub id: Option<u64>,
}
