use crate::core::errors::{ExchangeError, ResultExt};
use crate::core::kernel::{RestClient, Security};
use crate::core::types::{OrderRequest, OrderResponse};
use crate::exchanges::binance::converters::convert_order_request;
use crate::exchanges::binance::types::{
    BinanceAccountStatus, BinanceExchangeInfo, BinancePriceTicker, BinanceServerTime,
};
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::form_urlencoded;

const PATH_PING: &str = "/api/v3/ping";
const PATH_TIME: &str = "/api/v3/time";
const PATH_EXCHANGE_INFO: &str = "/api/v3/exchangeInfo";
const PATH_TICKER_PRICE: &str = "/api/v3/ticker/price";
const PATH_ORDER: &str = "/api/v3/order";
const PATH_ACCOUNT_STATUS: &str = "/sapi/v1/account/status";

fn symbol_query(symbol: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("symbol", symbol)
        .finish()
}

fn decode<T: DeserializeOwned>(body: &str, operation: &str) -> Result<T, ExchangeError> {
    serde_json::from_str(body).with_operation_context(operation)
}

/// Thin typed wrapper around `RestClient` for the Binance spot API
#[derive(Debug, Clone)]
pub struct BinanceRestClient<R: RestClient> {
    client: R,
}

impl<R: RestClient> BinanceRestClient<R> {
    pub fn new(client: R) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &R {
        &self.client
    }

    /// Test connectivity
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), ExchangeError> {
        self.client
            .get(PATH_PING, "", Security::Public)
            .await
            .with_operation_context("ping")?;
        Ok(())
    }

    /// Exchange server time in milliseconds
    #[instrument(skip(self))]
    pub async fn server_time(&self) -> Result<BinanceServerTime, ExchangeError> {
        let body = self.client.get(PATH_TIME, "", Security::Public).await?;
        decode(&body, "decode server time")
    }

    /// Trading rules, optionally narrowed to one symbol
    #[instrument(skip(self))]
    pub async fn exchange_info(
        &self,
        symbol: Option<&str>,
    ) -> Result<BinanceExchangeInfo, ExchangeError> {
        let query = symbol.map(symbol_query).unwrap_or_default();
        let body = self
            .client
            .get(PATH_EXCHANGE_INFO, &query, Security::Public)
            .await?;
        decode(&body, "decode exchange info")
    }

    /// Latest price for a symbol
    #[instrument(skip(self))]
    pub async fn price_ticker(&self, symbol: &str) -> Result<BinancePriceTicker, ExchangeError> {
        let body = self
            .client
            .get(PATH_TICKER_PRICE, &symbol_query(symbol), Security::Public)
            .await
            .with_symbol_context("price ticker", symbol)?;
        decode(&body, "decode price ticker")
    }

    /// Account status (SAPI, signed)
    #[instrument(skip(self))]
    pub async fn account_status(&self) -> Result<BinanceAccountStatus, ExchangeError> {
        let body = self
            .client
            .get(PATH_ACCOUNT_STATUS, "", Security::Signed)
            .await?;
        decode(&body, "decode account status")
    }

    /// Place an order. Called once per order; never retried here.
    #[instrument(skip(self, order), fields(symbol = %order.symbol, side = %order.side))]
    pub async fn create_order(&self, order: &OrderRequest) -> Result<OrderResponse, ExchangeError> {
        let query = convert_order_request(order);
        let body = self.client.post(PATH_ORDER, &query, "").await?;
        serde_json::from_str(&body).with_symbol_context("decode order response", &order.symbol)
    }
}
