use super::types as binance_types;
use crate::core::types::{Market, OrderRequest, TickerUpdate};
use chrono::{DateTime, Utc};
use url::form_urlencoded;

/// Convert binance market to core market type
pub fn convert_binance_market(binance_market: binance_types::BinanceMarket) -> Market {
    Market {
        symbol: binance_market.symbol,
        status: binance_market.status,
        base_asset: binance_market.base_asset,
        quote_asset: binance_market.quote_asset,
        quote_order_qty_market_allowed: binance_market.quote_order_qty_market_allowed,
    }
}

/// Convert a ticker event into an update stamped with the local receive time
pub fn convert_binance_ticker(
    ticker: binance_types::BinanceWebSocketTicker,
    received_at: DateTime<Utc>,
) -> TickerUpdate {
    TickerUpdate {
        symbol: ticker.symbol,
        last_price: ticker.last_price,
        received_at,
    }
}

/// Query string for `POST /api/v3/order`. Exactly one sizing field is
/// emitted and the full response type is always requested.
pub fn convert_order_request(order: &OrderRequest) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("symbol", &order.symbol)
        .append_pair("side", order.side.as_str())
        .append_pair("type", order.kind.as_str())
        .append_pair(
            order.sizing.param_name(),
            &order.sizing.amount().normalize().to_string(),
        )
        .append_pair("newOrderRespType", "FULL")
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderKind, OrderSide, OrderSizing};
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_query_quote_sizing() {
        let order = OrderRequest {
            side: OrderSide::Buy,
            symbol: "BTCFDUSD".to_string(),
            kind: OrderKind::Market,
            sizing: OrderSizing::Quote(dec!(100.00)),
        };
        assert_eq!(
            convert_order_request(&order),
            "symbol=BTCFDUSD&side=BUY&type=MARKET&quoteOrderQty=100&newOrderRespType=FULL"
        );
    }

    #[test]
    fn test_order_query_base_sizing() {
        let order = OrderRequest {
            side: OrderSide::Sell,
            symbol: "ETHUSDT".to_string(),
            kind: OrderKind::Market,
            sizing: OrderSizing::Base(dec!(0.0015)),
        };
        let query = convert_order_request(&order);
        assert!(query.contains("side=SELL"));
        assert!(query.contains("&quantity=0.0015&"));
        assert!(!query.contains("quoteOrderQty"));
    }
}
