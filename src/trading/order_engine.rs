use crate::core::{
    errors::{ExchangeError, ResultExt},
    traits::OrderTransport,
    types::{OrderFill, OrderRequest, OrderResponse, OrderSide, TradeIntent},
};
use rust_decimal::Decimal;
use tracing::{info, instrument};

/// Turns a trade intent into exactly one market order and interprets the fill
#[derive(Debug)]
pub struct OrderEngine<T: OrderTransport> {
    transport: T,
}

impl<T: OrderTransport> OrderEngine<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Market buy
    pub async fn buy(
        &self,
        symbol: &str,
        quote_quantity: Decimal,
        base_quantity: Decimal,
    ) -> Result<OrderFill, ExchangeError> {
        self.place_order(&TradeIntent::new(
            OrderSide::Buy,
            symbol,
            quote_quantity,
            base_quantity,
        ))
        .await
    }

    /// Market sell
    pub async fn sell(
        &self,
        symbol: &str,
        quote_quantity: Decimal,
        base_quantity: Decimal,
    ) -> Result<OrderFill, ExchangeError> {
        self.place_order(&TradeIntent::new(
            OrderSide::Sell,
            symbol,
            quote_quantity,
            base_quantity,
        ))
        .await
    }

    /// Validate, dispatch once and interpret the response.
    ///
    /// Sizing is resolved before any I/O. Exchange rejections come back as
    /// `OrderRejected`. Network and decode failures, and 5xx responses whose
    /// execution status is unknown, stay `TransportFailure`.
    #[instrument(skip(self, intent), fields(symbol = %intent.symbol, side = %intent.side))]
    pub async fn place_order(&self, intent: &TradeIntent) -> Result<OrderFill, ExchangeError> {
        let sizing = intent.sizing()?;
        let request = OrderRequest {
            side: intent.side,
            symbol: intent.symbol.clone(),
            kind: intent.kind,
            sizing,
        };

        info!(
            sizing_field = sizing.param_name(),
            amount = %sizing.amount(),
            "Placing market order"
        );

        let response = match self.transport.create_order(&request).await {
            Ok(response) => response,
            Err(ExchangeError::ApiError {
                status, message, ..
            }) if status >= 500 => {
                tracing::error!(symbol = %request.symbol, status, "Order outcome unknown");
                return Err(ExchangeError::transport(
                    format!("create order {}", request.symbol),
                    format!("HTTP {}, execution status unknown: {}", status, message),
                ));
            }
            Err(ExchangeError::ApiError { code, message, .. }) => {
                tracing::error!(symbol = %request.symbol, code = ?code, reason = %message, "Order rejected");
                return Err(ExchangeError::OrderRejected {
                    symbol: request.symbol,
                    code,
                    reason: message,
                });
            }
            Err(e) => return Err(e).with_symbol_context("create order", &request.symbol),
        };

        let fill = interpret_response(&request, response)?;
        info!(
            executed_quantity = %fill.executed_quantity,
            fill_price = %fill.fill_price,
            commission = %fill.commission,
            commission_asset = %fill.commission_asset,
            "Order filled"
        );
        Ok(fill)
    }
}

/// Pull the economic outcome out of a full response. The first fill's price
/// stands in for the whole order.
fn interpret_response(
    request: &OrderRequest,
    response: OrderResponse,
) -> Result<OrderFill, ExchangeError> {
    match response {
        OrderResponse::Full {
            executed_qty,
            fills,
            ..
        } => {
            let first = fills.into_iter().next().ok_or_else(|| {
                ExchangeError::transport(
                    format!("interpret order response {}", request.symbol),
                    "response carries no fills",
                )
            })?;

            Ok(OrderFill {
                symbol: request.symbol.clone(),
                side: request.side,
                executed_quantity: executed_qty,
                fill_price: first.price,
                commission: first.commission,
                commission_asset: first.commission_asset,
            })
        }
        OrderResponse::Executed { order_id, .. } | OrderResponse::Ack { order_id, .. } => {
            Err(ExchangeError::transport(
                format!("interpret order response {}", request.symbol),
                format!("response for order {} carries no fills", order_id),
            ))
        }
    }
}
