use crate::core::errors::ExchangeError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only immediate-execution market orders are supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderKind {
    #[default]
    Market,
}

impl OrderKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "MARKET",
        }
    }
}

/// The single sizing field sent with an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSizing {
    /// Notional in the quote asset (`quoteOrderQty`)
    Quote(Decimal),
    /// Units of the base asset (`quantity`)
    Base(Decimal),
}

impl OrderSizing {
    pub const fn param_name(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quoteOrderQty",
            Self::Base(_) => "quantity",
        }
    }

    pub const fn amount(&self) -> Decimal {
        match self {
            Self::Quote(amount) | Self::Base(amount) => *amount,
        }
    }
}

/// What the caller wants to trade, before validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeIntent {
    pub side: OrderSide,
    pub symbol: String,
    pub quote_quantity: Decimal,
    pub base_quantity: Decimal,
    pub kind: OrderKind,
}

impl TradeIntent {
    pub fn new(
        side: OrderSide,
        symbol: impl Into<String>,
        quote_quantity: Decimal,
        base_quantity: Decimal,
    ) -> Self {
        Self {
            side,
            symbol: symbol.into(),
            quote_quantity,
            base_quantity,
            kind: OrderKind::Market,
        }
    }

    /// Resolve the sizing field. Quote notional takes precedence over base
    /// quantity; the two are never combined.
    pub fn sizing(&self) -> Result<OrderSizing, ExchangeError> {
        if self.symbol.trim().is_empty() {
            return Err(ExchangeError::invalid_intent(
                &self.symbol,
                "symbol must not be empty",
            ));
        }
        if self.quote_quantity < Decimal::ZERO || self.base_quantity < Decimal::ZERO {
            return Err(ExchangeError::invalid_intent(
                &self.symbol,
                format!(
                    "quantities must not be negative (quote={}, base={})",
                    self.quote_quantity, self.base_quantity
                ),
            ));
        }

        if self.quote_quantity > Decimal::ZERO {
            Ok(OrderSizing::Quote(self.quote_quantity))
        } else if self.base_quantity > Decimal::ZERO {
            Ok(OrderSizing::Base(self.base_quantity))
        } else {
            Err(ExchangeError::invalid_intent(
                &self.symbol,
                "quote quantity or base quantity must be greater than 0",
            ))
        }
    }
}

/// A validated order as handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub side: OrderSide,
    pub symbol: String,
    pub kind: OrderKind,
    pub sizing: OrderSizing,
}

/// One executed portion of an order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub commission: Decimal,
    pub commission_asset: String,
}

/// Order placement responses. Any other JSON shape fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OrderResponse {
    /// `newOrderRespType=FULL`: execution details and fills
    #[serde(rename_all = "camelCase")]
    Full {
        symbol: String,
        order_id: u64,
        #[serde(with = "rust_decimal::serde::str")]
        executed_qty: Decimal,
        status: String,
        fills: Vec<Fill>,
    },
    /// `newOrderRespType=RESULT`: execution details without fills
    #[serde(rename_all = "camelCase")]
    Executed {
        symbol: String,
        order_id: u64,
        #[serde(with = "rust_decimal::serde::str")]
        executed_qty: Decimal,
        status: String,
    },
    /// `newOrderRespType=ACK`: identifiers only
    #[serde(rename_all = "camelCase")]
    Ack {
        symbol: String,
        order_id: u64,
        transact_time: i64,
    },
}

/// Economic outcome of a market order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderFill {
    pub symbol: String,
    pub side: OrderSide,
    pub executed_quantity: Decimal,
    /// Price of the first fill, used as the representative price
    pub fill_price: Decimal,
    pub commission: Decimal,
    pub commission_asset: String,
}

impl OrderFill {
    pub fn gross_value(&self) -> Decimal {
        self.executed_quantity * self.fill_price
    }

    /// Only meaningful when the commission is charged in the quote asset.
    pub fn net_value(&self) -> Decimal {
        self.gross_value() - self.commission
    }

    pub fn buy_received_quantity(&self) -> Decimal {
        self.executed_quantity
    }

    pub fn sell_proceeds(&self) -> Decimal {
        self.gross_value()
    }

    pub fn sell_commission(&self) -> Decimal {
        self.commission
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerUpdate {
    pub symbol: String,
    pub last_price: Decimal,
    pub received_at: DateTime<Utc>,
}

/// Fixed reference basis a ticker session values each tick against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Valuation {
    /// What was paid, in the quote asset
    pub quote_quantity: Decimal,
    /// What is held, in the base asset
    pub target_quantity: Decimal,
}

impl Valuation {
    pub const fn new(quote_quantity: Decimal, target_quantity: Decimal) -> Self {
        Self {
            quote_quantity,
            target_quantity,
        }
    }

    /// Profit estimate from the latest price alone. Fees and partial fills
    /// are not accounted for.
    pub fn evaluate(&self, update: &TickerUpdate) -> TickerMetric {
        let current_value = update.last_price * self.target_quantity;
        let unrealized_profit = current_value - self.quote_quantity;
        let profit_percent = if self.quote_quantity.is_zero() {
            None
        } else {
            Some(unrealized_profit / self.quote_quantity * Decimal::ONE_HUNDRED)
        };

        TickerMetric {
            symbol: update.symbol.clone(),
            last_price: update.last_price,
            current_value,
            unrealized_profit,
            profit_percent,
            received_at: update.received_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerMetric {
    pub symbol: String,
    pub last_price: Decimal,
    pub current_value: Decimal,
    pub unrealized_profit: Decimal,
    pub profit_percent: Option<Decimal>,
    pub received_at: DateTime<Utc>,
}

/// What a ticker feed delivers to its session
#[derive(Debug)]
pub enum FeedEvent {
    Update(TickerUpdate),
    /// Recoverable adapter-level error; the subscription stays up
    Error(ExchangeError),
    /// The transport is gone; no further deliveries will follow
    Disconnected(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    Draining,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Deadline,
    Stopped,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub transitions: Vec<SessionState>,
    pub end_reason: EndReason,
    pub updates_handled: u64,
    pub errors_reported: u64,
    pub started_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// Symbol listing as returned by exchange info
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Market {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub quote_order_qty_market_allowed: bool,
}
