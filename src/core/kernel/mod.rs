/// Spotline kernel - transport layer for REST and WebSocket communication
///
/// The kernel holds transport logic and the generic interfaces the trading
/// layer is written against. Nothing in here knows what an order or a ticker
/// is.
///
/// ## Transport
/// - `RestClient`: HTTP interface returning raw response bodies
/// - `WsSession`: WebSocket connection management with auto-pong
///
/// ## Authentication
/// - `Signer`: pluggable request signing
/// - `HmacSigner`: HMAC-SHA256 over the query, body and timestamp
/// - `public_endpoint` / `private_endpoint`: URL composition
///
/// ## Message Handling
/// - `WsCodec`: exchange-specific frame encoding/decoding
///
/// # Usage
///
/// ```rust,no_run
/// use spotline::core::config::Credential;
/// use spotline::core::kernel::*;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let signer = Arc::new(HmacSigner::new(Credential::new("api_key", "secret_key")));
/// let rest = RestClientBuilder::new(RestClientConfig::new(
///     "https://testnet.binance.vision".to_string(),
///     "binance".to_string(),
/// ))
/// .with_signer(signer)
/// .build()?;
///
/// let status = rest.get("/sapi/v1/account/status", "", Security::Signed).await?;
/// println!("{}", status);
/// # Ok(())
/// # }
/// ```
pub mod codec;
pub mod endpoint;
pub mod rest;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use codec::WsCodec;
pub use endpoint::{private_endpoint, public_endpoint};
pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig, Security};
pub use signer::{sign, HmacSigner, SignedRequest, Signer, API_KEY_HEADER};
pub use ws::{TungsteniteWs, WsConfig, WsSession};
