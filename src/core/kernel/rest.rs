use crate::core::errors::ExchangeError;
use crate::core::kernel::endpoint::{private_endpoint, public_endpoint};
use crate::core::kernel::signer::Signer;
use crate::utils::time::timestamp_millis;
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Whether a call needs a signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    Public,
    Signed,
}

/// REST client trait for making HTTP requests
///
/// Implementations return the raw response body on success. Non-2xx
/// responses come back as `ExchangeError::ApiError`, network problems as
/// `ExchangeError::TransportFailure`.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Make a GET request
    ///
    /// # Arguments
    /// * `path` - The API endpoint path
    /// * `query` - Encoded query string (without leading '?')
    /// * `security` - Whether to sign the request
    async fn get(&self, path: &str, query: &str, security: Security)
        -> Result<String, ExchangeError>;

    /// Make a signed POST request
    ///
    /// # Arguments
    /// * `path` - The API endpoint path
    /// * `query` - Encoded query string (without leading '?')
    /// * `body` - Form-encoded request body, may be empty
    async fn post(&self, path: &str, query: &str, body: &str) -> Result<String, ExchangeError>;
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Hard deadline for connect + read
    pub timeout: Duration,
    /// User agent string to include in requests
    pub user_agent: String,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout: crate::core::config::DEFAULT_REQUEST_TIMEOUT,
            user_agent: "spotline/0.1".to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            signer: None,
        }
    }

    /// Set the signer for authenticated requests
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::transport("build http client", e.to_string())
            })?;

        Ok(ReqwestRest {
            client,
            config: self.config,
            signer: self.signer,
        })
    }
}

/// Error body the exchange returns alongside non-2xx statuses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    signer: Option<Arc<dyn Signer>>,
}

impl std::fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Handle the response and extract the body
    #[instrument(skip(self, response), fields(exchange = %self.config.exchange_name, status = %response.status()))]
    async fn handle_response(&self, response: Response) -> Result<String, ExchangeError> {
        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            ExchangeError::transport("read response body", e.to_string())
        })?;

        trace!("Response body: {}", response_text);

        if status.is_success() {
            return Ok(response_text);
        }

        let (code, message) = match serde_json::from_str::<ApiErrorBody>(&response_text) {
            Ok(body) => (Some(body.code), body.msg),
            Err(_) => (None, response_text),
        };

        Err(ExchangeError::ApiError {
            status: status.as_u16(),
            code,
            message,
        })
    }

    /// Make a request, signing it at send time when required
    #[instrument(skip(self, body), fields(exchange = %self.config.exchange_name, method = %method, path = %path))]
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        query: &str,
        body: &str,
        security: Security,
    ) -> Result<String, ExchangeError> {
        let mut headers = Vec::new();

        let url = match security {
            Security::Public => public_endpoint(&self.config.base_url, path, query),
            Security::Signed => {
                let signer = self.signer.as_ref().ok_or_else(|| {
                    ExchangeError::SigningFailure(
                        "Authentication required but no signer provided".to_string(),
                    )
                })?;

                // Fresh timestamp per request, taken when signing
                let signed = signer.sign_request(path, query, body, timestamp_millis()?)?;
                headers.extend(signer.headers());

                private_endpoint(
                    &self.config.base_url,
                    &signed.path,
                    &signed.query,
                    &signed.signature_hex,
                    signed.timestamp_millis,
                )
            }
        };

        debug!(path = %path, signed = matches!(security, Security::Signed), "Sending request");

        let mut request = self.client.request(method, &url);
        for (key, value) in headers {
            request = request.header(&key, &value);
        }

        if !body.is_empty() {
            request = request
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(body.to_string());
        }

        let response = request.send().await?;

        self.handle_response(response).await
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, query), fields(exchange = %self.config.exchange_name, path = %path))]
    async fn get(
        &self,
        path: &str,
        query: &str,
        security: Security,
    ) -> Result<String, ExchangeError> {
        self.make_request(Method::GET, path, query, "", security)
            .await
    }

    #[instrument(skip(self, query, body), fields(exchange = %self.config.exchange_name, path = %path))]
    async fn post(&self, path: &str, query: &str, body: &str) -> Result<String, ExchangeError> {
        self.make_request(Method::POST, path, query, body, Security::Signed)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_request_without_signer_fails_locally() {
        let rest = RestClientBuilder::new(RestClientConfig::new(
            "http://127.0.0.1:9".to_string(),
            "binance".to_string(),
        ))
        .build()
        .unwrap();

        let err = rest
            .get("/sapi/v1/account/status", "", Security::Signed)
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::SigningFailure(_)));
    }

    #[test]
    fn test_debug_hides_signer() {
        let rest = RestClientBuilder::new(
            RestClientConfig::new("https://api.binance.com".to_string(), "binance".to_string())
                .with_timeout(Duration::from_secs(3)),
        )
        .build()
        .unwrap();
        let rendered = format!("{:?}", rest);
        assert!(rendered.contains("has_signer: false"));
        assert_eq!(rest.base_url(), "https://api.binance.com");
    }
}
