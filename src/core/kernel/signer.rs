use crate::core::config::Credential;
use crate::core::errors::ExchangeError;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;
use url::form_urlencoded;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key on every signed call
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// A request ready to be sent, with its signature and the timestamp it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub path: String,
    pub query: String,
    pub body: String,
    pub timestamp_millis: u64,
    pub signature_hex: String,
}

/// Build the exact payload that gets signed
///
/// With a query the payload is `query + body + "&timestamp=" + t`; query and
/// body are concatenated as-is. Without a query it is `"timestamp=" + t`.
pub fn signing_payload(query: &str, body: &str, timestamp_millis: u64) -> String {
    if query.is_empty() {
        format!("timestamp={}", timestamp_millis)
    } else {
        format!("{}{}&timestamp={}", query, body, timestamp_millis)
    }
}

/// Lowercase-hex HMAC-SHA256 of `data` keyed by `secret`
pub fn hmac_sha256_hex(secret: &str, data: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::SigningFailure(format!("Failed to create HMAC: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Query-escape a value the way `application/x-www-form-urlencoded` does
pub fn query_escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Sign a request payload.
///
/// Pure and deterministic; an empty secret is accepted. Returns the
/// query-escaped hex signature.
pub fn sign(
    secret: &str,
    query: &str,
    body: &str,
    timestamp_millis: u64,
) -> Result<String, ExchangeError> {
    let payload = signing_payload(query, body, timestamp_millis);
    let signature = hmac_sha256_hex(secret, &payload)?;
    Ok(query_escape(&signature))
}

/// Signer trait for request authentication
pub trait Signer: Send + Sync {
    /// Sign a request at the given wall-clock timestamp
    fn sign_request(
        &self,
        path: &str,
        query: &str,
        body: &str,
        timestamp_millis: u64,
    ) -> Result<SignedRequest, ExchangeError>;

    /// Headers to attach to every signed call
    fn headers(&self) -> HashMap<String, String>;
}

/// HMAC-SHA256 signer holding the session's credential
pub struct HmacSigner {
    credential: Credential,
}

impl HmacSigner {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }
}

impl Signer for HmacSigner {
    fn sign_request(
        &self,
        path: &str,
        query: &str,
        body: &str,
        timestamp_millis: u64,
    ) -> Result<SignedRequest, ExchangeError> {
        let signature_hex = sign(self.credential.secret_key(), query, body, timestamp_millis)?;

        Ok(SignedRequest {
            path: path.to_string(),
            query: query.to_string(),
            body: body.to_string(),
            timestamp_millis,
            signature_hex,
        })
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            API_KEY_HEADER.to_string(),
            self.credential.api_key().to_string(),
        );
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Made-up key from the exchange's public signing examples
    const SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
    const TIMESTAMP: u64 = 1_499_827_319_559;
    const FULL_QUERY: &str =
        "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000";

    #[test]
    fn test_known_vector_query_only() {
        let signature = sign(SECRET, FULL_QUERY, "", TIMESTAMP).unwrap();
        assert_eq!(
            signature,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_known_vector_query_and_body() {
        let signature = sign(
            SECRET,
            "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC",
            "quantity=1&price=0.1&recvWindow=5000",
            TIMESTAMP,
        )
        .unwrap();
        assert_eq!(
            signature,
            "0fd168b8ddb4876a0358a8d14d0c9f3da0e9b20c5d52b2a00fcf7d1c602f9a77"
        );
    }

    #[test]
    fn test_empty_query_signs_timestamp_only() {
        assert_eq!(signing_payload("", "ignored", TIMESTAMP), "timestamp=1499827319559");
        assert_eq!(
            sign(SECRET, "", "", TIMESTAMP).unwrap(),
            "2222d49722f6af5da13f6da6bfc0d7de19ca2815ebc98bbc49e4942268472f3f"
        );
    }

    #[test]
    fn test_empty_secret_is_deterministic() {
        let first = sign("", "", "", TIMESTAMP).unwrap();
        assert_eq!(
            first,
            "377ec8e267081d65955afe9db56c9eda5b60bb6bab114e4fc9a6540dafbf3124"
        );
        assert_eq!(first, sign("", "", "", TIMESTAMP).unwrap());
    }

    #[test]
    fn test_repeated_signing_is_deterministic() {
        let a = sign(SECRET, FULL_QUERY, "recvWindow=1", TIMESTAMP).unwrap();
        let b = sign(SECRET, FULL_QUERY, "recvWindow=1", TIMESTAMP).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_character_changes_signature() {
        let base = sign(SECRET, FULL_QUERY, "", TIMESTAMP).unwrap();

        let altered_query = FULL_QUERY.replace("LTCBTC", "LTCBTD");
        assert_ne!(base, sign(SECRET, &altered_query, "", TIMESTAMP).unwrap());
        assert_ne!(base, sign(SECRET, FULL_QUERY, "x", TIMESTAMP).unwrap());
        assert_ne!(base, sign(SECRET, FULL_QUERY, "", TIMESTAMP + 1).unwrap());

        let mut altered_secret = SECRET.to_string();
        altered_secret.replace_range(0..1, "M");
        assert_ne!(base, sign(&altered_secret, FULL_QUERY, "", TIMESTAMP).unwrap());
    }

    #[test]
    fn test_query_escape_is_stable_for_hex_and_escapes_reserved() {
        let hex = "c8db56825ae71d6d79447849e617115f";
        assert_eq!(query_escape(hex), hex);
        assert_eq!(query_escape(&query_escape(hex)), hex);
        assert_eq!(query_escape("a+b c&d=e/f"), "a%2Bb+c%26d%3De%2Ff");
    }

    #[test]
    fn test_hmac_signer_builds_signed_request() {
        let signer = HmacSigner::new(Credential::new("api-key", SECRET));
        let signed = signer
            .sign_request("/api/v3/order", FULL_QUERY, "", TIMESTAMP)
            .unwrap();

        assert_eq!(signed.path, "/api/v3/order");
        assert_eq!(signed.timestamp_millis, TIMESTAMP);
        assert_eq!(
            signed.signature_hex,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
        assert_eq!(
            signer.headers().get(API_KEY_HEADER).map(String::as_str),
            Some("api-key")
        );
    }
}
