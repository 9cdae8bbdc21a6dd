//! URL composition for public and signed calls.
//!
//! Neither builder validates its inputs; a malformed base or path only
//! surfaces when the transport attempts the request.

/// `base + path`, with `?query` appended only when the query is non-empty
pub fn public_endpoint(base: &str, path: &str, query: &str) -> String {
    if query.is_empty() {
        format!("{}{}", base, path)
    } else {
        format!("{}{}?{}", base, path, query)
    }
}

/// `base + path + "?timestamp=" + t`, then `&signature=` and `&query` when present
///
/// Parameter order is fixed so the same inputs always produce the same string.
pub fn private_endpoint(
    base: &str,
    path: &str,
    query: &str,
    signature: &str,
    timestamp_millis: u64,
) -> String {
    let mut url = format!("{}{}?timestamp={}", base, path, timestamp_millis);

    if !signature.is_empty() {
        url.push_str("&signature=");
        url.push_str(signature);
    }

    if !query.is_empty() {
        url.push('&');
        url.push_str(query);
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://testnet.binance.vision";

    #[test]
    fn test_public_endpoint() {
        assert_eq!(
            public_endpoint(BASE, "/api/v3/time", ""),
            "https://testnet.binance.vision/api/v3/time"
        );
        assert_eq!(
            public_endpoint(BASE, "/api/v3/exchangeInfo", "symbol=BTCFDUSD"),
            "https://testnet.binance.vision/api/v3/exchangeInfo?symbol=BTCFDUSD"
        );
    }

    #[test]
    fn test_private_endpoint_parameter_order() {
        assert_eq!(
            private_endpoint(BASE, "/sapi/v1/account/status", "", "abc123", 1_499_827_319_559),
            "https://testnet.binance.vision/sapi/v1/account/status?timestamp=1499827319559&signature=abc123"
        );
        assert_eq!(
            private_endpoint(BASE, "/api/v3/order", "symbol=BTCUSDT&side=BUY", "abc123", 7),
            "https://testnet.binance.vision/api/v3/order?timestamp=7&signature=abc123&symbol=BTCUSDT&side=BUY"
        );
        assert_eq!(
            private_endpoint(BASE, "/api/v3/order", "symbol=BTCUSDT", "", 7),
            "https://testnet.binance.vision/api/v3/order?timestamp=7&symbol=BTCUSDT"
        );
    }

    #[test]
    fn test_private_endpoint_is_idempotent() {
        let first = private_endpoint(BASE, "/api/v3/order", "symbol=ETHUSDT", "ff00", 42);
        let second = private_endpoint(BASE, "/api/v3/order", "symbol=ETHUSDT", "ff00", 42);
        assert_eq!(first.as_bytes(), second.as_bytes());
    }
}
