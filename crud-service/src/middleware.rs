//! Request tracking middleware
//!
//! Request id generation and propagation, and masking of credentials in
//! logged headers.

use http::HeaderName;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::config::MiddlewareConfig;

/// Default header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers masked in logs
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "proxy-authorization",
    "x-api-key",
];

/// Request id header from configuration
///
/// Falls back to `x-request-id` if the configured name is not a valid header.
pub fn request_id_header(config: &MiddlewareConfig) -> HeaderName {
    HeaderName::try_from(config.request_id_header.as_str()).unwrap_or_else(|_| {
        tracing::warn!(
            "Invalid request id header '{}', using {}",
            config.request_id_header,
            REQUEST_ID_HEADER
        );
        HeaderName::from_static(REQUEST_ID_HEADER)
    })
}

/// Assign a UUID request id to requests that lack one
pub fn request_id_layer(header: HeaderName) -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(header, MakeRequestUuid)
}

/// Copy the request id onto the response
pub fn request_id_propagation_layer(header: HeaderName) -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(header)
}

/// Mask credentials in logged request headers
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    let headers = SENSITIVE_HEADERS
        .iter()
        .map(|name| HeaderName::from_static(name))
        .collect::<Vec<_>>();

    SetSensitiveRequestHeadersLayer::new(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_header_from_config() {
        let mut config = MiddlewareConfig::default();
        assert_eq!(request_id_header(&config), REQUEST_ID_HEADER);

        config.request_id_header = "x-correlation-id".to_string();
        assert_eq!(request_id_header(&config), "x-correlation-id");

        config.request_id_header = "not a header".to_string();
        assert_eq!(request_id_header(&config), REQUEST_ID_HEADER);
    }
}
