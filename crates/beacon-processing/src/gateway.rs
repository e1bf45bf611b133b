use std::collections::HashMap;

use beacon_parser::identity::normalize_mac;
use beacon_repository::{Gateway, GatewayStore, RepositoryError};
use serde_json::Value;

/// Header names checked, in order, for the gateway's MAC.
pub const GATEWAY_MAC_HEADERS: [&str; 5] = [
    "x-gateway-mac",
    "gateway-mac",
    "x-minew-gateway",
    "mac",
    "device-mac",
];

pub const GATEWAY_MAC_QUERY_PARAM: &str = "gateway_mac";
pub const GATEWAY_MAC_BODY_FIELD: &str = "gatewayMac";

/// The transport-independent view of an ingestion call.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    /// Keys are lower-case header names.
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    /// `Value::Null` for an empty body.
    pub body: Value,
}

impl IngestRequest {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayIdSource {
    Header(&'static str),
    Query,
    Body,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayId {
    pub raw: String,
    pub normalized: String,
    pub source: GatewayIdSource,
}

/// First non-empty MAC from headers, then query string, then body.
pub fn extract_gateway_id(request: &IngestRequest) -> Option<GatewayId> {
    let from_headers = GATEWAY_MAC_HEADERS.into_iter().find_map(|name| {
        request
            .headers
            .get(name)
            .and_then(|value| candidate(value, GatewayIdSource::Header(name)))
    });

    from_headers
        .or_else(|| {
            request
                .query
                .get(GATEWAY_MAC_QUERY_PARAM)
                .and_then(|value| candidate(value, GatewayIdSource::Query))
        })
        .or_else(|| {
            request
                .body
                .get(GATEWAY_MAC_BODY_FIELD)
                .and_then(Value::as_str)
                .and_then(|value| candidate(value, GatewayIdSource::Body))
        })
}

fn candidate(value: &str, source: GatewayIdSource) -> Option<GatewayId> {
    let normalized = normalize_mac(value);
    if normalized.is_empty() {
        return None;
    }
    Some(GatewayId {
        raw: value.trim().to_string(),
        normalized,
        source,
    })
}

pub struct GatewayResolver<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> GatewayResolver<'a, S>
where
    S: GatewayStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, id: &GatewayId) -> Result<Option<Gateway>, RepositoryError> {
        self.store.find_active_gateway_by_mac(&id.normalized).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_win_in_declared_order() {
        let request = IngestRequest::new(json!({ "gatewayMac": "11:11:11:11:11:11" }))
            .with_header("MAC", "22:22:22:22:22:22")
            .with_header("X-Minew-Gateway", "33:33:33:33:33:33")
            .with_query(GATEWAY_MAC_QUERY_PARAM, "44:44:44:44:44:44");

        let id = extract_gateway_id(&request).unwrap();
        assert_eq!(id.source, GatewayIdSource::Header("x-minew-gateway"));
        assert_eq!(id.normalized, "333333333333");
    }

    #[test]
    fn blank_header_falls_through_to_query() {
        let request = IngestRequest::new(Value::Null)
            .with_header("x-gateway-mac", "  ")
            .with_query(GATEWAY_MAC_QUERY_PARAM, "aa:bb:cc:dd:ee:01");

        let id = extract_gateway_id(&request).unwrap();
        assert_eq!(id.source, GatewayIdSource::Query);
        assert_eq!(id.normalized, "AABBCCDDEE01");
    }

    #[test]
    fn body_field_is_last_resort() {
        let request = IngestRequest::new(json!({ "gatewayMac": "aa:bb:cc:dd:ee:02", "data": [] }));
        let id = extract_gateway_id(&request).unwrap();
        assert_eq!(id.source, GatewayIdSource::Body);
        assert_eq!(id.raw, "aa:bb:cc:dd:ee:02");
    }

    #[test]
    fn missing_everywhere_is_none() {
        let request = IngestRequest::new(json!([{ "mac": "aa:bb:cc:dd:ee:03" }]));
        assert!(extract_gateway_id(&request).is_none());
        assert!(extract_gateway_id(&IngestRequest::new(json!({ "gatewayMac": 5 }))).is_none());
    }
}
