//! Pure mappers from HTTP request/response data to semantic-convention
//! span attributes and span status.
//!
//! Every function here is side-effect free; callers attach the returned
//! attributes to whichever span they are recording.

use std::net::SocketAddr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, HOST, USER_AGENT};
use http::{HeaderMap, Request, Response, StatusCode, Version};
use opentelemetry::trace::Status;
use opentelemetry::KeyValue;
use opentelemetry_semantic_conventions::attribute::{
    CLIENT_ADDRESS, HTTP_REQUEST_BODY_SIZE, HTTP_REQUEST_METHOD, HTTP_RESPONSE_BODY_SIZE,
    HTTP_RESPONSE_STATUS_CODE, HTTP_ROUTE, NETWORK_PEER_ADDRESS, NETWORK_PEER_PORT,
    NETWORK_PROTOCOL_NAME, NETWORK_PROTOCOL_VERSION, SERVER_ADDRESS, SERVER_PORT, URL_FULL,
    URL_PATH, URL_QUERY, URL_SCHEME, USER_AGENT_ORIGINAL, USER_ID,
};

/// Attributes for an outbound HTTP request, recorded on a client span.
///
/// Emits the request method, the full URL, the server address and port
/// taken from the URL authority, the protocol, and when present the user
/// agent and request body size.
pub fn client_request<T>(req: &Request<T>) -> Vec<KeyValue> {
    let mut attrs = Vec::with_capacity(8);
    attrs.push(KeyValue::new(HTTP_REQUEST_METHOD, req.method().to_string()));
    attrs.push(KeyValue::new(URL_FULL, req.uri().to_string()));

    if let Some(host) = req.uri().host() {
        attrs.push(KeyValue::new(SERVER_ADDRESS, host.to_owned()));
    }
    if let Some(port) = req.uri().port_u16() {
        attrs.push(KeyValue::new(SERVER_PORT, i64::from(port)));
    }

    attrs.push(KeyValue::new(NETWORK_PROTOCOL_NAME, "http"));
    if let Some(version) = protocol_version(req.version()) {
        attrs.push(KeyValue::new(NETWORK_PROTOCOL_VERSION, version));
    }
    if let Some(agent) = header_str(req.headers(), USER_AGENT) {
        attrs.push(KeyValue::new(USER_AGENT_ORIGINAL, agent.to_owned()));
    }
    if let Some(size) = content_length(req.headers()) {
        attrs.push(KeyValue::new(HTTP_REQUEST_BODY_SIZE, size));
    }
    if let Some(user) = userinfo_name(req.uri()) {
        attrs.push(KeyValue::new(USER_ID, user));
    }
    attrs
}

/// Attributes for an HTTP response observed by a client, recorded on the
/// same client span as [`client_request`].
pub fn client_response<T>(resp: &Response<T>) -> Vec<KeyValue> {
    let mut attrs = Vec::with_capacity(2);
    attrs.push(KeyValue::new(
        HTTP_RESPONSE_STATUS_CODE,
        i64::from(resp.status().as_u16()),
    ));
    if let Some(size) = content_length(resp.headers()) {
        attrs.push(KeyValue::new(HTTP_RESPONSE_BODY_SIZE, size));
    }
    attrs
}

/// Attributes for an inbound HTTP request, recorded on a server span.
///
/// `server_name` overrides the Host header for `server.address` when
/// non-empty, `route` is the matched route pattern (skipped when empty),
/// and `peer` is the transport-level remote address when known. The
/// client address prefers the first `X-Forwarded-For` entry over the
/// transport peer.
pub fn server_request<T>(
    server_name: &str,
    route: &str,
    peer: Option<SocketAddr>,
    req: &Request<T>,
) -> Vec<KeyValue> {
    let mut attrs = Vec::with_capacity(12);
    attrs.push(KeyValue::new(HTTP_REQUEST_METHOD, req.method().to_string()));

    let scheme = req.uri().scheme_str().unwrap_or("http");
    attrs.push(KeyValue::new(URL_SCHEME, scheme.to_owned()));

    let path = req.uri().path();
    if !path.is_empty() {
        attrs.push(KeyValue::new(URL_PATH, path.to_owned()));
    }
    if let Some(query) = req.uri().query() {
        attrs.push(KeyValue::new(URL_QUERY, query.to_owned()));
    }

    let host_header = header_str(req.headers(), HOST);
    let (host, port) = match (server_name, host_header) {
        ("", Some(header)) => split_host_port(header),
        ("", None) => (req.uri().host().unwrap_or("").to_owned(), req.uri().port_u16().map(i64::from)),
        (name, _) => (name.to_owned(), None),
    };
    if !host.is_empty() {
        attrs.push(KeyValue::new(SERVER_ADDRESS, host));
    }
    if let Some(port) = port {
        attrs.push(KeyValue::new(SERVER_PORT, port));
    }

    if !route.is_empty() {
        attrs.push(KeyValue::new(HTTP_ROUTE, route.to_owned()));
    }

    attrs.push(KeyValue::new(NETWORK_PROTOCOL_NAME, "http"));
    if let Some(version) = protocol_version(req.version()) {
        attrs.push(KeyValue::new(NETWORK_PROTOCOL_VERSION, version));
    }
    if let Some(peer) = peer {
        attrs.push(KeyValue::new(NETWORK_PEER_ADDRESS, peer.ip().to_string()));
        attrs.push(KeyValue::new(NETWORK_PEER_PORT, i64::from(peer.port())));
    }

    let forwarded = header_str(req.headers(), http::HeaderName::from_static("x-forwarded-for"))
        .and_then(|value| value.split(',').next())
        .map(|client| client.trim().to_owned())
        .filter(|client| !client.is_empty());
    if let Some(client) = forwarded {
        attrs.push(KeyValue::new(CLIENT_ADDRESS, client));
    } else if let Some(peer) = peer {
        attrs.push(KeyValue::new(CLIENT_ADDRESS, peer.ip().to_string()));
    }

    if let Some(agent) = header_str(req.headers(), USER_AGENT) {
        attrs.push(KeyValue::new(USER_AGENT_ORIGINAL, agent.to_owned()));
    }
    if let Some(size) = content_length(req.headers()) {
        attrs.push(KeyValue::new(HTTP_REQUEST_BODY_SIZE, size));
    }
    if let Some(user) = basic_auth_user(req.headers()) {
        attrs.push(KeyValue::new(USER_ID, user));
    }
    attrs
}

/// Span status for a response code observed by a client.
///
/// Any 4xx or 5xx is an error for the caller; everything else leaves the
/// status unset, which readers treat as success.
pub fn client_status(code: StatusCode) -> Status {
    if code.is_client_error() || code.is_server_error() {
        Status::error(reason(code))
    } else if code.as_u16() >= 600 {
        Status::error("invalid HTTP status code")
    } else {
        Status::Unset
    }
}

/// Span status for a response code produced by a server.
///
/// Only 5xx marks the server span as failed: a 4xx means the server
/// correctly rejected a bad request, which is not a server fault.
pub fn server_status(code: StatusCode) -> Status {
    if code.is_server_error() {
        Status::error(reason(code))
    } else if code.as_u16() >= 600 {
        Status::error("invalid HTTP status code")
    } else {
        Status::Unset
    }
}

fn reason(code: StatusCode) -> String {
    match code.canonical_reason() {
        Some(reason) => format!("{}: {}", code.as_u16(), reason),
        None => code.as_u16().to_string(),
    }
}

fn protocol_version(version: Version) -> Option<&'static str> {
    match version {
        Version::HTTP_09 => Some("0.9"),
        Version::HTTP_10 => Some("1.0"),
        Version::HTTP_11 => Some("1.1"),
        Version::HTTP_2 => Some("2"),
        Version::HTTP_3 => Some("3"),
        _ => None,
    }
}

fn header_str(headers: &HeaderMap, name: http::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn content_length(headers: &HeaderMap) -> Option<i64> {
    header_str(headers, CONTENT_LENGTH).and_then(|value| value.parse().ok())
}

fn split_host_port(authority: &str) -> (String, Option<i64>) {
    match authority.rsplit_once(':') {
        Some((host, port)) => match port.parse::<i64>() {
            Ok(port) => (host.to_owned(), Some(port)),
            Err(_) => (authority.to_owned(), None),
        },
        None => (authority.to_owned(), None),
    }
}

/// Username from URL userinfo (`user:pass@host`), for client requests.
fn userinfo_name(uri: &http::Uri) -> Option<String> {
    let authority = uri.authority()?.as_str();
    let (userinfo, _) = authority.rsplit_once('@')?;
    let user = userinfo.split(':').next().unwrap_or("");
    (!user.is_empty()).then(|| user.to_owned())
}

/// Username from a `Basic` Authorization header, for server requests.
fn basic_auth_user(headers: &HeaderMap) -> Option<String> {
    let value = header_str(headers, AUTHORIZATION)?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(BASE64.decode(encoded).ok()?).ok()?;
    let user = decoded.split(':').next().unwrap_or("");
    (!user.is_empty()).then(|| user.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Value;

    fn find<'a>(attrs: &'a [KeyValue], key: &str) -> Option<&'a Value> {
        attrs
            .iter()
            .find(|kv| kv.key.as_str() == key)
            .map(|kv| &kv.value)
    }

    #[test]
    fn client_request_records_method_url_and_server() {
        let req = Request::builder()
            .method("POST")
            .uri("https://api.example.com:8443/v1/items?page=2")
            .header("User-Agent", "tracekit-test/1.0")
            .header("Content-Length", "42")
            .body(())
            .unwrap();
        let attrs = client_request(&req);

        assert_eq!(find(&attrs, HTTP_REQUEST_METHOD), Some(&Value::from("POST")));
        assert_eq!(
            find(&attrs, URL_FULL),
            Some(&Value::from("https://api.example.com:8443/v1/items?page=2"))
        );
        assert_eq!(find(&attrs, SERVER_ADDRESS), Some(&Value::from("api.example.com")));
        assert_eq!(find(&attrs, SERVER_PORT), Some(&Value::I64(8443)));
        assert_eq!(find(&attrs, HTTP_REQUEST_BODY_SIZE), Some(&Value::I64(42)));
        assert_eq!(
            find(&attrs, USER_AGENT_ORIGINAL),
            Some(&Value::from("tracekit-test/1.0"))
        );
    }

    #[test]
    fn server_request_prefers_forwarded_client_and_explicit_name() {
        let req = Request::builder()
            .uri("/orders/17?expand=lines")
            .header("Host", "frontend.example.com:8080")
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap();
        let peer = "10.0.0.1:52814".parse().ok();
        let attrs = server_request("orders", "/orders/:id", peer, &req);

        assert_eq!(find(&attrs, SERVER_ADDRESS), Some(&Value::from("orders")));
        assert_eq!(find(&attrs, URL_PATH), Some(&Value::from("/orders/17")));
        assert_eq!(find(&attrs, URL_QUERY), Some(&Value::from("expand=lines")));
        assert_eq!(find(&attrs, HTTP_ROUTE), Some(&Value::from("/orders/:id")));
        assert_eq!(find(&attrs, CLIENT_ADDRESS), Some(&Value::from("203.0.113.9")));
        assert_eq!(find(&attrs, NETWORK_PEER_ADDRESS), Some(&Value::from("10.0.0.1")));
        assert_eq!(find(&attrs, NETWORK_PEER_PORT), Some(&Value::I64(52814)));
    }

    #[test]
    fn server_request_falls_back_to_host_header() {
        let req = Request::builder()
            .uri("/healthz")
            .header("Host", "svc.internal:9090")
            .body(())
            .unwrap();
        let attrs = server_request("", "", None, &req);

        assert_eq!(find(&attrs, SERVER_ADDRESS), Some(&Value::from("svc.internal")));
        assert_eq!(find(&attrs, SERVER_PORT), Some(&Value::I64(9090)));
        assert_eq!(find(&attrs, HTTP_ROUTE), None);
    }

    #[test]
    fn server_request_reads_basic_auth_user() {
        // "jane:secret"
        let req = Request::builder()
            .uri("/me")
            .header("Authorization", "Basic amFuZTpzZWNyZXQ=")
            .body(())
            .unwrap();
        let attrs = server_request("", "", None, &req);
        assert_eq!(find(&attrs, USER_ID), Some(&Value::from("jane")));
    }

    #[test]
    fn client_response_records_status_and_size() {
        let resp = Response::builder()
            .status(StatusCode::CREATED)
            .header("Content-Length", "7")
            .body(())
            .unwrap();
        let attrs = client_response(&resp);
        assert_eq!(find(&attrs, HTTP_RESPONSE_STATUS_CODE), Some(&Value::I64(201)));
        assert_eq!(find(&attrs, HTTP_RESPONSE_BODY_SIZE), Some(&Value::I64(7)));
    }

    #[test]
    fn status_mapping_is_asymmetric_for_4xx() {
        assert_eq!(server_status(StatusCode::NOT_FOUND), Status::Unset);
        assert!(matches!(
            client_status(StatusCode::NOT_FOUND),
            Status::Error { .. }
        ));
    }

    #[test]
    fn status_mapping_agrees_elsewhere() {
        assert_eq!(server_status(StatusCode::OK), Status::Unset);
        assert_eq!(client_status(StatusCode::OK), Status::Unset);
        assert_eq!(server_status(StatusCode::NO_CONTENT), Status::Unset);
        assert!(matches!(
            server_status(StatusCode::INTERNAL_SERVER_ERROR),
            Status::Error { .. }
        ));
        assert!(matches!(
            client_status(StatusCode::BAD_GATEWAY),
            Status::Error { .. }
        ));
        assert_eq!(client_status(StatusCode::PERMANENT_REDIRECT), Status::Unset);
    }
}
