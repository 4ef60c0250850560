// src/capture/normalize.rs
//! Request/response metadata normalization
//!
//! Pure transforms from the raw outbound-call surfaces to canonical
//! nested records, ready for flattening. Request normalization resolves
//! a full `url`, renames the search string to `query`, coerces every
//! header value to a single string, and drops client-library artifact
//! keys that are meaningless to a trace consumer. Response
//! normalization keeps exactly the headers, status code, and status
//! message.
//!
//! Record keys (`statusCode`, `followRedirect`, ...) keep the trace
//! schema's spelling: they are portable schema constants consumed by
//! the downstream agent, not Rust identifiers.

use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

use crate::interception::handle::ClientResponse;
use crate::interception::request::RequestOptions;

/// Option-map keys that are artifacts of specific client libraries
/// (retry counts, redirect flags, agent handles, cache/compression
/// toggles, socket flags) and never appear in captured records. The
/// list is implementation-agnostic and kept in full even where a given
/// transport can never produce some of its keys, so captured schemas
/// stay portable across client stacks.
pub const EXCLUDED_OPTION_KEYS: &[&str] = &[
    "agent",
    "automaticFailover",
    "cache",
    "decompress",
    "followRedirect",
    "retries",
    "slashes",
    "strictTtl",
    "throwHttpErrors",
    "useElectronNet",
];

static EXCLUDED: Lazy<HashSet<&'static str>> =
    Lazy::new(|| EXCLUDED_OPTION_KEYS.iter().copied().collect());

/// Normalize a request spec into a canonical nested record.
///
/// The output always carries a resolved `url`; structural fields pass
/// through when present. `href`, `search`, and `host` never appear in
/// the output; they are consumed by url resolution and the `query`
/// rename.
pub fn normalize_request(options: &RequestOptions) -> Value {
    let mut record = Map::new();

    record.insert("url".to_string(), json!(options.resolved_url()));

    if let Some(search) = &options.search {
        record.insert("query".to_string(), json!(search));
    }
    if let Some(method) = &options.method {
        record.insert("method".to_string(), json!(method));
    }
    if let Some(protocol) = &options.protocol {
        record.insert("protocol".to_string(), json!(protocol));
    }
    if let Some(hostname) = &options.hostname {
        record.insert("hostname".to_string(), json!(hostname));
    }
    if let Some(port) = options.port {
        record.insert("port".to_string(), json!(port));
    }
    if let Some(path) = &options.path {
        record.insert("path".to_string(), json!(path));
    }
    if let Some(hash) = &options.hash {
        record.insert("hash".to_string(), json!(hash));
    }

    let mut headers = Map::new();
    for (name, value) in &options.headers {
        // list values must reach the flat schema as a single string
        headers.insert(name.clone(), json!(value.joined()));
    }
    record.insert("headers".to_string(), Value::Object(headers));

    for (key, value) in &options.extra {
        if EXCLUDED.contains(key.as_str()) {
            continue;
        }
        record.insert(key.clone(), value.clone());
    }

    Value::Object(record)
}

/// Normalize a response into a canonical nested record.
///
/// Keeps exactly `headers`, `statusCode`, and `statusMessage`; every
/// other response field is dropped.
pub fn normalize_response(response: &ClientResponse) -> Value {
    let mut headers = Map::new();
    for (name, value) in &response.headers {
        headers.insert(name.clone(), json!(value));
    }

    json!({
        "headers": Value::Object(headers),
        "statusCode": response.status,
        "statusMessage": response.status_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interception::request::{HeaderValue, RequestSpec};
    use bytes::Bytes;
    use std::collections::BTreeMap;

    fn response(status: u16, headers: &[(&str, &str)]) -> ClientResponse {
        ClientResponse {
            status,
            status_message: "OK".to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_address_string_resolves_url_directly() {
        let options = RequestSpec::Address("http://example.com/a?q=1".to_string()).into_options();
        let record = normalize_request(&options);

        assert_eq!(record["url"], json!("http://example.com/a?q=1"));
        // bare address form carries no search field to rename
        assert!(record.get("query").is_none());
    }

    #[test]
    fn test_url_composed_from_structural_fields() {
        let options = RequestOptions::new()
            .with_protocol("https")
            .with_hostname("api.example.com")
            .with_port(8443)
            .with_path("/v1/items")
            .with_search("?page=2");
        let record = normalize_request(&options);

        assert_eq!(
            record["url"],
            json!("https://api.example.com:8443/v1/items?page=2")
        );
        assert_eq!(record["query"], json!("?page=2"));
        assert_eq!(record["port"], json!(8443));
    }

    #[test]
    fn test_header_lists_join_with_spaces() {
        let mut options = RequestOptions::new().with_hostname("example.com");
        options.headers.insert(
            "accept-encoding".to_string(),
            HeaderValue::Multi(vec!["gzip".to_string(), "br".to_string()]),
        );
        options
            .headers
            .insert("user-agent".to_string(), HeaderValue::from("egress/1.0"));

        let record = normalize_request(&options);
        assert_eq!(record["headers"]["accept-encoding"], json!("gzip br"));
        assert_eq!(record["headers"]["user-agent"], json!("egress/1.0"));
    }

    #[test]
    fn test_artifact_keys_are_dropped() {
        let mut options = RequestOptions::new().with_hostname("example.com");
        options
            .extra
            .insert("followRedirect".to_string(), json!(true));
        options.extra.insert("retries".to_string(), json!(3));
        options.extra.insert("timeoutMs".to_string(), json!(500));

        let record = normalize_request(&options);
        assert!(record.get("followRedirect").is_none());
        assert!(record.get("retries").is_none());
        assert_eq!(record["timeoutMs"], json!(500));
    }

    #[test]
    fn test_host_and_search_do_not_leak_into_output() {
        let mut options = RequestOptions::new().with_search("?a=1");
        options.host = Some("example.com:8080".to_string());

        let record = normalize_request(&options);
        assert!(record.get("host").is_none());
        assert!(record.get("search").is_none());
        assert!(record.get("href").is_none());
        assert_eq!(record["url"], json!("http://example.com:8080/?a=1"));
    }

    #[test]
    fn test_response_keeps_only_head_fields() {
        let res = response(200, &[("content-type", "application/json")]);
        let record = normalize_response(&res);

        let object = record.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert_eq!(record["statusCode"], json!(200));
        assert_eq!(record["statusMessage"], json!("OK"));
        assert_eq!(record["headers"]["content-type"], json!("application/json"));
    }

    #[test]
    fn test_normalization_is_pure() {
        let options = RequestOptions::new().with_hostname("example.com");
        let first = normalize_request(&options);
        let second = normalize_request(&options);
        assert_eq!(first, second);

        let headers: BTreeMap<String, HeaderValue> = options.headers.clone();
        assert!(headers.is_empty());
    }
}
