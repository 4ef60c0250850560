// src/interception/request.rs
//! Request specifications
//!
//! An outbound call is specified either as a bare address string or as
//! structured options; both forms are normalized to `RequestOptions` at
//! the boundary. `PreparedRequest` is the shape that flows through the
//! dispatch stack, carrying the explicit per-call trace context the
//! dedup check keys on.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::capture::store::CallId;

/// Protocol variants the engine wraps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    /// URL scheme for this variant
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A header value as supplied by the caller.
///
/// List values are legal on input but always reach the captured record
/// joined into one space-separated string.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Single(String),
    Multi(Vec<String>),
}

impl HeaderValue {
    /// The value as a single string, list entries joined by spaces
    pub fn joined(&self) -> String {
        match self {
            HeaderValue::Single(value) => value.clone(),
            HeaderValue::Multi(values) => values.join(" "),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Single(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Single(value)
    }
}

impl From<Vec<String>> for HeaderValue {
    fn from(values: Vec<String>) -> Self {
        HeaderValue::Multi(values)
    }
}

/// Structured outbound-request options.
///
/// Every field is optional; url resolution falls back from `href` to
/// the structural fields. `extra` is the open map for client-library
/// specific options; artifact keys on the fixed exclusion list never
/// reach captured records.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Full address; takes precedence over the structural fields
    pub href: Option<String>,

    /// URL scheme, without the trailing colon
    pub protocol: Option<String>,

    pub hostname: Option<String>,

    /// `host:port` composite, used only when `hostname` is absent
    pub host: Option<String>,

    pub port: Option<u16>,

    pub path: Option<String>,

    pub method: Option<String>,

    /// Search string, including the leading `?`
    pub search: Option<String>,

    /// Fragment, including the leading `#`
    pub hash: Option<String>,

    pub headers: BTreeMap<String, HeaderValue>,

    /// Client-library specific options, captured as-is unless excluded
    pub extra: BTreeMap<String, Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Resolve the full request URL.
    ///
    /// `href` wins outright; otherwise the URL is composed from scheme,
    /// authority, path, search, and fragment.
    pub fn resolved_url(&self) -> String {
        if let Some(href) = &self.href {
            return href.clone();
        }

        let scheme = self.protocol.as_deref().unwrap_or("http");
        let authority = match (&self.hostname, &self.host) {
            (Some(hostname), _) => match self.port {
                Some(port) => format!("{}:{}", hostname, port),
                None => hostname.clone(),
            },
            (None, Some(host)) => host.clone(),
            (None, None) => "localhost".to_string(),
        };
        let path = self.path.as_deref().unwrap_or("/");

        let mut url = format!("{}://{}{}", scheme, authority, path);
        if let Some(search) = &self.search {
            url.push_str(search);
        }
        if let Some(hash) = &self.hash {
            url.push_str(hash);
        }
        url
    }
}

/// The two accepted request-specification shapes
#[derive(Debug, Clone)]
pub enum RequestSpec {
    /// Bare address string, e.g. `"http://example.com/a"`
    Address(String),

    /// Structured options
    Options(RequestOptions),
}

impl RequestSpec {
    /// Coerce to the canonical structured form
    pub fn into_options(self) -> RequestOptions {
        match self {
            RequestSpec::Address(address) => RequestOptions {
                href: Some(address),
                ..RequestOptions::default()
            },
            RequestSpec::Options(options) => options,
        }
    }
}

impl From<&str> for RequestSpec {
    fn from(address: &str) -> Self {
        RequestSpec::Address(address.to_string())
    }
}

impl From<String> for RequestSpec {
    fn from(address: String) -> Self {
        RequestSpec::Address(address)
    }
}

impl From<RequestOptions> for RequestSpec {
    fn from(options: RequestOptions) -> Self {
        RequestSpec::Options(options)
    }
}

/// The shape that flows through the dispatch stack.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub options: RequestOptions,

    /// Identity of the call already owning this dispatch, when an outer
    /// wrapper is delegating through a lower-level entry point. A set
    /// trace context makes every inner wrapper pass through untouched,
    /// so one logical call is recorded exactly once.
    pub trace: Option<CallId>,
}

impl PreparedRequest {
    /// Prepare a spec for dispatch through a protocol variant.
    ///
    /// The variant's scheme is filled in as the default protocol when
    /// the spec names neither an address nor a protocol.
    pub fn new(spec: RequestSpec, protocol: Protocol) -> Self {
        let mut options = spec.into_options();
        if options.href.is_none() && options.protocol.is_none() {
            options.protocol = Some(protocol.scheme().to_string());
        }
        Self {
            options,
            trace: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_spec_coerces_to_href() {
        let options = RequestSpec::from("http://example.com/x").into_options();
        assert_eq!(options.href.as_deref(), Some("http://example.com/x"));
        assert_eq!(options.resolved_url(), "http://example.com/x");
    }

    #[test]
    fn test_prepared_request_defaults_variant_scheme() {
        let prepared = PreparedRequest::new(
            RequestOptions::new().with_hostname("example.com").into(),
            Protocol::Https,
        );
        assert_eq!(prepared.options.protocol.as_deref(), Some("https"));
        assert_eq!(prepared.options.resolved_url(), "https://example.com/");
        assert!(prepared.trace.is_none());
    }

    #[test]
    fn test_prepared_request_keeps_explicit_protocol() {
        let prepared = PreparedRequest::new(
            RequestOptions::new()
                .with_protocol("http")
                .with_hostname("example.com")
                .into(),
            Protocol::Https,
        );
        assert_eq!(prepared.options.protocol.as_deref(), Some("http"));
    }

    #[test]
    fn test_address_spec_skips_scheme_defaulting() {
        let prepared =
            PreparedRequest::new(RequestSpec::from("https://example.com/"), Protocol::Http);
        assert!(prepared.options.protocol.is_none());
        assert_eq!(prepared.options.resolved_url(), "https://example.com/");
    }

    #[test]
    fn test_host_fallback_authority() {
        let mut options = RequestOptions::new();
        options.host = Some("example.com:9000".to_string());
        assert_eq!(options.resolved_url(), "http://example.com:9000/");
    }

    #[test]
    fn test_header_value_joining() {
        assert_eq!(HeaderValue::from("a").joined(), "a");
        assert_eq!(
            HeaderValue::Multi(vec!["a".to_string(), "b".to_string()]).joined(),
            "a b"
        );
    }
}
