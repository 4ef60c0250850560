// src/interception/transport.rs
//! Networking transports
//!
//! The `Transport` trait is the seam between the capture engine and the
//! opaque networking primitive it wraps: the engine never performs I/O,
//! retries, or response rewriting itself. Production transports are
//! built on the hyper 1.x legacy client, one per protocol variant; TLS
//! for the HTTPS variant comes from rustls.
//!
//! A variant transport MAY be implemented by delegating through
//! `CaptureController::dispatch_via` with the incoming request's trace
//! context preserved; the engine's dedup check guarantees the
//! delegated call is recorded exactly once.

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::http::response::Parts;
use hyper::{Method, Uri};
use hyper_util::client::legacy::connect::{Connect, HttpConnector};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::collections::BTreeMap;
use tracing::debug;

use crate::interception::handle::{ClientResponse, RequestHandle, ResponseCallback};
use crate::interception::request::{PreparedRequest, Protocol};
use crate::utils::errors::{CaptureError, Result};

/// An outbound-call primitive the engine can wrap.
///
/// Contract: the returned handle is inert until `end()`; the supplied
/// callback (if any) and any later `on_response` subscribers are
/// invoked with the response exactly once; dispatch failures after
/// `end()` surface through the handle's error event and the completion
/// handlers never fire.
pub trait Transport: Send + Sync {
    fn dispatch(
        &self,
        request: PreparedRequest,
        callback: Option<ResponseCallback>,
    ) -> Result<RequestHandle>;
}

impl ClientResponse {
    /// Build a response surface from a collected hyper response
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let mut headers = BTreeMap::new();
        for (name, value) in &parts.headers {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        Self {
            status: parts.status.as_u16(),
            status_message: parts
                .status
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
            headers,
            body,
        }
    }
}

/// Production transport over the hyper legacy client
pub struct HyperTransport<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    client: Client<C, Empty<Bytes>>,
    runtime: tokio::runtime::Handle,
    protocol: Protocol,
}

impl HyperTransport<HttpConnector> {
    /// Plain-HTTP transport.
    ///
    /// Must be constructed inside a tokio runtime; completions run on
    /// spawned tasks of that runtime.
    pub fn http() -> Result<Self> {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Ok(Self {
            client,
            runtime: runtime_handle()?,
            protocol: Protocol::Http,
        })
    }
}

impl HyperTransport<hyper_rustls::HttpsConnector<HttpConnector>> {
    /// HTTPS transport with a rustls connector (webpki roots)
    pub fn https() -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Ok(Self {
            client,
            runtime: runtime_handle()?,
            protocol: Protocol::Https,
        })
    }
}

fn runtime_handle() -> Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|e| CaptureError::Runtime(e.to_string()))
}

impl<C> Transport for HyperTransport<C>
where
    C: Connect + Clone + Send + Sync + 'static,
{
    fn dispatch(
        &self,
        request: PreparedRequest,
        callback: Option<ResponseCallback>,
    ) -> Result<RequestHandle> {
        let url = request.options.resolved_url();
        let uri: Uri = url
            .parse()
            .map_err(|e| CaptureError::InvalidRequest(format!("{}: {}", url, e)))?;

        let method = request.options.method.as_deref().unwrap_or("GET");
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| CaptureError::InvalidRequest(e.to_string()))?;

        let mut builder = hyper::Request::builder().method(method).uri(uri);
        for (name, value) in &request.options.headers {
            builder = builder.header(name.as_str(), value.joined());
        }
        let outbound = builder.body(Empty::<Bytes>::new())?;

        debug!(%url, protocol = %self.protocol, "dispatching outbound call");

        let handle = RequestHandle::inert();
        if let Some(callback) = callback {
            handle.on_response(callback);
        }

        let client = self.client.clone();
        let runtime = self.runtime.clone();
        let notifier = handle.clone();
        handle.set_starter(move || {
            runtime.spawn(async move {
                match client.request(outbound).await {
                    Ok(response) => {
                        let (parts, body) = response.into_parts();
                        match body.collect().await {
                            Ok(collected) => notifier
                                .deliver(ClientResponse::from_parts(&parts, collected.to_bytes())),
                            Err(e) => notifier.fail(CaptureError::Body(e.to_string())),
                        }
                    }
                    Err(e) => notifier.fail(e.into()),
                }
            });
        });

        Ok(handle)
    }
}
