// src/interception/installer.rs
//! Install/uninstall controller
//!
//! The process-wide singleton owning the active dispatch slot for each
//! protocol variant. `install` substitutes the capture wrapper into
//! both slots; `uninstall` restores the originals. Both are idempotent,
//! and uninstall refuses to remove a wrapper it did not put there.
//!
//! Applications construct the controller once at startup, build their
//! clients from it, and never touch the slots again. That single
//! construction point is what makes interception transparent to every
//! call site.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::capture::store::SharedStore;
use crate::interception::engine::{CaptureDispatch, ProtocolClient};
use crate::interception::handle::{RequestHandle, ResponseCallback};
use crate::interception::request::{PreparedRequest, Protocol};
use crate::interception::transport::{HyperTransport, Transport};
use crate::timeline::SharedTimeline;
use crate::utils::config::CaptureConfig;
use crate::utils::errors::Result;

struct InstalledWrap {
    original: Arc<dyn Transport>,
    wrapper: Arc<dyn Transport>,
}

struct VariantSlot {
    active: Arc<dyn Transport>,
    restore: Option<InstalledWrap>,
    installed: bool,
}

impl VariantSlot {
    fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            active: transport,
            restore: None,
            installed: false,
        }
    }
}

/// Singleton controller for the two protocol variants' dispatch slots
pub struct CaptureController {
    http: Mutex<VariantSlot>,
    https: Mutex<VariantSlot>,
}

impl CaptureController {
    /// Build a controller over explicit transports, one per variant
    pub fn new(http: Arc<dyn Transport>, https: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            http: Mutex::new(VariantSlot::new(http)),
            https: Mutex::new(VariantSlot::new(https)),
        })
    }

    /// Build a controller over the production hyper transports.
    ///
    /// Must be called inside a tokio runtime.
    pub fn hyper() -> Result<Arc<Self>> {
        Ok(Self::new(
            Arc::new(HyperTransport::http()?),
            Arc::new(HyperTransport::https()?),
        ))
    }

    fn slot(&self, protocol: Protocol) -> &Mutex<VariantSlot> {
        match protocol {
            Protocol::Http => &self.http,
            Protocol::Https => &self.https,
        }
    }

    /// Install the capture wrappers over both protocol variants.
    ///
    /// The timeline, store, and config are shared by both wrappers; the
    /// config is immutable from here on. Idempotent per variant: an
    /// already-installed variant keeps its existing wrapper (and the
    /// timeline, store, and config it was installed with). Returns
    /// whether capture is active after the call.
    pub fn install(
        &self,
        timeline: SharedTimeline,
        store: SharedStore,
        config: CaptureConfig,
    ) -> bool {
        let config = Arc::new(config);

        for protocol in [Protocol::Http, Protocol::Https] {
            let mut slot = self.slot(protocol).lock();
            if slot.installed {
                debug!(%protocol, "capture already installed; skipping");
                continue;
            }

            let original = Arc::clone(&slot.active);
            let wrapper: Arc<dyn Transport> = Arc::new(CaptureDispatch::new(
                Arc::clone(&original),
                Arc::clone(&timeline),
                Arc::clone(&store),
                Arc::clone(&config),
            ));

            slot.active = Arc::clone(&wrapper);
            slot.restore = Some(InstalledWrap { original, wrapper });
            slot.installed = true;
            info!(%protocol, "outbound capture installed");
        }

        true
    }

    /// Remove the capture wrappers, restoring pre-install behavior.
    ///
    /// A slot whose active transport is no longer the wrapper this
    /// controller installed is left in place (something else replaced
    /// it); the installed flag is cleared regardless. Idempotent.
    pub fn uninstall(&self) {
        for protocol in [Protocol::Http, Protocol::Https] {
            let mut slot = self.slot(protocol).lock();
            if let Some(wrap) = slot.restore.take() {
                if Arc::ptr_eq(&slot.active, &wrap.wrapper) {
                    slot.active = wrap.original;
                    info!(%protocol, "outbound capture uninstalled");
                } else {
                    warn!(%protocol, "active transport is not ours; leaving it in place");
                }
            }
            slot.installed = false;
        }
    }

    /// Whether the variant currently has a capture wrapper installed
    pub fn installed(&self, protocol: Protocol) -> bool {
        self.slot(protocol).lock().installed
    }

    /// Dispatch through a variant's active slot.
    ///
    /// This is the shared lower-level entry point: clients go through
    /// it, and a variant transport implemented on top of the other
    /// variant delegates through it with the trace context preserved.
    pub fn dispatch_via(
        &self,
        protocol: Protocol,
        request: PreparedRequest,
        callback: Option<ResponseCallback>,
    ) -> Result<RequestHandle> {
        let active = Arc::clone(&self.slot(protocol).lock().active);
        active.dispatch(request, callback)
    }

    /// Client surface for one protocol variant
    pub fn client(self: &Arc<Self>, protocol: Protocol) -> ProtocolClient {
        ProtocolClient::new(Arc::clone(self), protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::store::CallStore;
    use crate::interception::handle::ClientResponse;
    use crate::timeline::Timeline;
    use bytes::Bytes;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Minimal transport answering 200 synchronously on `end()`
    struct OkTransport {
        dispatched: Arc<AtomicUsize>,
    }

    impl OkTransport {
        fn new() -> (Arc<Self>, Arc<AtomicUsize>) {
            let count = Arc::new(AtomicUsize::new(0));
            (
                Arc::new(Self {
                    dispatched: Arc::clone(&count),
                }),
                count,
            )
        }
    }

    impl Transport for OkTransport {
        fn dispatch(
            &self,
            _request: PreparedRequest,
            callback: Option<ResponseCallback>,
        ) -> Result<RequestHandle> {
            self.dispatched.fetch_add(1, Ordering::SeqCst);
            let handle = RequestHandle::inert();
            if let Some(callback) = callback {
                handle.on_response(callback);
            }
            let notifier = handle.clone();
            handle.set_starter(move || {
                notifier.deliver(ClientResponse {
                    status: 200,
                    status_message: "OK".to_string(),
                    headers: BTreeMap::new(),
                    body: Bytes::new(),
                })
            });
            Ok(handle)
        }
    }

    fn controller() -> (Arc<CaptureController>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let (http, http_count) = OkTransport::new();
        let (https, https_count) = OkTransport::new();
        (
            CaptureController::new(http, https),
            http_count,
            https_count,
        )
    }

    #[test]
    fn test_install_sets_flags_for_both_variants() {
        let (controller, _, _) = controller();
        assert!(!controller.installed(Protocol::Http));

        let active = controller.install(
            Timeline::shared(),
            CallStore::shared(),
            CaptureConfig::default(),
        );
        assert!(active);
        assert!(controller.installed(Protocol::Http));
        assert!(controller.installed(Protocol::Https));
    }

    #[test]
    fn test_double_install_keeps_single_wrapper_layer() {
        let (controller, http_count, _) = controller();
        let store = CallStore::shared();

        controller.install(
            Timeline::shared(),
            Arc::clone(&store),
            CaptureConfig::default(),
        );
        controller.install(
            Timeline::shared(),
            CallStore::shared(),
            CaptureConfig::default(),
        );

        controller
            .client(Protocol::Http)
            .get("http://example.com/", None)
            .unwrap();

        // one raw dispatch, one record: no compounded instrumentation
        assert_eq!(http_count.load(Ordering::SeqCst), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_uninstall_restores_original_behavior() {
        let (controller, http_count, _) = controller();
        let store = CallStore::shared();
        let timeline = Timeline::shared();

        controller.install(
            Arc::clone(&timeline),
            Arc::clone(&store),
            CaptureConfig::default(),
        );
        controller.uninstall();
        assert!(!controller.installed(Protocol::Http));

        controller
            .client(Protocol::Http)
            .get("http://example.com/", None)
            .unwrap();

        // the call went straight to the original transport, uncaptured
        assert_eq!(http_count.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
        assert!(timeline.lock().is_empty());

        // second uninstall is a no-op
        controller.uninstall();
    }

    #[test]
    fn test_uninstall_leaves_foreign_wrapper_in_place() {
        let (controller, _, _) = controller();
        controller.install(
            Timeline::shared(),
            CallStore::shared(),
            CaptureConfig::default(),
        );

        // someone else replaces the active transport after us
        let (foreign, foreign_count) = OkTransport::new();
        {
            let mut slot = controller.http.lock();
            slot.active = foreign;
        }

        controller.uninstall();
        assert!(!controller.installed(Protocol::Http));

        controller
            .client(Protocol::Http)
            .get("http://example.com/", None)
            .unwrap();
        assert_eq!(foreign_count.load(Ordering::SeqCst), 1);
    }
}
