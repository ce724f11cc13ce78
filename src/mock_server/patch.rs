//! Test-time rebinding of adapter URLs onto a mock server.
//!
//! This is the only place tests cross the adapter abstraction: the
//! adapter's URL accessors are overridden for the lifetime of the returned
//! guard, and every other adapter operation runs unchanged against the
//! mock server's wire format.

use std::sync::Arc;

use crate::adapters::{ExchangeAdapter, UrlPatch};
use crate::mock_server::server::MockedExchangeServer;

/// RAII guard holding a URL patch; dropping it restores the adapter's real
/// URLs.
pub struct UrlPatchGuard {
    adapter: Arc<dyn ExchangeAdapter>,
}

impl Drop for UrlPatchGuard {
    fn drop(&mut self) {
        self.adapter.core().set_url_patch(None);
    }
}

/// Rebind `adapter`'s REST and WS URLs to `server`'s bound address until
/// the guard drops.
pub fn patch_adapter_urls(
    adapter: Arc<dyn ExchangeAdapter>,
    server: &MockedExchangeServer,
) -> UrlPatchGuard {
    adapter.core().set_url_patch(Some(UrlPatch {
        rest_base: server.rest_url(),
        ws_url: server.ws_url(),
    }));
    tracing::debug!(
        exchange = adapter.name(),
        rest = %server.rest_url(),
        ws = %server.ws_url(),
        "adapter URLs patched"
    );
    UrlPatchGuard { adapter }
}
