//! Per-command handler functions (§4.D). Each handler is a plain async
//! function taking a [`HandlerContext`]; the dispatcher is what routes a
//! `CommandPayload` to one of these and turns the result into a `Response`.

mod orders;
mod queries;
mod quotes;
mod symbols;

pub use orders::{cancel_order, place_order, recheck_order};
pub use queries::{list_trades, query_margin, query_profit_loss, query_usage, list_positions, list_settlements};
pub use quotes::{subscribe_quote, unsubscribe_quote};
pub use symbols::{list_symbols, symbol_info, symbol_snapshot};

use std::sync::Arc;
use std::sync::Mutex;

use cached::{Cached, SizedCache};

use crate::domain::audit::OrderAuditStore;
use crate::quotes::QuoteManager;
use crate::upstream::{ContractHandle, UpstreamSession};
use crate::worker::session::WorkerSessionManager;

/// A small bounded cache of alias -> contract resolutions (§4.D "cache
/// the resolution so repeated lookups are cheap"), backed by the same
/// `cached` crate the gateway codebase reaches for in its symbol lookup
/// path.
pub struct SymbolCache {
    inner: Mutex<SizedCache<String, ContractHandle>>,
}

impl SymbolCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SizedCache::with_size(256)),
        }
    }

    fn get(&self, alias: &str) -> Option<ContractHandle> {
        self.inner.lock().unwrap().cache_get(&alias.to_string()).cloned()
    }

    fn set(&self, alias: &str, handle: ContractHandle) {
        self.inner.lock().unwrap().cache_set(alias.to_string(), handle);
    }
}

impl Default for SymbolCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a handler needs: the worker's upstream session (and its
/// healing logic), the quote fan-out pipeline, the audit store, and the
/// symbol cache. Cheap to clone — every field is already `Arc`-backed.
pub struct HandlerContext<S: UpstreamSession + 'static> {
    pub session_mgr: Arc<WorkerSessionManager<S>>,
    pub quotes: Arc<QuoteManager<S>>,
    pub audit: Arc<dyn OrderAuditStore>,
    pub symbol_cache: Arc<SymbolCache>,
}

impl<S: UpstreamSession + 'static> HandlerContext<S> {
    pub fn session(&self) -> &S {
        self.session_mgr.session()
    }

    /// Resolve an alias to a contract handle, consulting the cache
    /// first and filling it on a miss.
    pub async fn resolve_symbol(
        &self,
        alias: &str,
    ) -> Result<ContractHandle, crate::upstream::UpstreamError> {
        if let Some(handle) = self.symbol_cache.get(alias) {
            return Ok(handle);
        }
        let handle = self.session().resolve_symbol(alias).await?;
        self.symbol_cache.set(alias, handle.clone());
        Ok(handle)
    }
}
