// ── Controller construction options ──
//
// The four capability functions and the behaviour flags a controller is
// built from. Capabilities are stored type-erased (`Arc<dyn Fn>` returning
// a boxed future) so one controller type serves any transport.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::error::SyncError;
use crate::model::{Identified, ItemRef, SyncItem};
use crate::store::SharedCache;

/// Stored fetch capability.
pub type FetchFn<T, Q> =
    Arc<dyn Fn(Option<Q>) -> BoxFuture<'static, Result<Vec<T>, SyncError>> + Send + Sync>;

/// Stored create / update / delete capability. The result is opaque.
pub type MutationFn<P> =
    Arc<dyn Fn(P) -> BoxFuture<'static, Result<serde_json::Value, SyncError>> + Send + Sync>;

/// Everything needed to [`spawn`](crate::SyncController::spawn) a controller.
///
/// `fetch` and `create` are required; `update` and `delete` are optional and
/// a controller without them answers those submissions with
/// [`SyncError::Unsupported`].
pub struct SyncOptions<T: SyncItem, Q = (), D = ItemRef> {
    pub(crate) fetch: FetchFn<T, Q>,
    pub(crate) create: MutationFn<T::Draft>,
    pub(crate) update: Option<MutationFn<T::Patch>>,
    pub(crate) delete: Option<MutationFn<D>>,
    pub(crate) query: Option<Q>,
    pub(crate) auto_fetch: bool,
    pub(crate) optimistic: bool,
    pub(crate) cache: Option<(SharedCache, String)>,
}

impl<T, Q, D> SyncOptions<T, Q, D>
where
    T: SyncItem,
    Q: Clone + Send + Sync + 'static,
    D: Identified + Clone + Send + Sync + 'static,
{
    /// Start from the two required capabilities. Both flags default to off.
    pub fn new<F, FFut, C, CFut>(fetch: F, create: C) -> Self
    where
        F: Fn(Option<Q>) -> FFut + Send + Sync + 'static,
        FFut: Future<Output = Result<Vec<T>, SyncError>> + Send + 'static,
        C: Fn(T::Draft) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = Result<serde_json::Value, SyncError>> + Send + 'static,
    {
        Self {
            fetch: Arc::new(move |query: Option<Q>| fetch(query).boxed()),
            create: Arc::new(move |draft: T::Draft| create(draft).boxed()),
            update: None,
            delete: None,
            query: None,
            auto_fetch: false,
            optimistic: false,
            cache: None,
        }
    }

    pub fn with_update<U, UFut>(mut self, update: U) -> Self
    where
        U: Fn(T::Patch) -> UFut + Send + Sync + 'static,
        UFut: Future<Output = Result<serde_json::Value, SyncError>> + Send + 'static,
    {
        self.update = Some(Arc::new(move |patch: T::Patch| update(patch).boxed()));
        self
    }

    pub fn with_delete<R, RFut>(mut self, delete: R) -> Self
    where
        R: Fn(D) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = Result<serde_json::Value, SyncError>> + Send + 'static,
    {
        self.delete = Some(Arc::new(move |params: D| delete(params).boxed()));
        self
    }

    /// Opaque query value passed unchanged to every fetch.
    pub fn query(mut self, query: Q) -> Self {
        self.query = Some(query);
        self
    }

    /// Fetch once as soon as the controller is spawned.
    pub fn auto_fetch(mut self, enabled: bool) -> Self {
        self.auto_fetch = enabled;
        self
    }

    /// Apply mutations to the mirror before the server confirms them.
    pub fn optimistic(mut self, enabled: bool) -> Self {
        self.optimistic = enabled;
        self
    }

    /// Share fetched collections through `cache` under `key`.
    ///
    /// The mirror is seeded from the cached value at spawn, every successful
    /// fetch overwrites it, and every settled mutation invalidates it.
    pub fn cache(mut self, cache: SharedCache, key: impl Into<String>) -> Self {
        self.cache = Some((cache, key.into()));
        self
    }
}
