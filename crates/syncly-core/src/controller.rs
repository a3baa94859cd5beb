// ── Sync controller ──
//
// Mediates between a locally rendered mirror and a remote collection.
// Mutations are staged on one FIFO queue per kind and executed by a
// dedicated drain task; every settled mutation publishes an invalidation
// which a single refetch task coalesces into one full fetch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{RefreshRequest, Staged, Submission};
use crate::error::{OperationKind, SyncError};
use crate::model::{Identified, ItemRef, LocalIds, SyncItem};
use crate::options::{FetchFn, MutationFn, SyncOptions};
use crate::store::{Mirror, SharedCache, Snapshot};
use crate::stream::MirrorStream;

// ── SyncStatus ───────────────────────────────────────────────────

/// Unresolved intents per operation kind.
///
/// A mutation counts from submission until its remote call settles; a fetch
/// counts from `refetch()` until its cycle starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub fetch: usize,
}

impl PendingCounts {
    pub fn total(&self) -> usize {
        self.create + self.update + self.delete + self.fetch
    }

    fn slot_mut(&mut self, kind: OperationKind) -> &mut usize {
        match kind {
            OperationKind::Create => &mut self.create,
            OperationKind::Update => &mut self.update,
            OperationKind::Delete => &mut self.delete,
            OperationKind::Fetch => &mut self.fetch,
        }
    }
}

/// Flags observable alongside the mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    /// Remote operations currently running.
    pub in_flight: usize,
    pub pending: PendingCounts,
    /// Most recent failure of any operation. A successful mutation clears it;
    /// a successful fetch clears it only when a fetch produced it.
    pub error: Option<SyncError>,
    /// Which capability produced `error`.
    pub error_source: Option<OperationKind>,
    /// A refetch is owed because a mutation settled after the last fetch began.
    pub invalidated: bool,
    pub last_fetch: Option<DateTime<Utc>>,
}

impl SyncStatus {
    fn record_error(&mut self, kind: OperationKind, err: &SyncError) {
        self.error = Some(err.clone());
        self.error_source = Some(kind);
    }

    fn clear_error(&mut self) {
        self.error = None;
        self.error_source = None;
    }

    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Nothing running, queued, or owed.
    pub fn is_settled(&self) -> bool {
        self.in_flight == 0 && self.pending.total() == 0 && !self.invalidated
    }
}

// ── SyncController ───────────────────────────────────────────────

/// Handle to a running synchronization controller.
///
/// Cheaply cloneable. The background tasks stop once every handle is dropped
/// (after draining what was already queued) or on [`shutdown()`](Self::shutdown).
pub struct SyncController<T: SyncItem, Q = (), D = ItemRef> {
    inner: Arc<ControllerInner<T, Q, D>>,
}

impl<T: SyncItem, Q, D> Clone for SyncController<T, Q, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<T: SyncItem, Q, D> {
    shared: Arc<Shared<T, Q>>,
    create_tx: mpsc::UnboundedSender<Staged<T::Draft>>,
    update_tx: mpsc::UnboundedSender<Staged<T::Patch>>,
    delete_tx: mpsc::UnboundedSender<Staged<D>>,
    refresh_tx: mpsc::UnboundedSender<RefreshRequest<T>>,
    local_ids: LocalIds,
    optimistic: bool,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

/// State the background tasks share with the handles. Holds no queue
/// senders, so dropping every handle closes the queues.
struct Shared<T: SyncItem, Q> {
    mirror: Mirror<T>,
    status: watch::Sender<SyncStatus>,
    fetch: FetchFn<T, Q>,
    query: Option<Q>,
    cache: Option<(SharedCache, String)>,
}

impl<T: SyncItem, Q> Shared<T, Q> {
    fn store_cache(&self, snapshot: &Snapshot<T>) {
        if let Some((cache, key)) = &self.cache {
            cache.insert(key.as_str(), Arc::clone(snapshot));
        }
    }

    fn invalidate_cache(&self) {
        if let Some((cache, key)) = &self.cache {
            cache.invalidate(key);
        }
    }
}

impl<T, Q, D> SyncController<T, Q, D>
where
    T: SyncItem,
    Q: Clone + Send + Sync + 'static,
    D: Identified + Clone + Send + Sync + 'static,
{
    /// Start the drain and refetch tasks on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn spawn(options: SyncOptions<T, Q, D>) -> Self {
        let SyncOptions {
            fetch,
            create,
            update,
            delete,
            query,
            auto_fetch,
            optimistic,
            cache,
        } = options;

        let seed = cache
            .as_ref()
            .and_then(|(cache, key)| cache.get::<Snapshot<T>>(key));
        let mirror = match seed {
            Some(snapshot) => {
                debug!(items = snapshot.len(), "seeding mirror from shared cache");
                Mirror::seeded(Arc::clone(&*snapshot))
            }
            None => Mirror::new(),
        };

        let (status, _) = watch::channel(SyncStatus::default());
        let shared = Arc::new(Shared {
            mirror,
            status,
            fetch,
            query,
            cache,
        });

        let (create_tx, create_rx) = mpsc::unbounded_channel();
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (delete_tx, delete_rx) = mpsc::unbounded_channel();
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let handles = vec![
            tokio::spawn(drain_task(
                OperationKind::Create,
                Arc::clone(&shared),
                Some(create),
                create_rx,
                refresh_tx.clone(),
                cancel.clone(),
            )),
            tokio::spawn(drain_task(
                OperationKind::Update,
                Arc::clone(&shared),
                update,
                update_rx,
                refresh_tx.clone(),
                cancel.clone(),
            )),
            tokio::spawn(drain_task(
                OperationKind::Delete,
                Arc::clone(&shared),
                delete,
                delete_rx,
                refresh_tx.clone(),
                cancel.clone(),
            )),
            tokio::spawn(refresh_task(Arc::clone(&shared), refresh_rx, cancel.clone())),
        ];

        let local_ids = LocalIds::new();
        info!(
            instance = %local_ids.instance(),
            optimistic,
            auto_fetch,
            "sync controller started"
        );

        let controller = Self {
            inner: Arc::new(ControllerInner {
                shared,
                create_tx,
                update_tx,
                delete_tx,
                refresh_tx,
                local_ids,
                optimistic,
                cancel,
                task_handles: Mutex::new(handles),
            }),
        };

        if auto_fetch {
            // Nobody awaits the initial fetch; its outcome lands in `status().error`.
            drop(controller.refetch());
        }
        controller
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Stage a create. With optimistic apply on, the mirror gains a provisional
    /// entry (with an [`ItemId::Local`](crate::model::ItemId::Local) id) before this returns.
    pub fn submit_create(&self, draft: T::Draft) -> Submission {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Submission::failed(SyncError::Shutdown);
        }
        self.reserve(OperationKind::Create);
        if inner.optimistic {
            let id = inner.local_ids.next();
            debug!(%id, "optimistic create");
            inner.shared.mirror.append(T::from_draft(id, &draft));
        }
        self.stage(&inner.create_tx, draft, OperationKind::Create)
    }

    /// Stage an update. With optimistic apply on, the patch is merged into the
    /// matching entry; an unknown id leaves the mirror alone but the remote call
    /// still runs.
    pub fn submit_update(&self, patch: T::Patch) -> Submission {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Submission::failed(SyncError::Shutdown);
        }
        self.reserve(OperationKind::Update);
        if inner.optimistic && !inner.shared.mirror.merge(&patch) {
            debug!(id = %patch.id(), "optimistic update: no matching entry");
        }
        self.stage(&inner.update_tx, patch, OperationKind::Update)
    }

    /// Stage a delete. With optimistic apply on, the matching entry is removed.
    pub fn submit_delete(&self, params: D) -> Submission {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Submission::failed(SyncError::Shutdown);
        }
        self.reserve(OperationKind::Delete);
        if inner.optimistic && inner.shared.mirror.remove(params.id()).is_none() {
            debug!(id = %params.id(), "optimistic delete: no matching entry");
        }
        self.stage(&inner.delete_tx, params, OperationKind::Delete)
    }

    /// Fetch the collection now, regardless of invalidation state.
    ///
    /// Requests queued together are coalesced into one fetch, and every caller
    /// receives its outcome.
    pub fn refetch(&self) -> Submission<Snapshot<T>> {
        let inner = &self.inner;
        if inner.cancel.is_cancelled() {
            return Submission::failed(SyncError::Shutdown);
        }
        self.reserve(OperationKind::Fetch);
        let (tx, rx) = oneshot::channel();
        if inner.refresh_tx.send(RefreshRequest::Explicit(tx)).is_err() {
            self.release(OperationKind::Fetch);
            return Submission::failed(SyncError::Shutdown);
        }
        Submission::new(rx)
    }

    fn reserve(&self, kind: OperationKind) {
        self.inner
            .shared
            .status
            .send_modify(|status| *status.pending.slot_mut(kind) += 1);
    }

    fn release(&self, kind: OperationKind) {
        self.inner.shared.status.send_modify(|status| {
            let slot = status.pending.slot_mut(kind);
            *slot = slot.saturating_sub(1);
        });
    }

    fn stage<P>(
        &self,
        tx: &mpsc::UnboundedSender<Staged<P>>,
        payload: P,
        kind: OperationKind,
    ) -> Submission {
        let (respond, rx) = oneshot::channel();
        if tx.send(Staged { payload, respond }).is_err() {
            warn!(operation = %kind, "drain task gone, dropping submission");
            self.release(kind);
            return Submission::failed(SyncError::Shutdown);
        }
        Submission::new(rx)
    }

    // ── Observation ──────────────────────────────────────────────

    /// Current mirror snapshot.
    pub fn items(&self) -> Snapshot<T> {
        self.inner.shared.mirror.snapshot()
    }

    pub fn status(&self) -> SyncStatus {
        self.inner.shared.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.inner.shared.status.subscribe()
    }

    /// Subscribe to mirror changes.
    pub fn subscribe(&self) -> MirrorStream<T> {
        MirrorStream::new(self.inner.shared.mirror.subscribe())
    }

    /// Wait until nothing is in flight, queued, or owed, then return the status.
    /// Returns early once the controller is shut down.
    pub async fn settled(&self) -> SyncStatus {
        let rx = self.inner.shared.status.subscribe();
        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => {}
            _ = wait_status(rx, SyncStatus::is_settled) => {}
        }
        self.status()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Stop the background tasks and wait for them to exit.
    ///
    /// A remote call already running completes, but no refetch follows it.
    /// Queued intents are dropped and their submissions resolve with
    /// [`SyncError::Shutdown`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.shared.status.send_modify(|status| {
            status.in_flight = 0;
            status.pending = PendingCounts::default();
            status.invalidated = false;
        });
        info!(instance = %self.inner.local_ids.instance(), "sync controller stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Execute one kind's staged intents strictly in submission order.
async fn drain_task<T, Q, P>(
    kind: OperationKind,
    shared: Arc<Shared<T, Q>>,
    capability: Option<MutationFn<P>>,
    mut rx: mpsc::UnboundedReceiver<Staged<P>>,
    refresh_tx: mpsc::UnboundedSender<RefreshRequest<T>>,
    cancel: CancellationToken,
) where
    T: SyncItem,
    Q: Send + Sync + 'static,
    P: Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            staged = rx.recv() => {
                let Some(Staged { payload, respond }) = staged else { break };
                let outcome = run_staged(kind, &shared, capability.as_ref(), payload).await;
                if !cancel.is_cancelled() {
                    let _ = refresh_tx.send(RefreshRequest::Invalidate);
                }
                let _ = respond.send(outcome);
            }
        }
    }
    debug!(operation = %kind, "drain task stopped");
}

async fn run_staged<T, Q, P>(
    kind: OperationKind,
    shared: &Shared<T, Q>,
    capability: Option<&MutationFn<P>>,
    payload: P,
) -> Result<serde_json::Value, SyncError>
where
    T: SyncItem,
{
    shared.status.send_modify(|status| status.in_flight += 1);

    let outcome = match capability {
        Some(call) => {
            let result = call(payload).await;
            match &result {
                Ok(_) => debug!(operation = %kind, "remote operation succeeded"),
                Err(e) => warn!(operation = %kind, error = %e, "remote operation failed"),
            }
            result
        }
        None => {
            // Roll back whatever the optimistic path did via the refetch below.
            debug!(operation = %kind, "no capability configured");
            Err(SyncError::Unsupported { operation: kind })
        }
    };

    shared.status.send_modify(|status| {
        status.in_flight = status.in_flight.saturating_sub(1);
        let slot = status.pending.slot_mut(kind);
        *slot = slot.saturating_sub(1);
        status.invalidated = true;
        match &outcome {
            Ok(_) => status.clear_error(),
            Err(SyncError::Unsupported { .. }) => {}
            Err(e) => status.record_error(kind, e),
        }
    });
    shared.invalidate_cache();
    outcome
}

/// Single consumer of refresh requests.
async fn refresh_task<T, Q>(
    shared: Arc<Shared<T, Q>>,
    mut rx: mpsc::UnboundedReceiver<RefreshRequest<T>>,
    cancel: CancellationToken,
) where
    T: SyncItem,
    Q: Clone + Send + Sync + 'static,
{
    loop {
        let first = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let mut batch = RefreshBatch::default();
        batch.push(first);
        batch.absorb(&mut rx);

        if batch.invalidated {
            // In-flight writes are about to invalidate again; fetch once after them.
            let quiesced = tokio::select! {
                biased;
                () = cancel.cancelled() => false,
                ok = wait_status(shared.status.subscribe(), |s| s.in_flight == 0) => ok,
            };
            if !quiesced {
                break;
            }
            batch.absorb(&mut rx);
        }

        if batch.coalesced > 1 {
            debug!(requests = batch.coalesced, "coalesced refresh requests");
        }
        let outcome = fetch_cycle(&shared, batch.explicit.len(), &cancel).await;
        for responder in batch.explicit {
            let _ = responder.send(outcome.clone());
        }
    }
    debug!("refresh task stopped");
}

struct RefreshBatch<T> {
    invalidated: bool,
    explicit: Vec<oneshot::Sender<Result<Snapshot<T>, SyncError>>>,
    coalesced: usize,
}

impl<T> Default for RefreshBatch<T> {
    fn default() -> Self {
        Self {
            invalidated: false,
            explicit: Vec::new(),
            coalesced: 0,
        }
    }
}

impl<T> RefreshBatch<T> {
    fn push(&mut self, request: RefreshRequest<T>) {
        self.coalesced += 1;
        match request {
            RefreshRequest::Invalidate => self.invalidated = true,
            RefreshRequest::Explicit(responder) => self.explicit.push(responder),
        }
    }

    fn absorb(&mut self, rx: &mut mpsc::UnboundedReceiver<RefreshRequest<T>>) {
        while let Ok(request) = rx.try_recv() {
            self.push(request);
        }
    }
}

/// One fetch: replace the mirror with server truth on success.
async fn fetch_cycle<T, Q>(
    shared: &Shared<T, Q>,
    explicit: usize,
    cancel: &CancellationToken,
) -> Result<Snapshot<T>, SyncError>
where
    T: SyncItem,
    Q: Clone,
{
    shared.status.send_modify(|status| {
        status.in_flight += 1;
        status.invalidated = false;
        status.pending.fetch = status.pending.fetch.saturating_sub(explicit);
    });

    let result = (shared.fetch)(shared.query.clone()).await;
    let outcome = match result {
        Ok(_) if cancel.is_cancelled() => Err(SyncError::Shutdown),
        Ok(items) => {
            let snapshot = shared.mirror.replace(items);
            shared.store_cache(&snapshot);
            debug!(items = snapshot.len(), "mirror replaced from fetch");
            Ok(snapshot)
        }
        Err(e) => {
            warn!(error = %e, "fetch failed");
            Err(e)
        }
    };

    shared.status.send_modify(|status| {
        status.in_flight = status.in_flight.saturating_sub(1);
        match &outcome {
            Ok(_) => {
                status.last_fetch = Some(Utc::now());
                // A rejected mutation stays visible after its rollback refetch.
                if status.error_source == Some(OperationKind::Fetch) {
                    status.clear_error();
                }
            }
            Err(SyncError::Shutdown) => {}
            Err(e) => status.record_error(OperationKind::Fetch, e),
        }
    });
    outcome
}

/// Resolve once the status satisfies `predicate`. `false` if the sender is gone.
async fn wait_status(
    mut rx: watch::Receiver<SyncStatus>,
    predicate: impl FnMut(&SyncStatus) -> bool,
) -> bool {
    rx.wait_for(predicate).await.is_ok()
}
