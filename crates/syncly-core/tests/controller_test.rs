#![allow(clippy::unwrap_used)]
// Behavioural tests for `SyncController` against an in-memory remote.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_stream::StreamExt;

use syncly_core::{
    Identified, ItemId, ItemRef, OperationKind, SharedCache, SyncController, SyncError, SyncItem,
    SyncOptions, SyncStatus,
};

// ── Test item ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
struct Note {
    id: ItemId,
    body: String,
}

#[derive(Debug, Clone)]
struct NotePatch {
    id: ItemId,
    body: String,
}

impl Identified for Note {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl Identified for NotePatch {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl SyncItem for Note {
    type Draft = String;
    type Patch = NotePatch;

    fn from_draft(id: ItemId, draft: &String) -> Self {
        Self {
            id,
            body: draft.clone(),
        }
    }

    fn merge(&mut self, patch: &NotePatch) {
        self.body.clone_from(&patch.body);
    }
}

fn patch(id: &str, body: &str) -> NotePatch {
    NotePatch {
        id: ItemId::from(id),
        body: body.into(),
    }
}

fn item_ref(id: &str) -> ItemRef {
    ItemRef::from(ItemId::from(id))
}

// ── Fake remote ─────────────────────────────────────────────────────

struct FakeServer {
    rows: Mutex<Vec<(String, String)>>,
    next_id: AtomicU64,
    log: Mutex<Vec<String>>,
    fail_updates: AtomicBool,
    fail_fetches: AtomicBool,
    create_gate: Semaphore,
    fetch_gate: Semaphore,
}

const OPEN: usize = Semaphore::MAX_PERMITS;

impl FakeServer {
    fn new(rows: &[(&str, &str)]) -> Arc<Self> {
        Self::build(rows, OPEN, OPEN)
    }

    fn holding_creates(rows: &[(&str, &str)]) -> Arc<Self> {
        Self::build(rows, 0, OPEN)
    }

    fn holding_fetches(rows: &[(&str, &str)]) -> Arc<Self> {
        Self::build(rows, OPEN, 0)
    }

    fn build(rows: &[(&str, &str)], create_permits: usize, fetch_permits: usize) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(
                rows.iter()
                    .map(|(id, body)| ((*id).to_owned(), (*body).to_owned()))
                    .collect(),
            ),
            next_id: AtomicU64::new(rows.len() as u64 + 1),
            log: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            create_gate: Semaphore::new(create_permits),
            fetch_gate: Semaphore::new(fetch_permits),
        })
    }

    fn release_creates(&self) {
        self.create_gate.add_permits(1000);
    }

    fn release_fetches(&self) {
        self.fetch_gate.add_permits(1000);
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn calls(&self, prefix: &str) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn fetches(&self) -> usize {
        self.calls("fetch").len()
    }

    async fn fetch(&self) -> Result<Vec<Note>, SyncError> {
        self.record("fetch".into());
        self.fetch_gate.acquire().await.unwrap().forget();
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(SyncError::remote("service unavailable"));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|(id, body)| Note {
                id: ItemId::from(id.as_str()),
                body: body.clone(),
            })
            .collect())
    }

    async fn create(&self, body: String) -> Result<serde_json::Value, SyncError> {
        self.record(format!("create:{body}"));
        self.create_gate.acquire().await.unwrap().forget();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.rows.lock().unwrap().push((id.clone(), body));
        Ok(json!({ "id": id }))
    }

    async fn update(&self, patch: NotePatch) -> Result<serde_json::Value, SyncError> {
        let id = patch.id.to_string();
        self.record(format!("update:{id}"));
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(SyncError::Remote {
                message: "rejected".into(),
                status: Some(422),
            });
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|(row_id, _)| *row_id == id) else {
            return Err(not_found());
        };
        row.1 = patch.body;
        Ok(serde_json::Value::Null)
    }

    async fn delete(&self, params: ItemRef) -> Result<serde_json::Value, SyncError> {
        let id = params.id.to_string();
        self.record(format!("delete:{id}"));
        let mut rows = self.rows.lock().unwrap();
        let Some(pos) = rows.iter().position(|(row_id, _)| *row_id == id) else {
            return Err(not_found());
        };
        rows.remove(pos);
        Ok(serde_json::Value::Null)
    }
}

fn not_found() -> SyncError {
    SyncError::Remote {
        message: "HTTP 404".into(),
        status: Some(404),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn create_only(server: &Arc<FakeServer>) -> SyncOptions<Note> {
    let fetch_server = Arc::clone(server);
    let create_server = Arc::clone(server);
    SyncOptions::new(
        move |_query: Option<()>| {
            let server = Arc::clone(&fetch_server);
            async move { server.fetch().await }
        },
        move |draft: String| {
            let server = Arc::clone(&create_server);
            async move { server.create(draft).await }
        },
    )
}

fn options(server: &Arc<FakeServer>) -> SyncOptions<Note> {
    let update_server = Arc::clone(server);
    let delete_server = Arc::clone(server);
    create_only(server)
        .with_update(move |patch: NotePatch| {
            let server = Arc::clone(&update_server);
            async move { server.update(patch).await }
        })
        .with_delete(move |params: ItemRef| {
            let server = Arc::clone(&delete_server);
            async move { server.delete(params).await }
        })
}

async fn settle(ctrl: &SyncController<Note>) -> SyncStatus {
    timeout(Duration::from_secs(5), ctrl.settled())
        .await
        .expect("controller did not settle")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

fn ids(ctrl: &SyncController<Note>) -> Vec<String> {
    ctrl.items().iter().map(|n| n.id.to_string()).collect()
}

fn bodies(ctrl: &SyncController<Note>) -> Vec<String> {
    ctrl.items().iter().map(|n| n.body.clone()).collect()
}

// ── Optimistic create ───────────────────────────────────────────────

#[tokio::test]
async fn optimistic_create_shows_provisional_item_then_server_truth() {
    let server = FakeServer::new(&[("1", "A")]);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true).optimistic(true));
    settle(&ctrl).await;
    assert_eq!(ids(&ctrl), ["1"]);

    let sub = ctrl.submit_create("B".into());

    let items = ctrl.items();
    assert_eq!(items.len(), 2);
    assert!(items[1].id.is_local());
    assert_eq!(items[1].body, "B");

    assert_eq!(sub.await, Ok(json!({ "id": "2" })));
    let status = settle(&ctrl).await;

    assert_eq!(ids(&ctrl), ["1", "2"]);
    assert_eq!(bodies(&ctrl), ["A", "B"]);
    assert!(!status.loading());
    assert_eq!(status.error, None);
    assert!(status.last_fetch.is_some());
}

#[tokio::test]
async fn non_optimistic_create_waits_for_refetch() {
    let server = FakeServer::new(&[("1", "A")]);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true));
    settle(&ctrl).await;

    let sub = ctrl.submit_create("B".into());
    assert_eq!(ctrl.items().len(), 1);

    sub.await.unwrap();
    settle(&ctrl).await;
    assert_eq!(bodies(&ctrl), ["A", "B"]);
}

// ── Update / delete ─────────────────────────────────────────────────

#[tokio::test]
async fn rejected_update_is_rolled_back_by_refetch() {
    let server = FakeServer::new(&[("1", "A")]);
    server.fail_updates.store(true, Ordering::SeqCst);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true).optimistic(true));
    settle(&ctrl).await;

    let sub = ctrl.submit_update(patch("1", "Z"));
    assert_eq!(bodies(&ctrl), ["Z"]);

    let err = sub.await.unwrap_err();
    assert!(
        matches!(err, SyncError::Remote { status: Some(422), .. }),
        "unexpected error: {err:?}"
    );

    let status = settle(&ctrl).await;
    assert_eq!(bodies(&ctrl), ["A"]);
    assert_eq!(status.error, Some(err));
}

#[tokio::test]
async fn later_success_clears_the_shared_error() {
    let server = FakeServer::new(&[("1", "A")]);
    server.fail_updates.store(true, Ordering::SeqCst);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true));
    settle(&ctrl).await;

    assert!(ctrl.submit_update(patch("1", "Z")).await.is_err());
    assert!(settle(&ctrl).await.error.is_some());

    server.fail_updates.store(false, Ordering::SeqCst);
    assert_eq!(
        ctrl.submit_update(patch("1", "Y")).await,
        Ok(serde_json::Value::Null)
    );

    let status = settle(&ctrl).await;
    assert_eq!(status.error, None);
    assert_eq!(bodies(&ctrl), ["Y"]);
}

#[tokio::test]
async fn successful_fetch_clears_a_fetch_error() {
    let server = FakeServer::new(&[("1", "A")]);
    let ctrl = SyncController::spawn(options(&server));

    server.fail_fetches.store(true, Ordering::SeqCst);
    assert!(ctrl.refetch().await.is_err());
    let status = settle(&ctrl).await;
    assert_eq!(status.error, Some(SyncError::remote("service unavailable")));
    assert_eq!(status.error_source, Some(OperationKind::Fetch));

    server.fail_fetches.store(false, Ordering::SeqCst);
    ctrl.refetch().await.unwrap();
    let status = settle(&ctrl).await;
    assert_eq!(status.error, None);
    assert_eq!(status.error_source, None);
    assert_eq!(bodies(&ctrl), ["A"]);
}

#[tokio::test]
async fn rollback_refetch_keeps_the_mutation_error() {
    let server = FakeServer::new(&[("1", "A")]);
    server.fail_updates.store(true, Ordering::SeqCst);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true));
    settle(&ctrl).await;

    assert!(ctrl.submit_update(patch("1", "Z")).await.is_err());
    settle(&ctrl).await;
    ctrl.refetch().await.unwrap();

    let status = settle(&ctrl).await;
    assert_eq!(status.error_source, Some(OperationKind::Update));
    assert!(matches!(status.error, Some(SyncError::Remote { status: Some(422), .. })));
}

#[tokio::test]
async fn unknown_id_leaves_mirror_alone_but_still_calls_remote() {
    let server = FakeServer::new(&[("1", "A")]);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true).optimistic(true));
    settle(&ctrl).await;
    let fetches = server.fetches();
    let before = ctrl.items();

    let update = ctrl.submit_update(patch("9", "X"));
    let delete = ctrl.submit_delete(item_ref("9"));
    assert!(Arc::ptr_eq(&before, &ctrl.items()));

    assert_eq!(update.await, Err(not_found()));
    assert_eq!(delete.await, Err(not_found()));
    settle(&ctrl).await;

    assert_eq!(server.calls("update:"), ["update:9"]);
    assert_eq!(server.calls("delete:"), ["delete:9"]);
    assert!(server.fetches() > fetches);
    assert_eq!(bodies(&ctrl), ["A"]);
}

#[tokio::test]
async fn delete_while_create_in_flight_settles_cleanly() {
    let server = FakeServer::holding_creates(&[("1", "A")]);
    let ctrl = SyncController::spawn(options(&server).optimistic(true));
    ctrl.refetch().await.unwrap();

    let create = ctrl.submit_create("B".into());
    let mut status = ctrl.watch_status();
    timeout(Duration::from_secs(5), status.wait_for(|s| s.in_flight == 1))
        .await
        .unwrap()
        .unwrap();

    let delete = ctrl.submit_delete(item_ref("1"));
    assert_eq!(bodies(&ctrl), ["B"]);
    delete.await.unwrap();
    assert!(ctrl.status().loading());

    server.release_creates();
    create.await.unwrap();
    let status = settle(&ctrl).await;

    assert!(!status.loading());
    assert_eq!(ids(&ctrl), ["2"]);
    assert_eq!(bodies(&ctrl), ["B"]);
}

// ── Queueing ────────────────────────────────────────────────────────

#[tokio::test]
async fn rapid_creates_reach_the_remote_in_order() {
    let server = FakeServer::new(&[]);
    let ctrl = SyncController::spawn(options(&server));

    let subs: Vec<_> = (0..5)
        .map(|i| ctrl.submit_create(format!("n{i}")))
        .collect();
    assert_eq!(ctrl.status().pending.create, 5);

    for sub in subs {
        sub.await.unwrap();
    }
    settle(&ctrl).await;

    assert_eq!(
        server.calls("create:"),
        ["create:n0", "create:n1", "create:n2", "create:n3", "create:n4"]
    );
    assert_eq!(bodies(&ctrl), ["n0", "n1", "n2", "n3", "n4"]);
}

#[tokio::test]
async fn refresh_requests_during_a_fetch_are_coalesced() {
    let server = FakeServer::holding_fetches(&[]);
    let ctrl = SyncController::spawn(options(&server));

    let first = ctrl.refetch();
    wait_until(|| server.fetches() == 1).await;

    ctrl.submit_create("x".into()).await.unwrap();
    ctrl.submit_create("y".into()).await.unwrap();
    let second = ctrl.refetch();
    let third = ctrl.refetch();

    server.release_fetches();
    first.await.unwrap();
    let second = second.await.unwrap();
    let third = third.await.unwrap();
    settle(&ctrl).await;

    assert_eq!(server.fetches(), 2);
    assert_eq!(second.len(), 2);
    assert!(Arc::ptr_eq(&second, &third));
}

#[tokio::test]
async fn refetch_is_idempotent_without_mutations() {
    let server = FakeServer::new(&[("1", "A"), ("2", "B")]);
    let ctrl = SyncController::spawn(options(&server));

    let first = ctrl.refetch().await.unwrap();
    let second = ctrl.refetch().await.unwrap();

    let contents = |snap: &syncly_core::Snapshot<Note>| -> Vec<Note> {
        snap.iter().map(|n| (**n).clone()).collect()
    };
    assert_eq!(contents(&first), contents(&second));
    assert_eq!(server.fetches(), 2);
    assert_eq!(ids(&ctrl), ["1", "2"]);
}

// ── Capabilities / lifecycle ────────────────────────────────────────

#[tokio::test]
async fn missing_capability_resolves_unsupported_and_rolls_back() {
    let server = FakeServer::new(&[("1", "A")]);
    let ctrl = SyncController::spawn(create_only(&server).auto_fetch(true).optimistic(true));
    settle(&ctrl).await;
    let fetches = server.fetches();

    let sub = ctrl.submit_delete(item_ref("1"));
    assert!(ctrl.items().is_empty());

    assert_eq!(
        sub.await,
        Err(SyncError::Unsupported {
            operation: OperationKind::Delete
        })
    );
    let status = settle(&ctrl).await;

    assert_eq!(bodies(&ctrl), ["A"]);
    assert_eq!(status.error, None);
    assert!(server.calls("delete:").is_empty());
    assert_eq!(server.fetches(), fetches + 1);
}

#[tokio::test]
async fn submissions_after_shutdown_fail_without_touching_the_mirror() {
    let server = FakeServer::new(&[("1", "A")]);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true).optimistic(true));
    settle(&ctrl).await;

    ctrl.shutdown().await;
    assert!(ctrl.is_shutdown());

    assert_eq!(ctrl.submit_create("B".into()).await, Err(SyncError::Shutdown));
    assert!(matches!(ctrl.refetch().await, Err(SyncError::Shutdown)));
    assert_eq!(bodies(&ctrl), ["A"]);
    assert!(settle(&ctrl).await.is_settled());
}

#[tokio::test]
async fn shutdown_lets_running_call_finish_and_drops_the_queue() {
    let server = FakeServer::holding_creates(&[]);
    let ctrl = SyncController::spawn(options(&server));

    let running = ctrl.submit_create("a".into());
    let queued = ctrl.submit_create("b".into());
    wait_until(|| server.calls("create:").len() == 1).await;

    let stopper = ctrl.clone();
    let stop = tokio::spawn(async move { stopper.shutdown().await });
    wait_until(|| ctrl.is_shutdown()).await;
    server.release_creates();

    assert!(running.await.is_ok());
    assert_eq!(queued.await, Err(SyncError::Shutdown));
    stop.await.unwrap();
    assert_eq!(server.calls("create:"), ["create:a"]);
}

#[tokio::test]
async fn dropped_submission_still_records_error() {
    let server = FakeServer::new(&[("1", "A")]);
    server.fail_updates.store(true, Ordering::SeqCst);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true));
    settle(&ctrl).await;

    drop(ctrl.submit_update(patch("1", "Z")));
    let status = settle(&ctrl).await;
    assert!(matches!(status.error, Some(SyncError::Remote { .. })));
}

// ── Shared cache ────────────────────────────────────────────────────

#[tokio::test]
async fn cache_seeds_new_controllers_and_is_invalidated_by_mutations() {
    let server = FakeServer::new(&[("1", "A")]);
    let cache = SharedCache::new();

    let first = SyncController::spawn(options(&server).cache(cache.clone(), "notes"));
    first.refetch().await.unwrap();
    assert!(cache.contains_key("notes"));

    let second = SyncController::spawn(options(&server).cache(cache.clone(), "notes"));
    assert_eq!(bodies(&second), ["A"]);

    server.fail_fetches.store(true, Ordering::SeqCst);
    first.submit_create("B".into()).await.unwrap();
    settle(&first).await;
    assert!(!cache.contains_key("notes"));
}

// ── Observation ─────────────────────────────────────────────────────

#[tokio::test]
async fn subscribers_see_optimistic_and_reconciled_snapshots() {
    let server = FakeServer::new(&[]);
    let ctrl = SyncController::spawn(options(&server).optimistic(true));
    let mut stream = ctrl.subscribe();
    assert!(stream.current().is_empty());

    let sub = ctrl.submit_create("A".into());
    let snap = timeout(Duration::from_secs(5), stream.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(snap[0].id.is_local());

    sub.await.unwrap();
    settle(&ctrl).await;
    assert_eq!(stream.latest()[0].id, ItemId::from("1"));
    assert!(stream.current()[0].id.is_local());

    stream.changed().await.unwrap();
    assert!(stream.get(&ItemId::from("1")).is_some());
}

#[tokio::test]
async fn into_stream_yields_current_snapshot_then_each_change() {
    let server = FakeServer::new(&[("1", "A")]);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true));
    ctrl.refetch().await.unwrap();
    settle(&ctrl).await;

    let mut stream = ctrl.subscribe().into_stream();
    let first = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.len(), 1);

    ctrl.submit_create("B".into()).await.unwrap();
    settle(&ctrl).await;

    let next = timeout(Duration::from_secs(5), stream.next())
        .await
        .unwrap()
        .unwrap();
    let bodies: Vec<_> = next.iter().map(|n| n.body.as_str()).collect();
    assert_eq!(bodies, ["A", "B"]);
}

// ── Multi-threaded runtime ──────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mixed_operations_converge_on_server_state() {
    let server = FakeServer::new(&[("1", "seed")]);
    let ctrl = SyncController::spawn(options(&server).auto_fetch(true).optimistic(true));

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let ctrl = ctrl.clone();
            tokio::spawn(async move {
                for round in 0..10 {
                    let mut subs = Vec::new();
                    for i in 0..3 {
                        subs.push(ctrl.submit_create(format!("w{worker}-r{round}-{i}")));
                    }
                    if let Ok(snapshot) = ctrl.refetch().await {
                        let synced: Vec<_> =
                            snapshot.iter().filter(|n| !n.id.is_local()).collect();
                        for note in synced.iter().take(3) {
                            let body = format!("u{worker}-r{round}");
                            subs.push(ctrl.submit_update(patch(&note.id.to_string(), &body)));
                        }
                        if let Some(note) = synced.last() {
                            subs.push(ctrl.submit_delete(ItemRef::from(note.id.clone())));
                        }
                    }
                    for sub in subs {
                        // Racing deletes and updates may 404.
                        let _ = sub.await;
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.await.unwrap();
    }

    let status = settle(&ctrl).await;
    assert!(!status.loading());
    assert_eq!(status.pending.total(), 0);

    let expected = server.rows.lock().unwrap().clone();
    let mirrored: Vec<(String, String)> = ctrl
        .items()
        .iter()
        .map(|n| (n.id.to_string(), n.body.clone()))
        .collect();
    assert_eq!(mirrored, expected);
    assert!(ctrl.items().iter().all(|n| !n.id.is_local()));
}
