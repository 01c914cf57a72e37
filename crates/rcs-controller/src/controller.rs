//! Controller — drives a [`Reconciler`] from informer events.
//!
//! One dispatcher task fans store changes out to the controller's informers
//! and enqueues the resulting keys; `workers` tasks pull keys and reconcile
//! them. The queue guarantees a key is never reconciled by two workers at
//! once, so reconcilers need no locking of their own.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rcs_state::{ObjectKey, StateStore};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::informer::Source;
use crate::queue::WorkQueue;

/// Outcome of a successful reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Converged; wait for the next event.
    Done,
    /// Reconcile again after the delay.
    RequeueAfter(Duration),
}

/// Level-triggered reconcile logic for one kind of key.
pub trait Reconciler: Send + Sync + 'static {
    type Error: Display + Send;

    fn name(&self) -> &'static str;

    fn reconcile(
        &self,
        key: &ObjectKey,
    ) -> impl Future<Output = Result<Action, Self::Error>> + Send;
}

pub struct Controller<R: Reconciler> {
    reconciler: Arc<R>,
    store: StateStore,
    queue: WorkQueue,
    sources: Vec<Box<dyn Source>>,
    workers: usize,
    resync: Option<Duration>,
}

impl<R: Reconciler> Controller<R> {
    pub fn new(reconciler: R, store: StateStore) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            store,
            queue: WorkQueue::new(),
            sources: Vec::new(),
            workers: 1,
            resync: None,
        }
    }

    /// Add an informer whose changes feed this controller.
    pub fn watches(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Periodically relist every informer.
    pub fn with_resync(mut self, resync: Option<Duration>) -> Self {
        self.resync = resync;
        self
    }

    pub fn queue(&self) -> WorkQueue {
        self.queue.clone()
    }

    /// Run until `shutdown` flips to true.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let name = self.reconciler.name();
        info!(controller = name, workers = self.workers, "controller starting");

        // Subscribe before the initial list so nothing falls in between.
        let events = self.store.watch();

        let dispatcher = tokio::spawn(dispatch(
            name,
            events,
            self.sources,
            self.queue.clone(),
            self.resync,
            shutdown.clone(),
        ));

        let mut handles = Vec::with_capacity(self.workers);
        for _ in 0..self.workers {
            handles.push(tokio::spawn(work(
                Arc::clone(&self.reconciler),
                self.queue.clone(),
                shutdown.clone(),
            )));
        }

        let _ = dispatcher.await;
        self.queue.shutdown().await;
        for handle in handles {
            let _ = handle.await;
        }
        info!(controller = name, "controller stopped");
    }
}

async fn dispatch(
    name: &'static str,
    mut events: tokio::sync::broadcast::Receiver<rcs_state::WatchEvent>,
    mut sources: Vec<Box<dyn Source>>,
    queue: WorkQueue,
    resync: Option<Duration>,
    mut shutdown: watch::Receiver<bool>,
) {
    relist_all(name, &mut sources, &queue).await;

    // The ticker branch is disabled when resync is off.
    let period = resync.unwrap_or(Duration::from_secs(3600));
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    for source in sources.iter_mut().filter(|s| s.kind() == event.kind) {
                        match source.handle(&event) {
                            Ok(Some(key)) => queue.add(key).await,
                            Ok(None) => {}
                            Err(e) => warn!(controller = name, error = %e, "informer read failed"),
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(controller = name, skipped, "change stream lagged, relisting");
                    relist_all(name, &mut sources, &queue).await;
                }
                Err(RecvError::Closed) => break,
            },
            _ = ticker.tick(), if resync.is_some() => {
                debug!(controller = name, "periodic resync");
                relist_all(name, &mut sources, &queue).await;
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn relist_all(name: &'static str, sources: &mut [Box<dyn Source>], queue: &WorkQueue) {
    for source in sources.iter_mut() {
        match source.relist() {
            Ok(keys) => {
                for key in keys {
                    queue.add(key).await;
                }
            }
            Err(e) => warn!(controller = name, kind = %source.kind(), error = %e, "relist failed"),
        }
    }
}

async fn work<R: Reconciler>(
    reconciler: Arc<R>,
    queue: WorkQueue,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = reconciler.name();
    loop {
        let key = tokio::select! {
            key = queue.get() => match key {
                Some(key) => key,
                None => break,
            },
            _ = shutdown.changed() => break,
        };

        match reconciler.reconcile(&key).await {
            Ok(Action::Done) => {
                queue.forget(&key).await;
            }
            Ok(Action::RequeueAfter(delay)) => {
                queue.forget(&key).await;
                debug!(controller = name, %key, ?delay, "requeue requested");
                queue.add_after(key.clone(), delay);
            }
            Err(e) => {
                let delay = queue.add_rate_limited(key.clone()).await;
                warn!(controller = name, %key, error = %e, ?delay, "reconcile failed");
            }
        }
        queue.done(&key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::informer::Informer;
    use rcs_state::Capp;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls per key and tracks peak concurrency on a single key.
    #[derive(Default)]
    struct CallLog {
        calls: Mutex<HashMap<ObjectKey, usize>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        fail_first: bool,
        requeue_once: bool,
    }

    struct CountingReconciler(Arc<CallLog>);

    impl Reconciler for CountingReconciler {
        type Error = String;

        fn name(&self) -> &'static str {
            "counting"
        }

        async fn reconcile(&self, key: &ObjectKey) -> Result<Action, String> {
            let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.0.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.0.in_flight.fetch_sub(1, Ordering::SeqCst);

            let n = {
                let mut calls = self.0.calls.lock().unwrap();
                let n = calls.entry(key.clone()).or_insert(0);
                *n += 1;
                *n
            };
            if self.0.fail_first && n == 1 {
                return Err("boom".into());
            }
            if self.0.requeue_once && n == 1 {
                return Ok(Action::RequeueAfter(Duration::from_millis(10)));
            }
            Ok(Action::Done)
        }
    }

    async fn wait_for(log: &CallLog, key: &ObjectKey, calls: usize) {
        for _ in 0..200 {
            if log.calls.lock().unwrap().get(key).copied().unwrap_or(0) >= calls {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("reconciler never reached {calls} calls for {key}");
    }

    #[tokio::test]
    async fn initial_list_and_changes_trigger_reconciles() {
        let store = StateStore::open_in_memory().unwrap();
        store.create(&Capp::new("ns1", "existing")).unwrap();

        let log = Arc::new(CallLog::default());
        let controller = Controller::new(CountingReconciler(log.clone()), store.clone())
            .watches(Informer::<Capp>::new(store.clone()))
            .with_workers(2);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(controller.run(rx));

        wait_for(&log, &ObjectKey::new("ns1", "existing"), 1).await;
        store.create(&Capp::new("ns1", "fresh")).unwrap();
        wait_for(&log, &ObjectKey::new("ns1", "fresh"), 1).await;

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn same_key_never_runs_concurrently() {
        let store = StateStore::open_in_memory().unwrap();
        let log = Arc::new(CallLog::default());
        let controller = Controller::new(CountingReconciler(log.clone()), store.clone())
            .watches(Informer::<Capp>::new(store.clone()))
            .with_workers(4);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(controller.run(rx));

        let created = store.create(&Capp::new("ns1", "busy")).unwrap();
        let mut current = created;
        for _ in 0..5 {
            current = store.update(&current).unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        wait_for(&log, &ObjectKey::new("ns1", "busy"), 2).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(log.peak.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn errors_and_requeues_retry() {
        let store = StateStore::open_in_memory().unwrap();
        let failing = Arc::new(CallLog {
            fail_first: true,
            ..Default::default()
        });
        let requeueing = Arc::new(CallLog {
            requeue_once: true,
            ..Default::default()
        });
        let (tx, rx) = watch::channel(false);

        let a = Controller::new(CountingReconciler(failing.clone()), store.clone())
            .watches(Informer::<Capp>::new(store.clone()));
        let b = Controller::new(CountingReconciler(requeueing.clone()), store.clone())
            .watches(Informer::<Capp>::new(store.clone()));
        let ha = tokio::spawn(a.run(rx.clone()));
        let hb = tokio::spawn(b.run(rx));

        store.create(&Capp::new("ns1", "app")).unwrap();
        let key = ObjectKey::new("ns1", "app");
        wait_for(&failing, &key, 2).await;
        wait_for(&requeueing, &key, 2).await;

        tx.send(true).unwrap();
        ha.await.unwrap();
        hb.await.unwrap();
    }

    #[tokio::test]
    async fn predicate_filters_events() {
        let store = StateStore::open_in_memory().unwrap();
        let log = Arc::new(CallLog::default());
        let informer = Informer::<Capp>::new(store.clone())
            .with_predicate(|_, new| new.is_some_and(|c| c.metadata.name.starts_with("keep")));
        let controller =
            Controller::new(CountingReconciler(log.clone()), store.clone()).watches(informer);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(controller.run(rx));

        store.create(&Capp::new("ns1", "drop-me")).unwrap();
        store.create(&Capp::new("ns1", "keep-me")).unwrap();
        wait_for(&log, &ObjectKey::new("ns1", "keep-me"), 1).await;
        assert!(
            !log
                .calls
                .lock()
                .unwrap()
                .contains_key(&ObjectKey::new("ns1", "drop-me"))
        );

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
