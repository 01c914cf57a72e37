//! End-to-end flows through the real controllers and site agents.
//!
//! Each test runs the hub controllers (and, where feedback matters, the
//! in-process site agents) against one in-memory store and polls the store
//! for the converged state.

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rcs_core::config::{ControllerConfig, RcsConfigSeed, ScoreConfig};
use rcs_core::names;
use rcs_score::ScoreBounds;
use rcs_state::*;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower::ServiceExt;

struct Hub {
    store: StateStore,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Hub {
    fn start(sites: &[&str]) -> Self {
        let store = StateStore::open_in_memory().unwrap();
        seed_policy(&store);

        let config = ControllerConfig {
            workers: 2,
            decision_backoff_secs: 1,
            ..Default::default()
        };
        let (tx, rx) = watch::channel(false);
        let mut handles = rcsd::spawn_controllers(&store, &config, &rx);
        let sites: Vec<String> = sites.iter().map(|s| s.to_string()).collect();
        let score = ScoreConfig {
            interval_secs: 1,
            ..Default::default()
        };
        handles.extend(rcsd::spawn_site_agents(
            &store,
            &sites,
            &score,
            ScoreBounds::default(),
            &rx,
        ));
        Self {
            store,
            shutdown: tx,
            handles,
        }
    }

    async fn stop(self) {
        self.shutdown.send(true).unwrap();
        for handle in self.handles {
            handle.await.unwrap();
        }
    }
}

fn seed_policy(store: &StateStore) {
    rcsd::seed_rcs_config(
        store,
        &RcsConfigSeed {
            placements: vec!["pool-a".into()],
            ..Default::default()
        },
    )
    .unwrap();
    store
        .create(&Placement {
            metadata: ObjectMeta::new(names::DEFAULT_PLACEMENTS_NAMESPACE, "pool-a"),
            ..Default::default()
        })
        .unwrap();
    store
        .create(&PlacementDecision::for_placement(
            names::DEFAULT_PLACEMENTS_NAMESPACE,
            "pool-a-decision-1",
            "pool-a",
            &[names::LOCAL_CLUSTER, "site-7"],
        ))
        .unwrap();
}

fn submit_capp(store: &StateStore) {
    submit_capp_for(store, "pool-a");
}

fn submit_capp_for(store: &StateStore, site: &str) {
    let mut capp = Capp::new("ns1", "app-x");
    capp.spec.site = site.into();
    capp.spec.configuration_spec.template.spec.containers.push(Container {
        name: "app".into(),
        image: "registry.local/app-x:1".into(),
        ..Default::default()
    });
    store.create(&capp).unwrap();
}

async fn eventually<T, F, Fut>(what: &str, mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..300 {
        if let Some(value) = check().await {
            return value;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

fn bundle(store: &StateStore) -> Option<ManifestWork> {
    store.get("site-7", "mw-create-ns1-app-x").unwrap()
}

#[tokio::test]
async fn capp_is_placed_and_bundled_on_the_decided_site() {
    let hub = Hub::start(&[]);
    submit_capp(&hub.store);

    let mw = eventually("bundle on site-7", || async { bundle(&hub.store) }).await;

    let kinds: Vec<(&str, &str)> = mw
        .spec
        .workload
        .manifests
        .iter()
        .map(|m| {
            (
                m["kind"].as_str().unwrap(),
                m["metadata"]["name"].as_str().unwrap(),
            )
        })
        .collect();
    assert!(kinds.contains(&("Capp", "app-x")));
    assert!(kinds.contains(&("Namespace", "ns1")));
    assert!(kinds.contains(&("Role", "app-x-logs-reader")));
    assert!(kinds.contains(&("RoleBinding", "app-x-logs-reader")));
    assert_eq!(mw.capp_key(), Some(ObjectKey::new("ns1", "app-x")));

    let capp: Capp = hub.store.fetch("ns1", "app-x").unwrap();
    assert_eq!(capp.placement(), Some("site-7"));
    assert_eq!(capp.status.application_links.site, "site-7");
    assert!(capp.metadata.has_finalizer(names::FINALIZER_CAPP_CLEANUP));

    let events: Vec<Event> = hub.store.list(Some("ns1")).unwrap();
    assert!(events.iter().any(|e| e.reason == names::REASON_CAPP_SCHEDULED));

    hub.stop().await;
}

fn seed_role_binding(store: &StateStore, name: &str, role: &str, users: &[&str]) {
    store
        .create(&RoleBinding {
            metadata: ObjectMeta::new("ns1", name),
            role_ref: RoleRef {
                api_group: names::RBAC_API_GROUP.into(),
                kind: "Role".into(),
                name: role.into(),
            },
            subjects: users
                .iter()
                .map(|u| Subject {
                    kind: "User".into(),
                    name: u.to_string(),
                    ..Default::default()
                })
                .collect(),
        })
        .unwrap();
}

#[tokio::test]
async fn default_policy_bundle_carries_exactly_the_expected_manifests() {
    let hub = Hub::start(&[]);
    seed_role_binding(&hub.store, "owners", "admin", &["alice"]);
    seed_role_binding(&hub.store, "readers", "logs-reader", &["bob", "alice"]);
    seed_role_binding(&hub.store, "viewers", "view", &["carol"]);
    submit_capp_for(&hub.store, "");

    let mw = eventually("bundle on site-7", || async { bundle(&hub.store) }).await;

    let kinds: Vec<&str> = mw
        .spec
        .workload
        .manifests
        .iter()
        .map(|m| m["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["Capp", "Namespace", "Role", "RoleBinding"]);

    let binding = &mw.spec.workload.manifests[3];
    assert_eq!(binding["metadata"]["name"], "app-x-logs-reader");
    assert_eq!(binding["metadata"]["namespace"], "ns1");
    let subjects: Vec<&str> = binding["subjects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(subjects, vec!["alice", "bob"]);

    let capp: Capp = hub.store.fetch("ns1", "app-x").unwrap();
    assert_eq!(capp.placement(), Some("site-7"));

    hub.stop().await;
}

#[tokio::test]
async fn deleting_a_capp_removes_its_bundle_first() {
    let hub = Hub::start(&[]);
    submit_capp(&hub.store);
    eventually("bundle on site-7", || async { bundle(&hub.store) }).await;

    let mut changes = hub.store.watch();
    assert!(!hub.store.delete::<Capp>("ns1", "app-x").unwrap());

    eventually("capp removed", || async {
        hub.store
            .get::<Capp>("ns1", "app-x")
            .unwrap()
            .is_none()
            .then_some(())
    })
    .await;
    assert!(bundle(&hub.store).is_none());

    let mut bundle_gone = None;
    let mut capp_gone = None;
    let mut seq = 0;
    while let Ok(event) = changes.try_recv() {
        seq += 1;
        if event.change != Change::Deleted {
            continue;
        }
        match event.kind {
            Kind::ManifestWork => bundle_gone = Some(seq),
            Kind::Capp => capp_gone = Some(seq),
            _ => {}
        }
    }
    assert!(bundle_gone.unwrap() < capp_gone.unwrap());

    hub.stop().await;
}

#[tokio::test]
async fn site_feedback_reaches_capp_status() {
    let hub = Hub::start(&["site-7"]);
    submit_capp(&hub.store);

    let capp = eventually("projected status", || async {
        let capp: Capp = hub.store.fetch("ns1", "app-x").unwrap();
        capp.status
            .knative_object_status
            .address
            .is_some()
            .then_some(capp)
    })
    .await;

    let knative = &capp.status.knative_object_status;
    assert_eq!(
        knative.address.as_ref().unwrap().url,
        "http://app-x-ns1.site-7"
    );
    assert_eq!(knative.latest_ready_revision_name, "app-x-00001");
    assert_eq!(knative.traffic.len(), 1);
    assert_eq!(knative.traffic[0].percent, Some(100));
    assert_eq!(capp.status.application_links.site, "site-7");

    hub.stop().await;
}

#[tokio::test]
async fn site_score_is_published() {
    let hub = Hub::start(&["site-7"]);
    let mut node = Node {
        metadata: ObjectMeta::new("site-7", "worker-1"),
        ..Default::default()
    };
    node.status
        .allocatable
        .insert("cpu".into(), rcs_core::Quantity::parse("50").unwrap());
    hub.store.create(&node).unwrap();

    let record = eventually("score record", || async {
        hub.store
            .get::<AddOnPlacementScore>("site-7", names::PLACEMENT_SCORE_NAME)
            .unwrap()
            .filter(|r| r.score(names::SCORE_CPU_AVAILABLE) == Some(0))
    })
    .await;
    assert_eq!(record.score(names::SCORE_MEM_AVAILABLE), Some(-100));

    hub.stop().await;
}

#[tokio::test]
async fn capp_submitted_over_http_is_scheduled() {
    let hub = Hub::start(&[]);
    let router = rcs_api::build_router(hub.store.clone());

    let body = serde_json::json!({
        "metadata": {"name": "app-x", "namespace": "ns1"},
        "spec": {"site": "pool-a"},
    });
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/capps")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    eventually("bundle on site-7", || async { bundle(&hub.store) }).await;

    let req = Request::builder()
        .uri("/api/v1/manifestworks/site-7/mw-create-ns1-app-x")
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    hub.stop().await;
}
