//! The cleanup finalizer.
//!
//! A placed Capp carries `rcs.dana.io/capp-cleanup` so its record outlives a
//! delete request until the remote bundle is gone. The finalizer is only
//! released after the bundle delete succeeded or the bundle was already
//! absent.

use rcs_core::names;
use rcs_state::{Capp, ManifestWork, Resource, StateStore};
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

/// Add the cleanup finalizer if missing. Returns the Capp as stored.
pub fn ensure_finalizer(store: &StateStore, mut capp: Capp) -> SyncResult<Capp> {
    if !capp.metadata.add_finalizer(names::FINALIZER_CAPP_CLEANUP) {
        return Ok(capp);
    }
    let stored = store.update(&capp)?;
    debug!(capp = %stored.key(), "cleanup finalizer added");
    Ok(stored)
}

/// Tear down the bundle of a deleting Capp, then release the finalizer.
pub fn handle_deletion(store: &StateStore, mut capp: Capp) -> SyncResult<()> {
    if !capp.metadata.has_finalizer(names::FINALIZER_CAPP_CLEANUP) {
        return Ok(());
    }

    let name = names::manifest_work_name(&capp.metadata.namespace, &capp.metadata.name);
    for site in capp.bundle_sites() {
        match store.delete::<ManifestWork>(site, &name) {
            Ok(_) => info!(capp = %capp.key(), site, bundle = %name, "bundle deleted"),
            Err(e) if e.is_not_found() => {
                debug!(capp = %capp.key(), site, "bundle already gone");
            }
            Err(source) => {
                return Err(SyncError::BundleDelete {
                    namespace: site.to_string(),
                    name: name.clone(),
                    source,
                });
            }
        }
    }

    capp.metadata.remove_finalizer(names::FINALIZER_CAPP_CLEANUP);
    store.update(&capp)?;
    info!(capp = %capp.key(), "cleanup finalizer removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::new_bundle;

    fn placed_capp(store: &StateStore) -> Capp {
        let mut capp = Capp::new("ns1", "app-x");
        capp.metadata
            .annotations
            .insert(names::ANNOTATION_HAS_PLACEMENT.into(), "site-7".into());
        capp.status.application_links.site = "site-7".into();
        let capp = store.create(&capp).unwrap();
        ensure_finalizer(store, capp).unwrap()
    }

    #[test]
    fn finalizer_added_once() {
        let store = StateStore::open_in_memory().unwrap();
        let capp = placed_capp(&store);
        let version = capp.metadata.resource_version;
        let again = ensure_finalizer(&store, capp).unwrap();
        assert_eq!(again.metadata.resource_version, version);
        assert_eq!(again.metadata.finalizers, vec![names::FINALIZER_CAPP_CLEANUP]);
    }

    #[test]
    fn bundle_deleted_before_finalizer_release() {
        let store = StateStore::open_in_memory().unwrap();
        let capp = placed_capp(&store);
        store.create(&new_bundle(&capp, "site-7", vec![])).unwrap();

        let mut events = store.watch();
        store.delete::<Capp>("ns1", "app-x").unwrap();
        let deleting: Capp = store.fetch("ns1", "app-x").unwrap();
        handle_deletion(&store, deleting).unwrap();

        assert!(store.get::<ManifestWork>("site-7", "mw-create-ns1-app-x").unwrap().is_none());
        assert!(store.get::<Capp>("ns1", "app-x").unwrap().is_none());

        // Marking, bundle delete, then the Capp removal.
        let order: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| (e.kind, e.change))
            .collect();
        let bundle_at = order
            .iter()
            .position(|(k, _)| *k == rcs_state::Kind::ManifestWork)
            .unwrap();
        let capp_gone_at = order
            .iter()
            .position(|(k, c)| *k == rcs_state::Kind::Capp && *c == rcs_state::Change::Deleted)
            .unwrap();
        assert!(bundle_at < capp_gone_at);
    }

    #[test]
    fn bundle_found_at_placement_when_site_reports_an_alias() {
        let store = StateStore::open_in_memory().unwrap();
        let mut capp = placed_capp(&store);
        store.create(&new_bundle(&capp, "site-7", vec![])).unwrap();
        capp.status.application_links.site = "spoke-alias".into();
        store.update(&capp).unwrap();

        store.delete::<Capp>("ns1", "app-x").unwrap();
        let deleting: Capp = store.fetch("ns1", "app-x").unwrap();
        handle_deletion(&store, deleting).unwrap();

        assert!(store.get::<ManifestWork>("site-7", "mw-create-ns1-app-x").unwrap().is_none());
        assert!(store.get::<Capp>("ns1", "app-x").unwrap().is_none());
    }

    #[test]
    fn missing_bundle_releases_immediately() {
        let store = StateStore::open_in_memory().unwrap();
        placed_capp(&store);
        store.delete::<Capp>("ns1", "app-x").unwrap();
        let deleting: Capp = store.fetch("ns1", "app-x").unwrap();
        handle_deletion(&store, deleting).unwrap();
        assert!(store.get::<Capp>("ns1", "app-x").unwrap().is_none());
    }

    #[test]
    fn stale_copy_keeps_finalizer() {
        let store = StateStore::open_in_memory().unwrap();
        let capp = placed_capp(&store);
        store.create(&new_bundle(&capp, "site-7", vec![])).unwrap();
        store.delete::<Capp>("ns1", "app-x").unwrap();

        // The copy predates the deletion mark, so releasing conflicts.
        let err = handle_deletion(&store, capp).unwrap_err();
        assert!(matches!(err, SyncError::State(ref e) if e.is_conflict()));
        let still: Capp = store.fetch("ns1", "app-x").unwrap();
        assert!(still.metadata.has_finalizer(names::FINALIZER_CAPP_CLEANUP));
    }
}
