//! Event filter for the sync controller.

use rcs_state::Capp;

/// Enqueue placed Capps, including deletions of placed Capps.
pub fn should_sync(old: Option<&Capp>, new: Option<&Capp>) -> bool {
    new.or(old).is_some_and(|capp| capp.placement().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_core::names::ANNOTATION_HAS_PLACEMENT;

    fn placed() -> Capp {
        let mut capp = Capp::new("ns1", "app-x");
        capp.metadata
            .annotations
            .insert(ANNOTATION_HAS_PLACEMENT.into(), "site-7".into());
        capp
    }

    #[test]
    fn unplaced_capps_are_ignored() {
        let capp = Capp::new("ns1", "app-x");
        assert!(!should_sync(None, Some(&capp)));
    }

    #[test]
    fn placed_capps_sync_on_every_change() {
        let capp = placed();
        assert!(should_sync(None, Some(&capp)));
        assert!(should_sync(Some(&capp), Some(&capp)));
    }

    #[test]
    fn removal_of_placed_capp_is_seen() {
        let capp = placed();
        assert!(should_sync(Some(&capp), None));
    }
}
