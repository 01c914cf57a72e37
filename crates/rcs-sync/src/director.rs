//! The director chain.
//!
//! A [`CappDirector`] runs an ordered list of [`Assembler`]s over a Capp and
//! concatenates their manifests. The first failing assembler aborts the
//! chain and nothing assembled so far is returned.

use rcs_controller::EventRecorder;
use rcs_state::{Capp, StateStore};
use serde_json::Value;
use tracing::debug;

use crate::auth::AuthAssembler;
use crate::base::BaseAssembler;
use crate::error::SyncResult;
use crate::volumes::VolumesAssembler;

/// Shared inputs for one assembly pass.
pub struct DirectorContext {
    pub store: StateStore,
    pub recorder: EventRecorder,
    /// Ties log lines from one pass together.
    pub correlation_id: String,
}

impl DirectorContext {
    pub fn new(store: StateStore, recorder: EventRecorder, capp: &Capp) -> Self {
        let correlation_id = format!(
            "{}@{}",
            capp.metadata.key(),
            capp.metadata.resource_version
        );
        Self {
            store,
            recorder,
            correlation_id,
        }
    }
}

/// Produces one slice of a Capp's bundle.
pub trait Assembler: Send + Sync {
    fn name(&self) -> &'static str;

    fn assemble(&self, ctx: &DirectorContext, capp: &Capp) -> SyncResult<Vec<Value>>;
}

pub struct CappDirector {
    assemblers: Vec<Box<dyn Assembler>>,
}

impl Default for CappDirector {
    /// base → volumes → auth.
    fn default() -> Self {
        Self::new(vec![
            Box::new(BaseAssembler),
            Box::new(VolumesAssembler),
            Box::new(AuthAssembler),
        ])
    }
}

impl CappDirector {
    pub fn new(assemblers: Vec<Box<dyn Assembler>>) -> Self {
        Self { assemblers }
    }

    /// Run every assembler in order. Emits the failing step's event reason.
    pub fn assemble(&self, ctx: &DirectorContext, capp: &Capp) -> SyncResult<Vec<Value>> {
        let mut manifests = Vec::new();
        for assembler in &self.assemblers {
            match assembler.assemble(ctx, capp) {
                Ok(part) => {
                    debug!(
                        correlation_id = %ctx.correlation_id,
                        assembler = assembler.name(),
                        manifests = part.len(),
                        "assembled"
                    );
                    manifests.extend(part);
                }
                Err(e) => {
                    if let Some(reason) = e.assembly_reason() {
                        ctx.recorder.warning(capp, reason, &e.to_string());
                    }
                    return Err(e);
                }
            }
        }
        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use rcs_core::names;
    use rcs_state::{Event, LocalObjectReference, Volume};

    struct Fixed(&'static str);

    impl Assembler for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn assemble(&self, _: &DirectorContext, _: &Capp) -> SyncResult<Vec<Value>> {
            Ok(vec![Value::String(self.0.into())])
        }
    }

    struct Failing;

    impl Assembler for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn assemble(&self, _: &DirectorContext, _: &Capp) -> SyncResult<Vec<Value>> {
            Err(SyncError::ConfigMapFetch(rcs_state::StateError::NotFound {
                kind: "ConfigMap",
                key: "ns1/cm".into(),
            }))
        }
    }

    fn ctx(store: &StateStore, capp: &Capp) -> DirectorContext {
        DirectorContext::new(store.clone(), EventRecorder::new(store.clone(), "sync"), capp)
    }

    #[test]
    fn assemblers_run_in_order() {
        let store = StateStore::open_in_memory().unwrap();
        let capp = Capp::new("ns1", "app-x");
        let director = CappDirector::new(vec![Box::new(Fixed("a")), Box::new(Fixed("b"))]);
        let out = director.assemble(&ctx(&store, &capp), &capp).unwrap();
        assert_eq!(out, vec![Value::from("a"), Value::from("b")]);
    }

    #[test]
    fn failure_short_circuits_and_reports() {
        let store = StateStore::open_in_memory().unwrap();
        let capp = Capp::new("ns1", "app-x");
        let director = CappDirector::new(vec![
            Box::new(Fixed("a")),
            Box::new(Failing),
            Box::new(Fixed("never")),
        ]);
        let err = director.assemble(&ctx(&store, &capp), &capp).unwrap_err();
        assert!(err.is_volume_error());

        let events: Vec<Event> = store.list(Some("ns1")).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, names::REASON_VOLUME_NOT_FOUND);
    }

    #[test]
    fn default_chain_builds_full_bundle() {
        let store = StateStore::open_in_memory().unwrap();
        let mut cm = rcs_state::ConfigMap::default();
        cm.metadata = rcs_state::ObjectMeta::new("ns1", "settings");
        store.create(&cm).unwrap();

        let mut capp = Capp::new("ns1", "app-x");
        capp.spec.configuration_spec.template.spec.volumes.push(Volume {
            name: "cfg".into(),
            config_map: Some(LocalObjectReference::new("settings")),
            secret: None,
        });

        let out = CappDirector::default()
            .assemble(&ctx(&store, &capp), &capp)
            .unwrap();
        let kinds: Vec<&str> = out.iter().filter_map(|m| m["kind"].as_str()).collect();
        assert_eq!(kinds, vec!["Capp", "Namespace", "ConfigMap", "Role", "RoleBinding"]);
    }
}
