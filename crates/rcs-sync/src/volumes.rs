//! Volumes assembler: copies the ConfigMaps and Secrets a Capp references.
//!
//! References are discovered in a fixed order (envFrom, env valueFrom,
//! volumes, imagePullSecrets, route TLS secret) and deduplicated keeping the
//! first occurrence. Every referenced object must exist in the Capp's
//! namespace; one missing object fails the whole assembly.

use rcs_state::{Capp, ConfigMap, Secret};
use serde_json::Value;

use crate::builders;
use crate::director::{Assembler, DirectorContext};
use crate::error::{SyncError, SyncResult};

/// Names referenced by a Capp, per kind, in discovery order.
#[derive(Debug, Default, PartialEq)]
pub struct VolumeRefs {
    pub config_maps: Vec<String>,
    pub secrets: Vec<String>,
}

impl VolumeRefs {
    fn config_map(&mut self, name: &str) {
        push_unique(&mut self.config_maps, name);
    }

    fn secret(&mut self, name: &str) {
        push_unique(&mut self.secrets, name);
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !name.is_empty() && !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

pub fn collect_refs(capp: &Capp) -> VolumeRefs {
    let pod = &capp.spec.configuration_spec.template.spec;
    let mut refs = VolumeRefs::default();

    for container in &pod.containers {
        for source in &container.env_from {
            if let Some(cm) = &source.config_map_ref {
                refs.config_map(&cm.name);
            }
            if let Some(secret) = &source.secret_ref {
                refs.secret(&secret.name);
            }
        }
    }

    for container in &pod.containers {
        for var in &container.env {
            let Some(from) = &var.value_from else { continue };
            if let Some(cm) = &from.config_map_key_ref {
                refs.config_map(&cm.name);
            }
            if let Some(secret) = &from.secret_key_ref {
                refs.secret(&secret.name);
            }
        }
    }

    for volume in &pod.volumes {
        if let Some(cm) = &volume.config_map {
            refs.config_map(&cm.name);
        }
        if let Some(secret) = &volume.secret {
            refs.secret(&secret.secret_name);
        }
    }

    for pull in &pod.image_pull_secrets {
        refs.secret(&pull.name);
    }

    let route = &capp.spec.route_spec;
    if route.tls_enabled {
        refs.secret(&route.tls_secret);
    }

    refs
}

pub struct VolumesAssembler;

impl Assembler for VolumesAssembler {
    fn name(&self) -> &'static str {
        "volumes"
    }

    fn assemble(&self, ctx: &DirectorContext, capp: &Capp) -> SyncResult<Vec<Value>> {
        let namespace = &capp.metadata.namespace;
        let refs = collect_refs(capp);
        let mut manifests = Vec::with_capacity(refs.config_maps.len() + refs.secrets.len());

        for name in &refs.config_maps {
            let cm: ConfigMap = ctx
                .store
                .fetch(namespace, name)
                .map_err(SyncError::ConfigMapFetch)?;
            manifests.push(builders::config_map(&cm));
        }
        for name in &refs.secrets {
            let secret: Secret = ctx
                .store
                .fetch(namespace, name)
                .map_err(SyncError::SecretFetch)?;
            manifests.push(builders::secret(&secret));
        }
        Ok(manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_controller::EventRecorder;
    use rcs_state::{
        Container, EnvFromSource, EnvVar, EnvVarSource, KeySelector, LocalObjectReference,
        ObjectMeta, SecretVolumeSource, StateStore, Volume,
    };

    fn referencing_capp() -> Capp {
        let mut capp = Capp::new("ns1", "app-x");
        let pod = &mut capp.spec.configuration_spec.template.spec;
        pod.containers.push(Container {
            name: "main".into(),
            env_from: vec![EnvFromSource {
                config_map_ref: Some(LocalObjectReference::new("cm-a")),
                secret_ref: Some(LocalObjectReference::new("sec-a")),
            }],
            env: vec![EnvVar {
                name: "TOKEN".into(),
                value: None,
                value_from: Some(EnvVarSource {
                    config_map_key_ref: Some(KeySelector {
                        name: "cm-b".into(),
                        key: "k".into(),
                    }),
                    secret_key_ref: Some(KeySelector {
                        name: "sec-a".into(),
                        key: "token".into(),
                    }),
                }),
            }],
            ..Default::default()
        });
        pod.volumes.push(Volume {
            name: "v".into(),
            config_map: Some(LocalObjectReference::new("cm-a")),
            secret: Some(SecretVolumeSource {
                secret_name: "sec-b".into(),
            }),
        });
        pod.image_pull_secrets.push(LocalObjectReference::new("pull"));
        capp.spec.route_spec.tls_enabled = true;
        capp.spec.route_spec.tls_secret = "tls".into();
        capp
    }

    #[test]
    fn refs_follow_discovery_order_without_duplicates() {
        let refs = collect_refs(&referencing_capp());
        assert_eq!(refs.config_maps, vec!["cm-a", "cm-b"]);
        assert_eq!(refs.secrets, vec!["sec-a", "sec-b", "pull", "tls"]);
    }

    #[test]
    fn tls_secret_ignored_when_tls_disabled() {
        let mut capp = Capp::new("ns1", "app-x");
        capp.spec.route_spec.tls_secret = "tls".into();
        assert!(collect_refs(&capp).secrets.is_empty());
        capp.spec.route_spec.tls_enabled = true;
        capp.spec.route_spec.tls_secret.clear();
        assert!(collect_refs(&capp).secrets.is_empty());
    }

    #[test]
    fn missing_secret_fails_with_descriptive_error() {
        let store = StateStore::open_in_memory().unwrap();
        for name in ["cm-a", "cm-b"] {
            store
                .create(&ConfigMap {
                    metadata: ObjectMeta::new("ns1", name),
                    ..Default::default()
                })
                .unwrap();
        }
        let capp = referencing_capp();
        let ctx = DirectorContext::new(
            store.clone(),
            EventRecorder::new(store.clone(), "sync"),
            &capp,
        );
        let err = VolumesAssembler.assemble(&ctx, &capp).unwrap_err();
        assert!(matches!(err, SyncError::SecretFetch(_)));
        assert!(
            err.to_string()
                .starts_with("unable to fetch Secret from Capp spec: ")
        );
    }

    #[test]
    fn config_maps_precede_secrets() {
        let store = StateStore::open_in_memory().unwrap();
        store
            .create(&Secret {
                metadata: ObjectMeta::new("ns1", "pull"),
                ..Default::default()
            })
            .unwrap();
        store
            .create(&ConfigMap {
                metadata: ObjectMeta::new("ns1", "cfg"),
                ..Default::default()
            })
            .unwrap();

        let mut capp = Capp::new("ns1", "app-x");
        let pod = &mut capp.spec.configuration_spec.template.spec;
        pod.image_pull_secrets.push(LocalObjectReference::new("pull"));
        pod.volumes.push(Volume {
            name: "v".into(),
            config_map: Some(LocalObjectReference::new("cfg")),
            secret: None,
        });
        let ctx = DirectorContext::new(
            store.clone(),
            EventRecorder::new(store.clone(), "sync"),
            &capp,
        );
        let out = VolumesAssembler.assemble(&ctx, &capp).unwrap();
        assert_eq!(out[0]["kind"], "ConfigMap");
        assert_eq!(out[1]["kind"], "Secret");
    }
}
