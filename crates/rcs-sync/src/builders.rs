//! Manifest builders for the objects a bundle ships.
//!
//! Each builder returns a plain JSON manifest. Maps come from `BTreeMap`s
//! and `serde_json::Map` keeps keys sorted, so rebuilding from the same
//! inputs yields byte-identical output.

use std::collections::BTreeMap;

use rcs_core::names;
use rcs_state::{Capp, ConfigMap, Secret};
use serde_json::{Value, json};

use crate::error::SyncResult;

const RBAC_API_VERSION: &str = "rbac.authorization.k8s.io/v1";

fn managed_labels(labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    let mut labels = labels.clone();
    labels.insert(
        names::LABEL_MANAGED_BY.to_string(),
        names::MANAGED_BY_VALUE.to_string(),
    );
    labels
}

/// Clean copy of the Capp: identity, labels, annotations and spec only.
pub fn capp(capp: &Capp) -> SyncResult<Value> {
    let meta = &capp.metadata;
    Ok(json!({
        "apiVersion": names::CAPP_API_VERSION,
        "kind": names::CAPP_KIND,
        "metadata": {
            "name": meta.name,
            "namespace": meta.namespace,
            "labels": managed_labels(&meta.labels),
            "annotations": meta.annotations,
        },
        "spec": serde_json::to_value(&capp.spec)?,
    }))
}

pub fn namespace(name: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": managed_labels(&BTreeMap::new()),
        },
    })
}

pub fn config_map(cm: &ConfigMap) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": cm.metadata.name,
            "namespace": cm.metadata.namespace,
        },
        "data": cm.data,
    })
}

pub fn secret(secret: &Secret) -> Value {
    let mut manifest = json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": secret.metadata.name,
            "namespace": secret.metadata.namespace,
        },
        "data": secret.data,
    });
    if !secret.type_.is_empty() {
        manifest["type"] = Value::String(secret.type_.clone());
    }
    manifest
}

/// Role granting read access to pod logs in the Capp's namespace.
pub fn logs_reader_role(capp_name: &str, namespace: &str) -> Value {
    json!({
        "apiVersion": RBAC_API_VERSION,
        "kind": "Role",
        "metadata": {
            "name": names::logs_reader_name(capp_name),
            "namespace": namespace,
        },
        "rules": [{
            "apiGroups": [""],
            "resources": ["pods/log"],
            "verbs": ["get", "watch", "list"],
        }],
    })
}

/// Binds the logs-reader Role to the given users.
pub fn logs_reader_role_binding(capp_name: &str, namespace: &str, users: &[String]) -> Value {
    let name = names::logs_reader_name(capp_name);
    let subjects: Vec<Value> = users
        .iter()
        .map(|user| {
            json!({
                "kind": "User",
                "name": user,
                "apiGroup": names::RBAC_API_GROUP,
            })
        })
        .collect();
    json!({
        "apiVersion": RBAC_API_VERSION,
        "kind": "RoleBinding",
        "metadata": {
            "name": name,
            "namespace": namespace,
        },
        "roleRef": {
            "apiGroup": names::RBAC_API_GROUP,
            "kind": "Role",
            "name": name,
        },
        "subjects": subjects,
    })
}
