//! Auth assembler: a logs-reader Role and RoleBinding for the Capp.
//!
//! Users bound to `admin` or `logs-reader` in the Capp's namespace are
//! granted pod-log access on the site.

use rcs_core::names;
use rcs_state::{Capp, RoleBinding};
use serde_json::Value;
use tracing::warn;

use crate::builders;
use crate::director::{Assembler, DirectorContext};
use crate::error::{SyncError, SyncResult};

/// Subjects of the namespace's log-reading bindings, deduplicated by name.
pub fn log_reader_users(bindings: &[RoleBinding]) -> Vec<String> {
    let mut users: Vec<String> = Vec::new();
    for binding in bindings {
        if !names::LOG_READER_SOURCE_ROLES.contains(&binding.role_ref.name.as_str()) {
            continue;
        }
        for subject in &binding.subjects {
            if !users.contains(&subject.name) {
                users.push(subject.name.clone());
            }
        }
    }
    users
}

pub struct AuthAssembler;

impl Assembler for AuthAssembler {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn assemble(&self, ctx: &DirectorContext, capp: &Capp) -> SyncResult<Vec<Value>> {
        let namespace = &capp.metadata.namespace;
        let bindings: Vec<RoleBinding> = ctx.store.list(Some(namespace)).map_err(|source| {
            warn!(
                correlation_id = %ctx.correlation_id,
                error = %source,
                "could not create auth manifests"
            );
            SyncError::RoleBindings {
                namespace: namespace.clone(),
                source,
            }
        })?;

        let users = log_reader_users(&bindings);
        let name = &capp.metadata.name;
        Ok(vec![
            builders::logs_reader_role(name, namespace),
            builders::logs_reader_role_binding(name, namespace, &users),
        ])
    }
}
