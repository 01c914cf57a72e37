//! Feedback rule evaluation.
//!
//! A bundle's `manifestConfigs` name JSON paths into the live copy of a
//! shipped resource. The site's work agent evaluates them and reports typed
//! scalars on the bundle status; this module does the same evaluation and
//! reads those reports back.
//!
//! Paths are dotted field chains (`.status.address.url`) with optional
//! `[N]` or `[*]` element selectors. A `[*]` fans out into one value per
//! element, and the index replaces the star in the value's name, so
//! `traffic[*].percent` yields `traffic[0].percent`, `traffic[1].percent`.

use rcs_core::names;
use rcs_state::{
    FeedbackRule, FeedbackValue, FieldValue, ManifestCondition, ManifestResourceMeta,
    ManifestWork,
};
use serde_json::Value;

use crate::error::{StatusError, StatusResult};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Field(String),
    Index(usize),
    Each,
}

fn invalid(path: &str, reason: &'static str) -> StatusError {
    StatusError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

fn parse_path(path: &str) -> StatusResult<Vec<Segment>> {
    let Some(rest) = path.strip_prefix('.') else {
        return Err(invalid(path, "must start with '.'"));
    };
    let mut segments = Vec::new();
    for part in rest.split('.') {
        let (field, mut selectors) = match part.find('[') {
            Some(at) => part.split_at(at),
            None => (part, ""),
        };
        if field.is_empty() {
            return Err(invalid(path, "empty field name"));
        }
        segments.push(Segment::Field(field.to_string()));

        while !selectors.is_empty() {
            let Some(close) = selectors.find(']') else {
                return Err(invalid(path, "unclosed '['"));
            };
            let inner = &selectors[1..close];
            if inner == "*" {
                segments.push(Segment::Each);
            } else {
                let index = inner
                    .parse()
                    .map_err(|_| invalid(path, "selector must be '*' or an index"))?;
                segments.push(Segment::Index(index));
            }
            selectors = &selectors[close + 1..];
            if !selectors.is_empty() && !selectors.starts_with('[') {
                return Err(invalid(path, "unexpected text after selector"));
            }
        }
    }
    Ok(segments)
}

fn walk<'a>(
    value: &'a Value,
    segments: &[Segment],
    indices: &mut Vec<usize>,
    out: &mut Vec<(Vec<usize>, &'a Value)>,
) {
    let Some((head, tail)) = segments.split_first() else {
        out.push((indices.clone(), value));
        return;
    };
    match head {
        Segment::Field(name) => {
            if let Some(next) = value.get(name) {
                walk(next, tail, indices, out);
            }
        }
        Segment::Index(i) => {
            if let Some(next) = value.get(*i) {
                walk(next, tail, indices, out);
            }
        }
        Segment::Each => {
            if let Some(items) = value.as_array() {
                for (i, item) in items.iter().enumerate() {
                    indices.push(i);
                    walk(item, tail, indices, out);
                    indices.pop();
                }
            }
        }
    }
}

/// Substitute `[*]` placeholders in a rule name, left to right.
fn expand_name(name: &str, indices: &[usize]) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    let mut indices = indices.iter();
    while let Some(at) = rest.find("[*]") {
        out.push_str(&rest[..at]);
        match indices.next() {
            Some(i) => out.push_str(&format!("[{i}]")),
            None => out.push_str("[*]"),
        }
        rest = &rest[at + 3..];
    }
    out.push_str(rest);
    out
}

/// Typed scalar for a JSON value; objects, arrays, nulls and fractions have none.
pub fn field_value(value: &Value) -> Option<FieldValue> {
    match value {
        Value::String(s) => Some(FieldValue::String { string: s.clone() }),
        Value::Bool(b) => Some(FieldValue::Boolean { boolean: *b }),
        Value::Number(n) => n.as_i64().map(|integer| FieldValue::Integer { integer }),
        _ => None,
    }
}

/// Evaluate JSON-path rules against a live object.
pub fn evaluate(rules: &[FeedbackRule], live: &Value) -> StatusResult<Vec<FeedbackValue>> {
    let mut values = Vec::new();
    for rule in rules {
        if rule.type_ != names::FEEDBACK_RULE_JSON_PATHS {
            continue;
        }
        for json_path in &rule.json_paths {
            let segments = parse_path(&json_path.path)?;
            let mut hits = Vec::new();
            walk(live, &segments, &mut Vec::new(), &mut hits);
            for (indices, value) in hits {
                if let Some(field_value) = field_value(value) {
                    values.push(FeedbackValue {
                        name: expand_name(&json_path.name, &indices),
                        field_value,
                    });
                }
            }
        }
    }
    Ok(values)
}

/// Feedback reported for the resource of `kind` named `name`.
pub fn values_for<'a>(mw: &'a ManifestWork, kind: &str, name: &str) -> Option<&'a [FeedbackValue]> {
    mw.status
        .resource_status
        .manifests
        .iter()
        .find(|m| m.resource_meta.kind == kind && m.resource_meta.name == name)
        .map(|m| m.status_feedbacks.values.as_slice())
}

fn split_api_version(api_version: &str) -> (&str, &str) {
    api_version.rsplit_once('/').unwrap_or(("", api_version))
}

/// Evaluate the bundle's rules for `live` and record them on the bundle
/// status, as the site's work agent does. Returns whether the status changed.
pub fn record_feedback(mw: &mut ManifestWork, live: &Value) -> StatusResult<bool> {
    let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    let kind = text(live, "kind");
    let (group, version) = split_api_version(live["apiVersion"].as_str().unwrap_or(""));
    let (group, version) = (group.to_string(), version.to_string());
    let name = text(&live["metadata"], "name");
    let namespace = text(&live["metadata"], "namespace");

    let Some(config) = mw.spec.manifest_configs.iter().find(|c| {
        let id = &c.resource_identifier;
        id.group == group && id.name == name && id.namespace == namespace
    }) else {
        return Ok(false);
    };

    let values = evaluate(&config.feedback_rules, live)?;
    let resource = config.resource_identifier.resource.clone();
    let ordinal = mw
        .spec
        .workload
        .manifests
        .iter()
        .position(|m| {
            text(m, "kind") == kind
                && text(&m["metadata"], "name") == name
                && text(&m["metadata"], "namespace") == namespace
        })
        .and_then(|i| i32::try_from(i).ok())
        .unwrap_or(-1);

    let condition = ManifestCondition {
        resource_meta: ManifestResourceMeta {
            ordinal,
            group,
            version,
            kind,
            resource,
            name,
            namespace,
        },
        status_feedbacks: rcs_state::StatusFeedbackResult { values },
    };

    let manifests = &mut mw.status.resource_status.manifests;
    match manifests.iter_mut().find(|m| {
        m.resource_meta.kind == condition.resource_meta.kind
            && m.resource_meta.name == condition.resource_meta.name
            && m.resource_meta.namespace == condition.resource_meta.namespace
    }) {
        Some(existing) if *existing == condition => Ok(false),
        Some(existing) => {
            *existing = condition;
            Ok(true)
        }
        None => {
            manifests.push(condition);
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcs_state::{JsonPath, ManifestConfigOption, ResourceIdentifier};
    use serde_json::json;

    fn rule(paths: &[(&str, &str)]) -> Vec<FeedbackRule> {
        vec![FeedbackRule {
            type_: names::FEEDBACK_RULE_JSON_PATHS.into(),
            json_paths: paths
                .iter()
                .map(|(n, p)| JsonPath {
                    name: n.to_string(),
                    path: p.to_string(),
                })
                .collect(),
        }]
    }

    fn live_capp() -> Value {
        json!({
            "apiVersion": "rcs.dana.io/v1alpha1",
            "kind": "Capp",
            "metadata": {"name": "app-x", "namespace": "ns1"},
            "status": {
                "applicationLinks": {"site": "site-7"},
                "knativeObjectStatus": {
                    "observedGeneration": 3,
                    "traffic": [
                        {"revisionName": "app-x-00001", "percent": 80, "latestRevision": false},
                        {"revisionName": "app-x-00002", "percent": 20, "latestRevision": true}
                    ]
                }
            }
        })
    }

    #[test]
    fn scalar_paths_yield_typed_values() {
        let values = evaluate(
            &rule(&[
                ("site", ".status.applicationLinks.site"),
                ("observedGeneration", ".status.knativeObjectStatus.observedGeneration"),
                ("missing", ".status.nothing.here"),
            ]),
            &live_capp(),
        )
        .unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].field_value.render(), "site-7");
        assert_eq!(values[1].field_value, FieldValue::Integer { integer: 3 });
    }

    #[test]
    fn star_fans_out_with_indexed_names() {
        let values = evaluate(
            &rule(&[(
                "traffic[*].percent",
                ".status.knativeObjectStatus.traffic[*].percent",
            )]),
            &live_capp(),
        )
        .unwrap();
        let names: Vec<&str> = values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["traffic[0].percent", "traffic[1].percent"]);
        assert_eq!(values[1].field_value, FieldValue::Integer { integer: 20 });
    }

    #[test]
    fn fixed_index_selects_one_element() {
        let values = evaluate(
            &rule(&[("rev", ".status.knativeObjectStatus.traffic[1].revisionName")]),
            &live_capp(),
        )
        .unwrap();
        assert_eq!(values[0].field_value.render(), "app-x-00002");
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for bad in ["status.x", ".status..x", ".a[*", ".a[x]", ".a[0]b"] {
            assert!(parse_path(bad).is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn record_feedback_is_stable() {
        let mut mw = ManifestWork::default();
        mw.spec.workload.manifests = vec![json!({"kind": "Namespace"}), live_capp()];
        mw.spec.manifest_configs = vec![ManifestConfigOption {
            resource_identifier: ResourceIdentifier {
                group: "rcs.dana.io".into(),
                resource: "capps".into(),
                namespace: "ns1".into(),
                name: "app-x".into(),
            },
            feedback_rules: rule(&[("site", ".status.applicationLinks.site")]),
        }];

        assert!(record_feedback(&mut mw, &live_capp()).unwrap());
        assert!(!record_feedback(&mut mw, &live_capp()).unwrap());

        let entry = &mw.status.resource_status.manifests[0];
        assert_eq!(entry.resource_meta.ordinal, 1);
        assert_eq!(entry.resource_meta.version, "v1alpha1");
        let values = values_for(&mw, "Capp", "app-x").unwrap();
        assert_eq!(values[0].name, "site");
        assert!(values_for(&mw, "Capp", "other").is_none());
    }
}
