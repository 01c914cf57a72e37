//! Projection of feedback values onto a Capp's status.

use std::collections::BTreeMap;

use rcs_core::names;
use rcs_state::{Addressable, CappStatus, FeedbackValue, TrafficTarget};

fn lookup(values: &[FeedbackValue], name: &str) -> String {
    values
        .iter()
        .find(|v| v.name == name)
        .map(|v| v.field_value.render())
        .unwrap_or_default()
}

/// `scheme://host/...` becomes `http://host/...`; empty stays empty.
pub fn normalize_url(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let host = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    format!("http://{host}")
}

/// Rebuild traffic targets from `traffic[<i>].<field>` values, by index.
fn traffic(values: &[FeedbackValue]) -> Vec<TrafficTarget> {
    let prefix = format!("{}[", names::FEEDBACK_TRAFFIC);
    let mut targets: BTreeMap<usize, TrafficTarget> = BTreeMap::new();
    for value in values {
        let Some(rest) = value.name.strip_prefix(&prefix) else {
            continue;
        };
        let Some((index, field)) = rest.split_once("].") else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        let target = targets.entry(index).or_default();
        let text = value.field_value.render();
        match field {
            "revisionName" => target.revision_name = text,
            "percent" => target.percent = text.parse().ok(),
            "latestRevision" => target.latest_revision = text.parse().ok(),
            _ => {}
        }
    }
    targets.into_values().collect()
}

/// The status `current` should have given the reported feedback.
///
/// Fields the site reported nothing for come out empty, except the site
/// link, which keeps the scheduler's binding until the site reports one.
/// Conditions are left untouched.
pub fn project(current: &CappStatus, values: &[FeedbackValue]) -> CappStatus {
    let mut status = current.clone();

    let links = &mut status.application_links;
    let site = lookup(values, names::FEEDBACK_SITE);
    if !site.is_empty() {
        links.site = site;
    }
    links.console_link = lookup(values, names::FEEDBACK_CONSOLE_LINK);
    links.cluster_segment = lookup(values, names::FEEDBACK_CLUSTER_SEGMENT);

    let knative = &mut status.knative_object_status;
    let url = normalize_url(&lookup(values, names::FEEDBACK_URL));
    knative.address = (!url.is_empty()).then_some(Addressable { url });
    knative.latest_created_revision_name = lookup(values, names::FEEDBACK_LATEST_CREATED_REVISION);
    knative.latest_ready_revision_name = lookup(values, names::FEEDBACK_LATEST_READY_REVISION);
    knative.observed_generation = lookup(values, names::FEEDBACK_OBSERVED_GENERATION)
        .parse()
        .ok();
    knative.traffic = traffic(values);

    status
}
