//! BDD scenarios for the volume lifecycle view.

use rstest_bdd_macros::scenario;

use super::test_helpers::{LifecycleContext, lifecycle_context};

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Instances without boot configurations only show the placeholder"
)]
fn scenario_no_config(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Create a volume on an instance without volumes"
)]
fn scenario_create(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Reject an empty label without calling the gateway"
)]
fn scenario_empty_label(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Detach a volume after confirming"
)]
fn scenario_detach(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "A failed delete shows a notice until the next intent"
)]
fn scenario_delete_failure(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Live volume events from other sessions refresh the view"
)]
fn scenario_live_events(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}

#[scenario(
    path = "tests/features/lifecycle.feature",
    name = "Replayed and unrelated events are ignored"
)]
fn scenario_ignored_events(lifecycle_context: LifecycleContext) {
    drop(lifecycle_context);
}
