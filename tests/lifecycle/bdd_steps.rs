//! BDD step definitions for the volume lifecycle view.

use mooring::{
    ConfirmationMode, DomainEvent, DrawerMode, GatewayError, GatewayOp, Intent, IntentOutcome,
    ParentId, SubmitOutcome, Volume, VolumeId,
};
use rstest_bdd_macros::{given, then, when};
use tokio::runtime::Runtime;

use super::test_helpers::{LifecycleContext, PARENT_ID, PARENT_REGION, StepOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("runtime unavailable: {0}")]
    Runtime(String),
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Runtime(err.to_string()))
}

fn volume(id: u64, label: &str, parent: Option<u64>) -> Volume {
    Volume {
        id: VolumeId(id),
        label: label.to_owned(),
        size: 20,
        region: PARENT_REGION.to_owned(),
        filesystem_path: None,
        parent_id: parent.map(ParentId),
    }
}

#[given("an instance with \"{configs}\" boot configurations")]
fn instance_with_configs(lifecycle_context: LifecycleContext, configs: usize) -> LifecycleContext {
    lifecycle_context
        .gateway
        .add_parent(&lifecycle_context.parent, configs);
    lifecycle_context
}

#[given("an attached volume \"{label}\" with id \"{id}\"")]
fn attached_volume(lifecycle_context: LifecycleContext, label: String, id: u64) -> LifecycleContext {
    lifecycle_context
        .gateway
        .insert_volume(volume(id, &label, Some(PARENT_ID)));
    lifecycle_context
}

#[given("an unattached volume \"{label}\" with id \"{id}\"")]
fn unattached_volume(
    lifecycle_context: LifecycleContext,
    label: String,
    id: u64,
) -> LifecycleContext {
    lifecycle_context.gateway.insert_volume(volume(id, &label, None));
    lifecycle_context
}

#[given("the gateway rejects the next delete with \"{message}\"")]
fn delete_rejected(lifecycle_context: LifecycleContext, message: String) -> LifecycleContext {
    lifecycle_context
        .gateway
        .fail_next(GatewayOp::Delete, GatewayError::operation(message));
    lifecycle_context
}

#[when("the view is loaded")]
fn view_loaded(lifecycle_context: LifecycleContext) -> Result<LifecycleContext, StepError> {
    let orchestrator = lifecycle_context.orchestrator.clone();
    runtime()?
        .block_on(async move { orchestrator.load().await })
        .map_err(|err| StepError::Assertion(format!("load failed: {err}")))?;
    Ok(lifecycle_context)
}

#[when("the user submits a create drawer with label \"{label}\" and size \"{size}\"")]
fn submit_create(
    mut lifecycle_context: LifecycleContext,
    label: String,
    size: String,
) -> Result<LifecycleContext, StepError> {
    let intents = vec![
        Intent::OpenDrawer {
            mode: DrawerMode::Create,
            seed: None,
        },
        Intent::EditField {
            key: String::from("label"),
            value: label,
        },
        Intent::EditField {
            key: String::from("size"),
            value: size,
        },
        Intent::SubmitDrawer,
    ];
    lifecycle_context.outcome = Some(replay(&lifecycle_context, intents)?);
    Ok(lifecycle_context)
}

#[when("the user submits a create drawer without a label")]
fn submit_create_without_label(
    mut lifecycle_context: LifecycleContext,
) -> Result<LifecycleContext, StepError> {
    let intents = vec![
        Intent::OpenDrawer {
            mode: DrawerMode::Create,
            seed: None,
        },
        Intent::SubmitDrawer,
    ];
    lifecycle_context.outcome = Some(replay(&lifecycle_context, intents)?);
    Ok(lifecycle_context)
}

#[when("the user confirms a \"{mode}\" of volume \"{id}\"")]
fn confirm_operation(
    mut lifecycle_context: LifecycleContext,
    mode: String,
    id: u64,
) -> Result<LifecycleContext, StepError> {
    let intents = vec![
        Intent::OpenConfirmation {
            mode: parse_confirmation_mode(&mode)?,
            target: VolumeId(id),
        },
        Intent::ConfirmAction,
    ];
    lifecycle_context.outcome = Some(replay(&lifecycle_context, intents)?);
    Ok(lifecycle_context)
}

#[when("the user closes the drawer")]
fn close_drawer(mut lifecycle_context: LifecycleContext) -> Result<LifecycleContext, StepError> {
    lifecycle_context.outcome = Some(replay(&lifecycle_context, vec![Intent::CloseDrawer])?);
    Ok(lifecycle_context)
}

#[when("another session publishes \"{action}\"")]
fn session_publishes(
    lifecycle_context: LifecycleContext,
    action: String,
) -> Result<LifecycleContext, StepError> {
    lifecycle_context.bus.publish(DomainEvent::live(action));
    drain_events(lifecycle_context)
}

#[when("another session replays \"{action}\"")]
fn session_replays(
    lifecycle_context: LifecycleContext,
    action: String,
) -> Result<LifecycleContext, StepError> {
    lifecycle_context.bus.publish(DomainEvent::replayed(action));
    drain_events(lifecycle_context)
}

fn drain_events(mut lifecycle_context: LifecycleContext) -> Result<LifecycleContext, StepError> {
    let orchestrator = lifecycle_context.orchestrator.clone();
    let refreshes =
        runtime()?.block_on(async move { orchestrator.process_pending_events().await });
    lifecycle_context.refreshes += refreshes;
    Ok(lifecycle_context)
}

/// Dispatches `intents` in order and keeps the last outcome. Earlier
/// failures stop the replay.
fn replay(
    lifecycle_context: &LifecycleContext,
    intents: Vec<Intent>,
) -> Result<StepOutcome, StepError> {
    let orchestrator = lifecycle_context.orchestrator.clone();
    let outcome = runtime()?.block_on(async move {
        let mut last = StepOutcome::Error(String::from("no intents replayed"));
        for intent in intents {
            match orchestrator.dispatch(intent).await {
                Ok(outcome) => last = StepOutcome::Intent(outcome),
                Err(err) => return StepOutcome::Error(err.to_string()),
            }
        }
        last
    });
    Ok(outcome)
}

fn parse_confirmation_mode(mode: &str) -> Result<ConfirmationMode, StepError> {
    match mode {
        "detach" => Ok(ConfirmationMode::Detach),
        "delete" => Ok(ConfirmationMode::Delete),
        _ => Err(StepError::Assertion(format!("unknown confirmation mode: {mode}"))),
    }
}

fn labels(labels: impl Iterator<Item = String>) -> String {
    labels.collect::<Vec<_>>().join(",")
}

#[then("the placeholder is \"{kind}\"")]
fn placeholder_is(lifecycle_context: &LifecycleContext, kind: String) -> Result<(), StepError> {
    let actual = lifecycle_context
        .orchestrator
        .surface()
        .placeholder_kind()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|err| StepError::Assertion(err.to_string()))?
        .and_then(|value| value.as_str().map(str::to_owned))
        .unwrap_or_else(|| String::from("none"));
    if actual == kind {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected placeholder {kind}, got {actual}"
        )))
    }
}

#[then("no volume rows are shown")]
fn no_rows(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let surface = lifecycle_context.orchestrator.surface();
    if surface.list.rows.is_empty() && surface.list.header_action.is_none() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected an empty list, got {:?}",
            surface.list
        )))
    }
}

#[then("the drawer submission completed")]
fn submission_completed(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match &lifecycle_context.outcome {
        Some(StepOutcome::Intent(IntentOutcome::Submitted {
            submission: SubmitOutcome::Completed(_),
        })) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected a completed submission, got {other:?}"
        ))),
    }
}

#[then("the attached volumes are \"{expected}\"")]
fn attached_are(lifecycle_context: &LifecycleContext, expected: String) -> Result<(), StepError> {
    let rows = lifecycle_context.orchestrator.surface().list.rows;
    let actual = labels(rows.into_iter().map(|row| row.label));
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected attached volumes [{expected}], got [{actual}]"
        )))
    }
}

#[then("no volumes are attached")]
fn none_attached(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let snapshot = lifecycle_context.orchestrator.snapshot();
    if snapshot.attached.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no attached volumes, got {:?}",
            snapshot.attached
        )))
    }
}

#[then("the attachable volumes are \"{expected}\"")]
fn attachable_are(lifecycle_context: &LifecycleContext, expected: String) -> Result<(), StepError> {
    let snapshot = lifecycle_context.orchestrator.snapshot();
    let actual = labels(snapshot.attachable.into_iter().map(|volume| volume.label));
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected attachable volumes [{expected}], got [{actual}]"
        )))
    }
}

#[then("the event poll was reset \"{count}\" times")]
fn poll_resets(lifecycle_context: &LifecycleContext, count: usize) -> Result<(), StepError> {
    let actual = lifecycle_context.bus.poll_resets();
    if actual == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} poll resets, got {actual}"
        )))
    }
}

#[then("the drawer shows an error on \"{field}\"")]
fn drawer_error_on(lifecycle_context: &LifecycleContext, field: String) -> Result<(), StepError> {
    let drawer = lifecycle_context
        .orchestrator
        .surface()
        .drawer
        .ok_or_else(|| StepError::Assertion(String::from("drawer should stay open")))?;
    if drawer.scroll_to.as_deref() == Some(field.as_str())
        && drawer.errors.iter().any(|error| error.field == field)
    {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected an error on {field}, got {:?}",
            drawer.errors
        )))
    }
}

#[then("no volume was created")]
fn no_volume_created(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    let calls = lifecycle_context.gateway.count_calls(GatewayOp::Create);
    if calls == 0 {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "gateway.create should not be invoked, got {calls} calls"
        )))
    }
}

#[then("the notice mentions \"{message}\"")]
fn notice_mentions(lifecycle_context: &LifecycleContext, message: String) -> Result<(), StepError> {
    let notice = lifecycle_context
        .orchestrator
        .surface()
        .notice
        .ok_or_else(|| StepError::Assertion(String::from("expected a notice")))?;
    if notice.message.contains(&message) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected notice mentioning {message}, got {}",
            notice.message
        )))
    }
}

#[then("no notice is shown")]
fn no_notice(lifecycle_context: &LifecycleContext) -> Result<(), StepError> {
    match lifecycle_context.orchestrator.surface().notice {
        None => Ok(()),
        Some(notice) => Err(StepError::Assertion(format!(
            "expected no notice, got {}",
            notice.message
        ))),
    }
}

#[then("\"{count}\" refreshes ran")]
fn refreshes_ran(lifecycle_context: &LifecycleContext, count: usize) -> Result<(), StepError> {
    if lifecycle_context.refreshes == count {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {count} refreshes, got {}",
            lifecycle_context.refreshes
        )))
    }
}
