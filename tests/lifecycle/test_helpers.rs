//! Shared fixtures for lifecycle BDD scenarios.

use std::sync::Arc;

use mooring::{
    EventBus, IntentOutcome, MemoryGateway, Orchestrator, OrchestratorSettings, ParentInstance,
};
use rstest::fixture;

pub const PARENT_ID: u64 = 1;
pub const PARENT_REGION: &str = "us-east";

/// Orchestrator, gateway and bus shared across the steps of one scenario.
#[derive(Clone, Debug)]
pub struct LifecycleContext {
    pub orchestrator: Arc<Orchestrator<MemoryGateway, EventBus>>,
    pub gateway: MemoryGateway,
    pub bus: EventBus,
    pub parent: ParentInstance,
    pub outcome: Option<StepOutcome>,
    pub refreshes: usize,
}

/// What the last `when` step produced.
#[derive(Clone, Debug)]
pub enum StepOutcome {
    Intent(IntentOutcome),
    Error(String),
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    let parent = ParentInstance::new(PARENT_ID, "web-1", PARENT_REGION);
    let bus = EventBus::new(16);
    let gateway = MemoryGateway::new().with_events(bus.clone());
    gateway.add_parent(&parent, 1);
    let orchestrator = Orchestrator::mount(
        parent.clone(),
        gateway.clone(),
        bus.clone(),
        OrchestratorSettings::default(),
    );
    LifecycleContext {
        orchestrator: Arc::new(orchestrator),
        gateway,
        bus,
        parent,
        outcome: None,
        refreshes: 0,
    }
}
