use std::sync::Arc;
use vani_core::{EventBus, Orchestrator, VaniConfig};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VaniConfig>,
    pub orchestrator: Orchestrator,
    pub bus: EventBus,
}

impl AppState {
    pub fn new(config: VaniConfig, orchestrator: Orchestrator) -> Self {
        let bus = orchestrator.bus().clone();
        Self {
            config: Arc::new(config),
            orchestrator,
            bus,
        }
    }
}
