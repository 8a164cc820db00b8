use crate::config::EngineConfig;
use crate::db::connection::DbPool;
use crate::gate::OperationGate;

/// Shared state handed to the orchestrators. Each engine instance owns its
/// own gate, so isolated instances (e.g. in tests) never interfere.
pub struct EngineState {
    pub db: DbPool,
    pub config: EngineConfig,
    pub gate: OperationGate,
}

impl EngineState {
    pub fn new(db: DbPool, config: EngineConfig) -> Self {
        Self {
            db,
            config,
            gate: OperationGate::new(),
        }
    }
}
