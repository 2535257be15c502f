// ── Async service facade ──
//
// Cheaply cloneable handle around a `RuleManager` for async callers. The
// manager blocks on per-source-IP locks, so each command runs on the
// blocking pool rather than a runtime worker.

use std::sync::Arc;

use tracing::debug;

use crate::command::{Command, CommandResult, RuleFilter};
use crate::error::CoreError;
use crate::manager::RuleManager;
use crate::model::{ApplicationLoadBalancerRule, CallContext, RuleId};

#[derive(Clone)]
pub struct LbService {
    manager: Arc<RuleManager>,
}

impl LbService {
    pub fn new(manager: RuleManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    pub fn manager(&self) -> &RuleManager {
        &self.manager
    }

    // ── Command execution ────────────────────────────────────────

    /// Run a mutating command to completion.
    pub async fn execute(
        &self,
        command: Command,
        context: CallContext,
    ) -> Result<CommandResult, CoreError> {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || route_command(&manager, command, &context))
            .await
            .map_err(|e| CoreError::Internal(format!("command task failed: {e}")))?
    }

    // ── Reads ────────────────────────────────────────────────────

    pub async fn get(&self, id: RuleId) -> Result<ApplicationLoadBalancerRule, CoreError> {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || manager.get(id))
            .await
            .map_err(|e| CoreError::Internal(format!("read task failed: {e}")))?
    }

    pub async fn list(
        &self,
        filter: RuleFilter,
    ) -> Result<Vec<ApplicationLoadBalancerRule>, CoreError> {
        let manager = Arc::clone(&self.manager);
        tokio::task::spawn_blocking(move || manager.list(&filter))
            .await
            .map_err(|e| CoreError::Internal(format!("read task failed: {e}")))
    }
}

fn route_command(
    manager: &RuleManager,
    command: Command,
    context: &CallContext,
) -> Result<CommandResult, CoreError> {
    match command {
        Command::CreateRule(request) => {
            debug!(name = %request.name, "routing create");
            manager.create(&request, context).map(CommandResult::Rule)
        }
        Command::DeleteRule { id } => {
            debug!(rule_id = %id, "routing delete");
            manager.delete(id, context).map(CommandResult::Deleted)
        }
    }
}
