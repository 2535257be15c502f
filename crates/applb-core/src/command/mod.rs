// ── Command API ──
//
// Write operations flow through a unified `Command` enum so the service
// facade can run each one on its own blocking task. Reads bypass it and
// go straight to the manager.

pub mod requests;

use crate::model::{ApplicationLoadBalancerRule, RuleId};

pub use requests::{CreateRuleRequest, RuleFilter};

/// All mutating operations against the rule manager.
#[derive(Debug, Clone)]
pub enum Command {
    CreateRule(CreateRuleRequest),
    DeleteRule { id: RuleId },
}

/// Result of a command execution.
#[derive(Debug)]
pub enum CommandResult {
    Rule(ApplicationLoadBalancerRule),
    /// Whether the rule engine confirmed removal.
    Deleted(bool),
}
