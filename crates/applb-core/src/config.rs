// ── Runtime manager configuration ──
//
// Tuning knobs for the rule manager. Core never reads config files: the
// config crate (or a test) builds a `ManagerConfig` and hands it in.

use serde::{Deserialize, Serialize};

/// Behaviour switches for [`RuleManager`](crate::RuleManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Detach the firewall rule on delete even if the dataplane refuses
    /// the revocation.
    pub force_detach_on_delete: bool,
    /// Emit usage events for rule creation and removal.
    pub usage_events: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            force_detach_on_delete: true,
            usage_events: true,
        }
    }
}
