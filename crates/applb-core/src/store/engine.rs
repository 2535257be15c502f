// ── In-memory load-balancing rule engine ──
//
// Drives rule removal through Revoke -> Removed and stands in for the
// dataplane acknowledging staged rules.

use std::sync::Arc;

use tracing::{debug, warn};

use super::firewall::MemoryFirewall;
use super::rules::MemoryRuleRepository;
use crate::model::{RuleId, RuleState};
use crate::ports::{LbRuleEngine, RuleRepository};

pub struct MemoryRuleEngine {
    rules: Arc<MemoryRuleRepository>,
    firewall: Arc<MemoryFirewall>,
}

impl MemoryRuleEngine {
    pub fn new(rules: Arc<MemoryRuleRepository>, firewall: Arc<MemoryFirewall>) -> Self {
        Self { rules, firewall }
    }

    /// Play the dataplane: every rule waiting in `Add` whose firewall rule
    /// is staged becomes `Active`. Returns how many moved.
    pub fn acknowledge(&self) -> usize {
        self.rules
            .in_state(RuleState::Add)
            .into_iter()
            .filter(|id| {
                self.firewall.activate(*id)
                    && self
                        .rules
                        .transition(*id, RuleState::Add, RuleState::Active)
                        .is_some()
            })
            .inspect(|id| debug!(rule_id = %id, "dataplane acknowledged rule"))
            .count()
    }
}

impl LbRuleEngine for MemoryRuleEngine {
    fn remove_rule(&self, id: RuleId, force_detach: bool) -> bool {
        let Some(rule) = self.rules.find_by_id(id) else {
            return false;
        };

        if rule.state != RuleState::Revoke
            && self
                .rules
                .transition(id, rule.state, RuleState::Revoke)
                .is_none()
        {
            debug!(rule_id = %id, state = %rule.state, "rule changed state before revocation");
            return false;
        }

        if !self.firewall.revoke(id) {
            if !force_detach {
                warn!(rule_id = %id, "firewall refused revocation; rule left in Revoke");
                return false;
            }
            warn!(rule_id = %id, "firewall refused revocation; detaching anyway");
        }
        self.firewall.detach(id);

        if self
            .rules
            .transition(id, RuleState::Revoke, RuleState::Removed)
            .is_none()
        {
            return false;
        }
        self.rules.remove(id).is_some()
    }
}
