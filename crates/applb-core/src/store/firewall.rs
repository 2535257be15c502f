// ── In-memory firewall ──
//
// Tracks the firewall rule behind each load balancer rule. Staging can be
// switched off to emulate a dataplane that refuses new rules.

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::model::{ApplicationLoadBalancerRule, RuleId, RuleState};
use crate::ports::FirewallRules;

pub struct MemoryFirewall {
    rules: DashMap<RuleId, RuleState>,
    accepting: AtomicBool,
}

impl MemoryFirewall {
    pub fn new() -> Self {
        Self {
            rules: DashMap::new(),
            accepting: AtomicBool::new(true),
        }
    }

    /// Refuse (or accept again) every staging and revocation request.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    pub fn state(&self, id: RuleId) -> Option<RuleState> {
        self.rules.get(&id).map(|r| *r.value())
    }

    /// Record a firewall rule that already exists, e.g. when reloading state.
    pub fn track(&self, id: RuleId, state: RuleState) {
        self.rules.insert(id, state);
    }

    /// Mark the firewall rule for revocation. `false` when refused.
    pub fn revoke(&self, id: RuleId) -> bool {
        if !self.is_accepting() {
            return false;
        }
        self.rules.insert(id, RuleState::Revoke);
        true
    }

    /// Drop the firewall rule entirely.
    pub fn detach(&self, id: RuleId) {
        if self.rules.remove(&id).is_some() {
            debug!(rule_id = %id, "detached firewall rule");
        }
    }

    /// Move a staged rule to `Active`. Returns whether anything changed.
    pub fn activate(&self, id: RuleId) -> bool {
        match self.rules.get_mut(&id) {
            Some(mut state) if *state == RuleState::Add => {
                *state = RuleState::Active;
                true
            }
            _ => false,
        }
    }
}

impl Default for MemoryFirewall {
    fn default() -> Self {
        Self::new()
    }
}

impl FirewallRules for MemoryFirewall {
    fn stage_add(&self, rule: &ApplicationLoadBalancerRule) -> bool {
        if !self.is_accepting() {
            return false;
        }
        self.rules.insert(rule.id, RuleState::Add);
        true
    }

    fn unstage(&self, id: RuleId) {
        self.rules.remove_if(&id, |_, state| *state == RuleState::Add);
    }
}
