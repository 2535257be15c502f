// ── In-memory rule repository ──
//
// Lock-free concurrent storage keyed by rule id, with a unique secondary
// index on (network, source IP, source port). Insert claims the index slot
// through the `DashMap` entry API, so two racing inserts for one tuple
// cannot both win.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::command::RuleFilter;
use crate::error::CoreError;
use crate::model::{ApplicationLoadBalancerRule, NetworkId, NewRule, RuleId, RuleState};
use crate::ports::RuleRepository;

type Endpoint = (NetworkId, Ipv4Addr, u16);

fn endpoint(rule: &ApplicationLoadBalancerRule) -> Endpoint {
    (rule.source_ip_network_id, rule.source_ip, rule.source_port)
}

pub struct MemoryRuleRepository {
    /// Primary storage: id -> rule.
    by_id: DashMap<RuleId, ApplicationLoadBalancerRule>,

    /// Unique index over live rules: (network, ip, port) -> id.
    by_endpoint: DashMap<Endpoint, RuleId>,

    /// Next identifier to hand out. Only ever grows.
    next_id: AtomicU64,
}

impl MemoryRuleRepository {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            by_endpoint: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Load previously persisted rules, keeping their identifiers.
    ///
    /// Removed rules are skipped. Fails on the first rule whose endpoint
    /// collides with one already loaded.
    pub fn restore(
        &self,
        rules: impl IntoIterator<Item = ApplicationLoadBalancerRule>,
    ) -> Result<(), CoreError> {
        for rule in rules {
            if !rule.state.is_live() {
                continue;
            }
            let key = endpoint(&rule);
            match self.by_endpoint.entry(key) {
                Entry::Occupied(_) => return Err(conflict(key)),
                Entry::Vacant(slot) => {
                    slot.insert(rule.id);
                }
            }
            self.next_id.fetch_max(rule.id.get() + 1, Ordering::SeqCst);
            self.by_id.insert(rule.id, rule);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Every rule currently in `state`.
    pub fn in_state(&self, state: RuleState) -> Vec<RuleId> {
        let mut ids: Vec<RuleId> = self
            .by_id
            .iter()
            .filter(|r| r.value().state == state)
            .map(|r| *r.key())
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for MemoryRuleRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRepository for MemoryRuleRepository {
    fn find_by_id(&self, id: RuleId) -> Option<ApplicationLoadBalancerRule> {
        self.by_id.get(&id).map(|r| r.value().clone())
    }

    fn persist(&self, rule: NewRule) -> Result<ApplicationLoadBalancerRule, CoreError> {
        let key = (rule.source_ip_network_id, rule.source_ip, rule.source_port);
        match self.by_endpoint.entry(key) {
            Entry::Occupied(_) => Err(conflict(key)),
            Entry::Vacant(slot) => {
                let id = RuleId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
                let rule = rule.into_rule(id);
                self.by_id.insert(id, rule.clone());
                slot.insert(id);
                Ok(rule)
            }
        }
    }

    fn count_by_source_ip(&self, ip: Ipv4Addr, network: NetworkId) -> u64 {
        let count = self
            .by_id
            .iter()
            .filter(|r| {
                let rule = r.value();
                rule.source_ip == ip && rule.source_ip_network_id == network && rule.state.is_live()
            })
            .count();
        u64::try_from(count).unwrap_or(u64::MAX)
    }

    fn transition(
        &self,
        id: RuleId,
        expected: RuleState,
        next: RuleState,
    ) -> Option<ApplicationLoadBalancerRule> {
        let updated = {
            let mut entry = self.by_id.get_mut(&id)?;
            if entry.state != expected || !expected.can_transition_to(next) {
                return None;
            }
            entry.state = next;
            entry.value().clone()
        };
        // Index is touched only after the primary shard guard is gone.
        if !next.is_live() {
            self.by_endpoint.remove_if(&endpoint(&updated), |_, owner| *owner == id);
        }
        Some(updated)
    }

    fn remove(&self, id: RuleId) -> Option<ApplicationLoadBalancerRule> {
        let (_, rule) = self.by_id.remove(&id)?;
        self.by_endpoint.remove_if(&endpoint(&rule), |_, owner| *owner == id);
        Some(rule)
    }

    fn list(&self, filter: &RuleFilter) -> Vec<ApplicationLoadBalancerRule> {
        let mut rules: Vec<ApplicationLoadBalancerRule> = self
            .by_id
            .iter()
            .filter(|r| filter.matches(r.value()))
            .map(|r| r.value().clone())
            .collect();
        rules.sort_by_key(|r| r.id);
        rules
    }
}

fn conflict((network_id, source_ip, source_port): Endpoint) -> CoreError {
    CoreError::RuleConflict {
        network_id,
        source_ip,
        source_port,
    }
}
