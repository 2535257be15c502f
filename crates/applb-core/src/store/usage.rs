// ── Usage event ledger ──
//
// Keeps every usage event in memory and mirrors it to the log.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CoreError;
use crate::model::{AccountId, ApplicationLoadBalancerRule, CallContext, RuleId};
use crate::ports::UsageEvents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageKind {
    LoadBalancerCreate,
    LoadBalancerDelete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub kind: UsageKind,
    pub rule_id: RuleId,
    pub rule_account_id: AccountId,
    pub caller_user_id: u64,
    pub caller_account_id: AccountId,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
pub struct UsageLedger {
    events: Mutex<Vec<UsageEvent>>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.lock().clone()
    }

    fn push(
        &self,
        kind: UsageKind,
        rule: &ApplicationLoadBalancerRule,
        context: &CallContext,
    ) {
        info!(
            target: "usage",
            ?kind,
            rule_id = %rule.id,
            account_id = %rule.account_id,
            caller = context.user_id,
            "usage event"
        );
        self.events.lock().push(UsageEvent {
            kind,
            rule_id: rule.id,
            rule_account_id: rule.account_id,
            caller_user_id: context.user_id,
            caller_account_id: context.account_id,
            at: Utc::now(),
        });
    }
}

impl UsageEvents for UsageLedger {
    fn record_create(
        &self,
        rule: &ApplicationLoadBalancerRule,
        context: &CallContext,
    ) -> Result<(), CoreError> {
        self.push(UsageKind::LoadBalancerCreate, rule, context);
        Ok(())
    }

    fn record_delete(
        &self,
        rule: &ApplicationLoadBalancerRule,
        context: &CallContext,
    ) -> Result<(), CoreError> {
        self.push(UsageKind::LoadBalancerDelete, rule, context);
        Ok(())
    }
}
