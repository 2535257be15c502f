// ── Caller context ──

use serde::{Deserialize, Serialize};

use super::ids::AccountId;

/// Who is making a request. Passed explicitly into mutating operations so
/// usage events can be attributed without process-wide state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub user_id: u64,
    pub account_id: AccountId,
}

impl CallContext {
    pub const fn new(user_id: u64, account_id: AccountId) -> Self {
        Self {
            user_id,
            account_id,
        }
    }

    /// The built-in system caller.
    pub const fn system() -> Self {
        Self::new(1, AccountId::new(1))
    }
}
