// ── In-memory account directory ──

use dashmap::DashMap;

use crate::model::AccountId;
use crate::ports::AccountDirectory;

#[derive(Default)]
pub struct MemoryAccountDirectory {
    accounts: DashMap<AccountId, String>,
}

impl MemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: AccountId, name: impl Into<String>) {
        self.accounts.insert(id, name.into());
    }

    pub fn name(&self, id: AccountId) -> Option<String> {
        self.accounts.get(&id).map(|r| r.value().clone())
    }
}

impl AccountDirectory for MemoryAccountDirectory {
    fn exists(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }
}
