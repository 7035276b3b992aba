use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use aus_types::{AccountId, AccountInfo};

use crate::error::{RemoteError, Result};

/// Where account records come from.
///
/// `Ok(None)` means the account does not exist and should be skipped. Any
/// `Err` aborts the run that asked for it.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn fetch(&self, id: AccountId) -> Result<Option<AccountInfo>>;
}

/// In-memory account source for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryAccountSource {
    accounts: RwLock<HashMap<AccountId, AccountInfo>>,
    failing: RwLock<HashSet<AccountId>>,
    fetched: RwLock<Vec<AccountId>>,
}

impl InMemoryAccountSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, info: AccountInfo) -> Self {
        self.insert(info);
        self
    }

    /// Add or replace an account.
    pub fn insert(&self, info: AccountInfo) {
        self.accounts
            .write()
            .expect("lock poisoned")
            .insert(info.id(), info);
    }

    /// Make every fetch of `id` fail with a server error.
    pub fn fail_on(&self, id: AccountId) {
        self.failing.write().expect("lock poisoned").insert(id);
    }

    /// Ids requested so far, in call order.
    pub fn fetched(&self) -> Vec<AccountId> {
        self.fetched.read().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl AccountSource for InMemoryAccountSource {
    async fn fetch(&self, id: AccountId) -> Result<Option<AccountInfo>> {
        self.fetched.write().expect("lock poisoned").push(id);
        if self.failing.read().expect("lock poisoned").contains(&id) {
            return Err(RemoteError::Status {
                url: format!("memory://accounts/{id}"),
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(self.accounts.read().expect("lock poisoned").get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aus_types::AccountRecord;

    #[tokio::test]
    async fn returns_known_accounts_and_none_otherwise() {
        let source = InMemoryAccountSource::new()
            .with_account(AccountInfo::new(AccountRecord::new(7).with_name("A")));

        let found = source.fetch(AccountId::new(7)).await.unwrap().unwrap();
        assert_eq!(found.record.full_name.as_deref(), Some("A"));
        assert!(source.fetch(AccountId::new(99)).await.unwrap().is_none());
        assert_eq!(source.fetched(), vec![AccountId::new(7), AccountId::new(99)]);
    }

    #[tokio::test]
    async fn injected_failure_is_an_error() {
        let source = InMemoryAccountSource::new();
        source.fail_on(AccountId::new(3));
        assert!(matches!(
            source.fetch(AccountId::new(3)).await,
            Err(RemoteError::Status { status: 500, .. })
        ));
    }
}
