use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Numeric account identifier as assigned by the review server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(u32);

impl AccountId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    /// Shard bucket used in the reference layout (`id mod 100`).
    pub fn shard(&self) -> u32 {
        self.0 % 100
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AccountId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| TypeError::InvalidAccountId(s.to_string()))
    }
}

impl From<u32> for AccountId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Account details as returned by the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub full_name: Option<String>,
    pub preferred_email: Option<String>,
}

impl AccountRecord {
    pub fn new(id: impl Into<AccountId>) -> Self {
        Self {
            id: id.into(),
            full_name: None,
            preferred_email: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.full_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.preferred_email = Some(email.into());
        self
    }
}

/// An alternate login or credential key (e.g. `username:jdoe`,
/// `mailto:jdoe@example.com`) bound to exactly one account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub key: String,
    pub account_id: AccountId,
    pub email: Option<String>,
}

impl ExternalIdentity {
    pub fn new(key: impl Into<String>, account_id: impl Into<AccountId>) -> Self {
        Self {
            key: key.into(),
            account_id: account_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// One fetched account: its record plus every external identity it owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub record: AccountRecord,
    pub external_ids: Vec<ExternalIdentity>,
}

impl AccountInfo {
    pub fn new(record: AccountRecord) -> Self {
        Self {
            record,
            external_ids: Vec::new(),
        }
    }

    pub fn with_external_id(mut self, identity: ExternalIdentity) -> Self {
        self.external_ids.push(identity);
        self
    }

    pub fn id(&self) -> AccountId {
        self.record.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_is_id_mod_100() {
        assert_eq!(AccountId::new(7).shard(), 7);
        assert_eq!(AccountId::new(1000042).shard(), 42);
        assert_eq!(AccountId::new(100).shard(), 0);
    }

    #[test]
    fn parse_account_id() {
        assert_eq!("1000096".parse::<AccountId>().unwrap(), AccountId::new(1000096));
        assert_eq!(" 7 ".parse::<AccountId>().unwrap(), AccountId::new(7));
        assert!("seven".parse::<AccountId>().is_err());
        assert!("-1".parse::<AccountId>().is_err());
    }

    #[test]
    fn record_builder() {
        let record = AccountRecord::new(7).with_name("A").with_email("a@x");
        assert_eq!(record.id, AccountId::new(7));
        assert_eq!(record.full_name.as_deref(), Some("A"));
        assert_eq!(record.preferred_email.as_deref(), Some("a@x"));
    }

    #[test]
    fn info_collects_external_ids() {
        let info = AccountInfo::new(AccountRecord::new(9))
            .with_external_id(ExternalIdentity::new("username:nine", 9))
            .with_external_id(ExternalIdentity::new("mailto:n@x", 9).with_email("n@x"));
        assert_eq!(info.id(), AccountId::new(9));
        assert_eq!(info.external_ids.len(), 2);
        assert_eq!(info.external_ids[1].email.as_deref(), Some("n@x"));
    }

    #[test]
    fn account_id_serializes_as_number() {
        let json = serde_json::to_string(&AccountId::new(12)).unwrap();
        assert_eq!(json, "12");
    }
}
