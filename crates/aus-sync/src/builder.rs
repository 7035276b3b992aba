//! Turns fetched account records into blobs, trees and commits.
//!
//! Every account gets its own single-file history:
//!
//! ```text
//! accounts/07/7 -> commit -> tree { account.config -> blob "[account] ..." }
//! ```
//!
//! External identities are collected into one shared ledger tree whose
//! entries are named by the hash of the identity key. Commits are only
//! written when the tree they would point at differs from the current one,
//! so re-running an unchanged sync writes nothing new.

use aus_crypto::identity_key_name;
use aus_refs::account_ref_name;
use aus_store::{
    Blob, Commit, EntryMode, ObjectStore, Person, Tree, TreeEntry, TreePatcher,
};
use aus_types::{AccountId, AccountInfo, AccountRecord, ExternalIdentity, ObjectId};

use crate::config::Identity;
use crate::error::SyncResult;
use crate::gitconfig::{ConfigError, ConfigFile};
use crate::repository::CommitRef;

pub const ACCOUNT_CONFIG_FILE: &str = "account.config";
pub const ACCOUNT_COMMIT_MESSAGE: &str = "update account";
pub const LEDGER_COMMIT_MESSAGE: &str = "update external IDs";

/// Result of building one history step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The derived tree matched the current commit's tree; nothing written.
    Unchanged { commit: ObjectId },
    /// A new commit was written on top of `parent`.
    Created {
        commit: ObjectId,
        parent: Option<ObjectId>,
    },
}

impl BuildOutcome {
    pub fn commit(&self) -> ObjectId {
        match self {
            Self::Unchanged { commit } | Self::Created { commit, .. } => *commit,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountBuild {
    pub account_id: AccountId,
    pub ref_name: String,
    pub outcome: BuildOutcome,
    /// Ledger entries for every identity the account owns, sorted by name.
    pub external_ids: Vec<TreeEntry>,
}

/// `[account]` section for a record. Absent fields are omitted.
pub fn account_config(record: &AccountRecord) -> Result<ConfigFile, ConfigError> {
    let mut config = ConfigFile::new();
    if let Some(name) = &record.full_name {
        config.set("account", None, "fullName", name)?;
    }
    if let Some(email) = &record.preferred_email {
        config.set("account", None, "preferredEmail", email)?;
    }
    Ok(config)
}

/// `[externalId "<key>"]` section binding an identity to its owner.
///
/// Fails for keys that cannot appear in a section header.
pub fn external_id_config(
    identity: &ExternalIdentity,
    owner: AccountId,
) -> Result<ConfigFile, ConfigError> {
    let key = Some(identity.key.as_str());
    let mut config = ConfigFile::new();
    config.set("externalId", key, "accountId", &owner.to_string())?;
    if let Some(email) = &identity.email {
        config.set("externalId", key, "email", email)?;
    }
    Ok(config)
}

/// Owner recorded in a ledger blob, if it parses as one.
pub fn external_id_owner(config: &ConfigFile) -> Option<(String, AccountId)> {
    let key = config.subsections("externalId").next()?;
    let owner = config.get("externalId", Some(key), "accountId")?.parse().ok()?;
    Some((key.to_string(), owner))
}

pub struct RecordCommitBuilder<'a> {
    store: &'a dyn ObjectStore,
    identity: Identity,
    fixed_time: Option<i64>,
}

impl<'a> RecordCommitBuilder<'a> {
    pub fn new(store: &'a dyn ObjectStore, identity: Identity) -> Self {
        Self {
            store,
            identity,
            fixed_time: None,
        }
    }

    /// Stamp every commit with `timestamp` instead of the current time.
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.fixed_time = Some(timestamp);
        self
    }

    fn signature(&self) -> Person {
        let when = self
            .fixed_time
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        Person::new(&self.identity.name, &self.identity.email, when)
    }

    fn write_blob(&self, config: &ConfigFile) -> SyncResult<ObjectId> {
        let blob = Blob::new(config.encode());
        Ok(self.store.write(&blob.to_stored_object())?)
    }

    /// Write a commit for `tree` unless `existing` already points at it.
    fn commit_if_changed(
        &self,
        existing: Option<&CommitRef>,
        tree: ObjectId,
        message: &str,
    ) -> SyncResult<BuildOutcome> {
        if let Some(current) = existing {
            if current.commit.tree == tree {
                return Ok(BuildOutcome::Unchanged { commit: current.id });
            }
        }
        let signature = self.signature();
        let parent = existing.map(|current| current.id);
        let commit = Commit {
            tree,
            parents: parent.into_iter().collect(),
            author: signature.clone(),
            committer: signature,
            message: message.to_string(),
        };
        let id = self.store.write(&commit.to_stored_object()?)?;
        Ok(BuildOutcome::Created { commit: id, parent })
    }

    /// Build the account's history step and its ledger entries.
    ///
    /// Ledger entries are produced even when the account itself is
    /// unchanged, so the ledger can be rebuilt from any run.
    pub fn build_account(
        &self,
        existing: Option<&CommitRef>,
        info: &AccountInfo,
    ) -> SyncResult<AccountBuild> {
        let account_id = info.id();
        let blob = self.write_blob(&account_config(&info.record)?)?;
        let tree = Tree::new(vec![TreeEntry::new(
            EntryMode::Regular,
            ACCOUNT_CONFIG_FILE,
            blob,
        )]);
        let tree_id = self.store.write(&tree.to_stored_object()?)?;
        let outcome = self.commit_if_changed(existing, tree_id, ACCOUNT_COMMIT_MESSAGE)?;

        let mut external_ids = Vec::with_capacity(info.external_ids.len());
        for identity in &info.external_ids {
            if identity.account_id != account_id {
                tracing::warn!(
                    account = %account_id,
                    claimed = %identity.account_id,
                    key = %identity.key,
                    "external id names another owner; recording the fetched account"
                );
            }
            let blob = self.write_blob(&external_id_config(identity, account_id)?)?;
            external_ids.push(TreeEntry::new(
                EntryMode::Regular,
                identity_key_name(&identity.key),
                blob,
            ));
        }
        external_ids.sort();
        external_ids.dedup_by(|a, b| a.name == b.name);

        tracing::debug!(
            account = %account_id,
            created = outcome.is_created(),
            external_ids = external_ids.len(),
            "built account"
        );
        Ok(AccountBuild {
            account_id,
            ref_name: account_ref_name(account_id),
            outcome,
            external_ids,
        })
    }

    /// Patch the ledger tree and commit it if it changed.
    ///
    /// `updates` must be sorted and unique by name. Returns `None` when
    /// there is no ledger yet and nothing to put in one.
    pub fn build_ledger(
        &self,
        existing: Option<&CommitRef>,
        base: &Tree,
        updates: &[TreeEntry],
    ) -> SyncResult<Option<BuildOutcome>> {
        if existing.is_none() && updates.iter().all(|u| u.mode.is_deleted()) {
            return Ok(None);
        }
        let (tree_id, tree) = TreePatcher::new(self.store).patch(base, updates)?;
        let outcome = self.commit_if_changed(existing, tree_id, LEDGER_COMMIT_MESSAGE)?;
        tracing::debug!(
            tree = %tree_id,
            entries = tree.len(),
            created = outcome.is_created(),
            "built ledger"
        );
        Ok(Some(outcome))
    }
}
