//! One sync run: fetch, build, publish.
//!
//! Fetching is the only asynchronous step. Once every requested account has
//! been fetched, the build and the reference update run synchronously
//! against the repository.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use aus_refs::{account_ref_name, RefTransaction, EXTERNAL_IDS_REF};
use aus_remote::AccountSource;
use aus_store::{sort_updates, Tree, TreeEntry};
use aus_types::{AccountId, AccountInfo};

use crate::builder::{external_id_owner, BuildOutcome, RecordCommitBuilder};
use crate::config::{Identity, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::gitconfig::ConfigFile;
use crate::repository::Repository;

/// Fetched-account interval between progress log lines.
pub const PROGRESS_INTERVAL: usize = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub identity: Identity,
    pub prune_external_ids: bool,
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            identity: config.identity.clone(),
            prune_external_ids: config.prune_external_ids,
        }
    }
}

/// What a run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: Vec<AccountId>,
    pub not_found: Vec<AccountId>,
    /// Accounts that got a new commit.
    pub created: Vec<AccountId>,
    /// Accounts whose content was already current.
    pub unchanged: Vec<AccountId>,
    /// `None` when no ledger exists and none was needed.
    pub ledger: Option<BuildOutcome>,
    /// Ledger entry names removed by pruning.
    pub pruned: Vec<String>,
    /// References written by the run's transaction.
    pub refs_updated: usize,
}

impl SyncReport {
    /// True when no account was fetched and nothing was attempted.
    pub fn is_noop(&self) -> bool {
        self.fetched.is_empty()
    }
}

pub struct SyncOrchestrator<'a> {
    repo: &'a Repository,
    source: &'a dyn AccountSource,
    options: SyncOptions,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(repo: &'a Repository, source: &'a dyn AccountSource, options: SyncOptions) -> Self {
        Self {
            repo,
            source,
            options,
        }
    }

    pub async fn run(&self, ids: &[AccountId]) -> SyncResult<SyncReport> {
        let mut report = SyncReport::default();
        let infos = self.fetch_all(ids, &mut report).await?;
        if infos.is_empty() {
            tracing::info!(requested = ids.len(), "nothing to do");
            return Ok(report);
        }
        self.publish(&infos, &mut report)?;
        tracing::info!(
            fetched = report.fetched.len(),
            not_found = report.not_found.len(),
            created = report.created.len(),
            unchanged = report.unchanged.len(),
            ledger_created = report.ledger.is_some_and(|l| l.is_created()),
            pruned = report.pruned.len(),
            refs_updated = report.refs_updated,
            "sync finished"
        );
        Ok(report)
    }

    async fn fetch_all(
        &self,
        ids: &[AccountId],
        report: &mut SyncReport,
    ) -> SyncResult<Vec<AccountInfo>> {
        let mut seen = HashSet::with_capacity(ids.len());
        let mut processed = Vec::with_capacity(ids.len());
        let mut infos = Vec::new();

        for &id in ids {
            if !seen.insert(id) {
                tracing::debug!(%id, "skipping repeated account id");
                continue;
            }
            match self.source.fetch(id).await {
                Ok(Some(info)) => {
                    report.fetched.push(id);
                    infos.push(info);
                    if infos.len() % PROGRESS_INTERVAL == 0 {
                        tracing::info!(fetched = infos.len(), last = %id, "fetch progress");
                    }
                }
                Ok(None) => {
                    tracing::warn!(%id, "account not found, skipping");
                    report.not_found.push(id);
                }
                Err(source) => {
                    return Err(SyncError::Fetch {
                        id,
                        processed,
                        source,
                    })
                }
            }
            processed.push(id);
        }
        Ok(infos)
    }

    fn publish(&self, infos: &[AccountInfo], report: &mut SyncReport) -> SyncResult<()> {
        let mut failed_at = None;
        let transaction = match self.build_all(infos, report, &mut failed_at) {
            Ok(transaction) => transaction,
            Err(source) => {
                return Err(SyncError::Build {
                    failed_at,
                    processed: report.fetched.clone(),
                    source: Box::new(source),
                })
            }
        };
        let applied = transaction.apply(self.repo.refs())?;
        report.refs_updated = applied.set.len();
        Ok(())
    }

    /// Write every account's objects and the ledger, returning the
    /// reference updates to publish. `failed_at` tracks the account being
    /// built and is `None` during the ledger step.
    fn build_all(
        &self,
        infos: &[AccountInfo],
        report: &mut SyncReport,
        failed_at: &mut Option<AccountId>,
    ) -> SyncResult<RefTransaction> {
        let builder = RecordCommitBuilder::new(self.repo.objects(), self.options.identity.clone());
        let mut transaction = RefTransaction::new();
        // name -> (owner, entry); a key claimed twice goes to the later account.
        let mut ledger_updates: BTreeMap<String, (AccountId, TreeEntry)> = BTreeMap::new();

        for info in infos {
            *failed_at = Some(info.id());
            let existing = self.repo.resolve(&account_ref_name(info.id()))?;
            let build = builder.build_account(existing.as_ref(), info)?;
            match build.outcome {
                BuildOutcome::Created { commit, .. } => {
                    transaction.set(build.ref_name, commit);
                    report.created.push(build.account_id);
                }
                BuildOutcome::Unchanged { .. } => report.unchanged.push(build.account_id),
            }
            for entry in build.external_ids {
                if let Some((previous, _)) = ledger_updates.get(&entry.name) {
                    if *previous != build.account_id {
                        tracing::warn!(
                            entry = %entry.name,
                            previous = %previous,
                            account = %build.account_id,
                            "external id claimed by more than one account; keeping the later one"
                        );
                    }
                }
                ledger_updates.insert(entry.name.clone(), (build.account_id, entry));
            }
        }

        *failed_at = None;
        let existing_ledger = self.repo.resolve(EXTERNAL_IDS_REF)?;
        let base = match &existing_ledger {
            Some(ledger) => self.repo.read_tree(&ledger.commit.tree)?,
            None => Tree::empty(),
        };

        let mut updates: Vec<TreeEntry> = ledger_updates
            .into_values()
            .map(|(_, entry)| entry)
            .collect();
        if self.options.prune_external_ids {
            let fetched: BTreeSet<AccountId> = infos.iter().map(AccountInfo::id).collect();
            let produced: HashSet<&str> = updates.iter().map(|e| e.name.as_str()).collect();
            let stale = self.stale_entries(&base, &fetched, &produced)?;
            report.pruned = stale.clone();
            updates.extend(stale.into_iter().map(TreeEntry::deleted));
        }
        sort_updates(&mut updates);

        report.ledger = builder.build_ledger(existing_ledger.as_ref(), &base, &updates)?;
        if let Some(BuildOutcome::Created { commit, .. }) = report.ledger {
            transaction.set(EXTERNAL_IDS_REF, commit);
        }
        Ok(transaction)
    }

    /// Ledger entries owned by a fetched account that this run did not
    /// produce. Entries whose blob cannot be read as an external id are
    /// kept.
    fn stale_entries(
        &self,
        base: &Tree,
        fetched: &BTreeSet<AccountId>,
        produced: &HashSet<&str>,
    ) -> SyncResult<Vec<String>> {
        let mut stale = Vec::new();
        for entry in &base.entries {
            if produced.contains(entry.name.as_str()) {
                continue;
            }
            let data = self.repo.read_blob(&entry.object_id)?;
            let owner = std::str::from_utf8(&data)
                .ok()
                .and_then(|text| ConfigFile::parse(text).ok())
                .and_then(|config| external_id_owner(&config));
            match owner {
                Some((key, owner)) if fetched.contains(&owner) => {
                    tracing::info!(account = %owner, key = %key, "pruning external id");
                    stale.push(entry.name.clone());
                }
                Some(_) => {}
                None => tracing::warn!(entry = %entry.name, "unreadable ledger entry, keeping it"),
            }
        }
        Ok(stale)
    }
}
