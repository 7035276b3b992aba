//! The aus sync pipeline.
//!
//! A run fetches account records from an [`AccountSource`](aus_remote::AccountSource),
//! turns each into a commit on its own reference with [`RecordCommitBuilder`],
//! folds every external identity into the shared ledger tree, and publishes
//! all changed references in one [`RefTransaction`](aus_refs::RefTransaction).
//!
//! ```no_run
//! # async fn demo() -> aus_sync::SyncResult<()> {
//! use aus_remote::InMemoryAccountSource;
//! use aus_sync::{Repository, SyncOptions, SyncOrchestrator};
//! use aus_types::AccountId;
//!
//! let repo = Repository::open("all-users")?;
//! let source = InMemoryAccountSource::new();
//! let report = SyncOrchestrator::new(&repo, &source, SyncOptions::default())
//!     .run(&[AccountId::new(1000096)])
//!     .await?;
//! println!("{} account(s) updated", report.created.len());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod gitconfig;
pub mod orchestrator;
pub mod repository;

pub use builder::{
    account_config, external_id_config, external_id_owner, AccountBuild, BuildOutcome,
    RecordCommitBuilder, ACCOUNT_COMMIT_MESSAGE, ACCOUNT_CONFIG_FILE, LEDGER_COMMIT_MESSAGE,
};
pub use config::{Identity, RemoteConfig, SyncConfig, CONFIG_FILE_NAME};
pub use error::{SyncError, SyncResult};
pub use gitconfig::{ConfigError, ConfigFile, Section};
pub use orchestrator::{SyncOptions, SyncOrchestrator, SyncReport, PROGRESS_INTERVAL};
pub use repository::{CommitRef, Repository};
