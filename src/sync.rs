//! Sync orchestrator: turns the configured identity list into one snapshot
//!
//! Exactly two concurrent units of work: the repository stream walks every
//! identity, the pull request stream walks the user identities only
//! (organizations are not searchable for PRs). Each stream processes its
//! identities sequentially into a stream-local accumulator; the streams are
//! joined before the snapshot is assembled. Any identity failure aborts the
//! whole sync and no snapshot is written.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{Snapshot, SnapshotStore};
use crate::config::Identity;
use crate::github::{PullRequest, RemoteSource, Repository};

/// Orchestrates a full re-fetch across all configured identities
pub struct SyncEngine {
    source: Arc<dyn RemoteSource>,
}

impl SyncEngine {
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        Self { source }
    }

    /// Fetch everything and assemble a snapshot, without persisting it
    pub async fn run(&self, identities: &[Identity]) -> Result<Snapshot> {
        info!("Starting sync for {} identities", identities.len());

        let repo_stream = async {
            let mut repositories: Vec<Repository> = Vec::new();
            for identity in identities {
                let fetched = self
                    .source
                    .repositories(identity)
                    .await
                    .with_context(|| {
                        format!("failed to fetch repositories for {}", identity.name)
                    })?;
                debug!("{}: {} repositories", identity.name, fetched.len());
                repositories.extend(fetched);
            }
            Ok::<_, anyhow::Error>(repositories)
        };

        let pr_stream = async {
            let mut pull_requests: Vec<PullRequest> = Vec::new();
            for identity in identities.iter().filter(|i| !i.is_org) {
                let fetched = self
                    .source
                    .open_pull_requests(identity)
                    .await
                    .with_context(|| {
                        format!("failed to fetch pull requests for {}", identity.name)
                    })?;
                debug!("{}: {} open pull requests", identity.name, fetched.len());
                pull_requests.extend(fetched);
            }
            Ok::<_, anyhow::Error>(pull_requests)
        };

        let (repositories, pull_requests) = tokio::try_join!(repo_stream, pr_stream)?;

        info!(
            "Sync fetched {} repositories and {} open pull requests",
            repositories.len(),
            pull_requests.len()
        );

        Ok(Snapshot {
            timestamp: Utc::now(),
            repositories,
            pull_requests,
        })
    }

    /// Run a full sync and hand the snapshot to the store
    pub async fn sync(
        &self,
        identities: &[Identity],
        store: &mut SnapshotStore,
    ) -> Result<Snapshot> {
        let snapshot = self.run(identities).await?;

        store
            .save(snapshot.clone())
            .with_context(|| format!("failed to persist snapshot to {:?}", store.path()))?;

        Ok(snapshot)
    }
}
