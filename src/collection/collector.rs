use chrono::Utc;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{StatusCode, Url};

use crate::collection::issues::IssueResolutionAggregator;
use crate::config::CollectorConfig;
use crate::error::{Error, Result};
use crate::github::executor::{ApiResponse, RequestOutcome};
use crate::github::paginator::{count_or_fallback, has_next};
use crate::github::{ApiSession, Credentials, GitHubClient};
use crate::models::{ApiRepository, CollectionReport, RepositoryDetails, RepositoryRecord};

/// Builds one enriched record per repository of an owner.
pub struct RepositoryStatsCollector {
    client: GitHubClient,
    aggregator: IssueResolutionAggregator,
    config: CollectorConfig,
}

#[derive(Clone, Copy)]
enum Probe {
    Commits,
    Contributors,
    ClosedIssues,
}

impl Probe {
    fn label(self) -> &'static str {
        match self {
            Probe::Commits => "commit",
            Probe::Contributors => "contributor",
            Probe::ClosedIssues => "closed issue",
        }
    }
}

impl RepositoryStatsCollector {
    pub fn new(client: GitHubClient, config: CollectorConfig) -> Self {
        Self {
            client,
            aggregator: IssueResolutionAggregator::new(),
            config,
        }
    }

    pub async fn collect(&self, owner: &str, credentials: &Credentials) -> Result<CollectionReport> {
        let session = self.client.session(credentials)?;

        let mut records = self.list_repositories(&session, owner).await?;
        let total_stars: u64 = records.iter().map(|r| r.stars).sum();
        tracing::info!(
            "Fetched basic info for {} repositories. Total stars: {}",
            records.len(),
            total_stars
        );

        self.collect_details(&session, &mut records).await?;

        Ok(CollectionReport::new(owner, Utc::now(), records))
    }

    /// Re-runs the detail pass for the records of `report` that are still pending.
    pub async fn resume(&self, mut report: CollectionReport, credentials: &Credentials) -> Result<CollectionReport> {
        let session = self.client.session(credentials)?;
        self.collect_details(&session, &mut report.repositories).await?;
        Ok(CollectionReport::new(&report.owner, Utc::now(), report.repositories))
    }

    pub async fn list_repositories(&self, session: &ApiSession, owner: &str) -> Result<Vec<RepositoryRecord>> {
        let mut records = Vec::new();
        let mut page = 1u32;

        tracing::info!("Fetching repository list for {}", owner);

        loop {
            let (url, outcome) = session
                .list_repositories_page(owner, page, self.config.list_page_size)
                .await
                .map_err(|e| listing_error(page, e))?;
            let response = outcome.into_result(&url).map_err(|e| listing_error(page, e))?;

            let Some(items) = response.body.as_array() else {
                return Err(listing_error(
                    page,
                    Error::MalformedResponseBody {
                        url: url.to_string(),
                        reason: "expected a JSON array of repositories".to_string(),
                    },
                ));
            };

            tracing::info!("Processing page {} of repositories ({} found)", page, items.len());
            for item in items {
                match serde_json::from_value::<ApiRepository>(item.clone()) {
                    Ok(repo) => records.push(RepositoryRecord::from(repo)),
                    Err(e) => tracing::warn!("Skipping invalid item in repository list: {}", e),
                }
            }

            if !has_next(&response.headers) {
                break;
            }
            page += 1;
            self.client.clock().sleep(self.config.list_page_delay).await;
        }

        Ok(records)
    }

    /// Fills in counters for every `Pending` record, in listing order, then
    /// sorts by stars. Only an authentication failure aborts the pass; any
    /// other error marks that one record `Failed`.
    pub async fn collect_details(&self, session: &ApiSession, records: &mut [RepositoryRecord]) -> Result<()> {
        let targets: Vec<(usize, String, bool)> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.processed_details())
            .map(|(i, r)| (i, r.full_name.clone(), r.has_issues))
            .collect();

        tracing::info!("Fetching detailed information for {} repositories", targets.len());
        let pb = self.progress_bar(targets.len() as u64);

        let limit = self.config.concurrency_limit.max(1);
        let mut results = stream::iter(targets.iter())
            .map(|(index, full_name, has_issues)| async move {
                let result = self.fetch_details(session, full_name, *has_issues).await;
                self.client.clock().sleep(self.config.repo_delay).await;
                (*index, result)
            })
            .buffered(limit);

        while let Some((index, result)) = results.next().await {
            let record = &mut records[index];
            match result {
                Ok(details) => record.apply(details),
                Err(e) if e.is_run_terminal() => {
                    pb.abandon_with_message("Aborted");
                    return Err(Error::Detail {
                        repository: record.full_name.clone(),
                        source: Box::new(e),
                    });
                }
                Err(e) => {
                    tracing::error!("Could not process details for {}: {}", record.full_name, e);
                    record.mark_failed(e.to_string());
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("Fetched repository details");

        // sort_by is stable, so equal star counts keep listing order
        records.sort_by(|a, b| b.stars.cmp(&a.stars));
        Ok(())
    }

    async fn fetch_details(&self, session: &ApiSession, full_name: &str, has_issues: bool) -> Result<RepositoryDetails> {
        let (url, outcome) = session.commits_probe(full_name).await?;
        let commit_count = probe_count(Probe::Commits, full_name, &url, outcome)?;

        let (url, outcome) = session.contributors_probe(full_name).await?;
        let contributor_count = probe_count(Probe::Contributors, full_name, &url, outcome)?;

        let (avg_resolution_seconds, closed_issue_count) = if has_issues {
            let avg = self
                .aggregator
                .aggregate(session, full_name)
                .await
                .map(|stats| stats.average());
            let (url, outcome) = session.closed_issues_probe(full_name).await?;
            (avg, probe_count(Probe::ClosedIssues, full_name, &url, outcome)?)
        } else {
            tracing::info!("Skipping issue statistics for {} as issues are disabled", full_name);
            (Some(0.0), Some(0))
        };

        Ok(RepositoryDetails {
            commit_count,
            contributor_count,
            closed_issue_count,
            avg_resolution_seconds,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Interprets a `per_page=1` count probe.
///
/// `Ok(None)` means the count is unknown for this repository. A credential
/// failure or a rate limit that outlasted the wait budget is returned as an
/// error.
fn probe_count(probe: Probe, full_name: &str, url: &Url, outcome: RequestOutcome) -> Result<Option<u64>> {
    match outcome {
        RequestOutcome::Success(response) => Ok(Some(success_count(probe, full_name, &response))),
        RequestOutcome::TerminalClientError(StatusCode::CONFLICT) if matches!(probe, Probe::Commits) => {
            tracing::info!("Repository {} is empty (409 on commits). Setting commit count to 0", full_name);
            Ok(Some(0))
        }
        RequestOutcome::TerminalClientError(StatusCode::UNAUTHORIZED) => Err(Error::Authentication(url.to_string())),
        RequestOutcome::RateLimited(wait) => Err(Error::RateLimited(wait.as_secs())),
        other => {
            let err = other.into_result(url).err();
            tracing::warn!(
                "Could not determine {} count for {}: {}",
                probe.label(),
                full_name,
                err.map(|e| e.to_string()).unwrap_or_default()
            );
            Ok(None)
        }
    }
}

fn success_count(probe: Probe, full_name: &str, response: &ApiResponse) -> u64 {
    if response.status == StatusCode::NO_CONTENT && matches!(probe, Probe::Contributors) {
        tracing::info!(
            "Repo {} reported 204 No Content for contributors (may still be processing). Setting count to 0",
            full_name
        );
        return 0;
    }
    count_or_fallback(response, 1)
}

fn listing_error(page: u32, source: Error) -> Error {
    Error::Listing {
        page,
        source: Box::new(source),
    }
}
