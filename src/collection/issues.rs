use std::time::Duration;

use crate::github::executor::RequestOutcome;
use crate::github::paginator::has_next;
use crate::github::ApiSession;
use crate::models::{IssueItem, IssueResolutionSample, ResolutionStats};

pub const ISSUE_PAGE_SIZE: u32 = 100;

/// Computes resolution-time statistics over a repository's closed issues.
pub struct IssueResolutionAggregator {
    per_page: u32,
    page_delay: Duration,
}

impl IssueResolutionAggregator {
    pub fn new() -> Self {
        Self {
            per_page: ISSUE_PAGE_SIZE,
            page_delay: Duration::from_millis(100),
        }
    }

    /// Walks every closed-issue page.
    ///
    /// Returns `None` only if the very first page could not be read; a later
    /// failure yields whatever was accumulated before it.
    pub async fn aggregate(&self, session: &ApiSession, full_name: &str) -> Option<ResolutionStats> {
        let mut stats = ResolutionStats::default();
        let mut pages_read = 0u32;
        let mut page = 1u32;

        tracing::info!("Calculating avg issue resolution time for {}", full_name);

        loop {
            let outcome = match session.closed_issues_page(full_name, page, self.per_page).await {
                Ok((_, outcome)) => outcome,
                Err(e) => {
                    tracing::warn!("Could not build issues request for {}: {}", full_name, e);
                    return (pages_read > 0).then_some(stats);
                }
            };

            let response = match outcome {
                RequestOutcome::Success(response) => response,
                other => {
                    tracing::warn!(
                        "Could not retrieve closed issues page {} for {}: {:?}. Stopping calculation",
                        page,
                        full_name,
                        other
                    );
                    return (pages_read > 0).then_some(stats);
                }
            };
            pages_read += 1;

            let Some(items) = response.body.as_array() else {
                tracing::error!(
                    "Unexpected JSON response type for issues of {} (page {})",
                    full_name,
                    page
                );
                return Some(stats);
            };

            let before = stats.sample_count;
            for item in items {
                let issue: IssueItem = match serde_json::from_value(item.clone()) {
                    Ok(issue) => issue,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable issue in {}: {}", full_name, e);
                        continue;
                    }
                };
                if issue.is_pull_request() {
                    continue;
                }
                let (Some(created_at), Some(closed_at)) = (issue.created_at, issue.closed_at) else {
                    continue;
                };
                match IssueResolutionSample::new(created_at, closed_at) {
                    Some(sample) => stats.record(sample),
                    None => tracing::info!(
                        "Issue #{} in {} closed at {} before creation at {}. Skipping",
                        issue.number,
                        full_name,
                        closed_at,
                        created_at
                    ),
                }
            }

            tracing::debug!(
                "Processed page {} for {}, found {} items, {} valid closed issues",
                page,
                full_name,
                items.len(),
                stats.sample_count - before
            );

            if !has_next(&response.headers) {
                break;
            }
            page += 1;
            session.client().clock().sleep(self.page_delay).await;
        }

        if stats.sample_count > 0 {
            tracing::info!(
                "Average resolution time for {}: {:.2}s over {} issues",
                full_name,
                stats.average(),
                stats.sample_count
            );
        } else {
            tracing::info!("No valid closed issues found for {}", full_name);
        }

        Some(stats)
    }
}

impl Default for IssueResolutionAggregator {
    fn default() -> Self {
        Self::new()
    }
}
