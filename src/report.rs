use chrono::{DateTime, Utc};

use crate::models::{CollectionReport, RepositoryRecord};

/// Formats an average resolution time such as `1d 2h 3m 4s`.
pub fn format_resolution_time(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return "N/A".to_string();
    };
    if seconds < 0.0 {
        return "Invalid Data".to_string();
    }
    if seconds.abs() < 0.001 {
        return "No Closed Issues".to_string();
    }

    let days = (seconds / 86_400.0).floor();
    let rem = seconds - days * 86_400.0;
    let hours = (rem / 3_600.0).floor();
    let rem = rem - hours * 3_600.0;
    let minutes = (rem / 60.0).floor();
    let secs = rem - minutes * 60.0;

    let mut parts = Vec::new();
    if days >= 1.0 {
        parts.push(format!("{}d", days as u64));
    }
    if hours >= 1.0 {
        parts.push(format!("{}h", hours as u64));
    }
    if minutes >= 1.0 {
        parts.push(format!("{}m", minutes as u64));
    }
    if secs > 0.1 || parts.is_empty() {
        if seconds < 3_600.0 {
            parts.push(format!("{:.1}s", secs));
        } else {
            parts.push(format!("{}s", secs as u64));
        }
    }

    parts.join(" ")
}

/// Relative description of `timestamp` as seen from `now`.
pub fn humanize_since(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = now.signed_duration_since(timestamp);
    let seconds = diff.num_seconds();
    let days = diff.num_days();

    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3_600 {
        format!("{} minutes ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{} hours ago", seconds / 3_600)
    } else if days == 1 {
        "yesterday".to_string()
    } else if days < 7 {
        format!("{} days ago", days)
    } else if days < 30 {
        format!("{} weeks ago", days / 7)
    } else if days < 365 {
        format!("{} months ago", days / 30)
    } else {
        format!("{} years ago", days / 365)
    }
}

fn count(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn format_row(repo: &RepositoryRecord, now: DateTime<Utc>) -> String {
    let updated = repo
        .last_pushed_at
        .map(|ts| humanize_since(ts, now))
        .unwrap_or_else(|| "Unknown".to_string());
    format!(
        "  {:<30} stars: {:>6}  forks: {:>5}  commits: {:>7}  contributors: {:>5}  closed issues: {:>6}  updated: {:<14}  avg resolution: {}\n",
        repo.name,
        repo.stars,
        repo.forks,
        count(repo.commit_count),
        count(repo.contributor_count),
        count(repo.closed_issue_count),
        updated,
        format_resolution_time(repo.avg_resolution_seconds)
    )
}

pub fn format_text(report: &CollectionReport) -> String {
    let now = Utc::now();
    let mut output = String::new();

    output.push_str(&format!(
        "\n=== Repository Statistics: {} ===\n\n",
        report.owner
    ));
    output.push_str(&format!("Repositories: {}\n", report.repository_count()));
    output.push_str(&format!("Total stars: {}\n", report.total_stars));
    output.push_str(&format!("Total forks: {}\n", report.total_forks));
    let top: Vec<_> = report.top_repositories(10).map(|r| r.name.as_str()).collect();
    if !top.is_empty() {
        output.push_str(&format!("Top repositories: {}\n", top.join(", ")));
    }
    output.push('\n');

    for repo in &report.repositories {
        output.push_str(&format_row(repo, now));
    }

    let failed: Vec<_> = report.failed_details().collect();
    if !failed.is_empty() {
        output.push_str("\nDetails unavailable:\n");
        for (name, reason) in failed {
            output.push_str(&format!("  - {}: {}\n", name, reason));
        }
    }

    output.push_str(&format!(
        "\nFetched on: {}\n",
        report.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    output
}
