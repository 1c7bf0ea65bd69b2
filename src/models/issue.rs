use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The subset of a closed-issue listing item we need.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueItem {
    #[serde(default)]
    pub number: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Present only when the item is a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl IssueItem {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IssueResolutionSample {
    created_at: DateTime<Utc>,
    closed_at: DateTime<Utc>,
}

impl IssueResolutionSample {
    /// Returns `None` when the issue was closed before it was created.
    pub fn new(created_at: DateTime<Utc>, closed_at: DateTime<Utc>) -> Option<Self> {
        (closed_at >= created_at).then_some(Self {
            created_at,
            closed_at,
        })
    }

    pub fn seconds(&self) -> f64 {
        (self.closed_at - self.created_at).num_milliseconds() as f64 / 1000.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub total_seconds: f64,
    pub sample_count: u64,
}

impl ResolutionStats {
    pub fn record(&mut self, sample: IssueResolutionSample) {
        self.total_seconds += sample.seconds();
        self.sample_count += 1;
    }

    /// Mean resolution time, `0.0` when there were no closed issues.
    pub fn average(&self) -> f64 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.total_seconds / self.sample_count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_negative_samples_are_rejected() {
        let created = Utc::now();
        assert!(IssueResolutionSample::new(created, created - Duration::seconds(1)).is_none());
        let same = IssueResolutionSample::new(created, created).unwrap();
        assert_eq!(same.seconds(), 0.0);
    }

    #[test]
    fn test_average() {
        let created = Utc::now();
        let mut stats = ResolutionStats::default();
        assert_eq!(stats.average(), 0.0);

        stats.record(IssueResolutionSample::new(created, created + Duration::hours(1)).unwrap());
        stats.record(IssueResolutionSample::new(created, created + Duration::hours(2)).unwrap());
        assert_eq!(stats.sample_count, 2);
        assert_eq!(stats.average(), 5400.0);
    }
}
