pub mod issues;
pub mod collector;

pub use issues::IssueResolutionAggregator;
pub use collector::RepositoryStatsCollector;
