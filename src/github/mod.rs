pub mod client;
pub mod clock;
pub mod executor;
pub mod paginator;
pub mod rate_limiter;
pub mod retry;
pub mod transport;

pub use client::{ApiSession, Credentials, GitHubClient};
pub use clock::{Clock, SystemClock};
pub use executor::{ApiResponse, FailureReason, RequestExecutor, RequestOutcome};
pub use paginator::{estimate_count, fallback_count};
pub use rate_limiter::{RateLimitSignal, RateLimiter};
pub use retry::RetryPolicy;
pub use transport::{ReqwestTransport, Transport};
