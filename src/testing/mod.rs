//! Test doubles for the HTTP and time seams.
//!
//! `MockTransport` serves scripted replies per path and `ManualClock`
//! advances virtual time instead of sleeping, so retry and rate-limit
//! behaviour can be asserted without real delays.

mod clock;
mod transport;

pub use clock::ManualClock;
pub use transport::{MockReply, MockTransport};
