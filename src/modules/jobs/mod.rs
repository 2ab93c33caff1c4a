/// Destination job resolution
///
/// Writes to the destination are processed asynchronously. This module turns a
/// `JobHandle` into the `ResolvedLocation` of the created record.
///
/// Architecture:
/// - Domain: job handle, poll policy table, rejection classification
/// - Resolver: fixed-delay polling loop plus the four-hop link traversal
pub mod domain;
pub mod resolver;

// Re-exports for easy access
pub use domain::{
    classify_rejection, JobHandle, JobState, PollPolicy, PollPolicyTable, ResolvedLocation,
};
pub use resolver::AsyncJobResolver;
