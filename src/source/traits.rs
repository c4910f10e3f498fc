//! The fetch engine capability consumed by the worker

use crate::types::ProgressSnapshot;
use async_trait::async_trait;

/// A fetch engine that exposes pollable progress
///
/// Both fetch entry points run until the fetch finishes and may fail. They are
/// never called concurrently with each other: the worker runs one job at a time.
/// [`snapshot`](ProgressSource::snapshot) is called from a separate task while a
/// fetch is in flight, so implementations must keep it cheap and non-blocking.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use fetch_queue::source::ProgressSource;
/// use fetch_queue::ProgressSnapshot;
///
/// struct Instant;
///
/// #[async_trait]
/// impl ProgressSource for Instant {
///     async fn fetch_single(&self, _identifier: &str) -> fetch_queue::Result<()> {
///         Ok(())
///     }
///
///     async fn fetch_collection(&self, _identifier: &str) -> fetch_queue::Result<()> {
///         Ok(())
///     }
///
///     fn snapshot(&self) -> fetch_queue::Result<ProgressSnapshot> {
///         Ok(ProgressSnapshot::default())
///     }
///
///     fn name(&self) -> &'static str {
///         "instant"
///     }
/// }
/// ```
#[async_trait]
pub trait ProgressSource: Send + Sync {
    /// Fetch a single item by its short identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails. Its `Display` text becomes the reason
    /// of the job's `Failed` event.
    async fn fetch_single(&self, identifier: &str) -> crate::Result<()>;

    /// Fetch every item of a collection
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch fails. Its `Display` text becomes the reason
    /// of the job's `Failed` event.
    async fn fetch_collection(&self, identifier: &str) -> crate::Result<()>;

    /// Best-effort progress of the fetch in flight
    ///
    /// Unknown values are reported as zeros and an empty status. An `Err` is
    /// treated as a transient poll failure: the caller skips this sample.
    fn snapshot(&self) -> crate::Result<ProgressSnapshot>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
