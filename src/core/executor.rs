//! Work execution traits and runtime abstraction.

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{WorkContext, WorkError};

/// Marker trait for work results.
///
/// Results are shared between every holder of a work handle and may be served
/// again from a result cache, so they must be cheap to clone and thread-safe.
pub trait WorkOutput: Clone + Send + Sync + 'static {}

/// Blanket implementation: any type meeting the requirements is a `WorkOutput`.
impl<T> WorkOutput for T where T: Clone + Send + Sync + 'static {}

/// A unit of asynchronous work supplied by the host.
///
/// The hub never looks inside the body: it only starts it, observes the
/// progress it reports through [`WorkContext`], and records the outcome.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_work_hub::core::{Work, WorkContext, WorkError};
///
/// struct FetchTile {
///     url: String,
/// }
///
/// #[async_trait]
/// impl Work for FetchTile {
///     type Output = Vec<u8>;
///
///     fn key(&self) -> Option<String> {
///         Some(self.url.clone())
///     }
///
///     async fn execute(&self, ctx: &WorkContext) -> Result<Vec<u8>, WorkError> {
///         ctx.set_progress(0.5);
///         Ok(download(&self.url).await?)
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Value produced on success. Shared between every holder of the handle.
    type Output: WorkOutput;

    /// Identity used for deduplication and result reuse.
    ///
    /// `None` gives the work a random key, so it is never merged with others.
    fn key(&self) -> Option<String> {
        None
    }

    /// Run the body once.
    ///
    /// May be called again for the same instance when a hub retries a failed
    /// attempt, so implementations must tolerate re-execution.
    async fn execute(&self, ctx: &WorkContext) -> Result<Self::Output, WorkError>;
}

/// Abstraction for spawning work execution on a runtime.
pub trait Spawn: Send + Sync {
    /// Run the future in the background to completion.
    fn spawn(&self, fut: BoxFuture<'static, ()>);
}
