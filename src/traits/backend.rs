//! Thread store and scoring seam used for post-stream reconciliation.

use async_trait::async_trait;

use crate::error::ReconcileError;
use crate::models::{StoredMessage, ThreadMeta};

/// Durable thread store plus the downstream scoring service.
///
/// Called by the session controller after a message is finalized, in order:
/// thread metadata (only when the request carried no thread id), message
/// reload, recommendation scoring.
#[async_trait]
pub trait ThreadBackend: Send + Sync {
    /// Fetch metadata for `thread_id`, or create a thread when it is `None`.
    ///
    /// `thread_id` is whatever the stream reported; `title_hint` is derived
    /// from the query.
    async fn create_or_fetch_thread(
        &self,
        account_id: &str,
        thread_id: Option<&str>,
        title_hint: &str,
    ) -> Result<ThreadMeta, ReconcileError>;

    /// Reload the durable messages of a thread.
    async fn load_thread_messages(
        &self,
        thread_id: &str,
    ) -> Result<Vec<StoredMessage>, ReconcileError>;

    /// Kick off a recommendation scoring pass for one answer.
    async fn score_recommendations(
        &self,
        thread_id: &str,
        message_id: &str,
    ) -> Result<(), ReconcileError>;
}
