//! Periodic transcript summarization.

use async_trait::async_trait;

use crate::transcript::Speaker;

/// One-shot summarizer over the ordered transcript.
///
/// Implementations must never fail: any backend error is reported as an
/// empty summary, which the session treats as "nothing available this
/// cycle" and retries on a later poll.
#[async_trait]
pub trait SummaryService: Send + Sync {
    async fn summarize(&self, transcript: &[(Speaker, String)]) -> String;
}

/// Placeholder for deployments without a summarizer configured.
pub struct NoSummary;

#[async_trait]
impl SummaryService for NoSummary {
    async fn summarize(&self, _transcript: &[(Speaker, String)]) -> String {
        String::new()
    }
}
