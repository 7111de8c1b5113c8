use async_trait::async_trait;

use crate::{domain::PageInfo, Result};

/// Outbound transport for serialized Send API bodies.
///
/// The adapter never talks to the network itself; the embedding application owns
/// the HTTP client, access token and retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one JSON body and return the raw response text.
    async fn send(&self, body: String) -> Result<String>;
}

/// Source of the page's own identity (id + name).
///
/// Called lazily, and at most once per `Page` after a successful fetch.
pub trait PageInfoFetcher: Send + Sync {
    fn fetch_page_info(&self) -> Result<PageInfo>;
}
