//! Page extractor trait for paginated sources

use crate::error::FetchError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One bounded batch of raw records plus the collection's total size
///
/// Records stay as raw JSON so a single malformed record is rejected by the
/// transformer rather than failing the whole page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Page {
    /// Authoritative record count of the collection
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,

    /// Records in API order
    #[serde(default, rename = "issues", deserialize_with = "null_as_default")]
    pub records: Vec<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Page {
    pub fn new(total: u64, records: Vec<Value>) -> Self {
        Self { total, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Extractor for sources that serve a collection one page at a time
///
/// Implementors define how to fetch the page of `collection` that starts at
/// `offset` and holds at most `limit` records. Retrying transient failures is
/// the implementor's job; whatever error comes back is final for that
/// attempt.
///
/// # Example
/// ```no_run
/// use jira_harvest::error::FetchError;
/// use jira_harvest::etl::{Page, PageExtractor};
///
/// struct EmptySource;
///
/// impl PageExtractor for EmptySource {
///     async fn extract_page(
///         &self,
///         _collection: &str,
///         _offset: u64,
///         _limit: u64,
///     ) -> Result<Page, FetchError> {
///         Ok(Page::default())
///     }
/// }
/// ```
pub trait PageExtractor: Send + Sync {
    /// Fetch one page
    ///
    /// # Errors
    /// Returns a classified [`FetchError`] when the page could not be fetched
    fn extract_page(
        &self,
        collection: &str,
        offset: u64,
        limit: u64,
    ) -> impl std::future::Future<Output = Result<Page, FetchError>> + Send;
}
