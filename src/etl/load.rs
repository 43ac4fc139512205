//! Loader trait for loading data to destinations

use eyre::Result;

/// Loader trait for appending items to a destination
///
/// Implementors define how items reach a durable sink: an NDJSON file, an
/// in-memory buffer in tests. Items must be written in the order given.
///
/// # Example
/// ```no_run
/// use jira_harvest::etl::Loader;
/// use eyre::Result;
///
/// struct CountingLoader {
///     seen: usize,
/// }
///
/// impl Loader for CountingLoader {
///     type Item = String;
///
///     async fn load(&mut self, items: Vec<Self::Item>) -> Result<usize> {
///         self.seen += items.len();
///         Ok(items.len())
///     }
///
///     async fn flush(&mut self) -> Result<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait Loader: Send {
    /// The type of items to load
    type Item: Send;

    /// Append items to the destination
    ///
    /// Returns the number of items actually written, which may be lower than
    /// `items.len()` for a loader that skips duplicates
    ///
    /// # Errors
    /// Returns an error if writing fails
    fn load(
        &mut self,
        items: Vec<Self::Item>,
    ) -> impl std::future::Future<Output = Result<usize>> + Send;

    /// Make everything loaded so far durable
    ///
    /// # Errors
    /// Returns an error if the destination cannot be flushed
    fn flush(&mut self) -> impl std::future::Future<Output = Result<()>> + Send;
}
