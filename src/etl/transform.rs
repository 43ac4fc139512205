//! Transformer trait for fan-out data transformation

use crate::error::TransformError;

/// Transformer that turns one input item into zero or more output items
///
/// Implementors define how a single source record fans out into derived
/// records. Each call is independent: no output depends on an earlier call.
///
/// # Example
/// ```
/// use jira_harvest::error::TransformError;
/// use jira_harvest::etl::Transformer;
///
/// struct WordSplitter;
///
/// impl Transformer for WordSplitter {
///     type Input = String;
///     type Output = String;
///
///     fn transform(&self, input: &Self::Input) -> Result<Vec<Self::Output>, TransformError> {
///         Ok(input.split_whitespace().map(str::to_string).collect())
///     }
/// }
///
/// let words = WordSplitter.transform(&"a b".to_string()).unwrap();
/// assert_eq!(words, vec!["a", "b"]);
/// ```
pub trait Transformer: Send + Sync {
    /// Input item type
    type Input: Send;

    /// Output item type after transformation
    type Output: Send;

    /// Transform a single item into its derived items
    ///
    /// An empty vector means the item was skipped on purpose.
    ///
    /// # Errors
    /// Returns a [`TransformError`] when the item is malformed. Callers skip
    /// that item and carry on with its siblings.
    fn transform(&self, input: &Self::Input) -> Result<Vec<Self::Output>, TransformError>;
}

