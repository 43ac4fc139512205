//! Jira issue records as returned by the search API
//!
//! Every field is optional. Accessors apply the defaults used when building
//! training examples.

use crate::error::TransformError;
use serde::Deserialize;
use serde_json::Value;

pub const NO_TITLE: &str = "No title provided.";
pub const NO_DESCRIPTION: &str = "No description provided.";
pub const UNKNOWN: &str = "Unknown";

/// A Jira issue with a key and a non-empty `fields` payload
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub key: String,
    pub fields: IssueFields,
}

impl Issue {
    /// Parse a raw search result
    ///
    /// Returns `Ok(None)` when the issue carries no `fields` payload at all,
    /// which is a skip rather than an error.
    ///
    /// # Errors
    /// - [`TransformError::MissingKey`] when fields are present but the key is not
    /// - [`TransformError::Malformed`] when a field has an unexpected shape
    pub fn parse(raw: &Value) -> Result<Option<Self>, TransformError> {
        let fields = match raw.get("fields") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(map)) if map.is_empty() => return Ok(None),
            Some(fields) => fields,
        };

        let key = raw
            .get("key")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .ok_or(TransformError::MissingKey)?
            .to_string();

        let fields = IssueFields::deserialize(fields).map_err(|e| TransformError::Malformed {
            key: key.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(Self { key, fields }))
    }
}

/// Object with a `name`, like `status` and `priority`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Named {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct User {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectRef {
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Comment {
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CommentPage {
    pub comments: Option<Vec<Option<Comment>>>,
}

/// The subset of issue fields used for training examples
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IssueFields {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub status: Option<Named>,
    pub priority: Option<Named>,
    pub reporter: Option<User>,
    pub project: Option<ProjectRef>,
    // Not used by any example, so any JSON shape is accepted
    pub created: Option<Value>,
    pub updated: Option<Value>,
    pub labels: Option<Value>,
    pub comment: Option<CommentPage>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

impl IssueFields {
    pub fn title(&self) -> &str {
        non_empty(self.summary.as_ref()).unwrap_or(NO_TITLE)
    }

    pub fn description(&self) -> &str {
        non_empty(self.description.as_ref()).unwrap_or(NO_DESCRIPTION)
    }

    pub fn status(&self) -> &str {
        non_empty(self.status.as_ref().and_then(|s| s.name.as_ref())).unwrap_or(UNKNOWN)
    }

    pub fn priority(&self) -> &str {
        non_empty(self.priority.as_ref().and_then(|p| p.name.as_ref())).unwrap_or(UNKNOWN)
    }

    pub fn reporter(&self) -> &str {
        non_empty(self.reporter.as_ref().and_then(|r| r.display_name.as_ref())).unwrap_or(UNKNOWN)
    }

    pub fn project(&self) -> &str {
        non_empty(self.project.as_ref().and_then(|p| p.key.as_ref())).unwrap_or(UNKNOWN)
    }

    /// String labels, ignoring anything else in the list
    pub fn labels(&self) -> Vec<&str> {
        self.labels
            .as_ref()
            .and_then(Value::as_array)
            .map(|labels| labels.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Comment bodies in order, without empty ones
    pub fn comment_bodies(&self) -> Vec<&str> {
        self.comment
            .as_ref()
            .and_then(|c| c.comments.as_ref())
            .map(|comments| {
                comments
                    .iter()
                    .flatten()
                    .filter_map(|c| non_empty(c.body.as_ref()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
