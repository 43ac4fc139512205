//! Training examples derived from Jira issues
//!
//! Each issue fans out into four independent instruction-tuning examples,
//! always in the order of [`ExampleKind::ALL`].

use super::record::{Issue, IssueFields};
use crate::error::TransformError;
use crate::etl::Transformer;
use crate::storage::Identified;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Task family of a training example
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedTask {
    Summarization,
    Classification,
    QuestionAnswering,
}

/// One line of the output corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    /// `{issue key}_{kind suffix}`, stable across runs
    pub id: String,
    #[serde(rename = "project", alias = "collection")]
    pub collection: String,
    pub derived_task: DerivedTask,
    pub instruction: String,
    pub input: String,
    pub output: String,
}

impl Identified for TrainingExample {
    fn id(&self) -> &str {
        &self.id
    }
}

/// The examples built from every issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleKind {
    Summarize,
    ClassifyPriority,
    ClassifyStatus,
    QaReporter,
}

impl ExampleKind {
    /// Fan-out order
    pub const ALL: [ExampleKind; 4] = [
        Self::Summarize,
        Self::ClassifyPriority,
        Self::ClassifyStatus,
        Self::QaReporter,
    ];

    /// Suffix appended to the issue key to form the example id
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::ClassifyPriority => "classify_priority",
            Self::ClassifyStatus => "classify_status",
            Self::QaReporter => "qa_reporter",
        }
    }

    pub fn task(&self) -> DerivedTask {
        match self {
            Self::Summarize => DerivedTask::Summarization,
            Self::ClassifyPriority | Self::ClassifyStatus => DerivedTask::Classification,
            Self::QaReporter => DerivedTask::QuestionAnswering,
        }
    }

    pub fn example_id(&self, key: &str) -> String {
        format!("{}_{}", key, self.suffix())
    }

    fn instruction(&self, key: &str) -> String {
        match self {
            Self::Summarize => {
                "Summarize the following bug report and all its comments into a one-line title."
                    .to_string()
            }
            Self::ClassifyPriority => {
                "Classify the priority of the following issue. Respond with only the priority level."
                    .to_string()
            }
            Self::ClassifyStatus => "What is the current status of this issue?".to_string(),
            Self::QaReporter => format!("Who reported the issue {}?", key),
        }
    }

    fn input(&self, fields: &IssueFields) -> String {
        match self {
            Self::Summarize => format!(
                "{}\n\n{}",
                fields.description(),
                fields.comment_bodies().join("\n\n")
            ),
            Self::ClassifyPriority | Self::ClassifyStatus => format!(
                "Title: {}\n\nDescription: {}",
                fields.title(),
                fields.description()
            ),
            Self::QaReporter => String::new(),
        }
    }

    fn output(&self, fields: &IssueFields) -> String {
        match self {
            Self::Summarize => fields.title(),
            Self::ClassifyPriority => fields.priority(),
            Self::ClassifyStatus => fields.status(),
            Self::QaReporter => fields.reporter(),
        }
        .to_string()
    }

    /// Build this kind's example for an issue
    pub fn build(&self, issue: &Issue) -> TrainingExample {
        TrainingExample {
            id: self.example_id(&issue.key),
            collection: issue.fields.project().to_string(),
            derived_task: self.task(),
            instruction: self.instruction(&issue.key),
            input: self.input(&issue.fields),
            output: self.output(&issue.fields),
        }
    }
}

/// Transformer from raw search results to training examples
///
/// # Example
/// ```
/// use jira_harvest::etl::Transformer;
/// use jira_harvest::harvest::IssueTransformer;
/// use serde_json::json;
///
/// let issue = json!({"key": "SPARK-7", "fields": {"summary": "Fix it"}});
/// let examples = IssueTransformer.transform(&issue).unwrap();
/// assert_eq!(examples.len(), 4);
/// assert_eq!(examples[0].id, "SPARK-7_summarize");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueTransformer;

impl Transformer for IssueTransformer {
    type Input = Value;
    type Output = TrainingExample;

    fn transform(&self, input: &Self::Input) -> Result<Vec<Self::Output>, TransformError> {
        let Some(issue) = Issue::parse(input)? else {
            log::debug!(
                "Issue {} has no fields, skipping",
                input.get("key").and_then(Value::as_str).unwrap_or("<no key>")
            );
            return Ok(Vec::new());
        };

        Ok(ExampleKind::ALL
            .iter()
            .map(|kind| kind.build(&issue))
            .collect())
    }
}
