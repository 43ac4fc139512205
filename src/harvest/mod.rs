//! Jira harvesting
//!
//! Turns Jira issues into training examples and drives the resumable,
//! project-by-project harvest.

mod orchestrator;
pub mod record;
mod training;

pub use orchestrator::{HarvestReport, JiraHarvester, Orchestrator};
pub use record::{Issue, IssueFields};
pub use training::{DerivedTask, ExampleKind, IssueTransformer, TrainingExample};
