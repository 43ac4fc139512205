//! Jira API client and retry policy.
//!
//! This module provides the [`JiraClient`] page extractor along with the
//! [`RetryPolicy`] it applies to transient failures.

mod jira;
mod retry;

pub use jira::JiraClient;
pub use retry::RetryPolicy;
