//! Integration tests for the pagination driver
//!
//! These run the driver with an in-memory page source against the real
//! NDJSON writer and checkpoint file.

use eyre::Result;
use jira_harvest::error::{FetchError, HarvestError};
use jira_harvest::etl::{DriverSettings, Page, PageExtractor, PaginationDriver};
use jira_harvest::harvest::{IssueTransformer, Orchestrator, TrainingExample};
use jira_harvest::storage::{
    Checkpoint, CheckpointStore, FileCheckpointStore, NdjsonReader, NdjsonWriter,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

/// Serves `size` issues per project, optionally failing at one offset
struct MockIssues {
    sizes: HashMap<String, u64>,
    fail_at: Option<(String, u64)>,
}

impl MockIssues {
    fn new(sizes: &[(&str, u64)]) -> Self {
        Self {
            sizes: sizes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            fail_at: None,
        }
    }

    fn failing_at(mut self, project: &str, offset: u64) -> Self {
        self.fail_at = Some((project.to_string(), offset));
        self
    }
}

impl PageExtractor for MockIssues {
    async fn extract_page(
        &self,
        collection: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Page, FetchError> {
        if let Some((project, at)) = &self.fail_at {
            if project == collection && *at == offset {
                return Err(FetchError::Unexpected("truncated body".into()));
            }
        }
        let size = self.sizes.get(collection).copied().unwrap_or_default();
        let end = (offset + limit).min(size);
        let issues = (offset..end)
            .map(|n| {
                json!({
                    "key": format!("{}-{}", collection, n + 1),
                    "fields": {
                        "summary": format!("Issue {}", n + 1),
                        "project": {"key": collection}
                    }
                })
            })
            .collect();
        Ok(Page::new(size, issues))
    }
}

fn settings(page_size: u64) -> DriverSettings {
    DriverSettings {
        page_size,
        max_page_failures: 1,
        failure_cooldown: Duration::ZERO,
    }
}

fn harvester(
    source: MockIssues,
    temp: &TempDir,
    projects: &[&str],
) -> Result<Orchestrator<MockIssues, IssueTransformer, NdjsonWriter<TrainingExample>, FileCheckpointStore>>
{
    let writer = NdjsonWriter::open(temp.path().join("corpus.jsonl"))?;
    let store = FileCheckpointStore::new(temp.path().join("state.json"));
    let driver =
        PaginationDriver::new(source, IssueTransformer, writer, store).with_settings(settings(2));
    Ok(Orchestrator::new(
        projects.iter().map(|p| p.to_string()).collect(),
        driver,
    ))
}

fn summarize_ids(temp: &TempDir) -> Result<Vec<String>> {
    Ok(NdjsonReader::new(temp.path().join("corpus.jsonl"))
        .read()?
        .iter()
        .filter_map(|v: &Value| v["id"].as_str())
        .filter(|id| id.ends_with("_summarize"))
        .map(str::to_string)
        .collect())
}

#[tokio::test]
async fn test_failure_then_resume_keeps_output_contiguous() -> Result<()> {
    let temp = TempDir::new()?;
    let sizes = [("A", 5), ("B", 3)];

    // First run dies on B's second page
    let mut first = harvester(MockIssues::new(&sizes).failing_at("B", 2), &temp, &["A", "B"])?;
    let err = first.resume().await.unwrap_err();
    assert!(matches!(err, HarvestError::Exhausted { offset: 2, attempts: 1, .. }));
    drop(first);

    let state = FileCheckpointStore::new(temp.path().join("state.json"));
    assert_eq!(state.load()?, Checkpoint::new(1, 2));

    // Second run picks up at B offset 2
    let mut second = harvester(MockIssues::new(&sizes), &temp, &["A", "B"])?;
    let report = second.resume().await?;
    assert_eq!(report.start, Checkpoint::new(1, 2));
    assert_eq!(report.records_fetched(), 1);
    drop(second);

    assert_eq!(
        summarize_ids(&temp)?,
        vec![
            "A-1_summarize",
            "A-2_summarize",
            "A-3_summarize",
            "A-4_summarize",
            "A-5_summarize",
            "B-1_summarize",
            "B-2_summarize",
            "B-3_summarize",
        ]
    );
    assert_eq!(state.load()?, Checkpoint::new(2, 0));
    Ok(())
}

#[tokio::test]
async fn test_finished_harvest_is_a_no_op() -> Result<()> {
    let temp = TempDir::new()?;
    let sizes = [("A", 3)];

    harvester(MockIssues::new(&sizes), &temp, &["A"])?.resume().await?;
    let lines = NdjsonReader::new(temp.path().join("corpus.jsonl")).read()?.len();
    assert_eq!(lines, 12);

    let report = harvester(MockIssues::new(&sizes), &temp, &["A"])?.resume().await?;
    assert!(report.collections.is_empty());
    assert_eq!(
        NdjsonReader::new(temp.path().join("corpus.jsonl")).read()?.len(),
        lines
    );
    Ok(())
}

#[tokio::test]
async fn test_examples_carry_project_field() -> Result<()> {
    let temp = TempDir::new()?;
    harvester(MockIssues::new(&[("HIVE", 1)]), &temp, &["HIVE"])?
        .resume()
        .await?;

    let lines = NdjsonReader::new(temp.path().join("corpus.jsonl")).read()?;
    assert_eq!(lines.len(), 4);
    for line in &lines {
        assert_eq!(line["project"], "HIVE");
    }
    assert_eq!(lines[1]["derived_task"], "classification");
    assert_eq!(lines[3]["instruction"], "Who reported the issue HIVE-1?");
    assert_eq!(lines[3]["output"], "Unknown");
    Ok(())
}
