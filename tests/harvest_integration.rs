//! Integration tests for the Jira harvest
//!
//! These run the real client, transformer, NDJSON writer and checkpoint file
//! against a mock Jira search endpoint.

use eyre::Result;
use jira_harvest::client::{JiraClient, RetryPolicy};
use jira_harvest::error::HarvestError;
use jira_harvest::etl::PaginationDriver;
use jira_harvest::harvest::{IssueTransformer, JiraHarvester, Orchestrator, TrainingExample};
use jira_harvest::storage::{
    Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, NdjsonReader,
    NdjsonWriter,
};
use jira_harvest::HarvestConfig;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

const SEARCH_PATH: &str = "/rest/api/2/search";

fn issue(key: &str, project: &str) -> Value {
    json!({
        "key": key,
        "fields": {
            "summary": format!("{} title", key),
            "description": format!("{} description", key),
            "status": {"name": "Open"},
            "priority": {"name": "Minor"},
            "reporter": {"displayName": "Reporter"},
            "project": {"key": project},
            "comment": {"comments": [{"body": "first"}]}
        }
    })
}

fn search_response(total: u64, issues: Vec<Value>) -> Value {
    json!({"startAt": 0, "maxResults": 50, "total": total, "issues": issues})
}

fn jql(project: &str) -> String {
    format!("project = {} ORDER BY created ASC", project)
}

/// Mount a successful page for `project` at `start_at`
async fn mount_page(server: &MockServer, project: &str, start_at: u64, body: Value) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("jql", jql(project).as_str()))
        .and(query_param("startAt", start_at.to_string().as_str()))
        .and(query_param("fields", "*all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn test_config(server: &MockServer, dir: &Path, projects: &[&str], page_size: u64) -> HarvestConfig {
    HarvestConfig {
        base_url: format!("{}/rest/api/2", server.uri()),
        projects: projects.iter().map(|p| p.to_string()).collect(),
        page_size,
        output: dir.join("corpus.jsonl"),
        state: dir.join("state.json"),
        request_timeout_secs: 5,
        max_retries: 3,
        backoff_base_ms: 0,
        failure_cooldown_secs: 0,
        max_page_failures: 2,
        ..Default::default()
    }
}

fn read_ids(path: &Path) -> Result<Vec<String>> {
    Ok(NdjsonReader::new(path)
        .read()?
        .into_iter()
        .map(|v| v["id"].as_str().unwrap_or_default().to_string())
        .collect())
}

#[tokio::test]
async fn test_two_record_collection() -> Result<()> {
    let server = MockServer::start().await;
    let temp = TempDir::new()?;
    mount_page(
        &server,
        "X",
        0,
        search_response(2, vec![issue("X-1", "X"), issue("X-2", "X")]),
    )
    .await;

    let config = test_config(&server, temp.path(), &["X"], 50);
    let mut harvester = JiraHarvester::from_config(&config)?;
    let report = harvester.resume().await?;

    assert_eq!(report.records_fetched(), 2);
    assert_eq!(report.examples_written(), 8);
    assert_eq!(
        read_ids(&config.output)?,
        vec![
            "X-1_summarize",
            "X-1_classify_priority",
            "X-1_classify_status",
            "X-1_qa_reporter",
            "X-2_summarize",
            "X-2_classify_priority",
            "X-2_classify_status",
            "X-2_qa_reporter",
        ]
    );

    let lines = NdjsonReader::new(&config.output).read()?;
    let first: TrainingExample = serde_json::from_value(lines[0].clone())?;
    assert_eq!(first.collection, "X");
    assert_eq!(first.input, "X-1 description\n\nfirst");
    assert_eq!(first.output, "X-1 title");

    let checkpoint = FileCheckpointStore::new(&config.state).load()?;
    assert_eq!(checkpoint, Checkpoint::new(1, 0));
    Ok(())
}

#[tokio::test]
async fn test_retries_503_before_first_checkpoint() -> Result<()> {
    let server = MockServer::start().await;
    let temp = TempDir::new()?;

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("startAt", "0"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "X",
        0,
        search_response(4, vec![issue("X-1", "X"), issue("X-2", "X")]),
    )
    .await;
    mount_page(&server, "X", 2, search_response(4, vec![])).await;

    let config = test_config(&server, temp.path(), &["X"], 2);
    let client = JiraClient::try_new(config.url()?, config.request_timeout(), config.retry_policy())?;
    let writer = NdjsonWriter::<TrainingExample>::open(&config.output)?;
    let driver = PaginationDriver::new(client, IssueTransformer, writer, MemoryCheckpointStore::new())
        .with_settings(config.driver_settings());
    let mut orchestrator = Orchestrator::new(config.projects.clone(), driver);

    orchestrator.run(Checkpoint::default()).await?;

    let history = orchestrator.driver().checkpoints().history().to_vec();
    // First write is after the successful fetch and reflects the page size
    assert_eq!(history, vec![Checkpoint::new(0, 2), Checkpoint::new(1, 0)]);
    assert_eq!(read_ids(&config.output)?.len(), 8);
    Ok(())
}

#[tokio::test]
async fn test_resume_from_state_file() -> Result<()> {
    let server = MockServer::start().await;
    let temp = TempDir::new()?;
    // Only B from offset 3 is served; touching A would get a 404
    mount_page(&server, "B", 3, search_response(4, vec![issue("B-4", "B")])).await;

    let config = test_config(&server, temp.path(), &["A", "B"], 10);
    FileCheckpointStore::new(&config.state).save(&Checkpoint::new(1, 3))?;

    let mut harvester = JiraHarvester::from_config(&config)?;
    let report = harvester.resume().await?;

    assert_eq!(report.collections.len(), 1);
    assert_eq!(report.collections[0].collection, "B");
    assert_eq!(read_ids(&config.output)?.len(), 4);
    assert_eq!(
        FileCheckpointStore::new(&config.state).load()?,
        Checkpoint::new(2, 0)
    );

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_persistent_503_pauses_and_later_resumes() -> Result<()> {
    let server = MockServer::start().await;
    let temp = TempDir::new()?;
    let config = test_config(&server, temp.path(), &["X"], 2);

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut harvester = JiraHarvester::from_config(&config)?;
    let err = harvester.resume().await.unwrap_err();
    assert!(matches!(err, HarvestError::Paused { offset: 0, .. }));
    // One attempt plus three retries
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 4);
    assert!(!config.state.exists());

    // A later invocation picks up where the checkpoint says
    server.reset().await;
    mount_page(&server, "X", 0, search_response(1, vec![issue("X-1", "X")])).await;

    let mut harvester = JiraHarvester::from_config(&config)?;
    harvester.resume().await?;
    assert_eq!(read_ids(&config.output)?.len(), 4);
    assert_eq!(
        FileCheckpointStore::new(&config.state).load()?,
        Checkpoint::new(1, 0)
    );
    Ok(())
}

#[tokio::test]
async fn test_rejected_request_fails_after_bounded_attempts() -> Result<()> {
    let server = MockServer::start().await;
    let temp = TempDir::new()?;
    let config = test_config(&server, temp.path(), &["SECRET"], 2);

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let mut harvester = JiraHarvester::from_config(&config)?;
    let err = harvester.resume().await.unwrap_err();
    assert!(matches!(err, HarvestError::Rejected { attempts: 2, .. }));
    // 403 is not retried by the client, so one request per driver attempt
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);
    assert!(!config.state.exists());
    Ok(())
}

#[tokio::test]
async fn test_malformed_issue_is_skipped() -> Result<()> {
    let server = MockServer::start().await;
    let temp = TempDir::new()?;
    mount_page(
        &server,
        "X",
        0,
        search_response(
            3,
            vec![
                issue("X-1", "X"),
                json!({"key": "X-2", "fields": {"status": "not an object"}}),
                json!({"key": "X-3"}),
            ],
        ),
    )
    .await;

    let config = test_config(&server, temp.path(), &["X"], 10);
    let mut harvester = JiraHarvester::from_config(&config)?;
    let report = harvester.resume().await?;

    assert_eq!(report.records_fetched(), 3);
    assert_eq!(report.records_skipped(), 2);
    assert_eq!(read_ids(&config.output)?.len(), 4);
    assert_eq!(
        FileCheckpointStore::new(&config.state).load()?,
        Checkpoint::new(1, 0)
    );
    Ok(())
}

#[tokio::test]
async fn test_rerun_duplicates_unless_deduplicated() -> Result<()> {
    let server = MockServer::start().await;
    let temp = TempDir::new()?;
    mount_page(&server, "X", 0, search_response(1, vec![issue("X-1", "X")])).await;

    let mut config = test_config(&server, temp.path(), &["X"], 10);
    JiraHarvester::from_config(&config)?.resume().await?;

    // Re-running from a stale checkpoint re-emits the page
    FileCheckpointStore::new(&config.state).clear()?;
    JiraHarvester::from_config(&config)?.resume().await?;
    assert_eq!(read_ids(&config.output)?.len(), 8);

    // With dedupe the known ids are skipped
    FileCheckpointStore::new(&config.state).clear()?;
    config.dedupe = true;
    let report = JiraHarvester::from_config(&config)?.resume().await?;
    assert_eq!(report.examples_written(), 0);
    assert_eq!(read_ids(&config.output)?.len(), 8);
    Ok(())
}

#[tokio::test]
async fn test_client_sends_search_parameters() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("jql", "project = KAFKA ORDER BY created ASC"))
        .and(query_param("startAt", "200"))
        .and(query_param("maxResults", "100"))
        .and(query_param("fields", "*all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_response(250, vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/rest/api/2", server.uri()))?;
    let client = JiraClient::try_new(url, Duration::from_secs(5), RetryPolicy::none())?;
    let page = client
        .search(&JiraClient::project_jql("KAFKA"), 200, 100)
        .await?;
    assert_eq!(page.total, 250);
    assert!(page.is_empty());
    Ok(())
}
