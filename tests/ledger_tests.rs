// Remote ledger client behavior against a mock HTTP server.

use std::collections::BTreeMap;

use anyhow::Result;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slurm_ledger_sync::ledger::client::MAX_PAGES;
use slurm_ledger_sync::ledger::models::Project;
use slurm_ledger_sync::sync::{project_start, upsert};
use slurm_ledger_sync::{JobRecord, LedgerClient, PartitionPrices, RunContext};

fn test_context(server: &MockServer, dry_run: bool) -> RunContext {
    RunContext {
        base_url: format!("{}/", server.uri()),
        auth_token: "test-token".to_string(),
        dry_run,
        resource: "Savio Compute".to_string(),
        sacct_bin: "sacct".to_string(),
        prices: PartitionPrices::parse("[PartitionPrice]\nsavio2 0.5\n"),
        client: reqwest::Client::new(),
    }
}

fn job_record(job_id: &str) -> JobRecord {
    let prices = PartitionPrices::parse("[PartitionPrice]\nsavio2 0.5\n");
    let line = format!(
        "{}|2023-06-01T10:00:00|2023-06-01T12:00:00|2023-06-01T14:00:00|4001|fc_lab|COMPLETED|savio2|normal|n[0001-0002].hpc|4|2|2|28800|08:00:00",
        job_id
    );
    JobRecord::parse(&line, &prices).unwrap()
}

fn page(names: &[&str], next: Option<&str>) -> serde_json::Value {
    json!({
        "results": names.iter().map(|n| json!({"name": n})).collect::<Vec<_>>(),
        "next": next,
    })
}

#[tokio::test]
async fn test_paginated_get_follows_next_cursor() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["p3"], Some("more"))))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["p4"], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["p1", "p2"], Some("more"))))
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);
    let projects: Vec<Project> = client.paginated_get("projects/", &[]).await;

    let names: Vec<_> = projects.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["p1", "p2", "p3", "p4"]);
    Ok(())
}

#[tokio::test]
async fn test_paginated_get_caps_page_count() -> Result<()> {
    let server = MockServer::start().await;

    // Every response claims there is more: without the cap this would
    // never terminate.
    Mock::given(method("GET"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["p"], Some("more"))))
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);
    let projects: Vec<Project> = client.paginated_get("projects/", &[]).await;

    // Initial unpaged request plus MAX_PAGES follow-ups, one result each.
    assert_eq!(projects.len(), (MAX_PAGES + 1) as usize);
    Ok(())
}

#[tokio::test]
async fn test_paginated_get_keeps_partial_results_on_later_failure() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(&["p1", "p2"], Some("more"))))
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);
    let projects: Vec<Project> = client.paginated_get("projects/", &[]).await;

    assert_eq!(projects.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_paginated_get_first_page_failure_yields_empty() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);
    let projects: Vec<Project> = client.paginated_get("projects/", &[]).await;

    assert!(projects.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_project_start_resolution_strips_fractional_seconds() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/allocations/"))
        .and(query_param("project", "fc_lab"))
        .and(query_param("resources", "Savio Compute"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"start_date": "2022-06-01T00:00:00.123456"}],
            "next": null,
        })))
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);

    let start = project_start::resolve(&client, "Savio Compute", "fc_lab").await;
    assert_eq!(start.as_deref(), Some("2022-06-01T00:00:00"));
    Ok(())
}

#[tokio::test]
async fn test_project_start_absent_allocation_is_none() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/allocations/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"results": [], "next": null})),
        )
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);

    assert!(project_start::resolve(&client, "Savio Compute", "fc_lab").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_push_all_upserts_with_token_auth() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/jobs/12345/"))
        .and(header("Authorization", "Token test-token"))
        .and(body_string_contains("jobslurmid=12345"))
        .and(body_string_contains("amount=4.00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);

    let mut records = BTreeMap::new();
    records.insert("12345".to_string(), job_record("12345"));

    let summary = upsert::push_all(&client, false, &records).await;
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.pushed, 1);
    assert!(summary.failures.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_push_all_isolates_per_record_failures() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/jobs/1/"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/jobs/2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);

    let mut records = BTreeMap::new();
    records.insert("1".to_string(), job_record("1"));
    records.insert("2".to_string(), job_record("2"));

    let summary = upsert::push_all(&client, false, &records).await;
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.pushed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].job_id, "1");
    Ok(())
}

#[tokio::test]
async fn test_upsert_is_repeatable() -> Result<()> {
    let server = MockServer::start().await;

    // Full-field replace keyed by job id: running twice issues the same
    // request twice and converges to the same remote state.
    Mock::given(method("PUT"))
        .and(path("/jobs/12345/"))
        .and(body_string_contains("jobslurmid=12345"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let ctx = test_context(&server, false);
    let client = LedgerClient::new(&ctx);

    let mut records = BTreeMap::new();
    records.insert("12345".to_string(), job_record("12345"));

    let first = upsert::push_all(&client, false, &records).await;
    let second = upsert::push_all(&client, false, &records).await;
    assert_eq!(first.pushed, 1);
    assert_eq!(second.pushed, 1);
    Ok(())
}

#[tokio::test]
async fn test_dry_run_writes_nothing() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = test_context(&server, true);
    let client = LedgerClient::new(&ctx);

    let mut records = BTreeMap::new();
    records.insert("12345".to_string(), job_record("12345"));

    let summary = upsert::push_all(&client, true, &records).await;
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.pushed, 0);
    assert!(summary.failures.is_empty());
    Ok(())
}
