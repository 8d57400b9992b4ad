//! Scheduler registration

mod common;

use common::*;
use foodfacts_ingest::config::ScheduleConfig;
use foodfacts_ingest::pipeline::ImportService;
use foodfacts_ingest::scheduler::ImportScheduler;
use wiremock::MockServer;

async fn service(server: &MockServer, tmp: &std::path::Path) -> ImportService {
    ImportService::new(coordinator(
        server,
        tmp,
        10,
        MemoryStore::new(),
        MemoryIndex::new(),
    ))
}

#[tokio::test]
async fn test_scheduler_starts_and_shuts_down() {
    init_tracing();
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let scheduler = ImportScheduler::start(
        service(&server, tmp.path()).await,
        &ScheduleConfig {
            cron: "0 0 3 * * *".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
        },
    )
    .await
    .unwrap();

    assert!(!scheduler.job_id().is_nil());
    scheduler.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_cron_expression_is_rejected() {
    init_tracing();
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let result = ImportScheduler::start(
        service(&server, tmp.path()).await,
        &ScheduleConfig {
            cron: "every day at three".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
        },
    )
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_unknown_timezone_is_rejected() {
    init_tracing();
    let server = MockServer::start().await;
    let tmp = tempfile::tempdir().unwrap();

    let result = ImportScheduler::start(
        service(&server, tmp.path()).await,
        &ScheduleConfig {
            cron: "0 0 3 * * *".to_string(),
            timezone: "Atlantis/Capital".to_string(),
        },
    )
    .await;

    assert!(result.is_err());
}
