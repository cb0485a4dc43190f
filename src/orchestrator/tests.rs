use super::*;
use crate::config::AdmissionMode;
use crate::error::Error;
use crate::types::{JobDetail, JobStatus, LINK_CAP};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(dir: &TempDir, admission: AdmissionMode, slots: usize) -> Config {
    let mut config = Config::default();
    config.storage.storage_dir = dir.path().join("archives");
    config.fetch.max_file_size_mb = 1;
    config.fetch.request_timeout = Duration::from_secs(5);
    config.processing.max_processing_tasks = slots;
    config.processing.admission = admission;
    config.processing.shutdown_timeout = Duration::from_secs(10);
    config
}

fn orchestrator(admission: AdmissionMode, slots: usize) -> (JobOrchestrator, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let orchestrator = JobOrchestrator::new(test_config(&dir, admission, slots)).unwrap();
    (orchestrator, dir)
}

async fn serve(server: &MockServer, route: &str, body: Vec<u8>, mime: &str) {
    for verb in ["HEAD", "GET"] {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), mime))
            .mount(server)
            .await;
    }
}

async fn wait_for_terminal(orchestrator: &JobOrchestrator, id: JobId) -> JobDetail {
    tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            let job = orchestrator.get_job(id).await.unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("job should reach a terminal status")
}

#[tokio::test]
async fn mixed_links_complete_with_errors() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 3);
    let server = MockServer::start().await;
    serve(&server, "/page.html", b"<html/>".to_vec(), "text/html").await;
    serve(&server, "/huge.pdf", vec![0u8; 2 * 1024 * 1024], "application/pdf").await;
    serve(&server, "/photo.jpg", b"jpeg".to_vec(), "image/jpeg").await;

    let created = orchestrator.create_job().await.unwrap();
    assert_eq!(created.status, JobStatus::Pending);

    for route in ["/page.html", "/huge.pdf"] {
        let summary = orchestrator
            .add_link(created.id, &format!("{}{}", server.uri(), route))
            .await
            .unwrap();
        assert_eq!(summary.status, JobStatus::Pending);
    }
    let summary = orchestrator
        .add_link(created.id, &format!("{}/photo.jpg", server.uri()))
        .await
        .unwrap();
    assert_eq!(summary.status, JobStatus::Ready);

    let job = wait_for_terminal(&orchestrator, created.id).await;
    assert_eq!(job.status, JobStatus::CompletedWithErrors);
    assert_eq!(job.error_messages.len(), 2);
    assert!(job.error_messages[0].contains("forbidden file type"));
    assert!(job.error_messages[1].contains("more than max allowed file size (1 MB)"));

    let archive = job.archive_path.expect("archive path");
    let zip = zip::ZipArchive::new(std::fs::File::open(&archive).unwrap()).unwrap();
    assert_eq!(zip.len(), 1);
    assert!(zip.file_names().all(|n| n.starts_with("file_") && n.ends_with(".jpg")));
}

#[tokio::test]
async fn unreachable_links_fail_the_job() {
    let (orchestrator, dir) = orchestrator(AdmissionMode::Reserve, 3);
    let id = orchestrator.create_job().await.unwrap().id;
    for n in 0..LINK_CAP {
        orchestrator
            .add_link(id, &format!("http://127.0.0.1:1/{n}.pdf"))
            .await
            .unwrap();
    }

    let job = wait_for_terminal(&orchestrator, id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.archive_path.is_none());
    assert_eq!(job.error_messages.len(), LINK_CAP);
    assert!(job.finished_at.is_some());
    assert!(!dir
        .path()
        .join("archives")
        .join(crate::pipeline::archive::archive_file_name(id))
        .exists());
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 3);
    let id = JobId::new();

    assert!(matches!(
        orchestrator.get_job(id).await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        orchestrator.add_link(id, "http://example.com/a.pdf").await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn reserve_mode_rejects_when_all_slots_are_held() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 2);

    orchestrator.create_job().await.unwrap();
    orchestrator.create_job().await.unwrap();
    assert_eq!(orchestrator.available_slots(), 0);
    assert_eq!(orchestrator.reserved_slots().await, 2);

    assert!(matches!(orchestrator.create_job().await, Err(Error::Busy)));
    assert_eq!(orchestrator.list_jobs().await.unwrap().len(), 2);
}

#[tokio::test]
async fn ready_job_hands_its_reservation_to_the_run() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 2);
    let waiting = orchestrator.create_job().await.unwrap().id;
    let id = orchestrator.create_job().await.unwrap().id;
    assert_eq!(orchestrator.reserved_slots().await, 2);

    for n in 0..LINK_CAP {
        orchestrator
            .add_link(id, &format!("http://127.0.0.1:1/{n}.pdf"))
            .await
            .unwrap();
    }
    assert_eq!(orchestrator.reserved_slots().await, 1);

    wait_for_terminal(&orchestrator, id).await;
    orchestrator.shutdown().await;
    assert_eq!(orchestrator.available_slots(), 1);
    assert_eq!(
        orchestrator.get_job(waiting).await.unwrap().status,
        JobStatus::Pending
    );
}

#[tokio::test]
async fn reserved_slot_returns_after_the_run() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 1);
    let id = orchestrator.create_job().await.unwrap().id;
    assert!(matches!(orchestrator.create_job().await, Err(Error::Busy)));

    for n in 0..LINK_CAP {
        orchestrator
            .add_link(id, &format!("http://127.0.0.1:1/{n}.pdf"))
            .await
            .unwrap();
    }
    wait_for_terminal(&orchestrator, id).await;
    orchestrator.shutdown().await;

    assert_eq!(orchestrator.available_slots(), 1);
}

#[tokio::test]
async fn advisory_mode_only_checks_capacity() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Advisory, 1);

    orchestrator.create_job().await.unwrap();
    orchestrator.create_job().await.unwrap();
    assert_eq!(orchestrator.available_slots(), 1);
    assert_eq!(orchestrator.list_jobs().await.unwrap().len(), 2);
}

#[tokio::test]
async fn fourth_link_is_overload() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Advisory, 1);
    let id = orchestrator.create_job().await.unwrap().id;
    for n in 0..LINK_CAP {
        orchestrator
            .add_link(id, &format!("http://127.0.0.1:1/{n}.pdf"))
            .await
            .unwrap();
    }

    let err = orchestrator
        .add_link(id, "http://127.0.0.1:1/extra.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Overload { cap: LINK_CAP, .. }));

    let job = orchestrator.get_job(id).await.unwrap();
    assert_eq!(job.links.len(), LINK_CAP);
}

#[tokio::test]
async fn malformed_links_are_rejected_before_the_store() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 1);
    let id = orchestrator.create_job().await.unwrap().id;

    for bad in ["", "not a url", "ftp://example.com/a.pdf", "file:///etc/passwd"] {
        assert!(
            matches!(orchestrator.add_link(id, bad).await, Err(Error::InvalidLink(_))),
            "{bad:?} should be rejected"
        );
    }
    assert!(orchestrator.get_job(id).await.unwrap().links.is_empty());
}

#[tokio::test]
async fn concurrent_adds_start_exactly_one_run() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 1);
    let id = orchestrator.create_job().await.unwrap().id;

    let handles: Vec<_> = (0..12)
        .map(|n| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .add_link(id, &format!("http://127.0.0.1:1/{n}.pdf"))
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    let mut ready = 0;
    let mut overloaded = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(summary) => {
                accepted += 1;
                if summary.status == JobStatus::Ready {
                    ready += 1;
                }
            }
            Err(Error::Overload { .. }) => overloaded += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(accepted, LINK_CAP);
    assert_eq!(ready, 1);
    assert_eq!(overloaded, 12 - LINK_CAP);

    let job = wait_for_terminal(&orchestrator, id).await;
    assert_eq!(job.links.len(), LINK_CAP);
    assert_eq!(job.error_messages.len(), LINK_CAP);
}

#[tokio::test]
async fn shutdown_refuses_new_jobs_and_drains() {
    let (orchestrator, _dir) = orchestrator(AdmissionMode::Reserve, 2);
    let server = MockServer::start().await;
    serve(&server, "/a.pdf", b"pdf".to_vec(), "application/pdf").await;

    let id = orchestrator.create_job().await.unwrap().id;
    for _ in 0..LINK_CAP {
        orchestrator
            .add_link(id, &format!("{}/a.pdf", server.uri()))
            .await
            .unwrap();
    }

    orchestrator.shutdown().await;

    assert!(!orchestrator.is_accepting());
    assert_eq!(orchestrator.active_pipelines(), 0);
    assert!(matches!(
        orchestrator.create_job().await,
        Err(Error::ShuttingDown)
    ));
    let job = orchestrator.get_job(id).await.unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir, AdmissionMode::Reserve, 1);
    config.processing.max_processing_tasks = 0;
    assert!(matches!(
        JobOrchestrator::new(config),
        Err(Error::Config { .. })
    ));
}
