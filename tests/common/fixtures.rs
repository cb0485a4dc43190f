//! Test fixtures: file server mocks and orchestrator setup

use bundle_dl::{AdmissionMode, Config, JobOrchestrator};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Small JPEG-looking payload
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Small PDF-looking payload
pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n%test\n";

/// Config writing into `dir`, with a 1 MB size cap and short timeouts
pub fn test_config(dir: &TempDir, slots: usize, admission: AdmissionMode) -> Config {
    let mut config = Config::default();
    config.storage.storage_dir = dir.path().join("archives");
    config.fetch.max_file_size_mb = 1;
    config.fetch.request_timeout = Duration::from_secs(5);
    config.processing.max_processing_tasks = slots;
    config.processing.admission = admission;
    config.processing.shutdown_timeout = Duration::from_secs(10);
    config.api.bind_address = "127.0.0.1:0".parse().expect("valid address");
    config
}

/// Orchestrator over a fresh temp storage dir
pub fn test_orchestrator(slots: usize) -> (JobOrchestrator, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let orchestrator = JobOrchestrator::new(test_config(&dir, slots, AdmissionMode::Reserve))
        .expect("valid config");
    (orchestrator, dir)
}

/// Serve `body` as `content_type` at `route` for both HEAD and GET
pub async fn serve_file(server: &MockServer, route: &str, body: &[u8], content_type: &str) {
    for verb in ["HEAD", "GET"] {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), content_type))
            .mount(server)
            .await;
    }
}

/// Answer HEAD with an allowed type but GET with `get_type`
pub async fn serve_type_switch(
    server: &MockServer,
    route: &str,
    body: &[u8],
    head_type: &str,
    get_type: &str,
) {
    Mock::given(method("HEAD"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), head_type))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_vec(), get_type))
        .mount(server)
        .await;
}

/// Answer every request at `route` with `status`
pub async fn serve_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
