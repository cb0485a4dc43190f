//! Custom test assertions for integration tests

use bundle_dl::{JobDetail, JobId, JobOrchestrator};
use std::path::Path;
use std::time::Duration;

/// Poll a job until it reaches a terminal status
///
/// Panics if `timeout` passes first.
pub async fn wait_for_terminal(
    orchestrator: &JobOrchestrator,
    id: JobId,
    timeout: Duration,
) -> JobDetail {
    let result = tokio::time::timeout(timeout, async {
        loop {
            let job = orchestrator.get_job(id).await.expect("job exists");
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    match result {
        Ok(job) => job,
        Err(_) => panic!("job {id} did not finish within {timeout:?}"),
    }
}

/// Names of the entries in a ZIP archive, sorted
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("archive exists");
    let zip = zip::ZipArchive::new(file).expect("valid zip");
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Contents of one archive entry
pub fn archive_entry_bytes(path: &Path, name: &str) -> Vec<u8> {
    use std::io::Read;

    let file = std::fs::File::open(path).expect("archive exists");
    let mut zip = zip::ZipArchive::new(file).expect("valid zip");
    let mut entry = zip.by_name(name).expect("entry exists");
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).expect("readable entry");
    bytes
}
