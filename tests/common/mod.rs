#![allow(dead_code)]

pub use exerun_test_utils::builders;
pub use exerun_test_utils::fake_backend::FakeBackend;
pub use exerun_test_utils::recording::{Recorder, ReportedError};
pub use exerun_test_utils::{init_tracing, with_timeout};

use std::path::Path;
use std::time::Duration;

/// Poll until `path` exists or `limit` elapses.
pub async fn wait_for_file(path: &Path, limit: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    path.exists()
}
