// Integration test modules
pub mod linked_file_tests;
pub mod provider_tests;
pub mod registry_tests;
pub mod resolver_tests;

// Shared helpers
pub mod helpers {
    use std::fs;
    use std::path::Path;
    use std::time::{Duration, Instant, SystemTime};

    /// Push a file's modification time forward without changing its contents
    pub fn touch(path: &Path, ahead: Duration) {
        fs::OpenOptions::new()
            .write(true)
            .open(path)
            .and_then(|file| file.set_modified(SystemTime::now() + ahead))
            .unwrap_or_else(|e| panic!("cannot touch {}: {}", path.display(), e));
    }

    /// Poll `condition` until it holds or `limit` elapses
    pub fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + limit;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        condition()
    }
}
