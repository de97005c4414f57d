use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A throwaway home directory for discovery and launch tests
pub struct TestFixture {
    _temp_dir: TempDir,
    pub home: PathBuf,
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let home = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            home,
        }
    }

    /// Write `content` to `name` relative to the home directory
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.home.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a shell script that records its arguments, and the contents of
    /// the file named by its second argument, to `record`.
    #[cfg(unix)]
    pub fn recording_script(&self, record: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{record}'\ncat \"$2\" >> '{record}'\nprintf '%s\\n' \"$2\" > '{record}.path'\n",
            record = record.display()
        );
        let path = self.write("bin/record", &script);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

/// Route `tracing` output through the test harness, honoring `RUST_LOG`.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
