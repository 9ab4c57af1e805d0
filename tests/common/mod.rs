/// Common test utilities and helpers for MirrorSync tests
use std::path::PathBuf;
use tempfile::TempDir;

/// Temporary tree holding a config directory and a mirror root for one test
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub mirror_root: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("mirrorsync");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        let mirror_root = temp_dir.path().join("mirror");
        std::fs::create_dir_all(&mirror_root).expect("Failed to create mirror root");

        Self {
            temp_dir,
            config_dir,
            mirror_root,
        }
    }

    pub fn create_test_config(&self, content: &str) -> PathBuf {
        let config_path = self.config_dir.join("config.yml");
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    /// Config pointing at a local mock API server, with the mirror rewrite
    /// rule the tool exists for
    pub fn config_for_server(&self, api_base: &str) -> PathBuf {
        self.create_test_config(&format!(
            r#"
mirror:
  root: "{}"
upstream:
  owner: "filebrowser"
  repo: "filebrowser"
  api_base: "{}"
rewrite:
  - pattern: "github.com/filebrowser"
    replacement: "github.com/thevickypedia"
"#,
            self.mirror_root.display(),
            api_base
        ))
    }
}
