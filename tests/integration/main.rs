//! Integration tests for precache

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Command isolated from the user's config and store directory
    fn precache(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("precache");
        cmd.env_remove("PRECACHE_ORIGIN")
            .arg("--config")
            .arg(dir.join("config.toml"))
            .arg("--store-dir")
            .arg(dir.join("stores"));
        cmd
    }

    fn write_config(dir: &Path, body: &str) {
        std::fs::write(dir.join("config.toml"), body).unwrap();
    }

    fn app_assets() -> Vec<(&'static str, &'static [u8])> {
        vec![
            ("/", &b"<html>shell</html>"[..]),
            ("/index.html", &b"<html>shell</html>"[..]),
            ("/app.js", &b"init()"[..]),
            ("/app_bg.wasm", &b"\0asm\x01\0\0\0"[..]),
        ]
    }

    /// Serve every manifest asset, each expected exactly `times` times
    async fn mount_app(server: &MockServer, times: u64) {
        for (route, body) in app_assets() {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
                .expect(times)
                .mount(server)
                .await;
        }
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Offline-first asset cache"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("precache"));
    }

    #[test]
    fn identity_uses_configured_build_id() {
        let dir = TempDir::new().unwrap();
        write_config(
            dir.path(),
            "[cache]\nnamespace = \"nes-cache\"\nbuild_id = \"20240115-abc1234\"\n",
        );

        precache(dir.path())
            .arg("identity")
            .assert()
            .success()
            .stdout("nes-cache-20240115-abc1234\n");
    }

    #[test]
    fn identity_unversioned() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), "[cache]\nnamespace = \"nes-cache\"\nversioned = false\n");

        precache(dir.path())
            .arg("identity")
            .assert()
            .success()
            .stdout("nes-cache-v1\n");
    }

    #[test]
    fn list_empty() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache stores found"));
    }

    #[test]
    fn list_empty_json() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[]"));
    }

    #[test]
    fn clear_nothing() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .args(["clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache stores to clear"));
    }

    #[test]
    fn config_path() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn invalid_config_fails() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), "[cache\n");

        precache(dir.path())
            .arg("identity")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn install_unreachable_origin_fails() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .args(["--origin", "http://127.0.0.1:9/", "install"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Provisioning failed"));

        assert!(!dir.path().join("stores").join("precache-dev").exists());
    }

    #[test]
    fn fetch_without_install_goes_to_network() {
        let dir = TempDir::new().unwrap();
        precache(dir.path())
            .args(["--origin", "http://127.0.0.1:9/", "fetch", "./index.html"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network request"));
    }

    #[tokio::test]
    async fn install_then_serve_offline() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), "[cache]\nbuild_id = \"b1\"\n");

        let mock_server = MockServer::start().await;
        mount_app(&mock_server, 1).await;
        Mock::given(method("GET"))
            .and(path("/not-cached.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
            .expect(1)
            .mount(&mock_server)
            .await;
        let origin = mock_server.uri();

        precache(dir.path())
            .args(["--origin", origin.as_str(), "install"])
            .assert()
            .success()
            .stdout(predicate::str::contains("precache-b1 is active"));

        // Cached assets are answered without touching the origin again
        precache(dir.path())
            .args(["--origin", origin.as_str(), "fetch", "./app.js"])
            .assert()
            .success()
            .stdout("init()");

        precache(dir.path())
            .args(["--origin", origin.as_str(), "load"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Ready"));

        // A miss goes to the network once and is not stored
        precache(dir.path())
            .args(["--origin", origin.as_str(), "fetch", "./not-cached.txt"])
            .assert()
            .success()
            .stdout("fresh");

        mock_server.verify().await;
    }

    #[tokio::test]
    async fn failed_install_leaves_no_store() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), "[cache]\nbuild_id = \"b1\"\n");

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app.js"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;

        precache(dir.path())
            .args(["--origin", mock_server.uri().as_str(), "install"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("HTTP 500"));

        assert!(!dir.path().join("stores").join("precache-b1").exists());
    }

    #[tokio::test]
    async fn incomplete_store_falls_back_to_network() {
        let dir = TempDir::new().unwrap();
        write_config(dir.path(), "[cache]\nbuild_id = \"b1\"\n");

        // An install that died after creating its store
        let store = dir.path().join("stores").join("precache-b1");
        std::fs::create_dir_all(store.join("blobs")).unwrap();
        std::fs::write(
            store.join("index.json"),
            r#"{"created_at":"2024-01-15T00:00:00Z","entries":{}}"#,
        )
        .unwrap();

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/app.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string("init()"))
            .expect(1)
            .mount(&mock_server)
            .await;

        precache(dir.path())
            .args(["--origin", mock_server.uri().as_str(), "fetch", "./app.js"])
            .assert()
            .success()
            .stdout("init()");
    }

    #[tokio::test]
    async fn new_build_removes_previous_store() {
        let dir = TempDir::new().unwrap();
        let mock_server = MockServer::start().await;
        mount_app(&mock_server, 2).await;
        let origin = mock_server.uri();

        write_config(dir.path(), "[cache]\nbuild_id = \"b1\"\n");
        precache(dir.path())
            .args(["--origin", origin.as_str(), "install"])
            .assert()
            .success();

        write_config(dir.path(), "[cache]\nbuild_id = \"b2\"\n");
        precache(dir.path())
            .args(["--origin", origin.as_str(), "install"])
            .assert()
            .success()
            .stdout(predicate::str::contains("precache-b1"));

        precache(dir.path())
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("precache-b2\n");
    }
}
