//! Integration tests for cache-pull

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn cache_pull() -> Command {
        let mut cmd = cargo_bin_cmd!("cache-pull");
        for var in [
            "cache_api_url",
            "is_debug_mode",
            "CACHE_PULL_ARCHIVE_PATH",
            "CACHE_PULL_TARGET_DIR",
            "CACHE_PULL_DOWNLOAD_TIMEOUT",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    #[test]
    fn help_displays() {
        cache_pull()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cache_api_url"));
    }

    #[test]
    fn version_displays() {
        cache_pull()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("cache-pull"));
    }

    #[test]
    fn no_endpoint_is_a_no_op() {
        let temp = TempDir::new().unwrap();

        cache_pull()
            .current_dir(temp.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("no cache to use"));

        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn blank_endpoint_is_a_no_op() {
        let temp = TempDir::new().unwrap();

        cache_pull()
            .current_dir(temp.path())
            .env("cache_api_url", "")
            .assert()
            .success()
            .stdout(predicate::str::contains("no cache to use"));
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        cache_pull()
            .args(["--download-timeout", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("at least one second"));
    }
}

mod pull_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use flate2::write::GzEncoder;
    use httpmock::prelude::*;
    use predicates::prelude::*;
    use serde_json::json;
    use std::io::Write;
    use std::path::PathBuf;
    use tar::{EntryType, Header};
    use tempfile::TempDir;

    const MTIME: u64 = 1_650_000_000;

    fn sample_tar() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let mut dir = Header::new_gnu();
        dir.set_entry_type(EntryType::Directory);
        dir.set_mode(0o755);
        dir.set_size(0);
        dir.set_mtime(MTIME);
        builder.append_data(&mut dir, "d/", std::io::empty()).unwrap();

        let mut file = Header::new_gnu();
        file.set_entry_type(EntryType::Regular);
        file.set_mode(0o644);
        file.set_size(2);
        file.set_mtime(MTIME);
        builder.append_data(&mut file, "d/f.txt", &b"hi"[..]).unwrap();

        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    struct Run {
        temp: TempDir,
        project: PathBuf,
    }

    impl Run {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let project = temp.path().join("project");
            std::fs::create_dir(&project).unwrap();
            Self { temp, project }
        }

        fn command(&self, endpoint: &str) -> Command {
            let mut cmd = cargo_bin_cmd!("cache-pull");
            cmd.current_dir(&self.project)
                .env("cache_api_url", endpoint)
                .env(
                    "CACHE_PULL_ARCHIVE_PATH",
                    self.temp.path().join("cache-archive.tar"),
                )
                .env_remove("is_debug_mode")
                .env_remove("CACHE_PULL_TARGET_DIR")
                .env_remove("CACHE_PULL_DOWNLOAD_TIMEOUT");
            cmd
        }

        fn assert_restored(&self) {
            let file = self.project.join("d/f.txt");
            assert_eq!(std::fs::read_to_string(&file).unwrap(), "hi");
            let meta = std::fs::metadata(&file).unwrap();
            assert_eq!(
                filetime::FileTime::from_last_modification_time(&meta).unix_seconds(),
                MTIME as i64
            );
        }
    }

    fn serve(server: &MockServer, archive: Vec<u8>) {
        let archive_url = server.url("/a.tar");
        server.mock(|when, then| {
            when.method(GET).path("/api/cache");
            then.status(200)
                .json_body(json!({ "download_url": archive_url }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/a.tar");
            then.status(200).body(archive);
        });
    }

    #[test]
    fn restores_plain_archive_into_working_directory() {
        let server = MockServer::start();
        serve(&server, sample_tar());
        let run = Run::new();

        run.command(&server.url("/api/cache"))
            .assert()
            .success()
            .stdout(predicate::str::contains("Restored 2 entries"));

        run.assert_restored();
    }

    #[test]
    fn restores_gzip_archive() {
        let server = MockServer::start();
        serve(&server, gzip(&sample_tar()));
        let run = Run::new();

        run.command(&server.url("/api/cache"))
            .assert()
            .success()
            .stdout(predicate::str::contains("gzip"));

        run.assert_restored();
    }

    #[test]
    fn second_run_overwrites_in_place() {
        let server = MockServer::start();
        serve(&server, sample_tar());
        let run = Run::new();

        run.command(&server.url("/api/cache")).assert().success();
        std::fs::write(run.project.join("d/f.txt"), "changed").unwrap();
        run.command(&server.url("/api/cache")).assert().success();

        run.assert_restored();
    }

    #[test]
    fn debug_mode_shows_download_url() {
        let server = MockServer::start();
        serve(&server, sample_tar());
        let run = Run::new();

        run.command(&server.url("/api/cache"))
            .env("is_debug_mode", "true")
            .assert()
            .success()
            .stdout(predicate::str::contains(server.url("/a.tar")));
    }

    #[test]
    fn missing_cache_fails_with_hint() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/cache");
            then.status(404).body("not found");
        });
        let run = Run::new();

        run.command(&server.url("/api/cache"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Build cache not found"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn unreachable_archive_fails() {
        let server = MockServer::start();
        let download = server.mock(|when, then| {
            when.method(GET).path("/a.tar");
            then.status(503).body("try later");
        });
        let archive_url = server.url("/a.tar");
        server.mock(|when, then| {
            when.method(GET).path("/api/cache");
            then.status(200)
                .json_body(json!({ "download_url": archive_url }));
        });
        let run = Run::new();

        run.command(&server.url("/api/cache"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("503"));

        download.assert_hits(2);
    }
}
