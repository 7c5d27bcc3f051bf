//! Shared helpers for CLI tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use assert_cmd::Command;
use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Minimal vault service answering fixed JSON bodies per path
pub struct FakeVault {
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeVault {
    pub fn start(routes: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("should bind test listener");
        listener
            .set_nonblocking(true)
            .expect("should set listener non-blocking");
        let port = listener.local_addr().expect("should have local addr").port();

        let mut table: HashMap<String, String> = routes
            .iter()
            .map(|(path, body)| (path.to_string(), body.to_string()))
            .collect();
        table
            .entry("/status".to_string())
            .or_insert_with(|| r#"{"success":true}"#.to_string());
        let table = Arc::new(table);
        let (tx, rx) = oneshot::channel::<()>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("should build test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)
                    .expect("should adopt std listener");
                let app = Router::new().fallback(respond).with_state(table);
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = rx.await;
                    })
                    .await;
            });
        });

        Self {
            port,
            shutdown: Some(tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for FakeVault {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn respond(State(table): State<Arc<HashMap<String, String>>>, uri: Uri) -> Response {
    match table.get(uri.path()) {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Reserve a free port by binding and immediately releasing it
pub fn find_available_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("should bind ephemeral port");
    listener.local_addr().expect("should have local addr").port()
}

/// Isolated home directory with an optional config file
pub struct CliTestFixture {
    _temp_dir: TempDir,
    pub home: PathBuf,
    pub config_path: PathBuf,
}

impl CliTestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("should create temp dir");
        let home = temp_dir.path().to_path_buf();
        let config_path = home.join("config.yaml");
        Self {
            _temp_dir: temp_dir,
            home,
            config_path,
        }
    }

    pub fn with_config(contents: &str) -> Self {
        let fixture = Self::new();
        fs::write(&fixture.config_path, contents).expect("should write config");
        fixture
    }

    /// `bwvpn` with a clean environment pointing at this fixture
    pub fn bwvpn(&self) -> Command {
        let mut cmd = Command::cargo_bin("bwvpn").expect("binary should build");
        cmd.env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", self.home.join(".config"))
            .env("XDG_CACHE_HOME", self.home.join(".cache"))
            .env("BW_BINARY", self.home.join("no-such-bw"))
            .env("LOG_OUTPUT", "console")
            .env_remove("BW_SERVE_URL")
            .env_remove("BW_SESSION")
            .env_remove("RUST_LOG");
        if self.config_path.exists() {
            cmd.arg("--config").arg(&self.config_path);
        }
        cmd
    }
}
