//! Common test utilities: an in-process fake `bw serve` and simulated launchers

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bwvpn_vault::{ClientConfig, LaunchCommand, Launcher, ServiceProcess, Timeouts};
use tokio::sync::oneshot;

/// Canned reply for one path
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json; charset=utf-8",
            body: body.to_string(),
        }
    }

    pub fn text(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/plain",
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "application/json; charset=utf-8",
            body: r#"{"success":false,"message":"Vault is locked."}"#.to_string(),
        }
    }
}

#[derive(Clone)]
struct FakeState {
    routes: Arc<HashMap<String, Vec<Reply>>>,
    hits: Arc<Mutex<Vec<String>>>,
}

/// A fake vault service on a background thread with its own tokio runtime.
///
/// `/status` answers 200 unless a route overrides it; unknown paths are 404.
/// Listing a path several times serves the replies in order, repeating the last.
pub struct FakeVault {
    port: u16,
    hits: Arc<Mutex<Vec<String>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl FakeVault {
    pub fn start(routes: Vec<(&str, Reply)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("should bind test listener");
        Self::serve(listener, routes)
    }

    pub fn start_on(port: u16, routes: Vec<(&str, Reply)>) -> Self {
        let listener =
            TcpListener::bind(("127.0.0.1", port)).expect("should bind reserved test port");
        Self::serve(listener, routes)
    }

    fn serve(listener: TcpListener, routes: Vec<(&str, Reply)>) -> Self {
        listener
            .set_nonblocking(true)
            .expect("should set listener non-blocking");
        let port = listener.local_addr().expect("should have local addr").port();

        let mut table: HashMap<String, Vec<Reply>> = HashMap::new();
        for (path, reply) in routes {
            table.entry(path.to_string()).or_default().push(reply);
        }
        table.entry("/status".to_string()).or_insert_with(|| {
            vec![Reply::json(
                r#"{"success":true,"data":{"object":"template","template":{"status":"unlocked"}}}"#,
            )]
        });

        let hits = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            routes: Arc::new(table),
            hits: Arc::clone(&hits),
        };
        let (tx, rx) = oneshot::channel::<()>();

        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("should build test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)
                    .expect("should adopt std listener");
                let app = Router::new().fallback(respond).with_state(state);
                let _ = axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = rx.await;
                    })
                    .await;
            });
        });

        Self {
            port,
            hits,
            shutdown: Some(tx),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Number of requests received for `path`
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .iter()
            .filter(|p| p.as_str() == path)
            .count()
    }
}

impl Drop for FakeVault {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn respond(State(state): State<FakeState>, uri: Uri) -> Response {
    let path = uri.path().to_string();
    let seen = {
        let mut hits = state.hits.lock().expect("hits lock");
        let seen = hits.iter().filter(|p| **p == path).count();
        hits.push(path.clone());
        seen
    };
    let reply = state
        .routes
        .get(&path)
        .and_then(|replies| replies.get(seen).or_else(|| replies.last()));
    match reply {
        Some(reply) => (
            StatusCode::from_u16(reply.status).expect("valid status"),
            [(header::CONTENT_TYPE, reply.content_type)],
            reply.body.clone(),
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

/// Client configuration pointing at `url` with short, test-friendly timings
pub fn test_config(url: &str, startup: Duration) -> ClientConfig {
    ClientConfig {
        serve_url: url.to_string(),
        timeouts: Timeouts {
            status: Duration::from_millis(500),
            field: Duration::from_secs(2),
            probe_status: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            startup,
        },
        ..ClientConfig::default()
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    condition()
}

/// A process that never touches the OS
pub struct SimulatedProcess {
    exited: bool,
    terminated: Arc<AtomicBool>,
}

impl SimulatedProcess {
    pub fn running() -> Self {
        Self::tracked(Arc::new(AtomicBool::new(false)))
    }

    pub fn exited() -> Self {
        Self {
            exited: true,
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A running process that raises `terminated` when stopped
    pub fn tracked(terminated: Arc<AtomicBool>) -> Self {
        Self {
            exited: false,
            terminated,
        }
    }
}

impl ServiceProcess for SimulatedProcess {
    fn id(&self) -> Option<u32> {
        None
    }

    fn exit_status(&mut self) -> Option<String> {
        self.exited.then(|| "exit status: 1".to_string())
    }

    fn terminate(&mut self) -> io::Result<()> {
        self.exited = true;
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every launch and what it was asked to run
#[derive(Clone, Default)]
pub struct LaunchLog {
    count: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<LaunchCommand>>>,
}

impl LaunchLog {
    fn record(&self, command: &LaunchCommand) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.commands
            .lock()
            .expect("launch log lock")
            .push(command.clone());
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<LaunchCommand> {
        self.commands.lock().expect("launch log lock").last().cloned()
    }
}

/// Simulates a service that starts answering on `port` after `delay`
pub struct DelayedVault {
    pub port: u16,
    pub delay: Duration,
    pub routes: Vec<(&'static str, Reply)>,
    pub log: LaunchLog,
    pub server: Arc<Mutex<Option<FakeVault>>>,
    /// Raised when any launched process is terminated
    pub terminated: Arc<AtomicBool>,
}

impl DelayedVault {
    pub fn new(port: u16, delay: Duration) -> Self {
        Self {
            port,
            delay,
            routes: Vec::new(),
            log: LaunchLog::default(),
            server: Arc::new(Mutex::new(None)),
            terminated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop the simulated service without telling the client
    pub fn kill_server(server: &Arc<Mutex<Option<FakeVault>>>) {
        server.lock().expect("server slot lock").take();
    }
}

impl Launcher for DelayedVault {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Box<dyn ServiceProcess>> {
        self.log.record(command);
        let port = self.port;
        let delay = self.delay;
        let routes = self.routes.clone();
        let slot = Arc::clone(&self.server);
        thread::spawn(move || {
            thread::sleep(delay);
            let vault = FakeVault::start_on(port, routes);
            *slot.lock().expect("server slot lock") = Some(vault);
        });
        Ok(Box::new(SimulatedProcess::tracked(Arc::clone(&self.terminated))))
    }
}

/// Simulates a service binary that exits right away
#[derive(Default)]
pub struct CrashingService {
    pub log: LaunchLog,
}

impl Launcher for CrashingService {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Box<dyn ServiceProcess>> {
        self.log.record(command);
        Ok(Box::new(SimulatedProcess::exited()))
    }
}
