//! Launching `bw serve` and waiting for it to become ready
//!
//! The service is started as a detached background process so that later
//! invocations can reuse it. Its output is never read on the caller's thread:
//! it is either drained by background threads into the log at debug level or
//! appended to a log file.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::error::{Result, VaultError};
use crate::liveness;
use crate::types::{ServiceEndpoint, SessionToken};
use crate::SESSION_ENV_VAR;

/// A running (or formerly running) service process
pub trait ServiceProcess: Send {
    /// OS process id, if known
    fn id(&self) -> Option<u32>;

    /// `Some(description)` once the process has exited, `None` while it runs
    fn exit_status(&mut self) -> Option<String>;

    /// Kill the process and reap it
    fn terminate(&mut self) -> io::Result<()>;
}

impl ServiceProcess for Child {
    fn id(&self) -> Option<u32> {
        Some(Child::id(self))
    }

    fn exit_status(&mut self) -> Option<String> {
        match self.try_wait() {
            Ok(Some(status)) => Some(status.to_string()),
            Ok(None) => None,
            Err(e) => {
                warn!(pid = Child::id(self), error = %e, "Failed to query vault service process state");
                None
            }
        }
    }

    fn terminate(&mut self) -> io::Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        self.kill()?;
        self.wait().map(|_| ())
    }
}

/// How to start the service: `<program> serve --hostname <h> --port <p> [--session <t>]`
#[derive(Debug, Clone)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub host: String,
    pub port: u16,
    pub session: Option<SessionToken>,
    /// Append stdout/stderr here instead of piping them
    pub log_file: Option<PathBuf>,
}

impl LaunchCommand {
    pub fn new(program: impl Into<PathBuf>, endpoint: &ServiceEndpoint) -> Self {
        Self {
            program: program.into(),
            host: endpoint.host().to_string(),
            port: endpoint.port(),
            session: None,
            log_file: None,
        }
    }

    pub fn with_session(mut self, session: Option<SessionToken>) -> Self {
        self.session = session;
        self
    }

    pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
        self.log_file = log_file;
        self
    }

    /// Arguments passed to the program; contains the raw session token
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "serve".to_string(),
            "--hostname".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
        ];
        if let Some(session) = &self.session {
            args.push("--session".to_string());
            args.push(session.expose().to_string());
        }
        args
    }

    /// Extra environment for the child; the vault CLI reads the session from either place
    pub fn envs(&self) -> Vec<(&'static str, String)> {
        self.session
            .iter()
            .map(|session| (SESSION_ENV_VAR, session.expose().to_string()))
            .collect()
    }

    /// Command line suitable for logs, with the session redacted
    pub fn display(&self) -> String {
        let mut line = format!(
            "{} serve --hostname {} --port {}",
            self.program.display(),
            self.host,
            self.port
        );
        if self.session.is_some() {
            line.push_str(" --session [REDACTED]");
        }
        line
    }
}

/// Something that can start the vault service
pub trait Launcher: Send {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Box<dyn ServiceProcess>>;
}

/// Launches the real vault CLI with `std::process::Command`
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandLauncher;

impl Launcher for CommandLauncher {
    fn launch(&self, command: &LaunchCommand) -> io::Result<Box<dyn ServiceProcess>> {
        let mut cmd = Command::new(&command.program);
        cmd.args(command.args()).stdin(Stdio::null());
        for (key, value) in command.envs() {
            cmd.env(key, value);
        }

        match &command.log_file {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let log = OpenOptions::new().create(true).append(true).open(path)?;
                cmd.stdout(log.try_clone()?).stderr(log);
            }
            None => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        // Own process group, so the service outlives the terminal session of the caller
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd.spawn()?;
        if let Some(stdout) = child.stdout.take() {
            drain_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            drain_output(stderr, "stderr");
        }
        Ok(Box::new(child))
    }
}

fn drain_output<R: Read + Send + 'static>(reader: R, stream: &'static str) {
    let spawned = thread::Builder::new()
        .name(format!("bw-serve-{stream}"))
        .spawn(move || {
            for line in BufReader::new(reader).lines() {
                match line {
                    Ok(line) => debug!(stream, "bw serve: {}", line),
                    Err(_) => break,
                }
            }
        });
    if let Err(e) = spawned {
        warn!(stream, error = %e, "Failed to start output drain thread for vault service");
    }
}

/// Ownership of a service process started by this client.
///
/// Dropping the handle does NOT stop the process: the service is deliberately
/// detached so later invocations reuse it. Call [`ServiceHandle::terminate`]
/// to stop it explicitly.
pub struct ServiceHandle {
    process: Box<dyn ServiceProcess>,
    command_line: String,
    started_at: Instant,
    ready_after: Duration,
}

impl ServiceHandle {
    pub fn pid(&self) -> Option<u32> {
        self.process.id()
    }

    /// Redacted command line the service was started with
    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time between spawning and the first successful liveness check
    pub fn ready_after(&self) -> Duration {
        self.ready_after
    }

    pub fn is_running(&mut self) -> bool {
        self.process.exit_status().is_none()
    }

    /// Stop the service process
    pub fn terminate(mut self) -> io::Result<()> {
        info!(pid = ?self.pid(), "Stopping vault service");
        self.process.terminate()
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("pid", &self.pid())
            .field("command_line", &self.command_line)
            .field("ready_after", &self.ready_after)
            .finish()
    }
}

/// Polling schedule for a supervised startup
#[derive(Debug, Clone, Copy)]
pub struct StartupWait {
    pub status_timeout: Duration,
    pub poll_interval: Duration,
    pub deadline: Duration,
}

/// Launch the service and wait until it answers, it dies, or the deadline passes.
///
/// On failure a process that is still alive is left running; the deadline alone
/// decides the outcome.
pub fn start_service(
    http: &Client,
    endpoint: &ServiceEndpoint,
    launcher: &dyn Launcher,
    command: &LaunchCommand,
    wait: StartupWait,
) -> Result<ServiceHandle> {
    let unreachable = |reason: String| VaultError::ServiceUnreachable {
        url: endpoint.base_url(),
        reason,
    };

    info!(
        host = %endpoint.host(),
        port = endpoint.port(),
        "Starting persistent vault service at {}",
        endpoint
    );
    debug!(command = %command.display(), "Launching vault service");

    let mut process = launcher.launch(command).map_err(|e| {
        unreachable(format!(
            "failed to launch `{}`: {e}",
            command.program.display()
        ))
    })?;

    let started_at = Instant::now();
    let deadline = started_at + wait.deadline;

    loop {
        if liveness::is_ready(http, endpoint, wait.status_timeout) {
            let ready_after = started_at.elapsed();
            info!(
                pid = ?process.id(),
                ready_after_ms = ready_after.as_millis() as u64,
                "Vault service is ready"
            );
            return Ok(ServiceHandle {
                process,
                command_line: command.display(),
                started_at,
                ready_after,
            });
        }

        if let Some(status) = process.exit_status() {
            warn!(pid = ?process.id(), status = %status, "Vault service exited during startup");
            return Err(unreachable(format!(
                "`{}` exited before becoming ready ({status})",
                command.program.display()
            )));
        }

        let now = Instant::now();
        if now >= deadline {
            warn!(
                pid = ?process.id(),
                deadline_ms = wait.deadline.as_millis() as u64,
                "Vault service did not become ready in time; leaving it running"
            );
            return Err(unreachable(format!(
                "service did not become ready within {:.1}s",
                wait.deadline.as_secs_f64()
            )));
        }

        thread::sleep(wait.poll_interval.min(deadline - now));
    }
}
