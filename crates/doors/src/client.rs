use crate::config::DoorsConfig;
use crate::dxl::{DXL_ERROR_MARKER, DXL_SUCCESS_MARKER};
use crate::errors::{DoorsError, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tokio::process::Child;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

const PASSWORD_MASK: &str = "********";

/// How the export script signalled that it is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// The script wrote the error marker; carries the text that followed it.
    Failed(String),
}

/// The client invocation for one script:
/// `"<client>" -d <server> -u <user> -P <password> -dxl "#include <script>"`.
#[derive(Clone)]
pub struct ClientCommand {
    program: PathBuf,
    server_addr: String,
    username: String,
    password: String,
    script_path: PathBuf,
    working_dir: Option<PathBuf>,
}

impl ClientCommand {
    pub fn new(config: &DoorsConfig, script_path: &Path) -> Self {
        Self {
            program: config.client_path.clone(),
            server_addr: config.server_addr.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            script_path: script_path.to_path_buf(),
            working_dir: config.working_dir(),
        }
    }

    fn include_directive(&self) -> String {
        format!("#include <{}>", self.script_path.display())
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "-d".to_string(),
            self.server_addr.clone(),
            "-u".to_string(),
            self.username.clone(),
            "-P".to_string(),
            self.password.clone(),
            "-dxl".to_string(),
            self.include_directive(),
        ]
    }

    /// Command line for logs and error messages, password masked.
    pub fn display(&self) -> String {
        format!(
            "\"{}\" -d {} -u {} -P {} -dxl \"{}\"",
            self.program.display(),
            self.server_addr,
            self.username,
            PASSWORD_MASK,
            self.include_directive()
        )
    }

    fn to_command(&self) -> tokio::process::Command {
        let mut command = tokio::process::Command::new(&self.program);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = self.working_dir.as_ref().filter(|dir| dir.is_dir()) {
            command.current_dir(dir);
        }
        command
    }

    pub fn spawn(&self) -> Result<Child> {
        self.to_command().spawn().map_err(|source| DoorsError::Launch {
            command: self.display(),
            source,
        })
    }
}

/// Runs DXL scripts through the DOORS desktop client.
#[derive(Debug, Clone)]
pub struct DoorsClient {
    config: DoorsConfig,
}

impl DoorsClient {
    pub fn new(config: DoorsConfig) -> Self {
        Self { config }
    }

    /// Launches the client on `script_path` and blocks until the script writes
    /// a completion marker into `out_path` or `max_wait` elapses. The client
    /// is killed in every case once the wait ends.
    pub async fn run_script(&self, script_path: &Path, out_path: &Path) -> Result<()> {
        remove_stale_artifact(out_path).await;

        let command = ClientCommand::new(&self.config, script_path);
        let masked = command.display();
        let mut child = command.spawn()?;
        let pid = child.id();
        info!("Executing DOORS command: {masked} (pid {pid:?})");

        let outcome =
            wait_for_marker(out_path, self.config.max_wait, self.config.poll_interval).await;

        self.terminate(&mut child, pid).await;

        match outcome {
            Some(Completion::Succeeded) => {
                info!("DOORS DXL process ended, output marker detected");
                Ok(())
            }
            Some(Completion::Failed(message)) => {
                error!("DXL script reported an error: {message}");
                Err(DoorsError::ClientReported {
                    message,
                    command: masked,
                })
            }
            None => {
                let waited = self.config.max_wait;
                error!(
                    "DXL did not output marker string within {} seconds, command: {masked}",
                    waited.as_secs_f64()
                );
                Err(DoorsError::Timeout {
                    waited,
                    command: masked,
                })
            }
        }
    }

    async fn terminate(&self, child: &mut Child, pid: Option<u32>) {
        match child.try_wait() {
            Ok(Some(status)) => debug!("DOORS client already exited with {status}"),
            _ => match child.kill().await {
                Ok(()) => info!("Terminated DOORS client (pid {pid:?})"),
                Err(e) => warn!("Failed to terminate DOORS client (pid {pid:?}): {e}"),
            },
        }

        if !self.config.kill_by_name {
            return;
        }
        let Some(name) = self.config.executable_name() else {
            return;
        };
        match tokio::task::spawn_blocking(move || terminate_by_name(&name)).await {
            Ok(0) => debug!("No leftover DOORS client processes"),
            Ok(killed) => info!("Killed {killed} leftover DOORS client process(es)"),
            Err(e) => warn!("Process sweep did not complete: {e}"),
        }
    }
}

/// Deletes an export left by an earlier run so it cannot satisfy the marker check.
async fn remove_stale_artifact(out_path: &Path) {
    if !tokio::fs::try_exists(out_path).await.unwrap_or(false) {
        return;
    }
    match tokio::fs::remove_file(out_path).await {
        Ok(()) => info!("Old output deleted: {}", out_path.display()),
        Err(e) => warn!("Failed to delete old output {}: {e}", out_path.display()),
    }
}

/// Polls `path` every `interval` until it contains a completion marker.
/// Returns `None` when `timeout` elapses first.
pub async fn wait_for_marker(
    path: &Path,
    timeout: Duration,
    interval: Duration,
) -> Option<Completion> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(completion) = read_completion(path).await {
            return Some(completion);
        }
        let now = Instant::now();
        if now >= deadline {
            return None;
        }
        tokio::time::sleep(interval.min(deadline - now)).await;
    }
}

async fn read_completion(path: &Path) -> Option<Completion> {
    let bytes = tokio::fs::read(path).await.ok()?;
    let content = String::from_utf8_lossy(&bytes);
    if content.contains(DXL_SUCCESS_MARKER) {
        return Some(Completion::Succeeded);
    }
    let at = content.find(DXL_ERROR_MARKER)?;
    let message = content[at + DXL_ERROR_MARKER.len()..]
        .lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches(':')
        .trim()
        .to_string();
    Some(Completion::Failed(message))
}

/// Kills every process whose executable name equals `name`, ignoring case.
/// Returns how many were killed.
pub fn terminate_by_name(name: &str) -> usize {
    if name.is_empty() {
        return 0;
    }
    let current_pid = std::process::id();
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut killed = 0;
    for (pid, process) in system.processes() {
        if pid.as_u32() == current_pid {
            continue;
        }
        if !process.name().to_string_lossy().eq_ignore_ascii_case(name) {
            continue;
        }
        if process.kill() {
            killed += 1;
            debug!("Killed {name} pid {}", pid.as_u32());
        } else {
            warn!(
                "Failed to kill {name} pid {} (may require elevated permissions)",
                pid.as_u32()
            );
        }
    }
    killed
}
