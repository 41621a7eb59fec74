//! Dev-server preview processes
//!
//! At most one preview runs per workspace. The [`PreviewRegistry`] is created
//! once by the host and shared with whichever service starts previews.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use node_engine::format_timestamp;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpListener;
use tokio::process::{Child, Command};

use crate::error::{Result, ServiceError};
use crate::values::PreviewRef;

/// Lines of stdout/stderr kept per preview
pub const LOG_TAIL_LINES: usize = 120;

type LogTail = Arc<Mutex<VecDeque<String>>>;

/// A spawned dev server
pub struct PreviewProcess {
    pub workspace_path: PathBuf,
    pub hero_id: String,
    pub url: String,
    pub port: u16,
    pub pid: u32,
    child: Child,
    logs: LogTail,
}

impl PreviewProcess {
    /// Spawn `<package_manager> dev --port <port>` inside `workspace_path`
    pub fn spawn(
        package_manager: &str,
        workspace_path: &Path,
        hero_id: &str,
        port: u16,
    ) -> Result<Self> {
        let mut child = Command::new(package_manager)
            .args(["dev", "--port", &port.to_string()])
            .current_dir(workspace_path)
            .env("FORCE_COLOR", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child.id().ok_or(ServiceError::PreviewSpawn)?;
        let logs: LogTail = Arc::new(Mutex::new(VecDeque::new()));

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(tail_lines(stdout, "stdout", logs.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(tail_lines(stderr, "stderr", logs.clone()));
        }

        Ok(Self {
            workspace_path: workspace_path.to_path_buf(),
            hero_id: hero_id.to_string(),
            url: format!("http://localhost:{}/preview/{}", port, hero_id),
            port,
            pid,
            child,
            logs,
        })
    }

    /// Whether the process has not exited yet
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub fn preview_ref(&self) -> PreviewRef {
        PreviewRef {
            url: self.url.clone(),
            port: self.port,
            pid: self.pid,
        }
    }

    pub fn info(&self) -> PreviewInfo {
        PreviewInfo {
            workspace_path: self.workspace_path.display().to_string(),
            hero_id: self.hero_id.clone(),
            url: self.url.clone(),
            port: self.port,
            pid: self.pid,
            logs: self.logs.lock().iter().cloned().collect(),
        }
    }

    /// SIGTERM, then SIGKILL if still running after `grace`
    pub async fn stop(mut self, grace: Duration) -> Result<()> {
        if !self.is_alive() {
            return Ok(());
        }

        log::info!("Sending SIGTERM to preview process {}", self.pid);
        let status = Command::new("kill")
            .args(["-TERM", &self.pid.to_string()])
            .status()
            .await?;
        if !status.success() {
            log::warn!("kill -TERM {} exited with {}", self.pid, status);
        }

        tokio::time::sleep(grace).await;

        if self.is_alive() {
            log::warn!(
                "Preview process {} didn't exit gracefully, sending SIGKILL",
                self.pid
            );
            self.child.kill().await?;
        }
        Ok(())
    }
}

/// Snapshot of a live preview
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewInfo {
    pub workspace_path: String,
    pub hero_id: String,
    pub url: String,
    pub port: u16,
    pub pid: u32,
    /// Most recent output lines, oldest first
    pub logs: Vec<String>,
}

/// Preview processes keyed by absolute workspace path
#[derive(Default)]
pub struct PreviewRegistry {
    entries: Mutex<HashMap<PathBuf, PreviewProcess>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live preview for `workspace`
    ///
    /// A dead entry is evicted and reported as absent.
    pub fn get(&self, workspace: &Path) -> Option<PreviewInfo> {
        let mut entries = self.entries.lock();
        let process = entries.get_mut(workspace)?;
        if process.is_alive() {
            return Some(process.info());
        }
        log::info!("Preview for {:?} exited, dropping it", workspace);
        entries.remove(workspace);
        None
    }

    pub fn is_alive(&self, workspace: &Path) -> bool {
        self.entries
            .lock()
            .get_mut(workspace)
            .is_some_and(PreviewProcess::is_alive)
    }

    /// Track `process`, returning the entry it replaced
    pub fn insert(&self, process: PreviewProcess) -> Option<PreviewProcess> {
        self.entries
            .lock()
            .insert(process.workspace_path.clone(), process)
    }

    pub fn remove(&self, workspace: &Path) -> Option<PreviewProcess> {
        self.entries.lock().remove(workspace)
    }

    /// Workspaces with a tracked preview, sorted
    pub fn workspaces(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Check that the package manager runs at all
pub async fn ensure_package_manager(package_manager: &str) -> Result<()> {
    let status = Command::new(package_manager)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(ServiceError::PackageManagerMissing(package_manager.to_string())),
    }
}

/// Marker written once dependencies are installed in a workspace
pub const DEPS_MARKER: &str = ".superhero-deps-installed";

/// Install workspace dependencies unless the marker says it was done
pub async fn ensure_dependencies(
    package_manager: &str,
    workspace_path: &Path,
    log: &node_engine::NodeLogger,
) -> Result<()> {
    let marker = workspace_path.join(DEPS_MARKER);
    if tokio::fs::try_exists(&marker).await? {
        return Ok(());
    }

    log.log(format!(
        "Installing workspace dependencies with {}...",
        package_manager
    ));
    let output = Command::new(package_manager)
        .arg("install")
        .current_dir(workspace_path)
        .env("FORCE_COLOR", "0")
        .kill_on_drop(true)
        .stdin(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            format!("{} install failed in workspace", package_manager)
        } else {
            stderr
        };
        return Err(ServiceError::InstallFailed(message));
    }

    tokio::fs::write(&marker, format!("{}\n", format_timestamp(Utc::now()))).await?;
    log.log("Workspace dependencies installed");
    Ok(())
}

/// First port in `start..=end` that 127.0.0.1 can bind
pub async fn find_free_port(start: u16, end: u16) -> Result<u16> {
    for port in start..=end {
        if TcpListener::bind(("127.0.0.1", port)).await.is_ok() {
            return Ok(port);
        }
    }
    Err(ServiceError::NoFreePort { start, end })
}

/// Poll `url` until it answers with a success status
pub async fn wait_for_url(url: &str, timeout: Duration, poll_interval: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(poll_interval.max(Duration::from_secs(2)))
        .build()?;
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => log::debug!("Preview {} answered {}", url, response.status()),
            Err(e) => log::debug!("Preview {} not ready: {}", url, e),
        }
        if tokio::time::Instant::now() + poll_interval > deadline {
            return Err(ServiceError::PreviewNotReady);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

async fn tail_lines<R>(reader: R, source: &'static str, logs: LogTail)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut tail = logs.lock();
        tail.push_back(format!("[{}][{}] {}", format_timestamp(Utc::now()), source, line));
        while tail.len() > LOG_TAIL_LINES {
            tail.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_free_port_skips_bound_ports() {
        let held = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = held.local_addr().unwrap().port();

        let err = find_free_port(port, port).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoFreePort { .. }));

        drop(held);
        assert_eq!(find_free_port(port, port).await.unwrap(), port);
    }

    #[tokio::test]
    async fn test_log_tail_is_bounded() {
        let logs: LogTail = Arc::new(Mutex::new(VecDeque::new()));
        let text: String = (0..200).map(|i| format!("line {}\n\n", i)).collect();

        tail_lines(text.as_bytes(), "stdout", logs.clone()).await;

        let tail = logs.lock();
        assert_eq!(tail.len(), LOG_TAIL_LINES);
        assert!(tail.front().unwrap().ends_with("[stdout] line 80"));
        assert!(tail.back().unwrap().ends_with("[stdout] line 199"));
    }

    #[tokio::test]
    async fn test_missing_package_manager() {
        let pm = "definitely-not-a-package-manager";
        let err = ensure_package_manager(pm).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "{} is required for preview.run. Please install {} and retry.",
                pm, pm
            )
        );
    }

    #[test]
    fn test_empty_registry() {
        let registry = PreviewRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get(Path::new("/tmp/nowhere")).is_none());
        assert!(!registry.is_alive(Path::new("/tmp/nowhere")));
        assert!(registry.remove(Path::new("/tmp/nowhere")).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_reuse_and_stop() {
        let dir = tempfile::TempDir::new().unwrap();
        // Stand-in package manager that ignores its arguments
        let script = dir.path().join("fake-pm");
        std::fs::write(&script, "#!/bin/sh\necho ready\nexec sleep 30\n").unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let registry = PreviewRegistry::new();
        let process =
            PreviewProcess::spawn(script.to_str().unwrap(), dir.path(), "hero_x", 3999).unwrap();
        assert_eq!(process.url, "http://localhost:3999/preview/hero_x");
        assert!(registry.insert(process).is_none());
        assert!(registry.is_alive(dir.path()));

        let info = registry.get(dir.path()).unwrap();
        assert_eq!(info.port, 3999);

        let process = registry.remove(dir.path()).unwrap();
        process.stop(Duration::from_millis(100)).await.unwrap();
        assert!(registry.is_empty());
    }
}
