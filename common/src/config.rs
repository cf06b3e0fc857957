use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::event::{CreateKind, RemoveKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};

use crate::error::WardenError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct WardenConfig {
    pub enumeration: EnumerationConfig,
    pub sessions: SessionConfig,
    pub report: ReportConfig,
}

impl WardenConfig {
    #[allow(clippy::missing_errors_doc)]
    pub fn validate(&self) -> Result<(), WardenError> {
        self.enumeration.validate()?;
        self.sessions.validate()?;
        self.report.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EnumerationConfig {
    pub treat_null_as_empty: bool,
}

impl EnumerationConfig {
    #[allow(clippy::missing_errors_doc)]
    pub fn validate(&self) -> Result<(), WardenError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    pub excluded_domains: Vec<String>,
    pub local_admin_group: String,
    pub domain_admin_group: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            excluded_domains: vec!["WINDOW MANAGER".to_string(), "FONT DRIVER HOST".to_string()],
            local_admin_group: "Administrators".to_string(),
            domain_admin_group: "Domain Admins".to_string(),
        }
    }
}

impl SessionConfig {
    #[allow(clippy::missing_errors_doc)]
    pub fn validate(&self) -> Result<(), WardenError> {
        if self.excluded_domains.iter().any(|d| d.trim().is_empty()) {
            return Err(WardenError::ConfigError {
                message: "sessions.excluded_domains 不能包含空域名".to_string(),
            });
        }
        if self.local_admin_group.trim().is_empty() {
            return Err(WardenError::ConfigError {
                message: "sessions.local_admin_group 不能为空".to_string(),
            });
        }
        if self.domain_admin_group.trim().is_empty() {
            return Err(WardenError::ConfigError {
                message: "sessions.domain_admin_group 不能为空".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    OpenFiles,
    NetworkFiles,
    NetworkShares,
    NetworkSessions,
    LoggedInUsers,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::OpenFiles,
        ReportKind::NetworkFiles,
        ReportKind::NetworkShares,
        ReportKind::NetworkSessions,
        ReportKind::LoggedInUsers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::OpenFiles => "open_files",
            ReportKind::NetworkFiles => "network_files",
            ReportKind::NetworkShares => "network_shares",
            ReportKind::NetworkSessions => "network_sessions",
            ReportKind::LoggedInUsers => "logged_in_users",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().replace('-', "_").to_ascii_lowercase();
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| format!("未知的报告类型: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    pub include: Vec<ReportKind>,
    pub interval_sec: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include: ReportKind::ALL.to_vec(),
            interval_sec: 0,
        }
    }
}

impl ReportConfig {
    #[allow(clippy::missing_errors_doc)]
    pub fn validate(&self) -> Result<(), WardenError> {
        if self.include.is_empty() {
            return Err(WardenError::ConfigError {
                message: "report.include 至少需要一个报告类型".to_string(),
            });
        }
        Ok(())
    }
}

/// The validated configuration the collector is running with, republished from
/// disk on demand or whenever the file changes.
pub struct ConfigManager {
    path: PathBuf,
    config: Arc<ArcSwap<WardenConfig>>,
    watcher_thread: Option<thread::JoinHandle<()>>,
    stop_tx: Option<mpsc::Sender<()>>,
}

impl ConfigManager {
    #[allow(clippy::missing_errors_doc)]
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, WardenError> {
        let path = path.into();
        let cfg = load_yaml_file(path.as_path())?;
        Self::from_config(path, cfg)
    }

    #[allow(clippy::missing_errors_doc)]
    pub fn from_config(path: impl Into<PathBuf>, cfg: WardenConfig) -> Result<Self, WardenError> {
        cfg.validate()?;
        Ok(Self {
            path: path.into(),
            config: Arc::new(ArcSwap::from_pointee(cfg)),
            watcher_thread: None,
            stop_tx: None,
        })
    }

    pub fn current(&self) -> Arc<WardenConfig> {
        self.config.load_full()
    }

    /// Re-reads the file now. On error the running configuration is kept.
    #[allow(clippy::missing_errors_doc)]
    pub fn reload_now(&self) -> Result<(), WardenError> {
        publish(self.path.as_path(), &self.config)
    }

    /// Republishes the file whenever it is written, created or removed.
    /// Events for other files in the same directory are ignored.
    #[allow(clippy::missing_errors_doc)]
    pub fn start_watching(&mut self) -> Result<(), WardenError> {
        if self.watcher_thread.is_some() {
            return Ok(());
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<bool>();
        let path = self.path.clone();
        let store = Arc::clone(&self.config);

        let handle = thread::spawn(move || {
            let watch_dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            let (event_tx, event_rx) = mpsc::channel::<notify::Result<Event>>();
            let watcher = notify::recommended_watcher(event_tx).and_then(|mut w| {
                w.watch(watch_dir.as_path(), RecursiveMode::NonRecursive)?;
                Ok(w)
            });
            let _watcher = match watcher {
                Ok(w) => w,
                Err(e) => {
                    tracing::warn!(dir = %watch_dir.display(), error = %e, "cannot watch configuration");
                    let _send_result = ready_tx.send(false);
                    return;
                }
            };
            let _send_result = ready_tx.send(true);

            while stop_rx.try_recv().is_err() {
                let Ok(Ok(event)) = event_rx.recv_timeout(Duration::from_millis(200)) else {
                    continue;
                };
                if !touches_config(&event, path.as_path()) {
                    continue;
                }
                // Editors write in several steps; let the file settle.
                thread::sleep(Duration::from_millis(25));
                if let Err(e) = publish(path.as_path(), &store) {
                    tracing::warn!(path = %path.display(), error = %e, "configuration edit ignored");
                }
            }
        });

        if !matches!(ready_rx.recv_timeout(Duration::from_secs(2)), Ok(true)) {
            let _send_result = stop_tx.send(());
            drop(handle.join());
            return Err(WardenError::ConfigError {
                message: format!("无法监听配置文件: {}", self.path.display()),
            });
        }

        self.watcher_thread = Some(handle);
        self.stop_tx = Some(stop_tx);
        Ok(())
    }
}

impl Drop for ConfigManager {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _send_result = tx.send(());
        }
        if let Some(handle) = self.watcher_thread.take() {
            drop(handle.join());
        }
    }
}

/// Loads, validates and swaps in the file at `path`, logging which sections
/// changed.
fn publish(path: &Path, store: &ArcSwap<WardenConfig>) -> Result<(), WardenError> {
    let next = load_yaml_file(path)?;
    next.validate()?;
    let next = Arc::new(next);
    let prev = store.swap(Arc::clone(&next));

    if prev.report != next.report {
        tracing::info!(
            include = ?next.report.include,
            interval_sec = next.report.interval_sec,
            "report schedule changed"
        );
    }
    if prev.sessions != next.sessions || prev.enumeration != next.enumeration {
        tracing::info!(path = %path.display(), "enumeration settings changed");
    }
    Ok(())
}

#[allow(clippy::missing_errors_doc)]
pub fn load_yaml_file(path: &Path) -> Result<WardenConfig, WardenError> {
    let text = std::fs::read_to_string(path).map_err(WardenError::IoError)?;
    serde_yaml::from_str::<WardenConfig>(&text).map_err(|e| WardenError::ConfigError {
        message: format!("解析配置 YAML 失败（{}）: {e}", path.display()),
    })
}

fn touches_config(event: &Event, path: &Path) -> bool {
    let relevant_kind = matches!(
        event.kind,
        EventKind::Modify(_)
            | EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Remove(RemoveKind::File | RemoveKind::Any)
            | EventKind::Any
    );
    let file_name = path.file_name();
    relevant_kind
        && (event.paths.is_empty() || event.paths.iter().any(|p| p.file_name() == file_name))
}
