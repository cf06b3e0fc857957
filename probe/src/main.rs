#![allow(missing_docs)]

mod report;

use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use common::collectors::local_host_name;
use common::config::{ConfigManager, ReportKind, WardenConfig};
use common::telemetry::init_telemetry;

use crate::report::ReportWriter;

#[derive(Parser, Debug)]
#[command(name = "warden-probe", version)]
struct Cli {
    /// YAML configuration; built-in defaults when omitted.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    /// Restrict the run to these kinds; repeatable.
    #[arg(long = "only")]
    only: Vec<ReportKind>,

    /// Seconds between rounds; 0 runs once.
    #[arg(long = "interval")]
    interval: Option<u64>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    init_telemetry().map_err(|e| format!("初始化日志失败: {e}"))?;
    let cli = Cli::parse();

    let mut mgr = match cli.config.as_ref() {
        Some(path) => Some(
            ConfigManager::load(path.clone())
                .map_err(|e| format!("加载配置失败（{}）: {e}", path.display()))?,
        ),
        None => None,
    };

    let first = effective_config(mgr.as_ref(), &cli);
    if first.report.interval_sec > 0
        && let Some(mgr) = mgr.as_mut()
    {
        mgr.start_watching()
            .map_err(|e| format!("启动配置热加载失败: {e}"))?;
    }

    let host = local_host_name();
    tracing::info!(host = %host, kinds = first.report.include.len(), "probe started");

    let stdout = io::stdout();
    let mut writer = ReportWriter::new(stdout.lock(), host);
    loop {
        let cfg = effective_config(mgr.as_ref(), &cli);
        writer
            .run_round(&cfg)
            .and_then(|()| writer.get_mut().flush())
            .map_err(|e| format!("写出报告失败: {e}"))?;

        if cfg.report.interval_sec == 0 {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(cfg.report.interval_sec));
    }
}

/// Live configuration with command-line overrides applied on top.
fn effective_config(mgr: Option<&ConfigManager>, cli: &Cli) -> WardenConfig {
    let mut cfg = mgr.map_or_else(WardenConfig::default, |m| (*m.current()).clone());
    if !cli.only.is_empty() {
        cfg.report.include.clone_from(&cli.only);
    }
    if let Some(interval) = cli.interval {
        cfg.report.interval_sec = interval;
    }
    cfg
}
