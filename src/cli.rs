//! 命令行参数定义
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use tracing::warn;

use crate::config::{FingerprintSource, ScanConfig, ScanMode, DEFAULT_USER_AGENT};
use crate::error::ProbeResult;
use crate::output::OutputFormat;

/// Detect web technologies with static fingerprints plus live-browser verification.
#[derive(Parser, Debug, Clone)]
#[command(name = "rswprobe", author, version, about, long_about = None)]
pub struct Cli {
    /// Target URLs
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Read URLs from file (one per line)
    #[arg(short = 'l', long = "list", value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'c', long, default_value_t = 1)]
    pub concurrency: usize,

    /// Static HTTP mode only (no browser)
    #[arg(long = "static")]
    pub static_mode: bool,

    /// Run the browser headless
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    pub headless: bool,

    /// Wait time for deferred scripts before browser checks (e.g. 500ms, 3s)
    #[arg(long, default_value = "3s", value_parser = parse_duration, value_name = "DURATION")]
    pub wait: Duration,

    /// Total timeout per URL, including the browser phase
    #[arg(long, default_value = "30s", value_parser = parse_duration, value_name = "DURATION")]
    pub timeout: Duration,

    /// Custom User-Agent header
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Load fingerprints from a JSON file instead of the embedded set
    #[arg(long, value_name = "FILE", conflicts_with = "fingerprints_dir")]
    pub fingerprints: Option<PathBuf>,

    /// Load and merge every *.json fingerprint file in a directory
    #[arg(long, value_name = "DIR")]
    pub fingerprints_dir: Option<PathBuf>,

    /// Output format: text, json, jsonl
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Output results as JSON (deprecated, use --format json)
    #[arg(long)]
    pub json: bool,

    /// Include categories, website and description
    #[arg(long)]
    pub detailed: bool,

    /// Write output to file instead of stdout
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Only print results and errors
    #[arg(long)]
    pub silent: bool,
}

impl Cli {
    pub fn scan_config(&self) -> ScanConfig {
        let mode = if self.static_mode {
            ScanMode::Static
        } else {
            ScanMode::Hybrid
        };
        ScanConfig::builder()
            .mode(mode)
            .timeout(self.timeout)
            .settle_delay(self.wait)
            .concurrency(self.concurrency)
            .user_agent(self.user_agent.clone())
            .headless(self.headless)
            .build()
    }

    pub fn fingerprint_source(&self) -> FingerprintSource {
        match (&self.fingerprints, &self.fingerprints_dir) {
            (Some(file), _) => FingerprintSource::File(file.clone()),
            (None, Some(dir)) => FingerprintSource::Directory(dir.clone()),
            (None, None) => FingerprintSource::Embedded,
        }
    }

    /// `--json` 覆盖 `--format`
    pub fn output_format(&self) -> ProbeResult<OutputFormat> {
        if self.json {
            warn!("--json is deprecated, use --format json instead");
            return Ok(OutputFormat::Json);
        }
        self.format.parse()
    }
}

/// 解析时长：`500ms` / `3s` / `2m` / 纯数字（秒）
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };

    let value: f64 = number
        .parse()
        .map_err(|_| format!("invalid duration: {:?}", raw))?;
    let seconds = match unit.trim() {
        "ms" => value / 1000.0,
        "s" => value,
        "m" => value * 60.0,
        other => return Err(format!("invalid duration unit {:?} (use ms, s or m)", other)),
    };
    Duration::try_from_secs_f64(seconds).map_err(|e| format!("invalid duration {:?}: {}", raw, e))
}
