//! rswprobe - 混合式网站技术栈识别命令行工具
use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use rswappalyzer_probe::browser::ChromiumBrowser;
use rswappalyzer_probe::cli::Cli;
use rswappalyzer_probe::input::collect_urls;
use rswappalyzer_probe::output::create_sink;
use rswappalyzer_probe::{logging, FingerprintOracle, ScanMode, ScanSummary, Scheduler, TechDetector};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(env!("CARGO_CRATE_NAME"), cli.silent);

    match run(cli).await {
        Ok(summary) => {
            info!(
                "Scan finished: {} URLs, {} written, {} failed, {} discarded",
                summary.total, summary.written, summary.failed, summary.discarded
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ScanSummary> {
    let format = cli.output_format()?;

    let stdin = io::stdin();
    let piped = (!stdin.is_terminal()).then(|| stdin.lock());
    let urls = collect_urls(piped, cli.list.as_deref(), &cli.urls)?;

    let source = cli.fingerprint_source();
    let oracle = FingerprintOracle::load(&source)
        .await
        .context("failed to initialize fingerprints")?;
    info!("Loaded {} technologies ({:?})", oracle.technology_count(), source);

    let config = cli.scan_config();
    let mode = config.mode;
    let mut detector = TechDetector::new(config, Arc::new(oracle))?;
    if mode == ScanMode::Hybrid {
        detector = detector.with_browser(Arc::new(ChromiumBrowser::new()));
    }

    let mut sink = create_sink(format, cli.detailed, cli.output.as_deref())?;
    info!("Scanning {} URLs in {} mode", urls.len(), mode);

    let outcome = Scheduler::new(detector).run(urls, sink.as_mut()).await;
    let closed = sink.close();
    let summary = outcome?;
    closed.context("failed to finalize output")?;
    Ok(summary)
}
