use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use scout::agent::ScreenshotAgent;
use scout::capture::{ScreenCapturer, Screenshot};
use scout::cli::CommonArgs;
use scout::config::{DEFAULT_SCREENSHOT_DIR, SCREENSHOT_INTERVAL};
use scout::env::setup_env;
use scout::hardware::HardwareInfo;
use scout::{run_agent, telemetry, FrameBoard, YoloDetector};

/// 定时截图并在后台检测
#[derive(Parser, Debug)]
#[command(name = "agent-screenshot", version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// 显示器序号
    #[arg(long, default_value_t = 0)]
    monitor: usize,

    /// 截图保存目录
    #[arg(long, value_name = "DIR", default_value = DEFAULT_SCREENSHOT_DIR)]
    output: PathBuf,

    /// 截图间隔（秒）
    #[arg(long, default_value_t = SCREENSHOT_INTERVAL.as_secs())]
    interval_secs: u64,
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();

    setup_env(&args.common.kernel_cache).context("Failed to set up environment. Exiting.")?;

    #[cfg(target_os = "linux")]
    if scout::env::detect_display_server().is_none() {
        anyhow::bail!("No supported windowing system found");
    }

    let hardware = HardwareInfo::detect();
    hardware.summary();

    info!("Loading Model...");
    let detector = YoloDetector::setup(&args.common, &hardware)?;
    info!("Model Loaded Successfully...");

    let monitor = args.monitor;
    let output = args.output;
    let interval = Duration::from_secs(args.interval_secs);

    let frames = run_agent("Screenshot", FrameBoard::new(), args.common.headless, move |board| {
        let mut screenshot = Screenshot::new(output, move || ScreenCapturer::open(monitor))?;
        let mut agent = ScreenshotAgent::new(detector, board).with_interval(interval);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        runtime.block_on(agent.run(&mut screenshot))
    })?;

    info!("Processed {frames} screenshots.");
    Ok(())
}
