use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use scout::agent::{LiveAgent, LiveSettings};
use scout::capture::ScreenCapturer;
use scout::cli::CommonArgs;
use scout::env::setup_env;
use scout::hardware::HardwareInfo;
use scout::{run_agent, telemetry, FrameBoard, YoloDetector};

/// 连续采集屏幕并实时检测
#[derive(Parser, Debug)]
#[command(name = "agent-live", version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// 显示器序号
    #[arg(long, default_value_t = 0)]
    monitor: usize,
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();

    info!("Starting continuous screen capture...");
    info!("Press Ctrl+C or ESC in the window to stop.");
    setup_env(&args.common.kernel_cache).context("Failed to set up environment")?;

    let hardware = HardwareInfo::detect();
    hardware.summary();

    let headless = args.common.headless;
    let settings = LiveSettings { fps: args.common.fps, ..Default::default() };
    let common = args.common;
    let monitor = args.monitor;

    let frames = run_agent("Live Feed", FrameBoard::new(), headless, move |board| {
        let mut agent = LiveAgent::new(
            move || ScreenCapturer::open(monitor),
            move || YoloDetector::setup(&common, &hardware),
            board,
        )
        .with_settings(settings);
        Ok(agent.run())
    })?;

    info!("Processed {frames} frames in total.");
    Ok(())
}
