use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use scout::agent::WebcamAgent;
use scout::capture::WebcamCapturer;
use scout::cli::CommonArgs;
use scout::config::{WEBCAM_INIT_ATTEMPTS, WEBCAM_INIT_DELAY};
use scout::env::setup_env;
use scout::hardware::HardwareInfo;
use scout::{run_agent, telemetry, FrameBoard, YoloDetector};

/// 摄像头实时检测
#[derive(Parser, Debug)]
#[command(name = "agent-webcam", version)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// 摄像头序号
    #[arg(long, default_value_t = 0)]
    camera: u32,
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let args = Args::parse();

    setup_env(&args.common.kernel_cache).context("Failed to set up environment")?;
    info!("Starting Webcam Feed...");

    let hardware = HardwareInfo::detect();
    hardware.summary();

    let headless = args.common.headless;
    let common = args.common;
    let camera = args.camera;

    let frames = run_agent("Webcam Live Feed", FrameBoard::new(), headless, move |board| {
        // 摄像头句柄不能跨线程，在工作线程里打开
        let source = WebcamCapturer::open_with_retries(camera, WEBCAM_INIT_ATTEMPTS, WEBCAM_INIT_DELAY)
            .inspect_err(|_| error!("Failed to initialize webcam after {WEBCAM_INIT_ATTEMPTS} attempts"))?;
        info!("Webcam Initialized successfully at default resolution");

        info!("Initializing YOLO network...");
        let detector = YoloDetector::setup(&common, &hardware)?;

        WebcamAgent::new(source, detector, board).with_fps(common.fps).run()
    })?;

    info!("Processed {frames} frames.");
    Ok(())
}
