//! 启动代理
//!
//! 代理在工作线程上运行，主线程负责窗口（或在无窗口模式下等待 Ctrl+C）。

use std::thread;
use std::time::Duration;

use tracing::info;

use crate::error::AgentError;
use crate::utils::FrameBoard;
use crate::viewer;

const QUIT_POLL: Duration = Duration::from_millis(50);

/// 运行代理直到窗口关闭、ESC、Ctrl+C 或代理自行结束
///
/// 任何一方结束都会设置退出标志，随后等待工作线程退出并返回其结果。
pub fn run_agent<F>(title: &str, board: FrameBoard, headless: bool, pipeline: F) -> Result<u64, AgentError>
where
    F: FnOnce(FrameBoard) -> Result<u64, AgentError> + Send + 'static,
{
    let worker_board = board.clone();
    let worker = thread::Builder::new().name("agent-worker".into()).spawn(move || {
        let result = pipeline(worker_board.clone());
        worker_board.request_quit();
        result
    })?;

    let shown = if headless { wait_for_ctrl_c(&board) } else { viewer::show(title, board.clone()) };
    board.request_quit();

    let result = worker
        .join()
        .map_err(|_| AgentError::Task { reason: "agent worker panicked".into() })?;
    shown?;
    result
}

fn wait_for_ctrl_c(board: &FrameBoard) -> Result<(), AgentError> {
    info!("Press Ctrl+C to exit");
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("Ctrl+C received, stopping...");
            }
            _ = wait_until_quit(board) => {}
        }
        Ok::<(), AgentError>(())
    })
}

async fn wait_until_quit(board: &FrameBoard) {
    while !board.should_quit() {
        tokio::time::sleep(QUIT_POLL).await;
    }
}
