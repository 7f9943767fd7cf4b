//! 运行环境准备

use std::path::Path;

use chrono::Local;
use tracing::{error, info};

use crate::error::AgentError;

pub const KERNEL_CACHE_ENV: &str = "OPENCV_OCL4DNN_CONFIG_PATH";

/// 创建推理缓存目录并导出运行所需的环境变量
///
/// 必须在启动任何工作线程之前调用。
pub fn setup_env(kernel_cache: &Path) -> Result<(), AgentError> {
    if !kernel_cache.exists() {
        std::fs::create_dir_all(kernel_cache).map_err(|e| {
            error!("Create Kernel Cache Failed");
            AgentError::Environment { reason: format!("create {}: {e}", kernel_cache.display()) }
        })?;
    }

    // SAFETY: 进程仍是单线程，没有其他线程读取环境变量
    unsafe {
        std::env::set_var(KERNEL_CACHE_ENV, kernel_cache);
        #[cfg(target_os = "linux")]
        std::env::set_var("NO_AT_BRIDGE", "1");
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayServer {
    Wayland,
    X11,
}

/// 检查当前会话是否有可用的窗口系统
pub fn detect_display_server() -> Option<DisplayServer> {
    detect_display_server_with(|key| std::env::var(key).ok())
}

pub fn detect_display_server_with<F>(lookup: F) -> Option<DisplayServer>
where
    F: Fn(&str) -> Option<String>,
{
    let server = if lookup("WAYLAND_DISPLAY").is_some() {
        info!("Wayland display detected");
        Some(DisplayServer::Wayland)
    } else if lookup("DISPLAY").is_some() {
        info!("X11 display detected");
        Some(DisplayServer::X11)
    } else {
        None
    };

    match lookup("XDG_SESSION_TYPE") {
        Some(session) => info!("Session type (XDG_SESSION_TYPE): {session}"),
        None => info!("XDG_SESSION_TYPE environment variable not set."),
    }

    if server.is_none() {
        error!(
            "No Wayland or X11 display environment variable found. The application may not be able to capture the screen."
        );
    }
    server
}

/// 本地时间戳，格式 `YYYYMMDD_HHMMSS`
pub fn timestamp_string() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn wayland_wins_over_x11() {
        let found = detect_display_server_with(lookup(&[
            ("WAYLAND_DISPLAY", "wayland-0"),
            ("DISPLAY", ":0"),
        ]));
        assert_eq!(found, Some(DisplayServer::Wayland));
    }

    #[test]
    fn x11_and_missing() {
        assert_eq!(detect_display_server_with(lookup(&[("DISPLAY", ":1")])), Some(DisplayServer::X11));
        assert_eq!(detect_display_server_with(lookup(&[("XDG_SESSION_TYPE", "tty")])), None);
    }

    #[test]
    fn timestamp_shape() {
        let ts = timestamp_string();
        assert_eq!(ts.len(), 15);
        assert_eq!(&ts[8..9], "_");
        assert!(ts.chars().filter(|c| *c != '_').all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn setup_creates_cache_dir() {
        let dir = std::env::temp_dir().join(format!("scout-env-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        setup_env(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(std::env::var(KERNEL_CACHE_ENV).unwrap(), dir.to_string_lossy());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
