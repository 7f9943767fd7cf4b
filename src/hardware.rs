//! 硬件检测
//!
//! 通过 ONNX Runtime 的执行提供者判断 CUDA / DirectML 是否可用，
//! Windows 下额外通过 DXGI 读取显卡名称与厂商。

use ort::execution_providers::{CUDAExecutionProvider, DirectMLExecutionProvider, ExecutionProvider};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    #[default]
    Unknown,
}

impl GpuVendor {
    /// 根据 PCI 厂商 ID 判断
    pub fn from_pci_id(id: u32) -> Self {
        match id {
            0x10DE => GpuVendor::Nvidia,
            0x1002 | 0x1022 => GpuVendor::Amd,
            0x8086 => GpuVendor::Intel,
            _ => GpuVendor::Unknown,
        }
    }

    /// 根据厂商名称子串判断
    pub fn from_name(name: &str) -> Self {
        if name.contains("AMD") {
            GpuVendor::Amd
        } else if name.contains("Intel") {
            GpuVendor::Intel
        } else if name.contains("NVIDIA") {
            GpuVendor::Nvidia
        } else {
            GpuVendor::Unknown
        }
    }
}

/// 推理后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Cuda,
    DirectMl,
    Cpu,
}

#[derive(Debug, Clone, Default)]
pub struct HardwareInfo {
    pub has_cuda: bool,
    pub has_directml: bool,
    pub gpu_name: Option<String>,
    pub vendor: GpuVendor,
}

impl HardwareInfo {
    /// 检测可用的推理后端和主显卡
    ///
    /// CUDA 和 DirectML 只在以 `cuda` / `directml` 特性构建时才会被检测，
    /// 默认构建使用 ONNX Runtime 的 CPU 版本。
    pub fn detect() -> Self {
        let mut info = HardwareInfo {
            has_cuda: cfg!(feature = "cuda") && provider_available("CUDA", &CUDAExecutionProvider::default()),
            has_directml: cfg!(feature = "directml")
                && provider_available("DirectML", &DirectMLExecutionProvider::default()),
            ..Default::default()
        };

        if let Some((name, vendor_id)) = primary_adapter() {
            info.vendor = match GpuVendor::from_pci_id(vendor_id) {
                GpuVendor::Unknown => GpuVendor::from_name(&name),
                vendor => vendor,
            };
            info.gpu_name = Some(name);
        }
        if info.has_cuda {
            info.vendor = GpuVendor::Nvidia;
        }
        info
    }

    /// CUDA 优先，其次 DirectML，最后 CPU
    pub fn preferred_backend(&self) -> Backend {
        if self.has_cuda {
            Backend::Cuda
        } else if self.has_directml && self.vendor != GpuVendor::Unknown {
            Backend::DirectMl
        } else {
            Backend::Cpu
        }
    }

    pub fn summary(&self) {
        info!("Hardware Detection Summary");
        info!("GPU Name: {}", self.gpu_name.as_deref().unwrap_or("N/A"));
        match self.preferred_backend() {
            Backend::Cuda => info!("Backend: CUDA enabled. (Optimal performance)"),
            Backend::DirectMl => info!("Backend: DirectML enabled."),
            Backend::Cpu => {
                if !cfg!(any(feature = "cuda", feature = "directml")) {
                    info!("Built without GPU execution providers (enable the `cuda` or `directml` feature)");
                }
                if self.vendor == GpuVendor::Nvidia {
                    info!("Install Nvidia Cuda toolkit for best performance");
                }
                info!("No GPU Acceleration");
            }
        }
    }
}

fn provider_available<E: ExecutionProvider>(name: &str, provider: &E) -> bool {
    match provider.is_available() {
        Ok(available) => available,
        Err(e) => {
            warn!("{name} check failed: {e}");
            false
        }
    }
}

#[cfg(windows)]
fn primary_adapter() -> Option<(String, u32)> {
    use windows::Win32::Graphics::Dxgi::{CreateDXGIFactory1, IDXGIFactory1};

    unsafe {
        let factory: IDXGIFactory1 = CreateDXGIFactory1().ok()?;
        let adapter = factory.EnumAdapters1(0).ok()?;
        let desc = adapter.GetDesc1().ok()?;
        let end = desc.Description.iter().position(|&c| c == 0).unwrap_or(desc.Description.len());
        Some((String::from_utf16_lossy(&desc.Description[..end]), desc.VendorId))
    }
}

#[cfg(not(windows))]
fn primary_adapter() -> Option<(String, u32)> {
    None
}
