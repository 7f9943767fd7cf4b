//! Windows 桌面复制采集
//!
//! 每次取帧：AcquireNextFrame → 拷贝到 CPU 可读的暂存纹理 → Map → 转 RGB → ReleaseFrame。

use std::{slice, thread};

use image::RgbImage;
use tracing::{debug, info};
use windows::{
    core::{Interface, HRESULT},
    Win32::{
        Foundation::HMODULE,
        Graphics::{
            Direct3D::{D3D_DRIVER_TYPE_UNKNOWN, D3D_FEATURE_LEVEL_11_0},
            Direct3D11::{
                D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Texture2D,
                D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAPPED_SUBRESOURCE,
                D3D11_MAP_READ, D3D11_SDK_VERSION, D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
            },
            Dxgi::{
                CreateDXGIFactory1, IDXGIAdapter, IDXGIFactory1, IDXGIOutput1, IDXGIOutputDuplication,
                IDXGIResource, DXGI_ERROR_ACCESS_DENIED, DXGI_ERROR_ACCESS_LOST,
                DXGI_ERROR_DEVICE_HUNG, DXGI_ERROR_DEVICE_REMOVED, DXGI_ERROR_DEVICE_RESET,
                DXGI_ERROR_NOT_FOUND, DXGI_ERROR_WAIT_TIMEOUT, DXGI_OUTDUPL_FRAME_INFO,
                DXGI_OUTPUT_DESC,
            },
        },
    },
};

use crate::capture::{bgra_to_rgb, retry_grab, FrameSource};
use crate::config::{ACQUIRE_RETRIES, ACQUIRE_RETRY_DELAY, ACQUIRE_TIMEOUT_MS};
use crate::error::CaptureError;

/// 桌面复制会话
///
/// 会话失效（ACCESS_LOST 或设备丢失）后不能继续使用，需要重新 `open`。
pub struct ScreenCapturer {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    duplication: IDXGIOutputDuplication,
    staging: Option<StagingTexture>,
    width: u32,
    height: u32,
}

struct StagingTexture {
    texture: ID3D11Texture2D,
    width: u32,
    height: u32,
}

impl ScreenCapturer {
    /// 打开第 `output_index` 个连接到桌面的显示输出
    pub fn open(output_index: usize) -> Result<Self, CaptureError> {
        let (device, context, duplication, desc) = create_duplication(output_index)?;
        let (width, height) = output_dimensions(&desc);
        info!("Desktop duplication ready on output {output_index} ({width}x{height})");

        Ok(Self { device, context, duplication, staging: None, width, height })
    }

    fn try_acquire(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        unsafe {
            let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
            let mut resource: Option<IDXGIResource> = None;

            if let Err(err) =
                self.duplication.AcquireNextFrame(ACQUIRE_TIMEOUT_MS, &mut frame_info, &mut resource)
            {
                return classify(err.code(), "AcquireNextFrame").map(|_| None);
            }

            let frame = self.copy_frame(resource);
            if let Err(err) = self.duplication.ReleaseFrame() {
                classify(err.code(), "ReleaseFrame")?;
            }
            frame.map(Some)
        }
    }

    fn copy_frame(&mut self, resource: Option<IDXGIResource>) -> Result<RgbImage, CaptureError> {
        let resource = resource.ok_or(CaptureError::Backend {
            context: "AcquireNextFrame",
            reason: "no desktop resource returned".into(),
        })?;

        unsafe {
            let desktop: ID3D11Texture2D =
                resource.cast().map_err(|err| os_error("IDXGIResource::cast<ID3D11Texture2D>", err))?;

            let mut desc = D3D11_TEXTURE2D_DESC::default();
            desktop.GetDesc(&mut desc);
            let staging = self.staging_for(&desc)?;

            self.context.CopyResource(&staging, &desktop);

            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            self.context
                .Map(&staging, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
                .map_err(|err| os_error("Map staging texture", err))?;

            let pitch = mapped.RowPitch as usize;
            let bytes = slice::from_raw_parts(mapped.pData as *const u8, pitch * desc.Height as usize);
            let image = bgra_to_rgb(bytes, desc.Width, desc.Height, pitch);

            self.context.Unmap(&staging, 0);
            image
        }
    }

    /// 尺寸不变时复用暂存纹理
    fn staging_for(&mut self, desktop: &D3D11_TEXTURE2D_DESC) -> Result<ID3D11Texture2D, CaptureError> {
        if let Some(staging) = &self.staging {
            if staging.width == desktop.Width && staging.height == desktop.Height {
                return Ok(staging.texture.clone());
            }
        }

        let desc = D3D11_TEXTURE2D_DESC {
            Width: desktop.Width,
            Height: desktop.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desktop.Format,
            SampleDesc: desktop.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: 0,
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: 0,
        };

        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe {
            self.device
                .CreateTexture2D(&desc, None, Some(&mut texture))
                .map_err(|err| os_error("CreateTexture2D (staging)", err))?;
        }
        let texture = texture.ok_or(CaptureError::Backend {
            context: "CreateTexture2D (staging)",
            reason: "no texture returned".into(),
        })?;

        debug!("Staging texture {}x{}", desktop.Width, desktop.Height);
        self.staging = Some(StagingTexture { texture: texture.clone(), width: desktop.Width, height: desktop.Height });
        Ok(texture)
    }
}

impl FrameSource for ScreenCapturer {
    /// 最多尝试3次，每次等待100ms，间隔10ms
    ///
    /// 需要重建会话的错误立即返回；其他错误在次数内重试，最后一次仍失败则返回该错误，
    /// 都超时则返回 `None`。
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        retry_grab(ACQUIRE_RETRIES, || self.try_acquire(), || thread::sleep(ACQUIRE_RETRY_DELAY))
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// 把 DXGI 错误码映射到采集错误，超时返回 `Ok`
fn classify(code: HRESULT, context: &'static str) -> Result<(), CaptureError> {
    if code == DXGI_ERROR_WAIT_TIMEOUT {
        Ok(())
    } else if code == DXGI_ERROR_ACCESS_LOST || code == DXGI_ERROR_ACCESS_DENIED {
        Err(CaptureError::AccessLost)
    } else if code == DXGI_ERROR_DEVICE_REMOVED
        || code == DXGI_ERROR_DEVICE_RESET
        || code == DXGI_ERROR_DEVICE_HUNG
    {
        Err(CaptureError::DeviceLost { code: code.0 as u32 })
    } else {
        Err(CaptureError::Os { context, code: code.0 as u32 })
    }
}

fn create_duplication(
    target_output: usize,
) -> Result<(ID3D11Device, ID3D11DeviceContext, IDXGIOutputDuplication, DXGI_OUTPUT_DESC), CaptureError> {
    unsafe {
        let factory: IDXGIFactory1 =
            CreateDXGIFactory1().map_err(|err| os_error("CreateDXGIFactory1", err))?;
        let mut desktop_index = 0usize;

        for adapter_index in 0.. {
            let adapter = match factory.EnumAdapters1(adapter_index) {
                Ok(adapter) => adapter,
                Err(err) if err.code() == DXGI_ERROR_NOT_FOUND => break,
                Err(err) => return Err(os_error("EnumAdapters1", err)),
            };
            let adapter: IDXGIAdapter =
                adapter.cast().map_err(|err| os_error("IDXGIAdapter1::cast<IDXGIAdapter>", err))?;

            for output_index in 0.. {
                let output = match adapter.EnumOutputs(output_index) {
                    Ok(output) => output,
                    Err(err) if err.code() == DXGI_ERROR_NOT_FOUND => break,
                    Err(err) => return Err(os_error("IDXGIAdapter::EnumOutputs", err)),
                };

                let desc = output.GetDesc().map_err(|err| os_error("IDXGIOutput::GetDesc", err))?;
                if !desc.AttachedToDesktop.as_bool() {
                    continue;
                }
                if desktop_index != target_output {
                    desktop_index += 1;
                    continue;
                }

                let (device, context) = create_device(&adapter)?;
                let output1: IDXGIOutput1 =
                    output.cast().map_err(|err| os_error("IDXGIOutput::cast<IDXGIOutput1>", err))?;
                let duplication = output1.DuplicateOutput(&device).map_err(|err| {
                    match classify(err.code(), "IDXGIOutput1::DuplicateOutput") {
                        Err(mapped) => mapped,
                        Ok(()) => os_error("IDXGIOutput1::DuplicateOutput", err),
                    }
                })?;
                return Ok((device, context, duplication, desc));
            }
        }
    }

    Err(CaptureError::NoOutput(format!("display output {target_output} not found")))
}

fn create_device(adapter: &IDXGIAdapter) -> Result<(ID3D11Device, ID3D11DeviceContext), CaptureError> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;
    let feature_levels = [D3D_FEATURE_LEVEL_11_0];

    unsafe {
        D3D11CreateDevice(
            Some(adapter),
            D3D_DRIVER_TYPE_UNKNOWN,
            HMODULE::default(),
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            Some(&feature_levels),
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )
        .map_err(|err| os_error("D3D11CreateDevice", err))?;
    }

    match (device, context) {
        (Some(device), Some(context)) => Ok((device, context)),
        _ => Err(CaptureError::Backend { context: "D3D11CreateDevice", reason: "no device returned".into() }),
    }
}

fn output_dimensions(desc: &DXGI_OUTPUT_DESC) -> (u32, u32) {
    let width = (desc.DesktopCoordinates.right - desc.DesktopCoordinates.left).max(1) as u32;
    let height = (desc.DesktopCoordinates.bottom - desc.DesktopCoordinates.top).max(1) as u32;
    (width, height)
}

fn os_error(context: &'static str, err: windows::core::Error) -> CaptureError {
    CaptureError::Os { context, code: err.code().0 as u32 }
}
