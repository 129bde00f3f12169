// src/renderer.rs

use winit::window::Window;

use crate::asset_manager::{AssetManager, TextureWrap};
use crate::error::EngineError;
use crate::logger::RENDERING_TARGET;

/// スプライト描画に使うシェーダー（asset_root からの相対パス）
pub const SPRITE_SHADER_PATH: &str = "shader_sprite.wgsl";

/// スプライトの頂点。位置はワールド座標。
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpriteVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

impl SpriteVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SpriteVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// 描画エンジンの中心構造体。WGPU の初期化、サーフェスの管理、
/// スプライト用パイプラインの保持を担当する。
pub struct Renderer {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub surface: wgpu::Surface,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,

    sprite_pipeline: wgpu::RenderPipeline,
    uniform_bind_group_layout: wgpu::BindGroupLayout,
    texture_bind_group_layout: wgpu::BindGroupLayout,

    // 描画先の矩形（左上原点、ピクセル単位）。None ならサーフェス全体
    viewport: Option<[f32; 4]>,
}

/// テクスチャとサンプラーをまとめた構造体。
/// テクスチャ本体も保持することで、ビューが無効にならないようにする。
pub struct TextureHandle {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl TextureHandle {
    /// RGBA8 の画像を GPU に転送する。
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::RgbaImage,
        wrap: TextureWrap,
        label: Option<&str>,
    ) -> Self {
        let (width, height) = img.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            img,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wrap.into(),
            address_mode_v: wrap.into(),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }
}

/// 1 フレーム分の描画先。Renderer::begin_frame で取得し、Renderer::present で提出する。
pub struct Frame {
    output: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

impl Renderer {
    /// Renderer構造体の初期化。
    /// ウィンドウと連携し、WGPUの初期化・パイプライン・バインドレイアウトをセットアップする。
    pub async fn new(window: &Window, vsync: bool, assets: &mut AssetManager) -> Result<Self, EngineError> {
        // ウィンドウサイズ取得（物理サイズ）
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        // window は Renderer より長生きする（run_game のクロージャが両方を所有する）
        let surface = unsafe { instance.create_surface(window) }?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .ok_or(EngineError::NoAdapter)?;
        log::info!(target: RENDERING_TARGET, "using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let surface_format = *caps.formats.first().ok_or(EngineError::NoSurfaceFormat)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: present_mode(vsync),
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Opaque),
            view_formats: vec![surface_format],
        };
        surface.configure(&device, &config);

        // group 0: 射影行列
        let uniform_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Uniform BindGroup Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        // group 1: texture + sampler
        let texture_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Texture BindGroup Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = assets.load_shader(&device, SPRITE_SHADER_PATH)?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sprite Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let sprite_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[SpriteVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        Ok(Self {
            device,
            queue,
            surface,
            config,
            surface_format,
            sprite_pipeline,
            uniform_bind_group_layout,
            texture_bind_group_layout,
            viewport: None,
        })
    }

    /// ウィンドウサイズが変更されたときの処理。新しい物理サイズでサーフェスを再構成する。
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    /// 描画先の矩形を設定する（左上原点、[x, y, w, h]）。
    pub fn set_viewport(&mut self, rect: Option<[f32; 4]>) {
        self.viewport = rect;
    }

    /// 現在のサーフェスに収まるように切り詰めた描画矩形。
    pub fn viewport_rect(&self) -> [f32; 4] {
        clamp_rect(self.viewport, self.config.width, self.config.height)
    }

    pub fn sprite_pipeline(&self) -> &wgpu::RenderPipeline {
        &self.sprite_pipeline
    }

    pub fn uniform_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.uniform_bind_group_layout
    }

    pub fn texture_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.texture_bind_group_layout
    }

    /// サーフェスから次のフレームを取得する。
    /// サーフェスが失われていた場合は再構成して None を返す（そのフレームは描画しない）。
    pub fn begin_frame(&mut self) -> Result<Option<Frame>, wgpu::SurfaceError> {
        let output = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!(target: RENDERING_TARGET, "surface lost, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!(target: RENDERING_TARGET, "surface timeout, skipping frame");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });
        Ok(Some(Frame { output, view, encoder }))
    }

    /// 記録したコマンドを提出して画面に表示する。
    pub fn present(&self, frame: Frame) {
        self.queue.submit(Some(frame.encoder.finish()));
        frame.output.present();
    }

    /// 描画先全体を指定色でクリアする。
    pub fn clear(&self, frame: &mut Frame, color: wgpu::Color) {
        let _render_pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: true,
                },
            })],
            depth_stencil_attachment: None,
        });
    }
}

fn present_mode(vsync: bool) -> wgpu::PresentMode {
    if vsync {
        wgpu::PresentMode::Fifo
    } else {
        wgpu::PresentMode::AutoNoVsync
    }
}

fn clamp_rect(rect: Option<[f32; 4]>, width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (width as f32, height as f32);
    match rect {
        None => [0.0, 0.0, w, h],
        Some([x, y, rw, rh]) => {
            let x = x.clamp(0.0, w);
            let y = y.clamp(0.0, h);
            [x, y, rw.min(w - x).max(0.0), rh.min(h - y).max(0.0)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_selects_fifo() {
        assert_eq!(present_mode(true), wgpu::PresentMode::Fifo);
        assert_eq!(present_mode(false), wgpu::PresentMode::AutoNoVsync);
    }

    #[test]
    fn missing_viewport_covers_surface() {
        assert_eq!(clamp_rect(None, 600, 1000), [0.0, 0.0, 600.0, 1000.0]);
    }

    #[test]
    fn viewport_is_clamped_to_shrunken_surface() {
        // 補正リサイズ中はビューポートが古いサイズのまま残っている
        let rect = Some([0.0, 0.0, 600.0, 1000.0]);
        assert_eq!(clamp_rect(rect, 480, 800), [0.0, 0.0, 480.0, 800.0]);

        let offset = Some([700.0, 10.0, 480.0, 800.0]);
        assert_eq!(clamp_rect(offset, 600, 500), [600.0, 10.0, 0.0, 490.0]);
    }

    #[test]
    fn vertex_layout_matches_struct() {
        let layout = SpriteVertex::desc();
        assert_eq!(layout.array_stride, 16);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.attributes[1].offset, 8);
    }
}
