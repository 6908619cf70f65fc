// renderer.rs — 核心渲染器 (Ray Casting / Fullscreen Triangle)
//
// 全屏三角形 + 片元着色器按相机参数反算每个像素的 UV：
// 球面模式与 projector.rs 的射线求交使用相同的相机基与 UV 约定，
// 平铺模式按水平平移取模。ID 图与高光遮罩用 textureLoad 逐像素读取，不做插值。

use image::imageops::FilterType;
use image::RgbaImage;
use panorama_tour::{Overlay, ProjectionMode, RasterPair, RenderSurface, ViewTransform, Viewport};
use thiserror::Error;
use wgpu::util::DeviceExt;
use winit::window::Window;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("cannot create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter")]
    NoAdapter,
    #[error("cannot open device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    aspect: f32,
    fov_rad: f32,
    lon: f32,
    lat: f32,
    mode: u32, // 0=Spherical, 1=Flat
    show_id: u32,
    pan_offset: f32,
    overlay_on: u32,
    viewport: [f32; 2],
    // 原始 ID 图尺寸（CPU 端命中检测的坐标空间）
    raster_size: [f32; 2],
}

struct PairTextures {
    panorama: wgpu::TextureView,
    id_map: wgpu::TextureView,
    overlay: wgpu::TextureView,
}

pub struct Renderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,

    // 纹理资源
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    textures: PairTextures,
    sampler: wgpu::Sampler,

    // Uniform 资源
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,

    // UI
    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl Renderer {
    pub async fn new(window: std::sync::Arc<Window>) -> Result<Self, RendererError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // SAFETY: window 由 Arc 持有，生命周期覆盖整个事件循环
        let surface = unsafe { instance.create_surface(window.as_ref()) }?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RendererError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(RendererError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo, // VSync on
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        // 资源加载完成前先放 1x1 占位
        let placeholder = RgbaImage::from_pixel(1, 1, image::Rgba([26, 26, 26, 255]));
        let transparent = RgbaImage::new(1, 1);
        let textures = PairTextures {
            panorama: upload(&device, &queue, &placeholder, wgpu::TextureFormat::Rgba8UnormSrgb, "panorama_texture"),
            id_map: upload(&device, &queue, &placeholder, wgpu::TextureFormat::Rgba8Unorm, "id_map_texture"),
            overlay: upload(&device, &queue, &transparent, wgpu::TextureFormat::Rgba8Unorm, "overlay_texture"),
        };

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat, // 全景图水平循环
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let camera_uniform = CameraUniform {
            aspect: size.width.max(1) as f32 / size.height.max(1) as f32,
            fov_rad: ViewTransform::default().fov.to_radians(),
            lon: 0.0,
            lat: 0.0,
            mode: 0,
            show_id: 0,
            pan_offset: 0.0,
            overlay_on: 0,
            viewport: [size.width as f32, size.height as f32],
            raster_size: [1.0, 1.0],
        };

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(3),
                texture_entry(4),
            ],
            label: Some("tour_bind_group_layout"),
        });

        let bind_group = create_bind_group(&device, &bind_group_layout, &camera_buffer, &textures, &sampler);

        let shader = device.create_shader_module(wgpu::include_wgsl!("shader_tour.wgsl"));
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[], // 无顶点缓冲，Shader 自生成
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None, // 覆盖全屏的单个三角形
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
        });

        let egui_ctx = egui::Context::default();
        crate::fonts::setup_egui_fonts(&egui_ctx);

        let mut egui_state = egui_winit::State::new(window.as_ref());
        // 高 DPI 显示器
        egui_state.set_pixels_per_point(window.scale_factor() as f32);

        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            bind_group_layout,
            bind_group,
            textures,
            sampler,
            camera_uniform,
            camera_buffer,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.camera_uniform.aspect = new_size.width as f32 / new_size.height as f32;
            self.camera_uniform.viewport = [new_size.width as f32, new_size.height as f32];
        }
    }

    pub fn update_camera(&mut self, view: &ViewTransform, mode: ProjectionMode, show_id: bool, highlight: bool) {
        self.camera_uniform.lon = view.lon.to_radians();
        // ±90° 时相机基退化；视角本身限制在 ±85°，这里再保险一次
        self.camera_uniform.lat = view.lat.clamp(-89.9, 89.9).to_radians();
        self.camera_uniform.fov_rad = view.fov.clamp(1.0, 179.0).to_radians();
        self.camera_uniform.pan_offset = view.pan_offset;
        self.camera_uniform.mode = match mode {
            ProjectionMode::Spherical => 0,
            ProjectionMode::Flat => 1,
        };
        self.camera_uniform.show_id = show_id as u32;
        self.camera_uniform.overlay_on = highlight as u32;

        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[self.camera_uniform]));
    }

    fn max_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn rebind(&mut self) {
        self.bind_group = create_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.camera_buffer,
            &self.textures,
            &self.sampler,
        );
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.1, g: 0.1, b: 0.1, a: 1.0 }),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);

        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);

        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        }

        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: true },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer.render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl RenderSurface for Renderer {
    fn viewport(&self) -> Viewport {
        Viewport::new(self.size.width as f32, self.size.height as f32)
    }

    fn show_rasters(&mut self, pair: &RasterPair) {
        let max = self.max_dimension();
        let (w, h) = pair.id_map.dimensions();

        let panorama = fit_to_limit(&pair.panorama, max, FilterType::Lanczos3);
        // ID 图缩放必须用最近邻，否则边缘会混出新颜色
        let id_map = fit_to_limit(pair.id_map.image(), max, FilterType::Nearest);

        self.textures = PairTextures {
            panorama: upload(&self.device, &self.queue, &panorama, wgpu::TextureFormat::Rgba8UnormSrgb, "panorama_texture"),
            id_map: upload(&self.device, &self.queue, &id_map, wgpu::TextureFormat::Rgba8Unorm, "id_map_texture"),
            overlay: upload(&self.device, &self.queue, &RgbaImage::new(1, 1), wgpu::TextureFormat::Rgba8Unorm, "overlay_texture"),
        };
        self.camera_uniform.raster_size = [w as f32, h as f32];
        self.rebind();
    }

    fn show_overlay(&mut self, overlay: &Overlay) {
        let img = fit_to_limit(overlay.image(), self.max_dimension(), FilterType::Nearest);
        self.textures.overlay = upload(&self.device, &self.queue, &img, wgpu::TextureFormat::Rgba8Unorm, "overlay_texture");
        self.rebind();
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    camera_buffer: &wgpu::Buffer,
    textures: &PairTextures,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&textures.panorama) },
            wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(sampler) },
            wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(&textures.id_map) },
            wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::TextureView(&textures.overlay) },
        ],
        label: Some("tour_bind_group"),
    })
}

/// 超过 GPU 纹理尺寸上限时等比缩小；UV 是归一化的，缩放不影响与 CPU 端 ID 图的对应
fn fit_to_limit(img: &RgbaImage, max: u32, filter: FilterType) -> RgbaImage {
    let (src_w, src_h) = img.dimensions();
    if src_w <= max && src_h <= max {
        return img.clone();
    }
    let scale = max as f32 / src_w.max(src_h) as f32;
    let new_w = ((src_w as f32 * scale) as u32).max(1);
    let new_h = ((src_h as f32 * scale) as u32).max(1);
    log::warn!(
        "{}",
        panorama_tour::i18n::tr_with(
            "gpu.image_too_large_scaled",
            &[
                ("src_w", src_w.to_string()),
                ("src_h", src_h.to_string()),
                ("max", max.to_string()),
                ("new_w", new_w.to_string()),
                ("new_h", new_h.to_string()),
            ]
        )
    );
    image::imageops::resize(img, new_w, new_h, filter)
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    img: &RgbaImage,
    format: wgpu::TextureFormat,
    label: &str,
) -> wgpu::TextureView {
    let (width, height) = img.dimensions();
    let size = wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        label: Some(label),
        view_formats: &[],
    });
    if width > 0 && height > 0 {
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
    }
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
