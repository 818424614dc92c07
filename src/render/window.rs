//! Full-screen presentation window.
//!
//! Implements the adapter side of the screensaver: a borderless full-screen
//! winit window that blits the current image or video frame with wgpu,
//! translates key presses into [`AdapterEvent`]s for the driver, and applies
//! [`PresentationCommand`]s delivered as user events.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};
use wgpu::util::DeviceExt;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow},
    keyboard::{KeyCode, PhysicalKey},
    window::{Fullscreen, Window, WindowId},
};

use crate::events::{AdapterEvent, Key, PresentationCommand};
use crate::render::video::VideoPlayer;

/// Redraw cadence while a video is up; images redraw on demand.
const VIDEO_FRAME_POLL: Duration = Duration::from_millis(15);

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 2],
    uv: [f32; 2],
}

const QUAD: [Vertex; 4] = [
    Vertex {
        pos: [-1.0, -1.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        pos: [1.0, -1.0],
        uv: [1.0, 1.0],
    },
    Vertex {
        pos: [-1.0, 1.0],
        uv: [0.0, 0.0],
    },
    Vertex {
        pos: [1.0, 1.0],
        uv: [1.0, 0.0],
    },
];

struct Tex {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
    w: u32,
    h: u32,
}

struct Gpu {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    _adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,

    pipeline: wgpu::RenderPipeline,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    vbuf: wgpu::Buffer,
    // 32 bytes to match the WGSL uniform block
    params: wgpu::Buffer,
    sampler: wgpu::Sampler,
    tex: Tex,
}

pub struct SaverApp {
    events: Sender<AdapterEvent>,
    window: Option<Arc<Window>>,
    gpu: Option<Gpu>,
    video: Option<VideoPlayer>,
    muted: bool,
    // Commands that arrived before the window and GPU existed.
    pending: Vec<PresentationCommand>,
}

impl SaverApp {
    #[must_use]
    pub fn new(events: Sender<AdapterEvent>) -> Self {
        Self {
            events,
            window: None,
            gpu: None,
            video: None,
            // audio starts muted; `m` unmutes
            muted: true,
            pending: Vec::new(),
        }
    }

    fn apply(&mut self, event_loop: &ActiveEventLoop, command: PresentationCommand) {
        match command {
            PresentationCommand::ShowImage(path) => self.show_image(path),
            PresentationCommand::PlayVideo(path) => self.play_video(path),
            PresentationCommand::StopVideo => {
                self.video = None;
                self.clear_to_black();
            }
            PresentationCommand::ToggleMute => {
                self.muted = !self.muted;
                if let Some(video) = &self.video {
                    video.set_muted(self.muted);
                }
                info!(muted = self.muted, "audio mute toggled");
            }
            PresentationCommand::Quit => event_loop.exit(),
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn show_image(&mut self, path: PathBuf) {
        self.video = None;
        match image::open(&path) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let (w, h) = rgba.dimensions();
                self.upload(&rgba, w, h, wgpu::TextureFormat::Rgba8UnormSrgb);
            }
            Err(err) => {
                warn!(path = %path.display(), "image decode failed: {err}");
                self.clear_to_black();
                let _ = self.events.try_send(AdapterEvent::RenderFailed(path));
            }
        }
    }

    fn play_video(&mut self, path: PathBuf) {
        self.video = None;
        self.clear_to_black();
        match VideoPlayer::play(&path, self.muted, self.events.clone()) {
            Ok(player) => self.video = Some(player),
            Err(err) => {
                warn!(path = %path.display(), "video playback failed: {err}");
                let _ = self.events.try_send(AdapterEvent::RenderFailed(path));
            }
        }
    }

    fn clear_to_black(&mut self) {
        self.upload(&[0, 0, 0, 255], 1, 1, wgpu::TextureFormat::Rgba8UnormSrgb);
    }

    fn upload(&mut self, pixels: &[u8], w: u32, h: u32, format: wgpu::TextureFormat) {
        let Some(gpu) = &mut self.gpu else { return };
        if gpu.tex.w == w && gpu.tex.h == h && gpu.tex.format == format {
            write_pixels(&gpu.queue, &gpu.tex.texture, pixels, w, h);
            return;
        }
        gpu.tex = make_tex(&gpu.device, &gpu.queue, pixels, w, h, format);
        let scale = compute_uv_scale(gpu.config.width, gpu.config.height, w, h);
        write_params(&gpu.queue, &gpu.params, scale);
        rebuild_bind_group(gpu);
    }

    fn on_key(&mut self, code: KeyCode) {
        let key = match code {
            KeyCode::Space => Key::Space,
            KeyCode::KeyM => Key::Mute,
            KeyCode::Escape => Key::Escape,
            _ => return,
        };
        let _ = self.events.try_send(AdapterEvent::Key(key));
    }

    fn draw(&self) {
        let Some(gpu) = &self.gpu else { return };
        let Ok(frame) = gpu.surface.get_current_texture() else {
            return;
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("encoder"),
            });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("rpass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rpass.set_pipeline(&gpu.pipeline);
            rpass.set_bind_group(0, &gpu.bind_group, &[]);
            rpass.set_vertex_buffer(0, gpu.vbuf.slice(..));
            rpass.draw(0..4, 0..1);
        }
        gpu.queue.submit([encoder.finish()]);
        frame.present();
    }
}

impl ApplicationHandler<PresentationCommand> for SaverApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes().with_title("media screensaver");
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                warn!("window creation failed: {err}");
                event_loop.exit();
                return;
            }
        };
        let monitor = window.current_monitor();
        window.set_fullscreen(Some(Fullscreen::Borderless(monitor)));
        window.set_cursor_visible(false);
        self.window = Some(window.clone());

        match pollster::block_on(init_gpu(window)) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(err) => {
                warn!("GPU init failed: {err}");
                event_loop.exit();
                return;
            }
        }
        info!("fullscreen window initialized");

        for command in std::mem::take(&mut self.pending) {
            self.apply(event_loop, command);
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, command: PresentationCommand) {
        if self.gpu.is_none() {
            self.pending.push(command);
            return;
        }
        self.apply(event_loop, command);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = &self.window else { return };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        self.on_key(code);
                    }
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(gpu) = &mut self.gpu
                    && width > 0
                    && height > 0
                {
                    gpu.config.width = width;
                    gpu.config.height = height;
                    gpu.surface.configure(&gpu.device, &gpu.config);
                    let scale = compute_uv_scale(width, height, gpu.tex.w, gpu.tex.h);
                    write_params(&gpu.queue, &gpu.params, scale);
                }
            }
            WindowEvent::RedrawRequested => self.draw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.video.is_some() {
            if let Some(frame) = self.video.as_ref().and_then(VideoPlayer::take_frame) {
                self.upload(
                    &frame.pixels,
                    frame.width,
                    frame.height,
                    wgpu::TextureFormat::Bgra8UnormSrgb,
                );
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + VIDEO_FRAME_POLL));
        } else {
            event_loop.set_control_flow(ControlFlow::Wait);
        }
    }
}

async fn init_gpu(window: Arc<Window>) -> Result<Gpu> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let surface = instance
        .create_surface(window.clone())
        .context("creating render surface")?;

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("no compatible GPU adapter found")?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            ..Default::default()
        })
        .await
        .context("requesting GPU device")?;

    let caps = surface.get_capabilities(&adapter);
    let format = caps
        .formats
        .iter()
        .copied()
        .find(wgpu::TextureFormat::is_srgb)
        .unwrap_or(caps.formats[0]);
    let PhysicalSize { width, height } = window.inner_size();
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: width.max(1),
        height: height.max(1),
        present_mode: wgpu::PresentMode::AutoVsync,
        alpha_mode: caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 1,
    };
    surface.configure(&device, &config);

    let tex = make_tex(
        &device,
        &queue,
        &[0, 0, 0, 255],
        1,
        1,
        wgpu::TextureFormat::Rgba8UnormSrgb,
    );

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let params = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("params"),
        size: 32,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let vbuf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("quad"),
        contents: bytemuck::cast_slice(&QUAD),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
    });

    let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("bind_layout"),
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
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    });

    let vlayout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2],
    };

    let pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("pipe_layout"),
        bind_group_layouts: &[&bind_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("pipeline"),
        layout: Some(&pip_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[vlayout],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    write_params(&queue, &params, compute_uv_scale(config.width, config.height, 1, 1));

    let bind_group = make_bind_group(&device, &bind_layout, &tex.view, &sampler, &params);

    Ok(Gpu {
        _instance: instance,
        surface,
        _adapter: adapter,
        device,
        queue,
        config,
        pipeline,
        bind_layout,
        bind_group,
        vbuf,
        params,
        sampler,
        tex,
    })
}

fn make_tex(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    pixels: &[u8],
    w: u32,
    h: u32,
    format: wgpu::TextureFormat,
) -> Tex {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("media"),
        size: wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    write_pixels(queue, &texture, pixels, w, h);
    Tex {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        texture,
        format,
        w,
        h,
    }
}

fn write_pixels(queue: &wgpu::Queue, texture: &wgpu::Texture, pixels: &[u8], w: u32, h: u32) {
    queue.write_texture(
        texture.as_image_copy(),
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * w),
            rows_per_image: Some(h),
        },
        wgpu::Extent3d {
            width: w,
            height: h,
            depth_or_array_layers: 1,
        },
    );
}

fn write_params(queue: &wgpu::Queue, buffer: &wgpu::Buffer, scale: [f32; 4]) {
    let mut block = [0f32; 8]; // 8 * 4 = 32 bytes
    block[0..4].copy_from_slice(&scale);
    queue.write_buffer(buffer, 0, bytemuck::bytes_of(&block));
}

fn make_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
    params: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
        ],
    })
}

fn rebuild_bind_group(gpu: &mut Gpu) {
    gpu.bind_group = make_bind_group(
        &gpu.device,
        &gpu.bind_layout,
        &gpu.tex.view,
        &gpu.sampler,
        &gpu.params,
    );
}

#[allow(clippy::cast_precision_loss)]
fn compute_uv_scale(win_w: u32, win_h: u32, img_w: u32, img_h: u32) -> [f32; 4] {
    let ww = win_w as f32;
    let wh = win_h as f32;
    let iw = img_w as f32;
    let ih = img_h as f32;

    if ww == 0.0 || wh == 0.0 || iw == 0.0 || ih == 0.0 {
        return [1.0, 1.0, 0.0, 0.0];
    }

    let win_ar = ww / wh;
    let img_ar = iw / ih;

    if img_ar > win_ar {
        // wider than the window: shrink the sampled area vertically
        [1.0, img_ar / win_ar, 0.0, 0.0]
    } else {
        [win_ar / img_ar, 1.0, 0.0, 0.0]
    }
}
