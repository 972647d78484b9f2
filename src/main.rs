// =============================================================================
// PRISM - Vulkan 1.3 mesh renderer
// =============================================================================
//
// One window, one graphics pipeline, one mesh, explicit synchronization.
//
// ARCHITECTURE OVERVIEW:
// ┌─────────────────────────────────────────────────────────────────┐
// │  winit App (window, input, event loop)                          │
// │    └── Renderer (engine driver, per-frame loop)                 │
// │          └── Vulkan Device + Swapchain                          │
// │                └── Command recording (dynamic rendering)        │
// │                      └── Synchronization (fences, semaphores)   │
// └─────────────────────────────────────────────────────────────────┘
//
// FRAME FLOW:
// 1. Wait on the slot's fence (previous use of this slot is done)
// 2. Acquire a swapchain image
// 3. Reset the fence, record the command buffer
// 4. Submit (waits on image-available, signals render-finished + fence)
// 5. Present (waits on render-finished)
//
// =============================================================================

mod backend;
mod config;
mod mesh;

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use ash::vk;
use glam::Mat4;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Fullscreen, Window, WindowAttributes},
};

use backend::commands::{self, FrameDraw};
use backend::pipeline::{self, GraphicsPipelineDesc, ShaderStage};
use backend::shader;
use backend::sync::FrameSync;
use backend::vertex::{PushConstants, Vertex};
use backend::{AllocatedBuffer, BackendError, FrameError, Swapchain, VulkanDevice};
use config::Config;

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    init_logging();

    let config = Config::load();
    log::info!("Starting Prism");
    log::info!(
        "Window: {}x{} ({})",
        config.window.width,
        config.window.height,
        if config.window.fullscreen {
            "fullscreen"
        } else {
            "windowed"
        }
    );
    log::info!("Present mode: {}", config.graphics.present_mode);

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

fn init_logging() {
    use env_logger::Builder;
    use log::LevelFilter;

    let mut builder = Builder::from_default_env();
    builder.filter_level(LevelFilter::Info);
    builder.init();
}

// =============================================================================
// RENDERER - owns every GPU resource and drives the per-frame protocol
// =============================================================================

/// One frame slot: a command buffer plus its sync-object set. The renderer
/// owns `frames_in_flight` of these, indexed by `frame_number % N`.
struct Frame {
    cmd: vk::CommandBuffer,
    sync: FrameSync,
}

struct Renderer {
    frames: Vec<Frame>,
    command_pool: vk::CommandPool,
    pipeline: vk::Pipeline,
    pipeline_layout: vk::PipelineLayout,
    vertex_buffer: AllocatedBuffer,
    vertex_count: u32,
    swapchain: Option<Swapchain>,
    present_mode: vk::PresentModeKHR,
    clear_color: [f32; 4],
    frame_number: u64,

    // Dropped last; everything above borrows it
    device: Arc<VulkanDevice>,
}

impl Renderer {
    fn new(window: &Window, config: &Config) -> Result<Self> {
        log::info!("Initializing Vulkan...");

        let display = window
            .display_handle()
            .context("Failed to get display handle")?
            .as_raw();
        let window_handle = window
            .window_handle()
            .context("Failed to get window handle")?
            .as_raw();

        // Validation layers in debug builds only, and only if configured
        let enable_validation = cfg!(debug_assertions) && config.debug.validation_layers;
        let device = VulkanDevice::new(
            &config.window.title,
            enable_validation,
            display,
            window_handle,
        )
        .context("Failed to create Vulkan device")?;

        let size = window.inner_size();
        let present_mode = config.present_mode();
        let swapchain = Swapchain::new(device.clone(), size.width, size.height, present_mode)
            .context("Failed to create swapchain")?;

        // ─────────────────────────────────────────────────────────────────────
        // Command pool + one primary buffer per frame slot
        // ─────────────────────────────────────────────────────────────────────
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(device.graphics_queue_family)
            .flags(
                vk::CommandPoolCreateFlags::TRANSIENT
                    | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
            );

        let command_pool = unsafe { device.device.create_command_pool(&pool_info, None) }
            .context("Failed to create command pool")?;

        let frames_in_flight = config.frames_in_flight();
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(frames_in_flight as u32);

        let command_buffers = unsafe { device.device.allocate_command_buffers(&alloc_info) }
            .context("Failed to allocate command buffers")?;

        let frames = command_buffers
            .into_iter()
            .map(|cmd| {
                Ok(Frame {
                    cmd,
                    sync: FrameSync::new(&device)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, BackendError>>()
            .context("Failed to create frame sync objects")?;

        log::info!("Frames in flight: {}", frames_in_flight);

        // ─────────────────────────────────────────────────────────────────────
        // Pipeline layout + graphics pipeline
        // ─────────────────────────────────────────────────────────────────────
        // The layout must stay alive as long as the pipeline does
        let pipeline_layout =
            pipeline::create_pipeline_layout(&device.device, &[PushConstants::range()])
                .context("Failed to create pipeline layout")?;

        let vert = shader::load_shader_module(&device.device, "shaders/mesh.vert.spv")
            .context("Failed to load vertex shader")?;
        let frag = shader::load_shader_module(&device.device, "shaders/mesh.frag.spv")
            .context("Failed to load fragment shader")?;

        let desc = GraphicsPipelineDesc {
            shader_stages: vec![
                ShaderStage {
                    stage: vk::ShaderStageFlags::VERTEX,
                    module: vert,
                },
                ShaderStage {
                    stage: vk::ShaderStageFlags::FRAGMENT,
                    module: frag,
                },
            ],
            vertex_bindings: vec![Vertex::binding_description()],
            vertex_attributes: Vertex::attribute_descriptions().to_vec(),
            layout: pipeline_layout,
            color_format: swapchain.format,
            ..Default::default()
        };
        let pipeline_result = desc.build(&device.device);

        // The pipeline owns a copy of the SPIR-V once built
        unsafe {
            device.device.destroy_shader_module(vert, None);
            device.device.destroy_shader_module(frag, None);
        }
        let pipeline = pipeline_result.context("Failed to build graphics pipeline")?;

        // ─────────────────────────────────────────────────────────────────────
        // Mesh upload: host-visible, written once, immutable afterwards
        // ─────────────────────────────────────────────────────────────────────
        let mesh_kind = config.mesh_kind();
        let vertices = mesh::vertices(mesh_kind);
        let vertex_buffer = AllocatedBuffer::with_data(
            &device,
            "mesh vertices",
            vk::BufferUsageFlags::VERTEX_BUFFER,
            &vertices,
        )
        .context("Failed to upload mesh")?;

        debug_assert_eq!(
            vertex_buffer.mapped_bytes(),
            Some(bytemuck::cast_slice::<_, u8>(&vertices))
        );

        log::info!(
            "Uploaded {:?} mesh: {} vertices ({} bytes)",
            mesh_kind,
            vertices.len(),
            vertex_buffer.size()
        );
        log::info!("Vulkan initialized successfully!");

        Ok(Self {
            frames,
            command_pool,
            pipeline,
            pipeline_layout,
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            swapchain: Some(swapchain),
            present_mode,
            clear_color: config.graphics.clear_color,
            frame_number: 0,
            device,
        })
    }

    /// Render a single frame.
    ///
    /// Returns true if the swapchain reported itself suboptimal and should be
    /// recreated at the next opportunity.
    fn render_frame(&mut self) -> std::result::Result<bool, FrameError> {
        let device = &self.device.device;
        let slot = (self.frame_number as usize) % self.frames.len();
        let frame = &self.frames[slot];
        let swapchain = self
            .swapchain
            .as_ref()
            .ok_or(FrameError::SwapchainOutOfDate)?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 1: Wait until this slot's previous frame is off the GPU
        // ─────────────────────────────────────────────────────────────────────
        frame.sync.wait(device)?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 2: Acquire the next swapchain image
        // ─────────────────────────────────────────────────────────────────────
        let (image_index, mut suboptimal) = swapchain.acquire_next(frame.sync.image_available)?;

        // Only reset the fence once the frame is certain to submit; resetting
        // before a failed acquire would deadlock the next wait
        frame.sync.reset(device)?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 3: Record this frame's commands
        // ─────────────────────────────────────────────────────────────────────
        let draw = FrameDraw {
            pipeline: self.pipeline,
            pipeline_layout: self.pipeline_layout,
            vertex_buffer: self.vertex_buffer.buffer,
            vertex_count: self.vertex_count,
            push_constants: PushConstants {
                transform: spin_transform(self.frame_number),
            },
            clear_color: pulse_clear(self.clear_color, self.frame_number),
        };

        commands::record_frame(
            device,
            frame.cmd,
            swapchain.images[image_index as usize],
            swapchain.image_views[image_index as usize],
            swapchain.extent,
            &draw,
        )?;

        // ─────────────────────────────────────────────────────────────────────
        // STEP 4: Submit, then present
        // ─────────────────────────────────────────────────────────────────────
        frame.sync.submit(device, self.device.graphics_queue, frame.cmd)?;

        suboptimal |= swapchain.present(
            self.device.graphics_queue,
            image_index,
            &[frame.sync.render_finished],
        )?;

        self.frame_number += 1;

        Ok(suboptimal)
    }

    /// Rebuild the swapchain after a resize or an out-of-date report.
    fn recreate_swapchain(&mut self, width: u32, height: u32) -> std::result::Result<(), BackendError> {
        // Nothing may be touching the old images
        self.device.wait_idle()?;

        // The surface can only have one swapchain at a time
        self.swapchain = None;

        self.swapchain = Some(Swapchain::new(
            self.device.clone(),
            width,
            height,
            self.present_mode,
        )?);
        Ok(())
    }

    fn wait_idle(&self) {
        let _ = self.device.wait_idle();
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        log::info!("Cleaning up Vulkan resources...");

        // Wait for GPU to finish before destroying anything
        let _ = self.device.wait_idle();

        unsafe {
            // Destroy in reverse order of creation!
            self.device.device.destroy_pipeline(self.pipeline, None);
            self.device
                .device
                .destroy_pipeline_layout(self.pipeline_layout, None);
        }

        self.vertex_buffer.destroy(&self.device);

        for frame in &self.frames {
            frame.sync.destroy(&self.device.device);
        }

        unsafe {
            // Also frees the command buffers allocated from it
            self.device
                .device
                .destroy_command_pool(self.command_pool, None);
        }

        // Swapchain drops next, then the device context itself

        log::info!("Cleanup complete");
    }
}

/// Per-frame transform pushed to the vertex stage: a slow spin keyed off the
/// frame counter.
fn spin_transform(frame_number: u64) -> Mat4 {
    let angle = frame_number as f32 / 120.0;
    Mat4::from_rotation_y(angle) * Mat4::from_rotation_z(angle * 0.25)
}

/// Clear color with the blue channel oscillating against the frame counter,
/// a visible sign the loop is alive.
fn pulse_clear(base: [f32; 4], frame_number: u64) -> [f32; 4] {
    let flash = (frame_number as f32 / 120.0).sin().abs();
    [base[0], base[1], flash, base[3]]
}

// =============================================================================
// APPLICATION STATE - window, input, frame pacing
// =============================================================================

pub struct App {
    config: Config,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    is_fullscreen: bool,

    /// Set to true when window is resized - triggers swapchain recreation
    needs_resize: bool,
    /// Set to true when window is minimized (size = 0) - skip rendering
    is_minimized: bool,

    // FPS tracking
    frame_count: u32,
    last_fps_update: Instant,
    last_frame_time: Instant,
}

impl App {
    pub fn new(config: Config) -> Self {
        let is_fullscreen = config.window.fullscreen;
        let now = Instant::now();
        Self {
            config,
            window: None,
            renderer: None,
            is_fullscreen,
            needs_resize: false,
            is_minimized: false,
            frame_count: 0,
            last_fps_update: now,
            last_frame_time: now,
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        if self.is_minimized {
            return;
        }

        let (Some(window), Some(renderer)) = (self.window.as_ref(), self.renderer.as_mut()) else {
            return;
        };

        if self.needs_resize {
            let size = window.inner_size();
            if size.width == 0 || size.height == 0 {
                self.is_minimized = true;
                return;
            }
            if let Err(e) = renderer.recreate_swapchain(size.width, size.height) {
                log::error!("Failed to recreate swapchain: {:?}", e);
                event_loop.exit();
                return;
            }
            self.needs_resize = false;
        }

        match renderer.render_frame() {
            Ok(suboptimal) => {
                if suboptimal {
                    self.needs_resize = true;
                }
                self.update_fps();
            }
            Err(e) if e.is_recoverable() => {
                log::debug!("Frame skipped: {}", e);
                self.needs_resize = true;
            }
            Err(e) => {
                log::error!("Render error: {}", e);
                event_loop.exit();
            }
        }
    }

    fn toggle_fullscreen(&mut self) {
        if let Some(ref window) = self.window {
            self.is_fullscreen = !self.is_fullscreen;

            if self.is_fullscreen {
                window.set_fullscreen(Some(Fullscreen::Borderless(None)));
                log::info!("Entered fullscreen mode");
            } else {
                window.set_fullscreen(None);
                log::info!("Exited fullscreen mode");
            }

            self.needs_resize = true;
        }
    }

    fn update_fps(&mut self) {
        if !self.config.debug.show_fps {
            return;
        }

        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;
        self.frame_count += 1;

        // Update title every second
        if now.duration_since(self.last_fps_update).as_secs_f32() >= 1.0 {
            let elapsed = now.duration_since(self.last_fps_update).as_secs_f32();
            let fps = self.frame_count as f32 / elapsed;

            if let Some(ref window) = self.window {
                let mode = if self.is_fullscreen {
                    "fullscreen"
                } else {
                    "windowed"
                };
                window.set_title(&format!(
                    "{} - {:.0} FPS ({:.2}ms) [{}]",
                    self.config.window.title,
                    fps,
                    frame_time * 1000.0,
                    mode
                ));
            }

            self.frame_count = 0;
            self.last_fps_update = now;
        }
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let mut window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        if self.config.window.fullscreen {
            window_attributes =
                window_attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                event_loop.exit();
                return;
            }
        };

        match Renderer::new(&window, &self.config) {
            Ok(renderer) => {
                self.renderer = Some(renderer);
                self.window = Some(window);
            }
            Err(e) => {
                log::error!("Failed to initialize Vulkan: {:?}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                if let Some(ref renderer) = self.renderer {
                    renderer.wait_idle();
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);

                if size.width == 0 || size.height == 0 {
                    self.is_minimized = true;
                } else {
                    self.is_minimized = false;
                    self.needs_resize = true;
                }
            }

            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() {
                    if let PhysicalKey::Code(key) = event.physical_key {
                        match key {
                            // ESC - Quit application
                            KeyCode::Escape => {
                                log::info!("ESC pressed, exiting...");
                                event_loop.exit();
                            }
                            // F11 - Toggle fullscreen
                            KeyCode::F11 => {
                                self.toggle_fullscreen();
                            }
                            _ => {}
                        }
                    }
                }
            }

            _ => {}
        }
    }

    /// Request continuous redraws for maximum FPS.
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_starts_at_identity() {
        assert_eq!(spin_transform(0), Mat4::IDENTITY);
    }

    #[test]
    fn transform_keeps_vectors_finite() {
        for frame in [1_u64, 60, 120, 100_000] {
            let m = spin_transform(frame);
            assert!(m.is_finite());
        }
    }

    #[test]
    fn clear_pulse_stays_in_range_and_only_touches_blue() {
        let base = [0.1, 0.2, 0.9, 1.0];
        for frame in 0..1_000_u64 {
            let clear = pulse_clear(base, frame);
            assert_eq!(clear[0], base[0]);
            assert_eq!(clear[1], base[1]);
            assert_eq!(clear[3], base[3]);
            assert!((0.0..=1.0).contains(&clear[2]));
        }
    }

    #[test]
    fn clear_pulse_starts_dark() {
        let clear = pulse_clear([0.0, 0.0, 0.0, 1.0], 0);
        assert_eq!(clear[2], 0.0);
    }
}
