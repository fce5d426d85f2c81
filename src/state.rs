use crate::model::CpuUploader;
use crate::render::SimpleRenderSystem;
use crate::simulation::Simulation;
use crate::{Scene, SimParams};
use anyhow::{anyhow, Context};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use winit::event::ElementState;
use winit::keyboard::*;
use winit::{
  event::{Event, KeyEvent, StartCause, WindowEvent},
  event_loop::{EventLoop, EventLoopWindowTarget},
  window::Window,
};

const STATS_INTERVAL: u64 = 60;

struct EventLoopWrapper {
  event_loop: EventLoop<()>,
  window: Arc<Window>,
}

impl EventLoopWrapper {
  pub fn new(title: &str) -> anyhow::Result<Self> {
    let event_loop = EventLoop::new()?;
    let mut builder = winit::window::WindowBuilder::new();
    builder = builder.with_title(title).with_resizable(false);
    let window = Arc::new(builder.build(&event_loop)?);

    Ok(Self { event_loop, window })
  }
}

struct SurfaceWrapper {
  surface: Option<wgpu::Surface<'static>>,
  config: Option<wgpu::SurfaceConfiguration>,
}

impl SurfaceWrapper {
  fn new() -> Self {
    Self {
      surface: None,
      config: None,
    }
  }

  fn resume(&mut self, context: &State, window: Arc<Window>) -> anyhow::Result<()> {
    let window_size = window.inner_size();
    let width = window_size.width.max(1);
    let height = window_size.height.max(1);
    let surface = context.instance.create_surface(window)?;
    let mut config = surface
      .get_default_config(&context.adapter, width, height)
      .ok_or_else(|| anyhow!("surface is not supported by the adapter"))?;
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(&context.device, &config);
    self.surface = Some(surface);
    self.config = Some(config);
    Ok(())
  }

  fn acquire(&mut self, context: &State) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
    let (Some(surface), Some(config)) = (&self.surface, &self.config) else {
      return Err(wgpu::SurfaceError::Lost);
    };

    match surface.get_current_texture() {
      Ok(frame) => Ok(frame),
      Err(wgpu::SurfaceError::Timeout) => surface.get_current_texture(),
      Err(
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory,
      ) => {
        surface.configure(&context.device, config);
        surface.get_current_texture()
      }
    }
  }

  fn suspend(&mut self) {}

  fn config(&self) -> Option<&wgpu::SurfaceConfiguration> {
    self.config.as_ref()
  }
}

/// GPU handles shared by the surface and the renderer.
struct State {
  instance: wgpu::Instance,
  adapter: wgpu::Adapter,
  device: wgpu::Device,
  queue: wgpu::Queue,
}

impl State {
  async fn init(surface: &SurfaceWrapper) -> anyhow::Result<Self> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
      #[cfg(not(target_arch = "wasm32"))]
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    });

    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: surface.surface.as_ref(),
        force_fallback_adapter: false,
      })
      .await
      .ok_or_else(|| anyhow!("no suitable graphics adapter"))?;
    log::info!("using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await
      .context("failed to create device")?;

    Ok(Self {
      instance,
      adapter,
      device,
      queue,
    })
  }
}

/// Maps the contour keys to `(threshold_steps, samples_steps)`.
fn contour_adjustment(keycode: KeyCode) -> Option<(i32, i32)> {
  match keycode {
    KeyCode::ArrowUp => Some((1, 0)),
    KeyCode::ArrowDown => Some((-1, 0)),
    KeyCode::BracketRight => Some((0, 1)),
    KeyCode::BracketLeft => Some((0, -1)),
    _ => None,
  }
}

async fn start(scene: Scene, params: SimParams) -> anyhow::Result<()> {
  let window_loop = EventLoopWrapper::new("Evilution")?;
  let mut surface = SurfaceWrapper::new();
  let context = State::init(&surface).await?;
  let mut simulation =
    Simulation::new(scene, &params, &context.device).context("failed to build scene")?;
  let mut renderer = None;
  let mut last_frame = Instant::now();

  window_loop.event_loop.run(
    move |event, target: &EventLoopWindowTarget<()>| match event {
      Event::NewEvents(StartCause::Init) => {
        if let Err(err) = surface.resume(&context, window_loop.window.clone()) {
          log::error!("failed to set up surface: {err:#}");
          target.exit();
          return;
        }
        if renderer.is_none() {
          renderer = surface
            .config()
            .map(|config| SimpleRenderSystem::init(config, &context.device, params.spin));
        }
        last_frame = Instant::now();
      }
      Event::Suspended => {
        surface.suspend();
      }
      Event::WindowEvent { event, window_id } if window_id == window_loop.window.id() => {
        match event {
          WindowEvent::CloseRequested
          | WindowEvent::KeyboardInput {
            event:
              KeyEvent {
                state: ElementState::Pressed,
                physical_key: PhysicalKey::Code(KeyCode::Escape),
                ..
              },
            ..
          } => target.exit(),
          WindowEvent::KeyboardInput {
            event:
              KeyEvent {
                state: ElementState::Pressed,
                physical_key: PhysicalKey::Code(keycode),
                ..
              },
            ..
          } => {
            if let Some((threshold_steps, samples_steps)) = contour_adjustment(keycode) {
              if let Err(err) =
                simulation.adjust_contour(threshold_steps, samples_steps, &context.device)
              {
                log::warn!("contour adjustment rejected: {err}");
              } else if let Some(meta_balls) = simulation.meta_balls() {
                let contour = meta_balls.marching_squares();
                log::info!(
                  "threshold {:.1}, samples {:?}",
                  contour.threshold(),
                  contour.samples()
                );
              }
            }
          }
          WindowEvent::RedrawRequested => {
            window_loop.window.request_redraw();
            let Some(renderer) = &mut renderer else {
              return;
            };
            let now = Instant::now();
            let dt = now.duration_since(last_frame).as_secs_f32();
            last_frame = now;
            if let Err(err) = simulation.tick(dt, &context.device) {
              log::warn!("frame tick failed: {err}");
            }

            let frame = match surface.acquire(&context) {
              Ok(frame) => frame,
              Err(err) => {
                log::warn!("skipping frame: {err}");
                return;
              }
            };
            let format = surface.config().and_then(|config| config.view_formats.first().copied());
            let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
              format,
              ..wgpu::TextureViewDescriptor::default()
            });
            renderer.render_game_objects(
              &view,
              &context.device,
              &context.queue,
              simulation.world_mut(),
            );
            frame.present();
          }
          _ => {}
        }
      }
      _ => {}
    },
  )?;
  Ok(())
}

/// Fixed-step loop without a window. Runs `frames` ticks, or until Ctrl-C
/// when `frames` is `None`.
pub fn run_headless(scene: Scene, params: &SimParams, frames: Option<u64>) -> anyhow::Result<()> {
  let stop = Arc::new(AtomicBool::new(false));
  let handler_stop = stop.clone();
  ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))
    .context("failed to install Ctrl-C handler")?;

  let mut simulation = Simulation::new(scene, params, &CpuUploader).context("failed to build scene")?;
  log::info!("running {scene:?} headless");

  while !stop.load(Ordering::SeqCst) {
    if frames.is_some_and(|frames| simulation.stats().frame >= frames) {
      break;
    }
    simulation.tick(params.delta_t, &CpuUploader)?;

    let stats = simulation.stats();
    if stats.frame % STATS_INTERVAL == 0 {
      log::info!(
        "frame {}: momentum ({:.4}, {:.4}), contour segments {}",
        stats.frame,
        stats.momentum.x,
        stats.momentum.y,
        stats.contour_segments
      );
    }
  }

  let stats = simulation.stats();
  log::info!("stopped after {} frames", stats.frame);
  Ok(())
}

pub fn run(scene: Scene, params: SimParams, headless: bool, frames: Option<u64>) -> anyhow::Result<()> {
  env_logger::init();
  if headless {
    run_headless(scene, &params, frames)
  } else {
    pollster::block_on(start(scene, params))
  }
}
