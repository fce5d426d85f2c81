use crate::components::{RenderComponent, Transform2DComponent, TransformComponent};
use crate::model::{Drawable, Topology, Vertex};
use cgmath::{Matrix4, Vector4};
use hecs::World;
use std::borrow::Cow;
use std::f32::consts::TAU;
use std::sync::Arc;
use wgpu::PipelineCompilationOptions;

const INITIAL_INSTANCE_CAPACITY: usize = 256;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
  r: 0.01,
  g: 0.01,
  b: 0.01,
  a: 1.0,
};

/// Per-entity data fed to the vertex shader through an instance buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
  pub model: [[f32; 4]; 4],
  pub color: [f32; 3],
}

impl InstanceRaw {
  const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    2 => Float32x4,
    3 => Float32x4,
    4 => Float32x4,
    5 => Float32x4,
    6 => Float32x3,
  ];

  fn desc() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
      step_mode: wgpu::VertexStepMode::Instance,
      attributes: &Self::ATTRIBUTES,
    }
  }

  /// Lifts the 2x2 transform and offset into the z = 0 plane.
  fn flat(transform: &Transform2DComponent, render: &RenderComponent) -> Self {
    let m = transform.mat2();
    let model = Matrix4::from_cols(
      m.x.extend(0.0).extend(0.0),
      m.y.extend(0.0).extend(0.0),
      Vector4::unit_z(),
      transform.translation.extend(0.0).extend(1.0),
    );
    Self {
      model: model.into(),
      color: render.color.into(),
    }
  }

  fn solid(transform: &TransformComponent, render: &RenderComponent) -> Self {
    Self {
      model: transform.mat4().into(),
      color: render.color.into(),
    }
  }
}

pub struct DrawCall {
  pub instance: InstanceRaw,
  pub model: Arc<dyn Drawable>,
}

/// Decorative rotation applied to everything that is drawn.
pub fn advance_spin(world: &mut World, spin: f32) {
  for (_, (transform, _)) in world.query_mut::<(&mut Transform2DComponent, &RenderComponent)>() {
    transform.rotation = (transform.rotation + spin).rem_euclid(TAU);
  }
}

/// One draw call per entity with a transform and a render component: 2D
/// entities first, then 3D ones. An entity carrying both transforms is drawn
/// once, with the 3D one.
pub fn collect_draw_calls(world: &World) -> Vec<DrawCall> {
  let mut calls: Vec<DrawCall> = world
    .query::<(&Transform2DComponent, &RenderComponent)>()
    .without::<&TransformComponent>()
    .iter()
    .map(|(_, (transform, render))| DrawCall {
      instance: InstanceRaw::flat(transform, render),
      model: render.model.clone(),
    })
    .collect();
  calls.extend(
    world
      .query::<(&TransformComponent, &RenderComponent)>()
      .iter()
      .map(|(_, (transform, render))| DrawCall {
        instance: InstanceRaw::solid(transform, render),
        model: render.model.clone(),
      }),
  );
  calls
}

fn create_pipeline(
  device: &wgpu::Device,
  layout: &wgpu::PipelineLayout,
  shader: &wgpu::ShaderModule,
  format: wgpu::TextureFormat,
  topology: Topology,
) -> wgpu::RenderPipeline {
  device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
    label: Some(match topology {
      Topology::LineList => "Line Pipeline",
      Topology::TriangleList => "Triangle Pipeline",
    }),
    layout: Some(layout),
    vertex: wgpu::VertexState {
      module: shader,
      entry_point: "main_vs",
      compilation_options: PipelineCompilationOptions::default(),
      buffers: &[Vertex::desc(), InstanceRaw::desc()],
    },
    fragment: Some(wgpu::FragmentState {
      module: shader,
      entry_point: "main_fs",
      compilation_options: PipelineCompilationOptions::default(),
      targets: &[Some(format.into())],
    }),
    primitive: wgpu::PrimitiveState {
      topology: topology.into(),
      ..Default::default()
    },
    // equal depths pass so later 2D draws land on top
    depth_stencil: Some(wgpu::DepthStencilState {
      format: DEPTH_FORMAT,
      depth_write_enabled: true,
      depth_compare: wgpu::CompareFunction::LessEqual,
      stencil: wgpu::StencilState::default(),
      bias: wgpu::DepthBiasState::default(),
    }),
    multisample: wgpu::MultisampleState::default(),
    multiview: None,
    cache: None,
  })
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
  device.create_buffer(&wgpu::BufferDescriptor {
    label: Some("Instance Buffer"),
    size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
    mapped_at_creation: false,
  })
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
  let texture = device.create_texture(&wgpu::TextureDescriptor {
    label: Some("Depth Texture"),
    size: wgpu::Extent3d {
      width: config.width.max(1),
      height: config.height.max(1),
      depth_or_array_layers: 1,
    },
    mip_level_count: 1,
    sample_count: 1,
    dimension: wgpu::TextureDimension::D2,
    format: DEPTH_FORMAT,
    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
    view_formats: &[],
  });
  texture.create_view(&wgpu::TextureViewDescriptor::default())
}

pub struct SimpleRenderSystem {
  depth_view: wgpu::TextureView,
  line_pipeline: wgpu::RenderPipeline,
  triangle_pipeline: wgpu::RenderPipeline,
  instance_buffer: wgpu::Buffer,
  instance_capacity: usize,
  spin: f32,
}

impl SimpleRenderSystem {
  #[must_use]
  pub fn init(config: &wgpu::SurfaceConfiguration, device: &wgpu::Device, spin: f32) -> Self {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("Simple Shader"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/simple.wgsl"))),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("simple"),
      bind_group_layouts: &[],
      push_constant_ranges: &[],
    });
    let format = config.view_formats.first().copied().unwrap_or(config.format);

    Self {
      depth_view: create_depth_view(device, config),
      line_pipeline: create_pipeline(device, &layout, &shader, format, Topology::LineList),
      triangle_pipeline: create_pipeline(device, &layout, &shader, format, Topology::TriangleList),
      instance_buffer: create_instance_buffer(device, INITIAL_INSTANCE_CAPACITY),
      instance_capacity: INITIAL_INSTANCE_CAPACITY,
      spin,
    }
  }

  fn pipeline(&self, topology: Topology) -> &wgpu::RenderPipeline {
    match topology {
      Topology::LineList => &self.line_pipeline,
      Topology::TriangleList => &self.triangle_pipeline,
    }
  }

  fn reserve_instances(&mut self, device: &wgpu::Device, count: usize) {
    if count > self.instance_capacity {
      let capacity = count.next_power_of_two();
      log::debug!("growing instance buffer to {capacity}");
      self.instance_buffer = create_instance_buffer(device, capacity);
      self.instance_capacity = capacity;
    }
  }

  /// Draws every entity that has a transform and a render component.
  pub fn render_game_objects(
    &mut self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    world: &mut World,
  ) {
    if self.spin != 0.0 {
      advance_spin(world, self.spin);
    }
    let draw_calls = collect_draw_calls(world);
    let instances: Vec<InstanceRaw> = draw_calls.iter().map(|call| call.instance).collect();
    self.reserve_instances(device, instances.len());
    if !instances.is_empty() {
      queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
    }

    let color_attachments = [Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations {
        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
        store: wgpu::StoreOp::Store,
      },
    })];
    let render_pass_descriptor = wgpu::RenderPassDescriptor {
      label: None,
      color_attachments: &color_attachments,
      depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
        view: &self.depth_view,
        depth_ops: Some(wgpu::Operations {
          load: wgpu::LoadOp::Clear(1.0),
          store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
      }),
      timestamp_writes: None,
      occlusion_query_set: None,
    };
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
      let mut rpass = command_encoder.begin_render_pass(&render_pass_descriptor);
      rpass.set_vertex_buffer(1, self.instance_buffer.slice(..));
      for (instance, call) in draw_calls.iter().enumerate() {
        rpass.set_pipeline(self.pipeline(call.model.topology()));
        call.model.draw(&mut rpass, instance as u32);
      }
    }
    queue.submit(Some(command_encoder.finish()));
  }
}
