//! Mesh data and the upload boundary between the simulation and the device.

use std::sync::Arc;
use thiserror::Error;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
  /// 2D meshes leave `z` at 0.
  pub position: [f32; 3],
  pub color: [f32; 3],
}

impl Vertex {
  const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

  #[must_use]
  pub fn new(position: [f32; 3], color: [f32; 3]) -> Self {
    Self { position, color }
  }

  #[must_use]
  pub fn at(x: f32, y: f32) -> Self {
    Self::new([x, y, 0.0], [0.0; 3])
  }

  pub fn desc() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &Self::ATTRIBUTES,
    }
  }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
  LineList,
  TriangleList,
}

impl Topology {
  #[must_use]
  pub fn indices_per_primitive(self) -> usize {
    match self {
      Topology::LineList => 2,
      Topology::TriangleList => 3,
    }
  }
}

impl From<Topology> for wgpu::PrimitiveTopology {
  fn from(topology: Topology) -> Self {
    match topology {
      Topology::LineList => wgpu::PrimitiveTopology::LineList,
      Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
    }
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
  #[error("a mesh needs at least 2 vertices, got {0}")]
  TooFewVertices(usize),
  #[error("{count} indices is not a whole number of {topology:?} primitives")]
  IndexCount { count: usize, topology: Topology },
  #[error("index {index} points past the last of {vertex_count} vertices")]
  IndexOutOfRange { index: u32, vertex_count: usize },
}

/// CPU-side mesh, handed to a [`MeshUploader`].
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
  pub vertices: Vec<Vertex>,
  pub indices: Vec<u32>,
  pub topology: Topology,
}

impl MeshData {
  #[must_use]
  pub fn new(topology: Topology) -> Self {
    Self {
      vertices: Vec::new(),
      indices: Vec::new(),
      topology,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }

  pub fn primitive_count(&self) -> usize {
    self.indices.len() / self.topology.indices_per_primitive()
  }

  pub fn validate(&self) -> Result<(), MeshError> {
    if self.vertices.len() < 2 {
      return Err(MeshError::TooFewVertices(self.vertices.len()));
    }
    if self.indices.len() % self.topology.indices_per_primitive() != 0 {
      return Err(MeshError::IndexCount {
        count: self.indices.len(),
        topology: self.topology,
      });
    }
    if let Some(&index) = self
      .indices
      .iter()
      .find(|&&i| i as usize >= self.vertices.len())
    {
      return Err(MeshError::IndexOutOfRange {
        index,
        vertex_count: self.vertices.len(),
      });
    }
    Ok(())
  }
}

/// An uploaded mesh that the render pass can bind and draw.
pub trait Drawable: Send + Sync {
  fn topology(&self) -> Topology;
  fn vertex_count(&self) -> u32;
  fn index_count(&self) -> u32;
  /// Binds vertex and index buffers to slot 0 and draws a single instance.
  fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, instance: u32);
}

pub trait MeshUploader {
  fn upload(&self, mesh: &MeshData) -> Result<Arc<dyn Drawable>, MeshError>;
}

pub struct Model {
  vertex_buffer: wgpu::Buffer,
  index_buffer: wgpu::Buffer,
  vertex_count: u32,
  index_count: u32,
  topology: Topology,
}

impl Model {
  pub fn new(device: &wgpu::Device, mesh: &MeshData) -> Result<Self, MeshError> {
    mesh.validate()?;
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Model Vertex Buffer"),
      contents: bytemuck::cast_slice(&mesh.vertices),
      usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Model Index Buffer"),
      contents: bytemuck::cast_slice(&mesh.indices),
      usage: wgpu::BufferUsages::INDEX,
    });
    Ok(Self {
      vertex_buffer,
      index_buffer,
      vertex_count: mesh.vertices.len() as u32,
      index_count: mesh.indices.len() as u32,
      topology: mesh.topology,
    })
  }
}

impl Drawable for Model {
  fn topology(&self) -> Topology {
    self.topology
  }

  fn vertex_count(&self) -> u32 {
    self.vertex_count
  }

  fn index_count(&self) -> u32 {
    self.index_count
  }

  fn draw<'a>(&'a self, pass: &mut wgpu::RenderPass<'a>, instance: u32) {
    pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
    pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..self.index_count, 0, instance..instance + 1);
  }
}

impl MeshUploader for wgpu::Device {
  fn upload(&self, mesh: &MeshData) -> Result<Arc<dyn Drawable>, MeshError> {
    Ok(Arc::new(Model::new(self, mesh)?))
  }
}

/// Validated mesh kept in host memory, for runs without a device.
#[derive(Debug)]
pub struct CpuModel {
  mesh: MeshData,
}

impl CpuModel {
  pub fn new(mesh: &MeshData) -> Result<Self, MeshError> {
    mesh.validate()?;
    Ok(Self { mesh: mesh.clone() })
  }

  pub fn mesh(&self) -> &MeshData {
    &self.mesh
  }
}

impl Drawable for CpuModel {
  fn topology(&self) -> Topology {
    self.mesh.topology
  }

  fn vertex_count(&self) -> u32 {
    self.mesh.vertices.len() as u32
  }

  fn index_count(&self) -> u32 {
    self.mesh.indices.len() as u32
  }

  // never submitted: headless runs have no render pass
  fn draw<'a>(&'a self, _pass: &mut wgpu::RenderPass<'a>, _instance: u32) {}
}

#[derive(Copy, Clone, Debug, Default)]
pub struct CpuUploader;

impl MeshUploader for CpuUploader {
  fn upload(&self, mesh: &MeshData) -> Result<Arc<dyn Drawable>, MeshError> {
    Ok(Arc::new(CpuModel::new(mesh)?))
  }
}
