use crate::components::{RigidBody2DComponent, Transform2DComponent};
use crate::gravity::GravityPhysicsSystem;
use crate::model::{MeshData, Topology, Vertex};
use cgmath::{InnerSpace, Vector2};
use hecs::{Entity, World};
use std::f32::consts::TAU;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
  #[error("entity {0:?} needs both a transform and a rigid body")]
  MissingComponents(Entity),
}

/// Points glyphs along the net gravitational pull at each probe.
#[derive(Copy, Clone, Debug, Default)]
pub struct Vec2FieldSystem;

impl Vec2FieldSystem {
  pub fn update(
    &self,
    gravity: &GravityPhysicsSystem,
    world: &mut World,
    sources: &[Entity],
    probes: &[Entity],
  ) -> Result<(), FieldError> {
    let sources = sources
      .iter()
      .map(|&entity| body_of(world, entity))
      .collect::<Result<Vec<_>, _>>()?;

    for &probe in probes {
      let (probe_transform, probe_body) = body_of(world, probe)?;
      let direction = sources
        .iter()
        .fold(Vector2::new(0.0, 0.0), |sum, (source_transform, source_body)| {
          sum + gravity.compute_force(source_transform, source_body, &probe_transform, &probe_body)
        });

      let transform = world
        .query_one_mut::<&mut Transform2DComponent>(probe)
        .map_err(|_| FieldError::MissingComponents(probe))?;
      transform.scale.x = glyph_length(direction.magnitude());
      transform.rotation = direction.y.atan2(direction.x);
    }
    Ok(())
  }
}

fn body_of(
  world: &mut World,
  entity: Entity,
) -> Result<(Transform2DComponent, RigidBody2DComponent), FieldError> {
  world
    .query_one_mut::<(&Transform2DComponent, &RigidBody2DComponent)>(entity)
    .map(|(transform, body)| (*transform, *body))
    .map_err(|_| FieldError::MissingComponents(entity))
}

/// Log-compressed so both tiny and huge forces stay visible.
fn glyph_length(magnitude: f32) -> f32 {
  0.005 + 0.045 * ((magnitude + 1.0).ln() / 3.0).clamp(0.0, 1.0)
}

/// Unit square shifted by `offset`, as two triangles.
#[must_use]
pub fn create_square_model(offset: Vector2<f32>) -> MeshData {
  let corners = [(-0.5, -0.5), (0.5, 0.5), (-0.5, 0.5), (0.5, -0.5)];
  MeshData {
    vertices: corners
      .iter()
      .map(|&(x, y)| Vertex::at(x + offset.x, y + offset.y))
      .collect(),
    indices: vec![0, 1, 2, 0, 3, 1],
    topology: Topology::TriangleList,
  }
}

/// Unit circle as a triangle fan around a centre vertex.
#[must_use]
pub fn create_circle_model(num_sides: u32) -> MeshData {
  let num_sides = num_sides.max(3);
  let mut vertices: Vec<Vertex> = (0..num_sides)
    .map(|i| {
      let angle = i as f32 * TAU / num_sides as f32;
      Vertex::at(angle.cos(), angle.sin())
    })
    .collect();
  vertices.push(Vertex::default());

  let center = num_sides;
  let indices = (0..num_sides)
    .flat_map(|i| [center, i, (i + 1) % num_sides])
    .collect();

  MeshData {
    vertices,
    indices,
    topology: Topology::TriangleList,
  }
}
