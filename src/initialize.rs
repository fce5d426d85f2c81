use crate::components::{
  FieldProbe, RenderComponent, RigidBody2DComponent, Transform2DComponent, TransformComponent,
};
use crate::marching_squares::{ContourError, MarchingSquares};
use crate::meta_balls::{MetaBallError, MetaBallSystem};
use crate::model::{MeshData, MeshError, MeshUploader, Topology, Vertex};
use crate::vec2_field::{create_circle_model, create_square_model};
use crate::SimParams;
use cgmath::{Vector2, Vector3};
use hecs::{Entity, World};
use rand::{rngs::SmallRng, Rng};
use rand_distr::{Distribution, Normal, NormalError};
use std::f32::consts::FRAC_PI_4;
use thiserror::Error;

const BODY_SCALE: f32 = 0.05;
const CIRCLE_SIDES: u32 = 64;

#[derive(Error, Debug)]
pub enum InitError {
  #[error("failed to build scene mesh: {0}")]
  Mesh(#[from] MeshError),
  #[error(transparent)]
  Contour(#[from] ContourError),
  #[error(transparent)]
  MetaBall(#[from] MetaBallError),
  #[error("bad velocity distribution: {0}")]
  Distribution(#[from] NormalError),
}

/// Spawns `params.num_bodies` gravitating discs. The first two start on
/// crossing paths; the rest are scattered with random velocities.
pub fn create_bodies(
  world: &mut World,
  uploader: &impl MeshUploader,
  params: &SimParams,
  rng: &mut SmallRng,
) -> Result<Vec<Entity>, InitError> {
  let circle = uploader.upload(&create_circle_model(CIRCLE_SIDES))?;
  let jitter = Normal::new(0.0, 0.2)?;
  let mut bodies = Vec::with_capacity(params.num_bodies as usize);

  for i in 0..params.num_bodies {
    let (translation, velocity, color) = match i {
      0 => (
        Vector2::new(0.5, 0.5),
        Vector2::new(-0.5, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
      ),
      1 => (
        Vector2::new(-0.45, -0.25),
        Vector2::new(0.5, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
      ),
      _ => (
        Vector2::new(rng.gen_range(-0.8..0.8), rng.gen_range(-0.8..0.8)),
        Vector2::new(jitter.sample(rng), jitter.sample(rng)),
        Vector3::new(rng.gen(), rng.gen(), rng.gen()),
      ),
    };

    let entity = world.spawn((
      Transform2DComponent {
        translation,
        scale: Vector2::new(BODY_SCALE, BODY_SCALE),
        rotation: 0.0,
      },
      RigidBody2DComponent {
        velocity,
        mass: 1.0,
      },
      RenderComponent {
        model: circle.clone(),
        color,
      },
    ));
    bodies.push(entity);
  }

  log::info!("created {} gravity bodies", bodies.len());
  Ok(bodies)
}

/// Lays a `grid_count` x `grid_count` lattice of probes over the view. All
/// probes share one square glyph mesh.
pub fn create_vector_field(
  world: &mut World,
  uploader: &impl MeshUploader,
  grid_count: u32,
) -> Result<Vec<Entity>, InitError> {
  if grid_count == 0 {
    return Ok(Vec::new());
  }
  let square = uploader.upload(&create_square_model(Vector2::new(0.5, 0.0)))?;
  let mut probes = Vec::with_capacity((grid_count * grid_count) as usize);

  for i in 0..grid_count {
    for j in 0..grid_count {
      let translation = Vector2::new(
        -1.0 + (i as f32 + 0.5) * 2.0 / grid_count as f32,
        -1.0 + (j as f32 + 0.5) * 2.0 / grid_count as f32,
      );
      let entity = world.spawn((
        Transform2DComponent {
          translation,
          scale: Vector2::new(0.005, 0.005),
          rotation: 0.0,
        },
        RigidBody2DComponent::default(),
        RenderComponent {
          model: square.clone(),
          color: Vector3::new(1.0, 1.0, 1.0),
        },
        FieldProbe,
      ));
      probes.push(entity);
    }
  }

  log::info!("created {} vector field probes", probes.len());
  Ok(probes)
}

/// Builds the meta ball system with randomly placed balls and spawns its
/// render entity.
pub fn create_meta_balls(
  world: &mut World,
  uploader: &impl MeshUploader,
  params: &SimParams,
  rng: &mut SmallRng,
) -> Result<MetaBallSystem, InitError> {
  let marching_squares = MarchingSquares::new(params.threshold, params.samples, params.samples)?;
  let mut system = MetaBallSystem::new(marching_squares);
  let speed = Normal::new(0.0, 0.3)?;

  for _ in 0..params.num_meta_balls {
    system.add_meta_ball(
      Vector2::new(rng.gen_range(-0.5..0.5), rng.gen_range(-0.5..0.5)),
      Vector2::new(speed.sample(rng), speed.sample(rng)),
      rng.gen_range(0.05..0.15),
    )?;
  }
  system.create_initial_mesh(world, uploader)?;

  log::info!("created {} meta balls", system.meta_balls().len());
  Ok(system)
}

/// Unit cube centred on `offset`, one flat colour per face.
#[must_use]
pub fn create_cube_model(offset: Vector3<f32>) -> MeshData {
  // four corners per face; the two triangles are (0, 1, 2) and (0, 3, 1)
  let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
    // left
    (
      [[-0.5, -0.5, -0.5], [-0.5, 0.5, 0.5], [-0.5, -0.5, 0.5], [-0.5, 0.5, -0.5]],
      [0.9, 0.9, 0.9],
    ),
    // right
    (
      [[0.5, -0.5, -0.5], [0.5, 0.5, 0.5], [0.5, -0.5, 0.5], [0.5, 0.5, -0.5]],
      [0.8, 0.8, 0.1],
    ),
    // bottom
    (
      [[-0.5, -0.5, -0.5], [0.5, -0.5, 0.5], [-0.5, -0.5, 0.5], [0.5, -0.5, -0.5]],
      [0.9, 0.6, 0.1],
    ),
    // top
    (
      [[-0.5, 0.5, -0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5], [0.5, 0.5, -0.5]],
      [0.8, 0.1, 0.1],
    ),
    // front
    (
      [[-0.5, -0.5, 0.5], [0.5, 0.5, 0.5], [-0.5, 0.5, 0.5], [0.5, -0.5, 0.5]],
      [0.1, 0.1, 0.8],
    ),
    // back
    (
      [[-0.5, -0.5, -0.5], [0.5, 0.5, -0.5], [-0.5, 0.5, -0.5], [0.5, -0.5, -0.5]],
      [0.1, 0.8, 0.1],
    ),
  ];

  let mut mesh = MeshData::new(Topology::TriangleList);
  for (corners, color) in faces {
    let base = mesh.vertices.len() as u32;
    for [x, y, z] in corners {
      mesh
        .vertices
        .push(Vertex::new([x + offset.x, y + offset.y, z + offset.z], color));
    }
    mesh
      .indices
      .extend([0, 1, 2, 0, 3, 1].map(|i| base + i));
  }
  mesh
}

/// Spawns a half-size cube in the middle of the depth range, turned so three
/// faces show.
pub fn create_cube(world: &mut World, uploader: &impl MeshUploader) -> Result<Entity, InitError> {
  let cube = uploader.upload(&create_cube_model(Vector3::new(0.0, 0.0, 0.0)))?;
  let entity = world.spawn((
    TransformComponent {
      translation: Vector3::new(0.0, 0.0, 0.5),
      scale: Vector3::new(0.5, 0.5, 0.5),
      rotation: Vector3::new(FRAC_PI_4, FRAC_PI_4, 0.0),
    },
    RenderComponent {
      model: cube,
      color: Vector3::new(0.0, 0.0, 0.0),
    },
  ));
  log::info!("created cube");
  Ok(entity)
}
