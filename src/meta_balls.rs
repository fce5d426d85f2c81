use crate::components::{RenderComponent, Transform2DComponent};
use crate::marching_squares::{ContourError, MarchingSquares};
use crate::model::{MeshError, MeshUploader};
use cgmath::{Vector2, Vector3};
use hecs::{Entity, World};
use thiserror::Error;

/// Balls bounce inside `[-BOUNDS, BOUNDS]` on both axes.
pub const BOUNDS: f32 = 0.9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetaBallError {
  #[error("meta ball radius {0} does not fit inside the bounds")]
  InvalidRadius(f32),
  #[error("no render entity, call create_initial_mesh first")]
  NoRenderEntity,
  #[error("render entity {0:?} was despawned")]
  EntityMissing(Entity),
  #[error(transparent)]
  Contour(#[from] ContourError),
  #[error(transparent)]
  Mesh(#[from] MeshError),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MetaBall {
  pub center: Vector2<f32>,
  pub velocity: Vector2<f32>,
  pub radius: f32,
}

impl MetaBall {
  /// Moves the ball and reflects it off the bounds.
  fn advance(&mut self, dt: f32) {
    self.center += self.velocity * dt;

    let limit = BOUNDS - self.radius;
    if self.center.x.abs() > limit {
      self.velocity.x = -self.velocity.x;
      self.center.x = limit.copysign(self.center.x);
    }
    if self.center.y.abs() > limit {
      self.velocity.y = -self.velocity.y;
      self.center.y = limit.copysign(self.center.y);
    }
  }
}

/// `radius / distance`: above 1 inside the circle, below 1 outside.
#[must_use]
pub fn implicit_circle(x: f32, y: f32, center: Vector2<f32>, radius: f32) -> f32 {
  let dx = x - center.x;
  let dy = y - center.y;
  radius / (dx * dx + dy * dy).sqrt()
}

/// One plus the smaller of the two edge clearances, each measured as a
/// fraction of the half-extent: above 1 inside the rectangle, exactly 1 on
/// its perimeter, below 1 outside.
#[must_use]
pub fn implicit_rectangle(x: f32, y: f32, center: Vector2<f32>, size: Vector2<f32>) -> f32 {
  let half_width = size.x * 0.5;
  let half_height = size.y * 0.5;
  let clearance_x = (half_width - (x - center.x).abs()) / half_width;
  let clearance_y = (half_height - (y - center.y).abs()) / half_height;
  1.0 + clearance_x.min(clearance_y)
}

/// Owns the balls and the single entity that renders their contour.
#[derive(Debug)]
pub struct MetaBallSystem {
  meta_balls: Vec<MetaBall>,
  marching_squares: MarchingSquares,
  color: Vector3<f32>,
  entity: Option<Entity>,
}

impl Default for MetaBallSystem {
  fn default() -> Self {
    Self::new(MarchingSquares::default())
  }
}

impl MetaBallSystem {
  #[must_use]
  pub fn new(marching_squares: MarchingSquares) -> Self {
    Self {
      meta_balls: Vec::new(),
      marching_squares,
      color: Vector3::new(1.0, 0.0, 0.0),
      entity: None,
    }
  }

  pub fn meta_balls(&self) -> &[MetaBall] {
    &self.meta_balls
  }

  pub fn marching_squares(&self) -> &MarchingSquares {
    &self.marching_squares
  }

  pub fn entity(&self) -> Option<Entity> {
    self.entity
  }

  pub fn add_meta_ball(
    &mut self,
    center: Vector2<f32>,
    velocity: Vector2<f32>,
    radius: f32,
  ) -> Result<(), MetaBallError> {
    if !(radius.is_finite() && radius > 0.0 && radius < BOUNDS) {
      return Err(MetaBallError::InvalidRadius(radius));
    }
    self.meta_balls.push(MetaBall {
      center,
      velocity,
      radius,
    });
    Ok(())
  }

  /// Sum of every ball's inverse-distance falloff at `(x, y)`.
  #[must_use]
  pub fn evaluate_field(&self, x: f32, y: f32) -> f32 {
    self
      .meta_balls
      .iter()
      .map(|ball| implicit_circle(x, y, ball.center, ball.radius))
      .sum()
  }

  /// Spawns the render entity and gives it its first contour mesh.
  pub fn create_initial_mesh(
    &mut self,
    world: &mut World,
    uploader: &impl MeshUploader,
  ) -> Result<Entity, MetaBallError> {
    let entity = world.spawn((Transform2DComponent::default(),));
    self.entity = Some(entity);
    self.update_mesh(world, uploader)?;
    Ok(entity)
  }

  pub fn tick(
    &mut self,
    dt: f32,
    world: &mut World,
    uploader: &impl MeshUploader,
  ) -> Result<(), MetaBallError> {
    for ball in &mut self.meta_balls {
      ball.advance(dt);
    }
    self.update_mesh(world, uploader)
  }

  /// Re-extracts the contour and swaps it into the render entity.
  pub fn update_mesh(
    &self,
    world: &mut World,
    uploader: &impl MeshUploader,
  ) -> Result<(), MetaBallError> {
    let entity = self.entity.ok_or(MetaBallError::NoRenderEntity)?;
    if !world.contains(entity) {
      return Err(MetaBallError::EntityMissing(entity));
    }

    let mesh = self
      .marching_squares
      .extract(|x, y| self.evaluate_field(x, y));
    log::debug!(
      "meta ball contour rebuilt: {} segments",
      mesh.primitive_count()
    );

    if mesh.is_empty() {
      // nothing to draw until the contour reappears
      if world.remove_one::<RenderComponent>(entity).is_ok() {
        log::debug!("meta ball contour vanished, hiding {entity:?}");
      }
      return Ok(());
    }

    let model = uploader.upload(&mesh)?;
    match world.query_one_mut::<&mut RenderComponent>(entity) {
      Ok(render) => render.model = model,
      Err(_) => world
        .insert_one(
          entity,
          RenderComponent {
            model,
            color: self.color,
          },
        )
        .map_err(|_| MetaBallError::EntityMissing(entity))?,
    }
    Ok(())
  }

  /// Replaces the extraction parameters and rebuilds the mesh right away.
  pub fn reconfigure(
    &mut self,
    threshold: f32,
    samples_x: u32,
    samples_y: u32,
    world: &mut World,
    uploader: &impl MeshUploader,
  ) -> Result<(), MetaBallError> {
    self.marching_squares = MarchingSquares::new(threshold, samples_x, samples_y)?;
    log::info!(
      "marching squares reconfigured: threshold {threshold}, {samples_x}x{samples_y} samples"
    );
    self.update_mesh(world, uploader)
  }
}
