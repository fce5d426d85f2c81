use crate::components::{RenderComponent, TransformComponent};
use crate::gravity::{self, GravityError, GravityPhysicsSystem};
use crate::initialize::{self, InitError};
use crate::meta_balls::{MetaBallError, MetaBallSystem};
use crate::model::MeshUploader;
use crate::vec2_field::{FieldError, Vec2FieldSystem};
use crate::{Scene, SimParams};
use cgmath::{Vector2, Vector3};
use hecs::{Entity, World};
use rand::{rngs::SmallRng, SeedableRng};
use std::f32::consts::TAU;
use thiserror::Error;

const THRESHOLD_STEP: f32 = 0.1;
const SAMPLES_STEP: i64 = 4;
const MIN_SAMPLES: i64 = 4;
/// Radians per second about x, y and z.
const CUBE_TUMBLE: Vector3<f32> = Vector3 {
  x: 0.3,
  y: 0.5,
  z: 0.0,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
  #[error(transparent)]
  Gravity(#[from] GravityError),
  #[error(transparent)]
  Field(#[from] FieldError),
  #[error(transparent)]
  MetaBall(#[from] MetaBallError),
}

/// Snapshot reported by the driver loops.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameStats {
  pub frame: u64,
  pub momentum: Vector2<f32>,
  pub contour_segments: u32,
}

/// The world plus every system that mutates it, advanced one tick per frame.
pub struct Simulation {
  world: World,
  gravity: GravityPhysicsSystem,
  field: Vec2FieldSystem,
  bodies: Vec<Entity>,
  probes: Vec<Entity>,
  meta_balls: Option<MetaBallSystem>,
  cube: Option<Entity>,
  substeps: u32,
  frame: u64,
}

impl Simulation {
  pub fn new(
    scene: Scene,
    params: &SimParams,
    uploader: &impl MeshUploader,
  ) -> Result<Self, InitError> {
    let mut world = World::new();
    let mut rng = SmallRng::seed_from_u64(params.seed);
    let mut bodies = Vec::new();
    let mut probes = Vec::new();
    let mut meta_balls = None;
    let mut cube = None;

    match scene {
      Scene::Gravity => {
        // probes first so the bodies draw on top of the field
        probes = initialize::create_vector_field(&mut world, uploader, params.field_grid)?;
        bodies = initialize::create_bodies(&mut world, uploader, params, &mut rng)?;
      }
      Scene::MetaBalls => {
        meta_balls = Some(initialize::create_meta_balls(
          &mut world, uploader, params, &mut rng,
        )?);
      }
      Scene::Cube => {
        cube = Some(initialize::create_cube(&mut world, uploader)?);
      }
    }

    Ok(Self {
      world,
      gravity: GravityPhysicsSystem::new(params.gravity),
      field: Vec2FieldSystem,
      bodies,
      probes,
      meta_balls,
      cube,
      substeps: params.substeps,
      frame: 0,
    })
  }

  pub fn world(&self) -> &World {
    &self.world
  }

  pub fn world_mut(&mut self) -> &mut World {
    &mut self.world
  }

  pub fn meta_balls(&self) -> Option<&MetaBallSystem> {
    self.meta_balls.as_ref()
  }

  /// Gravity, then the vector field, then the meta ball contour, then the
  /// cube's tumble.
  pub fn tick(&mut self, dt: f32, uploader: &impl MeshUploader) -> Result<(), SimError> {
    if !self.bodies.is_empty() {
      self.gravity.update(&mut self.world, dt, self.substeps)?;
      self
        .field
        .update(&self.gravity, &mut self.world, &self.bodies, &self.probes)?;
    }
    if let Some(meta_balls) = &mut self.meta_balls {
      meta_balls.tick(dt, &mut self.world, uploader)?;
    }
    if let Some(cube) = self.cube {
      if let Ok(transform) = self.world.query_one_mut::<&mut TransformComponent>(cube) {
        let turned = transform.rotation + CUBE_TUMBLE * dt;
        transform.rotation = turned.map(|angle| angle.rem_euclid(TAU));
      }
    }
    self.frame += 1;
    Ok(())
  }

  /// Nudges the contour threshold and grid resolution; a no-op without meta
  /// balls.
  pub fn adjust_contour(
    &mut self,
    threshold_steps: i32,
    samples_steps: i32,
    uploader: &impl MeshUploader,
  ) -> Result<(), SimError> {
    let Some(meta_balls) = &mut self.meta_balls else {
      return Ok(());
    };
    let current = *meta_balls.marching_squares();
    let threshold = (current.threshold() + threshold_steps as f32 * THRESHOLD_STEP).max(THRESHOLD_STEP);
    let (samples_x, samples_y) = current.samples();
    let resize =
      |samples: u32| (samples as i64 + samples_steps as i64 * SAMPLES_STEP).max(MIN_SAMPLES) as u32;
    meta_balls.reconfigure(
      threshold,
      resize(samples_x),
      resize(samples_y),
      &mut self.world,
      uploader,
    )?;
    Ok(())
  }

  pub fn stats(&self) -> FrameStats {
    let contour_segments = self
      .meta_balls
      .as_ref()
      .and_then(|meta_balls| meta_balls.entity())
      .and_then(|entity| self.world.get::<&RenderComponent>(entity).ok())
      .map_or(0, |render| render.model.index_count() / 2);
    FrameStats {
      frame: self.frame,
      momentum: gravity::total_momentum(&self.world),
      contour_segments,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::components::Transform2DComponent;
  use crate::model::CpuUploader;

  #[test]
  fn gravity_scene_moves_bodies_and_turns_probes() {
    let params = SimParams {
      field_grid: 3,
      ..Default::default()
    };
    let mut sim = Simulation::new(Scene::Gravity, &params, &CpuUploader).unwrap();
    let body = sim.bodies[0];
    let probe = sim.probes[0];
    let before = *sim.world().get::<&Transform2DComponent>(body).unwrap();

    sim.tick(params.delta_t, &CpuUploader).unwrap();

    let after = *sim.world().get::<&Transform2DComponent>(body).unwrap();
    assert_ne!(before.translation, after.translation);
    let probe = *sim.world().get::<&Transform2DComponent>(probe).unwrap();
    assert!(probe.scale.x > 0.005);
    assert_eq!(sim.stats().frame, 1);
    assert_eq!(sim.stats().contour_segments, 0);
  }

  #[test]
  fn meta_ball_scene_reports_contour() {
    let params = SimParams::default();
    let mut sim = Simulation::new(Scene::MetaBalls, &params, &CpuUploader).unwrap();
    sim.tick(params.delta_t, &CpuUploader).unwrap();
    assert!(sim.stats().contour_segments > 0);
    assert_eq!(sim.stats().momentum, Vector2::new(0.0, 0.0));
  }

  #[test]
  fn contour_adjustment_is_clamped() {
    let params = SimParams::default();
    let mut sim = Simulation::new(Scene::MetaBalls, &params, &CpuUploader).unwrap();

    sim.adjust_contour(0, -100, &CpuUploader).unwrap();
    assert_eq!(
      sim.meta_balls().unwrap().marching_squares().samples(),
      (MIN_SAMPLES as u32, MIN_SAMPLES as u32)
    );

    sim.adjust_contour(2, 3, &CpuUploader).unwrap();
    let ms = sim.meta_balls().unwrap().marching_squares();
    assert_eq!(ms.samples(), (16, 16));
    assert!((ms.threshold() - 1.2).abs() < 1e-5);
  }

  #[test]
  fn cube_scene_tumbles_within_a_turn() {
    let params = SimParams::default();
    let mut sim = Simulation::new(Scene::Cube, &params, &CpuUploader).unwrap();
    let cube = sim.cube.unwrap();
    let before = sim.world().get::<&TransformComponent>(cube).unwrap().rotation;

    sim.tick(2.0, &CpuUploader).unwrap();
    let after = sim.world().get::<&TransformComponent>(cube).unwrap().rotation;
    assert!((after.x - before.x - 0.6).abs() < 1e-5);
    assert!((after.y - before.y - 1.0).abs() < 1e-5);
    assert_eq!(after.z, before.z);

    for _ in 0..100 {
      sim.tick(1.0, &CpuUploader).unwrap();
    }
    let late = sim.world().get::<&TransformComponent>(cube).unwrap().rotation;
    assert!((0.0..TAU).contains(&late.x) && (0.0..TAU).contains(&late.y));
    assert_eq!(sim.stats().contour_segments, 0);
  }

  #[test]
  fn contour_adjustment_without_meta_balls_is_ignored() {
    let params = SimParams {
      field_grid: 2,
      ..Default::default()
    };
    let mut sim = Simulation::new(Scene::Gravity, &params, &CpuUploader).unwrap();
    assert_eq!(sim.adjust_contour(1, 1, &CpuUploader), Ok(()));
  }
}
