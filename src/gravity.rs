use crate::components::{FieldProbe, RigidBody2DComponent, Transform2DComponent};
use cgmath::{InnerSpace, Vector2};
use hecs::{Entity, World};
use thiserror::Error;

/// Squared distances below this produce no force.
const MIN_DISTANCE_SQUARED: f32 = 1e-10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GravityError {
  #[error("gravity update needs at least one substep")]
  ZeroSubsteps,
  #[error("entity {entity:?} has mass {mass}, masses must be finite and positive")]
  InvalidMass { entity: Entity, mass: f32 },
}

#[derive(Copy, Clone, Debug)]
pub struct GravityPhysicsSystem {
  pub strength_gravity: f32,
}

impl GravityPhysicsSystem {
  #[must_use]
  pub fn new(strength_gravity: f32) -> Self {
    Self { strength_gravity }
  }

  /// Advances every body by `dt`, split into `substeps` equal steps.
  /// More substeps are more stable but cost more.
  pub fn update(&self, world: &mut World, dt: f32, substeps: u32) -> Result<(), GravityError> {
    if substeps == 0 {
      return Err(GravityError::ZeroSubsteps);
    }
    for (entity, (_, body)) in world
      .query::<(&Transform2DComponent, &RigidBody2DComponent)>()
      .without::<&FieldProbe>()
      .iter()
    {
      if !(body.mass.is_finite() && body.mass > 0.0) {
        return Err(GravityError::InvalidMass {
          entity,
          mass: body.mass,
        });
      }
    }

    let step_delta = dt / substeps as f32;
    for _ in 0..substeps {
      self.step_simulation(world, step_delta);
    }
    Ok(())
  }

  fn step_simulation(&self, world: &mut World, dt: f32) {
    let mut bodies: Vec<(&mut Transform2DComponent, &mut RigidBody2DComponent)> = world
      .query_mut::<(&mut Transform2DComponent, &mut RigidBody2DComponent)>()
      .without::<&FieldProbe>()
      .into_iter()
      .map(|(_, components)| components)
      .collect();

    // unique pairs only: b always comes after a
    for a in 0..bodies.len() {
      let (head, tail) = bodies.split_at_mut(a + 1);
      let (transform_a, body_a) = &mut head[a];
      for (transform_b, body_b) in tail.iter_mut() {
        let force = self.compute_force(transform_a, body_a, transform_b, body_b);
        body_a.velocity += dt * -force / body_a.mass;
        body_b.velocity += dt * force / body_b.mass;
      }
    }

    for (transform, body) in bodies.iter_mut() {
      transform.translation += dt * body.velocity;
    }
  }

  /// Force that `from` exerts on `to`, returned along `from - to` scaled by
  /// the inverse-square law.
  #[must_use]
  pub fn compute_force(
    &self,
    transform_from: &Transform2DComponent,
    body_from: &RigidBody2DComponent,
    transform_to: &Transform2DComponent,
    body_to: &RigidBody2DComponent,
  ) -> Vector2<f32> {
    let offset = transform_from.translation - transform_to.translation;
    let distance_squared = offset.dot(offset);

    if distance_squared.abs() < MIN_DISTANCE_SQUARED {
      return Vector2::new(0.0, 0.0);
    }

    let force_magnitude =
      self.strength_gravity * body_from.mass * body_to.mass / distance_squared;
    force_magnitude * offset / distance_squared.sqrt()
  }
}

/// Sum of `mass * velocity` over the bodies the gravity system integrates.
#[must_use]
pub fn total_momentum(world: &World) -> Vector2<f32> {
  world
    .query::<(&Transform2DComponent, &RigidBody2DComponent)>()
    .without::<&FieldProbe>()
    .iter()
    .fold(Vector2::new(0.0, 0.0), |sum, (_, (_, body))| {
      sum + body.mass * body.velocity
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  fn body(world: &mut World, x: f32, y: f32, mass: f32) -> Entity {
    world.spawn((
      Transform2DComponent::at(Vector2::new(x, y)),
      RigidBody2DComponent {
        velocity: Vector2::new(0.0, 0.0),
        mass,
      },
    ))
  }

  fn velocity(world: &World, entity: Entity) -> Vector2<f32> {
    world.get::<&RigidBody2DComponent>(entity).unwrap().velocity
  }

  fn translation(world: &World, entity: Entity) -> Vector2<f32> {
    world.get::<&Transform2DComponent>(entity).unwrap().translation
  }

  #[test]
  fn unit_bodies_one_apart_feel_unit_force() {
    let gravity = GravityPhysicsSystem::new(1.0);
    let a = Transform2DComponent::at(Vector2::new(0.0, 0.0));
    let b = Transform2DComponent::at(Vector2::new(1.0, 0.0));
    let body = RigidBody2DComponent::default();

    let force = gravity.compute_force(&a, &body, &b, &body);
    assert_relative_eq!(force.magnitude(), 1.0);
    assert_relative_eq!(force.x, -1.0);
    assert_relative_eq!(force.y, 0.0);
  }

  #[test]
  fn force_follows_inverse_square_law() {
    let gravity = GravityPhysicsSystem::new(2.0);
    let a = Transform2DComponent::at(Vector2::new(0.0, 0.0));
    let b = Transform2DComponent::at(Vector2::new(0.0, 2.0));
    let heavy = RigidBody2DComponent {
      mass: 3.0,
      ..Default::default()
    };
    let light = RigidBody2DComponent {
      mass: 0.5,
      ..Default::default()
    };

    // 2 * 3 * 0.5 / 4
    let force = gravity.compute_force(&a, &heavy, &b, &light);
    assert_relative_eq!(force.magnitude(), 0.75);
    assert_relative_eq!(force.y, -0.75);
  }

  #[test]
  fn coincident_bodies_feel_no_force() {
    let gravity = GravityPhysicsSystem::new(1.0);
    let at = Transform2DComponent::at(Vector2::new(0.3, -0.2));
    for mass in [1e-6, 1.0, 1e6] {
      let body = RigidBody2DComponent {
        mass,
        ..Default::default()
      };
      let force = gravity.compute_force(&at, &body, &at, &body);
      assert_eq!(force, Vector2::new(0.0, 0.0));
    }
  }

  #[test]
  fn one_step_updates_velocity_then_position() {
    let mut world = World::new();
    let a = body(&mut world, 0.0, 0.0, 1.0);
    let b = body(&mut world, 1.0, 0.0, 1.0);

    GravityPhysicsSystem::new(1.0)
      .update(&mut world, 1.0, 1)
      .unwrap();

    assert_relative_eq!(velocity(&world, a).x, 1.0);
    assert_relative_eq!(velocity(&world, b).x, -1.0);
    assert_relative_eq!(velocity(&world, a).y, 0.0);
    // positions move with the freshly updated velocities
    assert_relative_eq!(translation(&world, a).x, 1.0);
    assert_relative_eq!(translation(&world, b).x, 0.0);
  }

  #[test]
  fn heavier_body_accelerates_less() {
    let mut world = World::new();
    let heavy = body(&mut world, 0.0, 0.0, 4.0);
    let light = body(&mut world, 2.0, 0.0, 1.0);

    GravityPhysicsSystem::new(1.0)
      .update(&mut world, 0.1, 1)
      .unwrap();

    assert_relative_eq!(
      velocity(&world, light).x,
      -4.0 * velocity(&world, heavy).x,
      epsilon = 1e-6
    );
  }

  #[test]
  fn zero_substeps_is_rejected() {
    let mut world = World::new();
    let a = body(&mut world, 0.0, 0.0, 1.0);
    body(&mut world, 1.0, 0.0, 1.0);

    let result = GravityPhysicsSystem::new(1.0).update(&mut world, 1.0, 0);
    assert_eq!(result, Err(GravityError::ZeroSubsteps));
    assert_eq!(velocity(&world, a), Vector2::new(0.0, 0.0));
  }

  #[test]
  fn non_positive_mass_is_rejected_before_any_step() {
    let mut world = World::new();
    let a = body(&mut world, 0.0, 0.0, 1.0);
    let bad = body(&mut world, 1.0, 0.0, 0.0);

    let result = GravityPhysicsSystem::new(1.0).update(&mut world, 1.0, 1);
    assert_eq!(
      result,
      Err(GravityError::InvalidMass {
        entity: bad,
        mass: 0.0
      })
    );
    assert_eq!(translation(&world, a), Vector2::new(0.0, 0.0));
  }

  #[test]
  fn field_probes_are_not_integrated() {
    let mut world = World::new();
    body(&mut world, 0.0, 0.0, 1.0);
    let probe = world.spawn((
      Transform2DComponent::at(Vector2::new(0.5, 0.0)),
      RigidBody2DComponent::default(),
      FieldProbe,
    ));

    GravityPhysicsSystem::new(1.0)
      .update(&mut world, 1.0, 4)
      .unwrap();

    assert_eq!(translation(&world, probe), Vector2::new(0.5, 0.0));
    assert_eq!(velocity(&world, probe), Vector2::new(0.0, 0.0));
  }

  #[test]
  fn substeps_split_the_time_step() {
    let mut world = World::new();
    let a = body(&mut world, 0.0, 0.0, 1.0);
    body(&mut world, 10.0, 0.0, 1.0);

    GravityPhysicsSystem::new(0.0)
      .update(&mut world, 1.0, 8)
      .unwrap();
    assert_eq!(translation(&world, a), Vector2::new(0.0, 0.0));

    world
      .get::<&mut RigidBody2DComponent>(a)
      .unwrap()
      .velocity = Vector2::new(1.0, 0.0);
    GravityPhysicsSystem::new(0.0)
      .update(&mut world, 1.0, 8)
      .unwrap();
    assert_relative_eq!(translation(&world, a).x, 1.0, epsilon = 1e-6);
  }
}
