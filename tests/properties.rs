use approx::assert_abs_diff_eq;
use cgmath::{InnerSpace, Vector2};
use evilution::components::{RigidBody2DComponent, Transform2DComponent};
use evilution::gravity::{self, GravityPhysicsSystem};
use evilution::marching_squares::MarchingSquares;
use evilution::meta_balls::{implicit_circle, MetaBallSystem, BOUNDS};
use evilution::model::CpuUploader;
use evilution::simulation::Simulation;
use evilution::{Scene, SimParams};
use hecs::World;

fn spawn_body(world: &mut World, x: f32, y: f32, vx: f32, vy: f32, mass: f32) -> hecs::Entity {
  world.spawn((
    Transform2DComponent::at(Vector2::new(x, y)),
    RigidBody2DComponent {
      velocity: Vector2::new(vx, vy),
      mass,
    },
  ))
}

#[test]
fn symmetric_pair_conserves_momentum() {
  let mut world = World::new();
  spawn_body(&mut world, 0.5, 0.0, 0.0, 0.3, 1.0);
  spawn_body(&mut world, -0.5, 0.0, 0.0, -0.3, 1.0);
  let gravity = GravityPhysicsSystem::new(0.81);

  for _ in 0..240 {
    gravity.update(&mut world, 1.0 / 60.0, 5).unwrap();
  }

  let momentum = gravity::total_momentum(&world);
  assert_abs_diff_eq!(momentum.x, 0.0, epsilon = 1e-4);
  assert_abs_diff_eq!(momentum.y, 0.0, epsilon = 1e-4);
}

#[test]
fn coincident_bodies_feel_no_force() {
  let gravity = GravityPhysicsSystem::new(1.0);
  let at = Transform2DComponent::at(Vector2::new(0.3, -0.2));
  for (m1, m2) in [(1.0, 1.0), (1e-3, 50.0), (1e6, 2.0)] {
    let force = gravity.compute_force(
      &at,
      &RigidBody2DComponent {
        mass: m1,
        ..Default::default()
      },
      &at,
      &RigidBody2DComponent {
        mass: m2,
        ..Default::default()
      },
    );
    assert_eq!(force, Vector2::new(0.0, 0.0));
  }
}

#[test]
fn unit_pair_after_one_step() {
  let mut world = World::new();
  let a = spawn_body(&mut world, 0.0, 0.0, 0.0, 0.0, 1.0);
  let b = spawn_body(&mut world, 1.0, 0.0, 0.0, 0.0, 1.0);
  let gravity = GravityPhysicsSystem::new(1.0);

  let force = gravity.compute_force(
    &*world.get::<&Transform2DComponent>(a).unwrap(),
    &*world.get::<&RigidBody2DComponent>(a).unwrap(),
    &*world.get::<&Transform2DComponent>(b).unwrap(),
    &*world.get::<&RigidBody2DComponent>(b).unwrap(),
  );
  assert_abs_diff_eq!(force.magnitude(), 1.0, epsilon = 1e-6);
  assert_abs_diff_eq!(force.y, 0.0);

  gravity.update(&mut world, 1.0, 1).unwrap();

  let va = world.get::<&RigidBody2DComponent>(a).unwrap().velocity;
  let vb = world.get::<&RigidBody2DComponent>(b).unwrap().velocity;
  assert_abs_diff_eq!(va.x, 1.0, epsilon = 1e-6);
  assert_abs_diff_eq!(vb.x, -1.0, epsilon = 1e-6);
  assert_abs_diff_eq!(va.y, 0.0);
  assert_abs_diff_eq!(vb.y, 0.0);
}

#[test]
fn circle_contour_hugs_the_radius() {
  let radius = 0.5;
  let center = Vector2::new(0.0, 0.0);
  let marching_squares = MarchingSquares::new(1.0, 64, 64).unwrap();
  let mesh = marching_squares.extract(|x, y| implicit_circle(x, y, center, radius));

  assert!(!mesh.is_empty());
  for vertex in &mesh.vertices {
    let [x, y, _] = vertex.position;
    let distance = Vector2::new(x, y).magnitude();
    assert!(
      (radius * 0.9..=radius * 1.1).contains(&distance),
      "vertex {:?} is {distance} from the centre",
      vertex.position
    );
  }
}

#[test]
fn uniform_cells_emit_nothing() {
  let marching_squares = MarchingSquares::new(1.0, 1, 1).unwrap();
  assert!(marching_squares.extract(|_, _| 0.0).is_empty());
  assert!(marching_squares.extract(|_, _| 2.0).is_empty());
}

#[test]
fn saddle_cells_emit_two_segments() {
  let marching_squares = MarchingSquares::new(1.0, 1, 1).unwrap();
  // Opposite corners inside; the cell centre sits exactly on the axes.
  let diagonal = marching_squares.extract(|x, y| if x * y > 0.0 { 2.0 } else { 0.0 });
  let anti_diagonal = marching_squares.extract(|x, y| if x * y < 0.0 { 2.0 } else { 0.0 });

  for mesh in [diagonal, anti_diagonal] {
    assert_eq!(mesh.primitive_count(), 2);
    assert_eq!(mesh.vertices.len(), 4);
  }
}

#[test]
fn same_seed_same_trajectory() {
  let params = SimParams {
    num_bodies: 6,
    field_grid: 4,
    ..Default::default()
  };
  let run = |scene| {
    let mut sim = Simulation::new(scene, &params, &CpuUploader).unwrap();
    for _ in 0..30 {
      sim.tick(params.delta_t, &CpuUploader).unwrap();
    }
    let transforms: Vec<Transform2DComponent> = sim
      .world()
      .query::<&Transform2DComponent>()
      .iter()
      .map(|(_, transform)| *transform)
      .collect();
    let balls = sim
      .meta_balls()
      .map(|system| system.meta_balls().to_vec())
      .unwrap_or_default();
    (transforms, balls, sim.stats())
  };

  assert_eq!(run(Scene::Gravity), run(Scene::Gravity));
  assert_eq!(run(Scene::MetaBalls), run(Scene::MetaBalls));
}

#[test]
fn ball_reflects_off_the_wall() {
  let radius = 0.1;
  let limit = BOUNDS - radius;
  let mut world = World::new();
  let mut system = MetaBallSystem::default();
  system
    .add_meta_ball(
      Vector2::new(limit - 0.001, 0.0),
      Vector2::new(1.0, -0.25),
      radius,
    )
    .unwrap();
  system.create_initial_mesh(&mut world, &CpuUploader).unwrap();

  system.tick(0.1, &mut world, &CpuUploader).unwrap();

  let ball = system.meta_balls()[0];
  assert_eq!(ball.center.x, limit);
  assert_eq!(ball.velocity, Vector2::new(-1.0, -0.25));
  assert_abs_diff_eq!(ball.center.y, -0.025, epsilon = 1e-6);
}
