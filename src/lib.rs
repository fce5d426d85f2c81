pub mod components;
pub mod gravity;
pub mod initialize;
pub mod marching_squares;
pub mod meta_balls;
pub mod model;
pub mod render;
pub mod simulation;
pub mod state;
pub mod vec2_field;

/// Which demo the engine runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Scene {
  /// Attracting bodies with a vector field showing the pull
  Gravity,
  /// Bouncing blobs outlined with marching squares
  MetaBalls,
  /// A tumbling colour-faced cube through the 3D transform path
  Cube,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimParams {
  /// Fixed time step for headless runs; windowed runs use frame time.
  pub delta_t: f32,
  pub gravity: f32,
  pub substeps: u32,
  pub num_bodies: u32,
  /// Probes per side of the vector-field grid.
  pub field_grid: u32,
  pub num_meta_balls: u32,
  pub threshold: f32,
  pub samples: u32,
  /// Radians added to every rendered entity's rotation each frame.
  pub spin: f32,
  pub seed: u64,
}

impl Default for SimParams {
  fn default() -> Self {
    Self {
      delta_t: 1.0 / 60.0,
      gravity: 0.81,
      substeps: 5,
      num_bodies: 2,
      field_grid: 40,
      num_meta_balls: 6,
      threshold: 1.0,
      samples: 20,
      spin: 0.0,
      seed: 42,
    }
  }
}
