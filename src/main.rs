use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use evilution::{Scene, SimParams};
use std::io;

/// 2D gravity and meta ball playground
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Which demo to run
  #[arg(long, value_enum, default_value_t = Scene::Gravity)]
  scene: Scene,
  /// Run in headless mode (no window)
  #[arg(long, default_value_t = false)]
  headless: bool,
  /// Stop after this many frames (headless only)
  #[arg(long)]
  frames: Option<u64>,
  /// Integration substeps per frame
  #[arg(long, default_value_t = SimParams::default().substeps)]
  substeps: u32,
  /// Gravitational constant
  #[arg(long, default_value_t = SimParams::default().gravity)]
  gravity: f32,
  /// Number of gravitating bodies
  #[arg(short, long, default_value_t = SimParams::default().num_bodies)]
  bodies: u32,
  /// Vector field probes per side
  #[arg(long, default_value_t = SimParams::default().field_grid)]
  field_grid: u32,
  /// Number of meta balls
  #[arg(long, default_value_t = SimParams::default().num_meta_balls)]
  balls: u32,
  /// Contour threshold
  #[arg(long, default_value_t = SimParams::default().threshold)]
  threshold: f32,
  /// Marching squares cells per side
  #[arg(long, default_value_t = SimParams::default().samples)]
  samples: u32,
  /// Radians of decorative rotation added per frame
  #[arg(long, default_value_t = SimParams::default().spin)]
  spin: f32,
  /// Seed for randomly placed bodies and balls
  #[arg(long, default_value_t = SimParams::default().seed)]
  seed: u64,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

impl Args {
  fn params(&self) -> SimParams {
    SimParams {
      gravity: self.gravity,
      substeps: self.substeps,
      num_bodies: self.bodies,
      field_grid: self.field_grid,
      num_meta_balls: self.balls,
      threshold: self.threshold,
      samples: self.samples,
      spin: self.spin,
      seed: self.seed,
      ..Default::default()
    }
  }
}

fn main() -> anyhow::Result<()> {
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = &args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(*shell, &mut cmd, name, &mut io::stdout());
    return Ok(());
  }

  evilution::state::run(args.scene, args.params(), args.headless, args.frames)
}
