//! Iso-contour extraction from an implicit 2D function.
//!
//! The function is sampled once per point of a regular grid spanning the
//! normalized square `[-1, 1] x [-1, 1]`. Grid column `x` maps left to right
//! and grid row `y` maps top to bottom, so row indices grow while normalized
//! `y` shrinks. Each cell is classified by which of its corners lie above the
//! threshold and contributes zero, one or two line segments.

use crate::model::{MeshData, Topology, Vertex};
use cgmath::Vector2;
use thiserror::Error;

const BOTTOM: usize = 0;
const RIGHT: usize = 1;
const TOP: usize = 2;
const LEFT: usize = 3;

/// Edge pair joined by the single segment of each non-ambiguous case.
/// Corner bits: bottom-left 1, bottom-right 2, top-right 4, top-left 8.
const SEGMENTS: [Option<(usize, usize)>; 16] = [
  None,
  Some((BOTTOM, LEFT)),
  Some((BOTTOM, RIGHT)),
  Some((RIGHT, LEFT)),
  Some((RIGHT, TOP)),
  None, // ambiguous
  Some((BOTTOM, TOP)),
  Some((TOP, LEFT)),
  Some((TOP, LEFT)),
  Some((BOTTOM, TOP)),
  None, // ambiguous
  Some((RIGHT, TOP)),
  Some((RIGHT, LEFT)),
  Some((BOTTOM, RIGHT)),
  Some((BOTTOM, LEFT)),
  None,
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContourError {
  #[error("the sampling grid needs at least one cell per axis, got {samples_x}x{samples_y}")]
  EmptyGrid { samples_x: u32, samples_y: u32 },
  #[error("threshold must be finite, got {0}")]
  InvalidThreshold(f32),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MarchingSquares {
  threshold: f32,
  samples_x: u32,
  samples_y: u32,
}

impl Default for MarchingSquares {
  fn default() -> Self {
    Self {
      threshold: 1.0,
      samples_x: 20,
      samples_y: 20,
    }
  }
}

/// The four corner samples of one cell and its extent in normalized space.
struct Cell {
  bottom_left: f32,
  bottom_right: f32,
  top_right: f32,
  top_left: f32,
  x0: f32,
  x1: f32,
  y0: f32,
  y1: f32,
}

impl MarchingSquares {
  pub fn new(threshold: f32, samples_x: u32, samples_y: u32) -> Result<Self, ContourError> {
    if samples_x == 0 || samples_y == 0 {
      return Err(ContourError::EmptyGrid {
        samples_x,
        samples_y,
      });
    }
    if !threshold.is_finite() {
      return Err(ContourError::InvalidThreshold(threshold));
    }
    Ok(Self {
      threshold,
      samples_x,
      samples_y,
    })
  }

  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  pub fn samples(&self) -> (u32, u32) {
    (self.samples_x, self.samples_y)
  }

  /// Normalized position of grid point `(x, y)`.
  fn grid_point(&self, x: u32, y: u32) -> Vector2<f32> {
    Vector2::new(
      x as f32 / self.samples_x as f32 * 2.0 - 1.0,
      -(y as f32 / self.samples_y as f32 * 2.0 - 1.0),
    )
  }

  /// NaN never counts as inside.
  fn is_inside(&self, value: f32) -> bool {
    value > self.threshold
  }

  /// Where the threshold crosses between two samples, as a fraction of the edge.
  fn crossing(&self, v0: f32, v1: f32) -> f32 {
    let t = (self.threshold - v0) / (v1 - v0);
    if t.is_finite() {
      t.clamp(0.0, 1.0)
    } else {
      0.5
    }
  }

  fn edge_point(&self, cell: &Cell, edge: usize) -> Vector2<f32> {
    let lerp = |a: f32, b: f32, v0: f32, v1: f32| a + (b - a) * self.crossing(v0, v1);
    match edge {
      BOTTOM => Vector2::new(
        lerp(cell.x0, cell.x1, cell.bottom_left, cell.bottom_right),
        cell.y0,
      ),
      RIGHT => Vector2::new(
        cell.x1,
        lerp(cell.y0, cell.y1, cell.bottom_right, cell.top_right),
      ),
      TOP => Vector2::new(
        lerp(cell.x0, cell.x1, cell.top_left, cell.top_right),
        cell.y1,
      ),
      _ => Vector2::new(
        cell.x0,
        lerp(cell.y0, cell.y1, cell.bottom_left, cell.top_left),
      ),
    }
  }

  /// Builds a line-list mesh approximating `implicit_fn(x, y) == threshold`.
  ///
  /// Every segment owns its two vertices, so the output has exactly as many
  /// vertices as indices. Vertices carry positions only.
  pub fn extract<F>(&self, implicit_fn: F) -> MeshData
  where
    F: Fn(f32, f32) -> f32,
  {
    let mut mesh = MeshData::new(Topology::LineList);
    let columns = self.samples_y as usize + 1;

    let mut field = Vec::with_capacity((self.samples_x as usize + 1) * columns);
    for x in 0..=self.samples_x {
      for y in 0..=self.samples_y {
        let p = self.grid_point(x, y);
        field.push(implicit_fn(p.x, p.y));
      }
    }
    let sample = |x: u32, y: u32| field[x as usize * columns + y as usize];

    for x in 0..self.samples_x {
      for y in 0..self.samples_y {
        let p00 = self.grid_point(x, y);
        let p11 = self.grid_point(x + 1, y + 1);
        let cell = Cell {
          bottom_left: sample(x, y),
          bottom_right: sample(x + 1, y),
          top_right: sample(x + 1, y + 1),
          top_left: sample(x, y + 1),
          x0: p00.x,
          x1: p11.x,
          y0: p00.y,
          y1: p11.y,
        };

        let mut case_index = 0;
        if self.is_inside(cell.bottom_left) {
          case_index |= 1;
        }
        if self.is_inside(cell.bottom_right) {
          case_index |= 2;
        }
        if self.is_inside(cell.top_right) {
          case_index |= 4;
        }
        if self.is_inside(cell.top_left) {
          case_index |= 8;
        }

        match case_index {
          0 | 15 => {}
          5 | 10 => {
            let center_inside =
              self.is_inside(implicit_fn((cell.x0 + cell.x1) * 0.5, (cell.y0 + cell.y1) * 0.5));
            // Case 5 has bottom-left and top-right inside. A centre above the
            // threshold joins them, leaving the two outside corners cut off;
            // otherwise the inside corners are cut off. Case 10 mirrors this.
            let cut_bottom_right_and_top_left = center_inside == (case_index == 5);
            let pairs = if cut_bottom_right_and_top_left {
              [(BOTTOM, RIGHT), (TOP, LEFT)]
            } else {
              [(BOTTOM, LEFT), (RIGHT, TOP)]
            };
            for (from, to) in pairs {
              add_line_segment(&mut mesh, self.edge_point(&cell, from), self.edge_point(&cell, to));
            }
          }
          _ => {
            if let Some((from, to)) = SEGMENTS[case_index] {
              add_line_segment(&mut mesh, self.edge_point(&cell, from), self.edge_point(&cell, to));
            }
          }
        }
      }
    }

    mesh
  }
}

fn add_line_segment(mesh: &mut MeshData, p1: Vector2<f32>, p2: Vector2<f32>) {
  let index = mesh.vertices.len() as u32;
  mesh.vertices.push(Vertex::at(p1.x, p1.y));
  mesh.vertices.push(Vertex::at(p2.x, p2.y));
  mesh.indices.push(index);
  mesh.indices.push(index + 1);
}
