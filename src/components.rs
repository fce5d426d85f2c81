use crate::model::Drawable;
use cgmath::{Matrix2, Matrix4, Vector2, Vector3, Vector4};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform2DComponent {
  pub translation: Vector2<f32>,
  pub scale: Vector2<f32>,
  /// Radians.
  pub rotation: f32,
}

impl Default for Transform2DComponent {
  fn default() -> Self {
    Self {
      translation: Vector2::new(0.0, 0.0),
      scale: Vector2::new(1.0, 1.0),
      rotation: 0.0,
    }
  }
}

impl Transform2DComponent {
  #[must_use]
  pub fn at(translation: Vector2<f32>) -> Self {
    Self {
      translation,
      ..Default::default()
    }
  }

  /// Rotation applied after scale, as a column-major 2x2 matrix.
  #[must_use]
  pub fn mat2(&self) -> Matrix2<f32> {
    let (s, c) = self.rotation.sin_cos();
    let rotation = Matrix2::new(c, s, -s, c);
    let scale = Matrix2::new(self.scale.x, 0.0, 0.0, self.scale.y);
    rotation * scale
  }
}

/// Placement of a 3D mesh. Rotation holds Tait-Bryan angles in radians,
/// applied in Y, X, Z order.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformComponent {
  pub translation: Vector3<f32>,
  pub scale: Vector3<f32>,
  pub rotation: Vector3<f32>,
}

impl Default for TransformComponent {
  fn default() -> Self {
    Self {
      translation: Vector3::new(0.0, 0.0, 0.0),
      scale: Vector3::new(1.0, 1.0, 1.0),
      rotation: Vector3::new(0.0, 0.0, 0.0),
    }
  }
}

impl TransformComponent {
  /// `translate * Ry * Rx * Rz * scale`, column-major.
  #[must_use]
  pub fn mat4(&self) -> Matrix4<f32> {
    let (s3, c3) = self.rotation.z.sin_cos();
    let (s2, c2) = self.rotation.x.sin_cos();
    let (s1, c1) = self.rotation.y.sin_cos();
    let scale = self.scale;
    Matrix4::from_cols(
      Vector4::new(
        scale.x * (c1 * c3 + s1 * s2 * s3),
        scale.x * (c2 * s3),
        scale.x * (c1 * s2 * s3 - c3 * s1),
        0.0,
      ),
      Vector4::new(
        scale.y * (c3 * s1 * s2 - c1 * s3),
        scale.y * (c2 * c3),
        scale.y * (c1 * c3 * s2 + s1 * s3),
        0.0,
      ),
      Vector4::new(scale.z * (c2 * s1), scale.z * -s2, scale.z * (c1 * c2), 0.0),
      self.translation.extend(1.0),
    )
  }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RigidBody2DComponent {
  pub velocity: Vector2<f32>,
  pub mass: f32,
}

impl Default for RigidBody2DComponent {
  fn default() -> Self {
    Self {
      velocity: Vector2::new(0.0, 0.0),
      mass: 1.0,
    }
  }
}

#[derive(Clone)]
pub struct RenderComponent {
  pub model: Arc<dyn Drawable>,
  pub color: Vector3<f32>,
}

impl std::fmt::Debug for RenderComponent {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("RenderComponent")
      .field("topology", &self.model.topology())
      .field("index_count", &self.model.index_count())
      .field("color", &self.color)
      .finish()
  }
}

/// Marks a vector-field test mass. Probes are left out of gravity integration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldProbe;
