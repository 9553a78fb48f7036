/// Pose description and transformation matrix composition
use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector3};

/// Position, base rotation and scale of a model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3<f32>,
    /// Axis of the base rotation, normalised when the matrix is composed
    pub axis: Vector3<f32>,
    /// Base rotation angle in radians
    pub theta: f32,
    pub scale: Vector3<f32>,
}

impl Pose {
    pub fn new(position: Point3<f32>, axis: Vector3<f32>, theta: f32, scale: Vector3<f32>) -> Self {
        Self {
            position,
            axis,
            theta,
            scale,
        }
    }

    /// Pose at `position` with no rotation and unit scale
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            ..Self::default()
        }
    }

    pub fn with_rotation(mut self, axis: Vector3<f32>, theta: f32) -> Self {
        self.axis = axis;
        self.theta = theta;
        self
    }

    pub fn with_scale(mut self, sx: f32, sy: f32, sz: f32) -> Self {
        self.scale = Vector3::new(sx, sy, sz);
        self
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            axis: Vector3::y(),
            theta: 0.0,
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a translation matrix
    pub fn translation_matrix(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// Create a scale matrix
    pub fn scale_matrix(sx: f32, sy: f32, sz: f32) -> Matrix4<f32> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Rotation of `angle` radians about `axis`; a zero axis yields no rotation
    pub fn axis_rotation(angle: f32, axis: &Vector3<f32>) -> UnitQuaternion<f32> {
        match Unit::try_new(*axis, f32::EPSILON) {
            Some(axis) => UnitQuaternion::from_axis_angle(&axis, angle),
            None => UnitQuaternion::identity(),
        }
    }

    /// `translate * scale * rotate(theta, axis) * steering`
    ///
    /// Translation is outermost, so the model rotates about its own origin
    /// before it is scaled and placed.
    pub fn model_matrix(pose: &Pose, steering: &UnitQuaternion<f32>) -> Matrix4<f32> {
        let p = pose.position;
        let s = pose.scale;
        let base = Self::axis_rotation(pose.theta, &pose.axis);

        Self::translation_matrix(p.x, p.y, p.z)
            * Self::scale_matrix(s.x, s.y, s.z)
            * base.to_homogeneous()
            * steering.to_homogeneous()
    }

    /// Create a model-view-projection matrix
    pub fn mvp_matrix(
        model: &Matrix4<f32>,
        view: &Matrix4<f32>,
        projection: &Matrix4<f32>,
    ) -> Matrix4<f32> {
        projection * view * model
    }

    /// Translation column of an affine matrix
    pub fn translation_of(matrix: &Matrix4<f32>) -> Point3<f32> {
        Point3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_neutral_pose_is_identity() {
        let matrix = Transform::model_matrix(&Pose::default(), &UnitQuaternion::identity());
        assert_relative_eq!(matrix, Matrix4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_zero_axis_does_not_rotate() {
        let pose = Pose::default().with_rotation(Vector3::zeros(), 1.0);
        let matrix = Transform::model_matrix(&pose, &UnitQuaternion::identity());
        assert!(matrix.iter().all(|v| v.is_finite()));
        assert_relative_eq!(matrix, Matrix4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_axis_is_normalised() {
        let short = Transform::axis_rotation(0.7, &Vector3::new(0.0, 0.0, 1.0));
        let long = Transform::axis_rotation(0.7, &Vector3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(short, long, epsilon = 1e-6);
    }

    #[test]
    fn test_composition_order() {
        // Rotate first, then scale, then translate
        let pose = Pose::at(10.0, 0.0, 0.0)
            .with_scale(2.0, 2.0, 2.0)
            .with_rotation(Vector3::z(), FRAC_PI_2);
        let matrix = Transform::model_matrix(&pose, &UnitQuaternion::identity());
        let moved = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Point3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_translation_column() {
        let matrix = Transform::translation_matrix(2.0, 3.0, 4.0);
        assert_eq!(Transform::translation_of(&matrix), Point3::new(2.0, 3.0, 4.0));
        assert_eq!(matrix[(3, 3)], 1.0);
    }
}
