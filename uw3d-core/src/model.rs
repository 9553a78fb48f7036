/// A mesh asset with its own pose and transformation matrix
use log::{debug, trace};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::device::{BufferHandle, GraphicsDevice};
use crate::geometry::VertexPool;
use crate::mesh::{self, BuildOptions, MeshBuffers, MeshError, VertexLayout};
use crate::obj::{self, ObjError};
use crate::transform::{Pose, Transform};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ObjError,
    },
    #[error("failed to build vertex buffer for {}: {source}", path.display())]
    Build {
        path: PathBuf,
        #[source]
        source: MeshError,
    },
}

impl ModelError {
    pub fn path(&self) -> &Path {
        match self {
            ModelError::Parse { path, .. } | ModelError::Build { path, .. } => path,
        }
    }
}

/// A renderable model.
///
/// The matrix is always `translate * scale * rotate(theta, axis) * steering`.
/// Every mutation updates the stored pose or steering rotation and rebuilds the
/// matrix from them, so moves and turns never accumulate drift in each other.
#[derive(Debug, Clone)]
pub struct Model {
    path: PathBuf,
    pose: Pose,
    steering: UnitQuaternion<f32>,
    matrix: Matrix4<f32>,
    buffers: MeshBuffers,
    handle: Option<BufferHandle>,
    box_offset: Option<f32>,
}

impl Model {
    /// Parse the OBJ at `path` and build its vertex buffer
    pub fn load(
        path: impl AsRef<Path>,
        pose: Pose,
        options: impl Into<BuildOptions>,
    ) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let pool = obj::load_obj(path).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_pool(path, &pool, pose, options)
    }

    pub fn from_pool(
        path: impl AsRef<Path>,
        pool: &VertexPool,
        pose: Pose,
        options: impl Into<BuildOptions>,
    ) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let buffers = mesh::build_with(pool, options.into()).map_err(|source| ModelError::Build {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            "{}: {} vertices, {:?} layout",
            path.display(),
            buffers.vertex_count(),
            buffers.layout
        );
        Ok(Self::from_buffers(path, buffers, pose))
    }

    pub fn from_buffers(path: impl AsRef<Path>, buffers: MeshBuffers, pose: Pose) -> Self {
        let mut model = Self {
            path: path.as_ref().to_path_buf(),
            pose,
            steering: UnitQuaternion::identity(),
            matrix: Matrix4::identity(),
            buffers,
            handle: None,
            box_offset: None,
        };
        model.initialize_matrix();
        model
    }

    /// Half-extent of the axis-aligned box used by collision queries
    pub fn with_box_offset(mut self, box_offset: f32) -> Self {
        self.box_offset = Some(box_offset);
        self
    }

    /// Derive the matrix from the pose alone, discarding accumulated steering
    pub fn initialize_matrix(&mut self) {
        self.steering = UnitQuaternion::identity();
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.matrix = Transform::model_matrix(&self.pose, &self.steering);
    }

    /// Compose an extra rotation after the current one (radians, model-local axis).
    /// Calls accumulate in order.
    pub fn rotate_on_axis(&mut self, angle: f32, axis: Vector3<f32>) {
        self.steering *= Transform::axis_rotation(angle, &axis);
        self.rebuild();
    }

    /// Replace the base rotation of the pose
    pub fn rotate(&mut self, angle: f32, axis: Vector3<f32>) {
        self.pose.axis = axis;
        self.pose.theta = angle;
        self.rebuild();
    }

    pub fn move_by(&mut self, delta: Vector3<f32>) {
        self.pose.position += delta;
        self.rebuild();
    }

    /// Move unless the destination overlaps one of `others`; returns whether it moved.
    ///
    /// A model that already intersects another box may still move as long as
    /// the move shrinks that overlap, so an overlapping spawn can back out.
    pub fn move_checked<'a>(
        &mut self,
        delta: Vector3<f32>,
        others: impl IntoIterator<Item = &'a Model>,
    ) -> bool {
        let current = self.pose.position;
        let target = current + delta;
        if let Some(blocker) = others.into_iter().find(|other| {
            let there = other.position();
            let after = overlap_volume(&target, self.box_offset, &there, other.box_offset);
            let before = overlap_volume(&current, self.box_offset, &there, other.box_offset);
            after > 0.0 && after >= before
        }) {
            trace!(
                "{} blocked by {}",
                self.path.display(),
                blocker.path.display()
            );
            return false;
        }
        self.move_by(delta);
        true
    }

    /// Multiply the scale component-wise
    pub fn scale_by(&mut self, factors: Vector3<f32>) {
        self.pose.scale.component_mul_assign(&factors);
        self.rebuild();
    }

    pub fn collides_with(&self, other: &Model) -> bool {
        boxes_overlap(
            &self.position(),
            self.box_offset,
            &other.position(),
            other.box_offset,
        )
    }

    /// World-space direction of the model's local -Z axis
    pub fn heading(&self) -> Vector3<f32> {
        let rotation = Transform::axis_rotation(self.pose.theta, &self.pose.axis) * self.steering;
        rotation * -Vector3::z()
    }

    /// Distance below the y = 0 plane
    pub fn depth(&self) -> f32 {
        -self.position().y
    }

    /// Translation column of the matrix
    pub fn position(&self) -> Point3<f32> {
        Transform::translation_of(&self.matrix)
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.matrix
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> VertexLayout {
        self.buffers.layout
    }

    pub fn buffers(&self) -> &MeshBuffers {
        &self.buffers
    }

    pub fn box_offset(&self) -> Option<f32> {
        self.box_offset
    }

    pub fn is_uploaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Send the vertex buffer to `device` once; later calls are no-ops
    pub fn upload<D: GraphicsDevice + ?Sized>(&mut self, device: &mut D) -> BufferHandle {
        if let Some(handle) = self.handle {
            return handle;
        }
        let handle = device.upload(&self.buffers);
        self.handle = Some(handle);
        handle
    }

    /// Publish the matrix and draw every record.
    ///
    /// # Panics
    ///
    /// If the model has not been uploaded to a device.
    pub fn draw<D: GraphicsDevice + ?Sized>(&self, device: &mut D) {
        let Some(handle) = self.handle else {
            panic!("{} drawn before its buffers were uploaded", self.path.display());
        };
        device.set_transform(&self.matrix);
        device.draw_triangles(handle, 0, self.buffers.vertex_count());
    }
}

/// Axis-aligned overlap of two boxes given by centre and half-extent.
/// A missing half-extent never collides.
fn boxes_overlap(
    a: &Point3<f32>,
    a_half: Option<f32>,
    b: &Point3<f32>,
    b_half: Option<f32>,
) -> bool {
    overlap_volume(a, a_half, b, b_half) > 0.0
}

/// Volume shared by two axis-aligned boxes; touching boxes share none
fn overlap_volume(
    a: &Point3<f32>,
    a_half: Option<f32>,
    b: &Point3<f32>,
    b_half: Option<f32>,
) -> f32 {
    match (a_half, b_half) {
        (Some(ha), Some(hb)) => {
            let reach = ha + hb;
            (a - b).iter().map(|d| (reach - d.abs()).max(0.0)).product()
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::recording::{Call, RecordingDevice};
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn cube_at(pose: Pose) -> Model {
        Model::from_pool("cube.obj", &VertexPool::cube(1.0), pose, VertexLayout::Regular).unwrap()
    }

    #[test]
    fn test_neutral_pose_draws_identity() {
        let mut model = cube_at(Pose::default());
        model.initialize_matrix();
        let mut device = RecordingDevice::default();
        model.upload(&mut device);
        model.draw(&mut device);
        assert_eq!(device.calls[1], Call::Transform(Matrix4::identity()));
    }

    #[test]
    fn test_translation_column() {
        let model = cube_at(Pose::at(2.0, 3.0, 4.0));
        let column = model.matrix().column(3);
        assert_relative_eq!(column[0], 2.0);
        assert_relative_eq!(column[1], 3.0);
        assert_relative_eq!(column[2], 4.0);
        assert_relative_eq!(column[3], 1.0);
    }

    #[test]
    fn test_rotate_then_inverse_restores_matrix() {
        let mut model = cube_at(
            Pose::at(1.0, -2.0, 5.0)
                .with_scale(0.5, 0.5, 0.5)
                .with_rotation(Vector3::new(0.0, 0.0, 1.0), 1.2),
        );
        model.rotate_on_axis(0.3, Vector3::x());
        let before = *model.matrix();
        let axis = Vector3::new(1.0, 1.0, 0.0);
        model.rotate_on_axis(0.8, axis);
        model.rotate_on_axis(-0.8, axis);
        assert_relative_eq!(*model.matrix(), before, epsilon = 1e-5);
    }

    #[test]
    fn test_rotations_accumulate() {
        let mut model = cube_at(Pose::default());
        model.rotate_on_axis(FRAC_PI_2, Vector3::y());
        model.rotate_on_axis(FRAC_PI_2, Vector3::y());
        assert_relative_eq!(model.heading(), Vector3::z(), epsilon = 1e-5);
    }

    #[test]
    fn test_moves_accumulate_across_rotations() {
        let mut model = cube_at(Pose::default());
        model.move_by(Vector3::new(1.0, 0.0, 0.0));
        model.rotate_on_axis(0.7, Vector3::y());
        model.move_by(Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(model.position(), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_initialize_matrix_discards_steering() {
        let mut model = cube_at(Pose::at(0.0, 1.0, 0.0));
        let original = *model.matrix();
        model.rotate_on_axis(1.0, Vector3::z());
        model.initialize_matrix();
        assert_relative_eq!(*model.matrix(), original, epsilon = 1e-6);
    }

    #[test]
    fn test_rotate_replaces_base_rotation() {
        let mut model = cube_at(Pose::default().with_rotation(Vector3::x(), 1.0));
        model.rotate(FRAC_PI_2, Vector3::y());
        assert_relative_eq!(model.heading(), -Vector3::x(), epsilon = 1e-5);
    }

    #[test]
    fn test_scale_by_multiplies() {
        let mut model = cube_at(Pose::default().with_scale(2.0, 1.0, 1.0));
        model.scale_by(Vector3::new(0.5, 3.0, 1.0));
        assert_eq!(model.pose().scale, Vector3::new(1.0, 3.0, 1.0));
        assert_relative_eq!(model.matrix()[(1, 1)], 3.0);
    }

    #[test]
    fn test_draw_covers_all_records() {
        let mut model = Model::from_pool(
            "cube.obj",
            &VertexPool::cube(1.0),
            Pose::at(0.0, 0.0, -3.0),
            VertexLayout::TangentSpace,
        )
        .unwrap();
        let mut device = RecordingDevice::default();
        let handle = model.upload(&mut device);
        assert_eq!(model.upload(&mut device), handle);
        model.draw(&mut device);
        assert_eq!(
            device.calls,
            vec![
                Call::Upload { vertices: 36 },
                Call::Transform(*model.matrix()),
                Call::Draw { buffer: handle, first: 0, count: 36 },
            ]
        );
    }

    #[test]
    #[should_panic(expected = "drawn before its buffers were uploaded")]
    fn test_draw_before_upload_panics() {
        let model = cube_at(Pose::default());
        model.draw(&mut RecordingDevice::default());
    }

    #[test]
    fn test_collision_boxes() {
        let a = cube_at(Pose::at(0.0, 0.0, 0.0)).with_box_offset(1.0);
        let b = cube_at(Pose::at(1.5, 0.0, 0.0)).with_box_offset(1.0);
        let c = cube_at(Pose::at(3.0, 0.0, 0.0)).with_box_offset(0.5);
        let ghost = cube_at(Pose::at(0.0, 0.0, 0.0));
        assert!(a.collides_with(&b));
        assert!(!a.collides_with(&c));
        assert!(!a.collides_with(&ghost));
    }

    #[test]
    fn test_move_checked_stops_at_obstacle() {
        let mut sub = cube_at(Pose::default()).with_box_offset(0.5);
        let rock = cube_at(Pose::at(2.0, 0.0, 0.0)).with_box_offset(0.5);
        assert!(sub.move_checked(Vector3::new(0.5, 0.0, 0.0), [&rock]));
        assert!(!sub.move_checked(Vector3::new(0.8, 0.0, 0.0), [&rock]));
        assert_relative_eq!(sub.position(), Point3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_overlapping_model_can_back_out() {
        let mut sub = cube_at(Pose::default()).with_box_offset(1.0);
        let rock = cube_at(Pose::at(0.5, 0.0, 0.0)).with_box_offset(1.0);
        assert!(sub.collides_with(&rock));

        // Pushing further in stays blocked
        assert!(!sub.move_checked(Vector3::new(0.25, 0.0, 0.0), [&rock]));
        assert_relative_eq!(sub.position(), Point3::origin());

        assert!(sub.move_checked(Vector3::new(-0.5, 0.0, 0.0), [&rock]));
        assert_relative_eq!(sub.position(), Point3::new(-0.5, 0.0, 0.0));
        assert!(sub.move_checked(Vector3::new(0.0, 0.5, 0.0), [&rock]));
    }

    #[test]
    fn test_depth_is_negative_height() {
        let model = cube_at(Pose::at(0.0, -12.5, 0.0));
        assert_relative_eq!(model.depth(), 12.5);
    }

    #[test]
    fn test_load_error_names_asset() {
        let err = Model::load("missing/submarine.obj", Pose::default(), VertexLayout::Regular)
            .unwrap_err();
        assert_eq!(err.path(), Path::new("missing/submarine.obj"));
        assert!(err.to_string().contains("missing/submarine.obj"));
    }

    #[test]
    fn test_build_error_names_asset() {
        let pool = obj::parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").unwrap();
        let err = Model::from_pool("bare.obj", &pool, Pose::default(), VertexLayout::Regular)
            .unwrap_err();
        assert!(matches!(err, ModelError::Build { .. }));
        assert!(err.to_string().starts_with("failed to build vertex buffer for bare.obj"));
    }
}
