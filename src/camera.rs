use glam::{Mat4, Vec3};
use log::debug;

/// Forward/backward moves are dropped when they would put the eye at or
/// below this height.
pub const FLOOR_HEIGHT: f32 = 4.0;

/// Pitch never accumulates above this many degrees.
pub const MAX_PITCH: f32 = 89.0;

/// Yaw never accumulates below this many degrees.
pub const MIN_YAW: f32 = -89.0;

/// Discrete movement commands produced by held keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoveDirection {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    TurnLeft,
    TurnRight,
}

/// Pitch and yaw accumulated over every rotate call of a camera, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Orientation {
    pub pitch: f32,
    pub yaw: f32,
}

impl Orientation {
    /// Adds the deltas and applies the one-sided clamps: pitch is capped
    /// from above only and yaw from below only.
    pub fn accumulate(&mut self, pitch_delta: f32, yaw_delta: f32) {
        self.pitch += pitch_delta;
        self.yaw += yaw_delta;
        if self.pitch > MAX_PITCH {
            self.pitch = MAX_PITCH;
        }
        if self.yaw < MIN_YAW {
            self.yaw = MIN_YAW;
        }
    }

    /// Unit offset from the eye to the look-at point for the current angles.
    pub fn look_offset(&self) -> Vec3 {
        let pitch = self.pitch.to_radians();
        let yaw = self.yaw.to_radians();
        Vec3::new(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            -yaw.cos() * pitch.cos(),
        )
    }
}

/// First-person camera driven by discrete move and rotate commands.
///
/// The basis is derived once from `(position, target, up)` at construction.
/// `move_along` translates eye and target together without touching the
/// basis; `rotate` re-aims the target and refreshes `front` and `right`
/// but keeps the up vector computed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    orientation: Orientation,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, world_up: Vec3) -> Self {
        let front = (position - target).normalize_or_zero();
        let right = world_up.cross(front).normalize_or_zero();
        let up = front.cross(right);
        Self {
            position,
            target,
            front,
            right,
            up,
            orientation: Orientation::default(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Look-at matrix from the eye along `front`.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Translates eye and target along the basis vector for `direction`.
    ///
    /// Forward and backward moves that would end at or below
    /// [`FLOOR_HEIGHT`] are dropped entirely. Turning is reserved and does
    /// nothing.
    pub fn move_along(&mut self, direction: MoveDirection, speed: f32) {
        let offset = match direction {
            MoveDirection::Forward => self.front * speed,
            MoveDirection::Backward => -self.front * speed,
            MoveDirection::Left => -self.right * speed,
            MoveDirection::Right => self.right * speed,
            MoveDirection::Up => self.up * speed,
            MoveDirection::Down => -self.up * speed,
            MoveDirection::TurnLeft | MoveDirection::TurnRight => return,
        };

        let gated = matches!(direction, MoveDirection::Forward | MoveDirection::Backward);
        if gated && (self.position + offset).y <= FLOOR_HEIGHT {
            debug!(
                "dropping {direction:?} move: eye would reach y={:.3}",
                (self.position + offset).y
            );
            return;
        }

        self.position += offset;
        self.target += offset;
    }

    /// Accumulates pitch and yaw (degrees) and re-aims the camera.
    pub fn rotate(&mut self, pitch_delta: f32, yaw_delta: f32) {
        self.orientation.accumulate(pitch_delta, yaw_delta);
        self.target = self.position + self.orientation.look_offset();
        self.front = (self.target - self.position).normalize();
        // Looking straight down makes front parallel to up; the previous
        // right vector stays valid in that case.
        if let Some(right) = self.front.cross(self.up).try_normalize() {
            self.right = right;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn start() -> Camera {
        Camera::new(Vec3::new(0.0, 5.0, 3.0), Vec3::new(0.0, 5.0, -10.0), Vec3::Y)
    }

    fn assert_basis_orthonormal(camera: &Camera) {
        assert!((camera.front().length() - 1.0).abs() < EPS);
        assert!((camera.right().length() - 1.0).abs() < EPS);
        assert!(camera.front().dot(camera.right()).abs() < EPS);
    }

    #[test]
    fn construction_derives_orthonormal_basis() {
        let camera = start();
        assert_basis_orthonormal(&camera);
        assert!(camera.up().dot(camera.front()).abs() < EPS);
        assert!(camera.up().dot(camera.right()).abs() < EPS);
        assert!((camera.up() - Vec3::Y).length() < EPS);
    }

    #[test]
    fn repeated_forward_moves_keep_height_and_advance_z() {
        let mut camera = start();
        let mut last_z = camera.position().z;
        for _ in 0..50 {
            camera.move_along(MoveDirection::Forward, 0.1);
            assert_eq!(camera.position().y, 5.0);
            assert!(camera.position().z > last_z);
            last_z = camera.position().z;
        }
        assert!((camera.position().z - 8.0).abs() < 1e-3);
    }

    #[test]
    fn forward_move_below_floor_is_rejected() {
        let mut camera = Camera::new(Vec3::new(0.0, 4.5, 0.0), Vec3::new(0.0, 3.5, 0.0), Vec3::Z);
        // front points up here, so backward heads for the floor
        let before = camera.clone();
        camera.move_along(MoveDirection::Backward, 0.6);
        assert_eq!(camera, before);
        camera.move_along(MoveDirection::Backward, 0.6);
        assert_eq!(camera, before);
        camera.move_along(MoveDirection::Backward, 0.4);
        assert!(camera.position().y > FLOOR_HEIGHT);
        assert!((camera.target().y - 3.1).abs() < EPS);
    }

    #[test]
    fn accepted_gated_moves_stay_above_floor() {
        let mut camera = start();
        camera.rotate(-30.0, 0.0);
        for _ in 0..200 {
            camera.move_along(MoveDirection::Forward, 0.1);
            camera.move_along(MoveDirection::Backward, 0.05);
            assert!(camera.position().y > FLOOR_HEIGHT);
        }
    }

    #[test]
    fn lateral_and_vertical_moves_are_unconditional() {
        let mut camera = Camera::new(Vec3::new(0.0, 4.05, 0.0), Vec3::new(0.0, 4.05, -1.0), Vec3::Y);
        camera.move_along(MoveDirection::Down, 1.0);
        assert!((camera.position().y - 3.05).abs() < EPS);
        camera.move_along(MoveDirection::Right, 2.0);
        assert!((camera.position().x - 2.0).abs() < EPS);
        camera.move_along(MoveDirection::Left, 2.0);
        assert!(camera.position().x.abs() < EPS);
        assert_basis_orthonormal(&camera);
    }

    #[test]
    fn turning_is_a_no_op() {
        let mut camera = start();
        let before = camera.clone();
        camera.move_along(MoveDirection::TurnLeft, 0.1);
        camera.move_along(MoveDirection::TurnRight, 0.1);
        assert_eq!(camera, before);
    }

    #[test]
    fn pitch_overflow_clamps_to_limit() {
        let mut camera = start();
        camera.rotate(100.0, 0.0);
        assert_eq!(camera.orientation().pitch, 89.0);
        assert_basis_orthonormal(&camera);
    }

    #[test]
    fn clamps_are_one_sided() {
        let mut camera = start();
        camera.rotate(-150.0, 150.0);
        assert_eq!(camera.orientation().pitch, -150.0);
        assert_eq!(camera.orientation().yaw, 150.0);

        camera.rotate(0.0, -400.0);
        assert_eq!(camera.orientation().yaw, -89.0);
    }

    #[test]
    fn accumulator_survives_many_rotations() {
        let mut camera = start();
        for _ in 0..10 {
            camera.rotate(15.0, -20.0);
            assert!(camera.orientation().pitch <= MAX_PITCH);
            assert!(camera.orientation().yaw >= MIN_YAW);
            assert_basis_orthonormal(&camera);
        }
        assert_eq!(camera.orientation().pitch, 89.0);
        assert_eq!(camera.orientation().yaw, -89.0);
    }

    #[test]
    fn rotate_aims_target_one_unit_away() {
        let mut camera = start();
        camera.rotate(0.0, 90.0);
        let offset = camera.target() - camera.position();
        assert!((offset - Vec3::X).length() < EPS);
        assert!((camera.front() - Vec3::X).length() < EPS);
    }

    #[test]
    fn rotate_leaves_up_untouched() {
        let mut camera = start();
        let up = camera.up();
        camera.rotate(30.0, 10.0);
        assert_eq!(camera.up(), up);
    }

    #[test]
    fn view_matrix_inverse_recovers_eye() {
        let mut camera = start();
        camera.rotate(12.0, 33.0);
        camera.move_along(MoveDirection::Right, 1.5);
        let eye = camera.view_matrix().inverse().transform_point3(Vec3::ZERO);
        assert!((eye - camera.position()).length() < 1e-4);
    }

    #[test]
    fn looking_straight_down_keeps_a_valid_right_vector() {
        let mut camera = start();
        camera.rotate(-90.0, 0.0);
        assert!(camera.right().is_finite());
        assert_basis_orthonormal(&camera);
    }
}
