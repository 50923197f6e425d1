use glam::{Mat3, Mat4, Vec3};

/// Box covered by the sun's orthographic projection, in light view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoVolume {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl OrthoVolume {
    /// Fixed volume sized for the shipped scene; it does not follow the
    /// scene bounds.
    pub const SCENE: Self = Self {
        left: -20.0,
        right: 20.0,
        bottom: -20.0,
        top: 20.0,
        near: 0.1,
        far: 50.0,
    };

    pub fn projection(&self) -> Mat4 {
        Mat4::orthographic_rh(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

/// Directional sun light that can be spun around the world Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    pub base_direction: Vec3,
    pub angle_degrees: f32,
    pub color: Vec3,
}

impl LightState {
    pub const DEFAULT_DIRECTION: Vec3 = Vec3::new(10.0, 20.0, 10.0);

    pub fn new(base_direction: Vec3) -> Self {
        Self {
            base_direction,
            angle_degrees: 0.0,
            color: Vec3::ONE,
        }
    }

    pub fn rotate_by(&mut self, degrees: f32) {
        self.angle_degrees += degrees;
    }

    pub fn rotation(&self) -> Mat4 {
        Mat4::from_rotation_y(self.angle_degrees.to_radians())
    }

    /// Rotated sun direction in world space (points toward the light).
    pub fn world_direction(&self) -> Vec3 {
        self.rotation().transform_vector3(self.base_direction)
    }

    /// Sun direction as seen from the camera: the inverse-transpose of
    /// `view * rotation` applied to the base direction.
    pub fn view_direction(&self, view: Mat4) -> Vec3 {
        let linear = Mat3::from_mat4(view * self.rotation());
        linear.inverse().transpose() * self.base_direction
    }

    /// Model matrix of the small cube that marks the sun's position.
    pub fn marker_model(&self) -> Mat4 {
        self.rotation()
            * Mat4::from_translation(self.base_direction)
            * Mat4::from_scale(Vec3::splat(MARKER_SCALE))
    }
}

impl Default for LightState {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIRECTION)
    }
}

/// Optional point light that only contributes shading, never shadows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub enabled: bool,
}

impl PointLight {
    pub const DEFAULT_POSITION: Vec3 = Vec3::new(2.0743, 4.7439, 13.469);

    pub fn marker_model(&self) -> Option<Mat4> {
        self.enabled.then(|| {
            Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(MARKER_SCALE))
        })
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Self::DEFAULT_POSITION,
            enabled: false,
        }
    }
}

const MARKER_SCALE: f32 = 0.05;

/// View and projection of the sun used both to render and to sample the
/// shadow map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSpaceTransform {
    pub view: Mat4,
    pub projection: Mat4,
    pub combined: Mat4,
}

impl LightSpaceTransform {
    /// Pure function of the light state: the sun sits on its rotated
    /// direction and looks at the world origin.
    pub fn compute(light: &LightState) -> Self {
        Self::with_volume(light, &OrthoVolume::SCENE)
    }

    pub fn with_volume(light: &LightState, volume: &OrthoVolume) -> Self {
        let view = Mat4::look_at_rh(light.world_direction(), Vec3::ZERO, Vec3::Y);
        let projection = volume.projection();
        Self {
            view,
            projection,
            combined: projection * view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputation_is_bit_identical() {
        let mut light = LightState::default();
        light.rotate_by(37.0);
        let first = LightSpaceTransform::compute(&light);
        let second = LightSpaceTransform::compute(&light);
        assert_eq!(
            first.combined.to_cols_array(),
            second.combined.to_cols_array()
        );
    }

    #[test]
    fn origin_projects_to_center_of_light_clip_space() {
        let light = LightState::default();
        let transform = LightSpaceTransform::compute(&light);
        let clip = transform.combined.project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-5);
        assert!(clip.y.abs() < 1e-5);
        let distance = LightState::DEFAULT_DIRECTION.length();
        let expected = (distance - 0.1) / (50.0 - 0.1);
        assert!((clip.z - expected).abs() < 1e-4);
    }

    #[test]
    fn rotation_spins_direction_about_y() {
        let mut light = LightState::new(Vec3::new(1.0, 2.0, 0.0));
        light.rotate_by(90.0);
        let direction = light.world_direction();
        assert!((direction - Vec3::new(0.0, 2.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn view_direction_with_identity_view_is_rotated_direction() {
        let mut light = LightState::default();
        light.rotate_by(-45.0);
        let direction = light.view_direction(Mat4::IDENTITY);
        assert!((direction - light.world_direction()).length() < 1e-4);
    }

    #[test]
    fn view_direction_ignores_camera_translation() {
        let mut light = LightState::new(Vec3::new(10.0, 20.0, 10.0));
        light.rotate_by(30.0);
        let view = Mat4::look_at_rh(
            Vec3::new(5.0, 4.0, -12.0),
            Vec3::new(-3.0, 1.0, 6.0),
            Vec3::Y,
        );
        let direction = light.view_direction(view);
        let expected = Mat3::from_mat4(view) * light.world_direction();
        assert!((direction - expected).length() < 1e-4);

        let as_point = view.transform_point3(light.world_direction());
        assert!((direction - as_point).length() > 1.0);
    }

    #[test]
    fn markers_sit_on_their_lights() {
        let mut light = LightState::default();
        light.rotate_by(30.0);
        let center = light.marker_model().transform_point3(Vec3::ZERO);
        assert!((center - light.world_direction()).length() < 1e-4);

        let mut point = PointLight::default();
        assert!(point.marker_model().is_none());
        point.enabled = true;
        let center = point
            .marker_model()
            .map(|model| model.transform_point3(Vec3::ZERO));
        assert_eq!(center, Some(PointLight::DEFAULT_POSITION));
    }
}
