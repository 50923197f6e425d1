use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Vec3};
use log::{error, warn};
use roxmltree::{Document, Node};

use crate::light::{LightState, PointLight};
use crate::obj::{load_obj_file, MeshData};

/// Pivot of the ceiling fan in the shipped scene.
pub const DEFAULT_FAN_PIVOT: Vec3 = Vec3::new(0.7752, 6.9715, 8.6792);

/// Scene description: drawable meshes plus camera and light placement.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub meshes: Vec<SceneMesh>,
    pub camera: CameraSetup,
    pub sun_direction: Vec3,
    pub point_light: Vec3,
    /// Directory mesh paths are resolved against.
    pub base_dir: PathBuf,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            meshes: Vec::new(),
            camera: CameraSetup::default(),
            sun_direction: LightState::DEFAULT_DIRECTION,
            point_light: PointLight::DEFAULT_POSITION,
            base_dir: PathBuf::new(),
        }
    }
}

impl Scene {
    /// Reads and parses a scene file; mesh paths become relative to its
    /// directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read scene {}", path.display()))?;
        let mut scene = Self::from_xml(&xml)
            .with_context(|| format!("failed to parse scene {}", path.display()))?;
        scene.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(scene)
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid scene XML")?;
        let mut scene = Scene::default();

        for node in document.descendants().filter(|n| n.has_tag_name("object")) {
            let name = required_text(&node, "name")?;
            let object_type = optional_text(&node, "type").unwrap_or_else(|| "mesh".to_string());
            match object_type.as_str() {
                "mesh" => {
                    let mesh = SceneMesh {
                        mesh: optional_text(&node, "mesh"),
                        color: parse_color(optional_text(&node, "color"), Vec3::ONE)?,
                        pivot: optional_text(&node, "pivot")
                            .map(|pivot| parse_vec3(Some(pivot), Vec3::ZERO))
                            .transpose()?,
                        name,
                    };
                    scene.meshes.push(mesh);
                }
                "camera" => {
                    let defaults = CameraSetup::default();
                    scene.camera = CameraSetup {
                        position: parse_vec3(optional_text(&node, "position"), defaults.position)?,
                        target: parse_vec3(optional_text(&node, "target"), defaults.target)?,
                        up: parse_vec3(optional_text(&node, "up"), defaults.up)?,
                    };
                }
                "sun" => {
                    scene.sun_direction =
                        parse_vec3(optional_text(&node, "direction"), scene.sun_direction)?;
                }
                "pointlight" => {
                    scene.point_light =
                        parse_vec3(optional_text(&node, "position"), scene.point_light)?;
                }
                other => bail!("object {name} has unknown type {other}"),
            }
        }

        let rotating = scene.meshes.iter().filter(|m| m.pivot.is_some()).count();
        if rotating > 1 {
            warn!("{rotating} objects declare a pivot; only the first one rotates");
        }

        Ok(scene)
    }

    /// Index of the mesh that spins about its pivot, if any.
    pub fn rotating_index(&self) -> Option<usize> {
        self.meshes.iter().position(|mesh| mesh.pivot.is_some())
    }

    /// Model matrix for every mesh given the rotating part's current angle.
    pub fn model_matrices(&self, spin_radians: f32) -> Vec<Mat4> {
        let rotating = self.rotating_index();
        self.meshes
            .iter()
            .enumerate()
            .map(|(index, mesh)| match mesh.pivot {
                Some(pivot) if Some(index) == rotating => spin_about(pivot, spin_radians),
                _ => Mat4::IDENTITY,
            })
            .collect()
    }

    pub fn mesh_path(&self, mesh: &SceneMesh) -> Option<PathBuf> {
        mesh.mesh.as_ref().map(|relative| self.base_dir.join(relative))
    }

    /// Geometry for every mesh in scene order. Objects without a mesh file,
    /// or whose file fails to load, get a unit cube.
    pub fn load_meshes(&self) -> Vec<MeshData> {
        self.meshes
            .iter()
            .map(|entry| match self.mesh_path(entry) {
                Some(path) => load_obj_file(&path).unwrap_or_else(|err| {
                    error!("failed to load mesh for {}: {err:?}", entry.name);
                    MeshData::unit_cube()
                }),
                None => MeshData::unit_cube(),
            })
            .collect()
    }
}

/// `translate(pivot) * rotate_y(angle) * translate(-pivot)`.
pub fn spin_about(pivot: Vec3, radians: f32) -> Mat4 {
    Mat4::from_translation(pivot) * Mat4::from_rotation_y(radians) * Mat4::from_translation(-pivot)
}

/// Drawable object of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMesh {
    pub name: String,
    /// OBJ file relative to the scene file; a unit cube is drawn without one.
    pub mesh: Option<String>,
    pub color: Vec3,
    /// Marks the rotating part and the point it spins around.
    pub pivot: Option<Vec3>,
}

/// Initial eye placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSetup {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl Default for CameraSetup {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 3.0),
            target: Vec3::new(0.0, 5.0, -10.0),
            up: Vec3::Y,
        }
    }
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    node.children()
        .find(|child| child.has_tag_name(tag))
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.to_string())
}

fn parse_triple(value: &str, what: &str) -> Result<[f32; 3]> {
    let numbers = value
        .split_whitespace()
        .map(|component| {
            component
                .parse::<f32>()
                .with_context(|| format!("{what} component {component:?} is not a number"))
        })
        .collect::<Result<Vec<_>>>()?;
    match numbers.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(anyhow!("{what} needs 3 components, got {}", numbers.len())),
    }
}

fn parse_vec3(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => parse_triple(&value, "vector").map(Vec3::from),
        None => Ok(default),
    }
}

fn parse_color(value: Option<String>, default: Vec3) -> Result<Vec3> {
    match value {
        Some(value) => parse_triple(&value, "color").map(|rgb| Vec3::from(rgb) / 255.0),
        None => Ok(default),
    }
}
