//! WGSL sources. Uniform member and binding names follow the names the
//! stages upload under (`model`, `view`, `lightSpaceTrMatrix`, ...).

/// Names every lit or depth program exposes.
pub const UNIFORM_NAMES: &[&str] = &[
    "model",
    "view",
    "projection",
    "normalMatrix",
    "lightDir",
    "lightColor",
    "lightPos1",
    "havePointLight",
    "fogDensity",
    "shadowMap",
    "lightSpaceTrMatrix",
    "depthMap",
];

/// Object block shared by the lit, depth and marker programs.
const OBJECT_BLOCK: &str = r#"
struct ObjectConstants {
    model: mat4x4<f32>,
    normalMatrix: mat3x4<f32>,
    color: vec4<f32>,
}

@group(1) @binding(0)
var<uniform> object: ObjectConstants;
"#;

const GLOBALS_BLOCK: &str = r#"
struct Globals {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    lightSpaceTrMatrix: mat4x4<f32>,
    lightDir: vec4<f32>,
    lightColor: vec4<f32>,
    lightPos1: vec4<f32>,
    fogDensity: f32,
    havePointLight: u32,
    padding: vec2<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;
"#;

const LIT_BODY: &str = r#"
@group(0) @binding(1)
var shadowMap: texture_depth_2d;
@group(0) @binding(2)
var shadowSampler: sampler_comparison;

const SHADOW_BIAS: f32 = 0.005;
const AMBIENT: f32 = 0.2;
const SPECULAR: f32 = 0.5;
const SHININESS: f32 = 32.0;
const FOG_COLOR: vec3<f32> = vec3<f32>(0.5, 0.5, 0.5);

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) eye_position: vec3<f32>,
    @location(1) eye_normal: vec3<f32>,
    @location(2) light_space: vec4<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let world = object.model * vec4<f32>(input.position, 1.0);
    let eye = globals.view * world;
    out.clip = globals.projection * eye;
    out.eye_position = eye.xyz;
    let normal_matrix = mat3x3<f32>(
        object.normalMatrix[0].xyz,
        object.normalMatrix[1].xyz,
        object.normalMatrix[2].xyz
    );
    out.eye_normal = normal_matrix * input.normal;
    out.light_space = globals.lightSpaceTrMatrix * world;
    return out;
}

// 1.0 when the sun reaches the fragment, 0.0 when something is in between.
fn sun_visibility(light_space: vec4<f32>) -> f32 {
    let ndc = light_space.xyz / light_space.w;
    let uv = vec2<f32>(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5);
    let stored = textureSampleCompareLevel(
        shadowMap,
        shadowSampler,
        clamp(uv, vec2<f32>(0.0), vec2<f32>(1.0)),
        ndc.z - SHADOW_BIAS
    );
    let outside = any(uv < vec2<f32>(0.0)) || any(uv > vec2<f32>(1.0)) || ndc.z > 1.0;
    return select(stored, 1.0, outside);
}

fn phong(normal: vec3<f32>, to_light: vec3<f32>, to_eye: vec3<f32>, color: vec3<f32>) -> vec3<f32> {
    let diffuse = max(dot(normal, to_light), 0.0);
    let reflected = reflect(-to_light, normal);
    let specular = SPECULAR * pow(max(dot(to_eye, reflected), 0.0), SHININESS);
    return (diffuse + specular) * color;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(input.eye_normal);
    let to_eye = normalize(-input.eye_position);
    let color = globals.lightColor.rgb;

    let sun = phong(normal, normalize(globals.lightDir.xyz), to_eye, color);
    var lighting = AMBIENT * color + sun_visibility(input.light_space) * sun;

    if (globals.havePointLight != 0u) {
        let point_eye = (globals.view * vec4<f32>(globals.lightPos1.xyz, 1.0)).xyz;
        let offset = point_eye - input.eye_position;
        let distance = length(offset);
        let attenuation = 1.0 / (1.0 + 0.09 * distance + 0.032 * distance * distance);
        let to_light = offset / max(distance, 0.0001);
        lighting += attenuation * (AMBIENT * color + phong(normal, to_light, to_eye, color));
    }

    let shaded = min(object.color.rgb * lighting, vec3<f32>(1.0));
    let fog_depth = length(input.eye_position) * globals.fogDensity;
    let fog = clamp(exp(-fog_depth * fog_depth), 0.0, 1.0);
    return vec4<f32>(mix(FOG_COLOR, shaded, fog), object.color.a);
}
"#;

const MARKER_BODY: &str = r#"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.projection * globals.view * object.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return object.color;
}
"#;

const DEPTH_BODY: &str = r#"
struct LightSpace {
    lightSpaceTrMatrix: mat4x4<f32>,
}

@group(0) @binding(0)
var<uniform> light: LightSpace;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return light.lightSpaceTrMatrix * object.model * vec4<f32>(position, 1.0);
}
"#;

pub const DEPTH_VIEW_SHADER: &str = r#"
@group(0) @binding(0)
var depthMap: texture_depth_2d;
@group(0) @binding(1)
var depthSampler: sampler;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

// One triangle that covers the whole screen.
@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    var out: VertexOutput;
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    out.clip = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let depth = textureSample(depthMap, depthSampler, input.uv);
    return vec4<f32>(vec3<f32>(depth), 1.0);
}
"#;

pub const SKY_SHADER: &str = r#"
struct Sky {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    zenith: vec4<f32>,
    horizon: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> sky: Sky;

struct VertexOutput {
    @builtin(position) clip: vec4<f32>,
    @location(0) direction: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    let rotation = mat4x4<f32>(sky.view[0], sky.view[1], sky.view[2], vec4<f32>(0.0, 0.0, 0.0, 1.0));
    let clip = sky.projection * rotation * vec4<f32>(position, 1.0);
    // w in the depth slot pins the sky to the far plane
    out.clip = clip.xyww;
    out.direction = position;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let height = clamp(normalize(input.direction).y * 0.5 + 0.5, 0.0, 1.0);
    return vec4<f32>(mix(sky.horizon.rgb, sky.zenith.rgb, height), 1.0);
}
"#;

pub fn lit_shader() -> String {
    [GLOBALS_BLOCK, OBJECT_BLOCK, LIT_BODY].concat()
}

pub fn marker_shader() -> String {
    [GLOBALS_BLOCK, OBJECT_BLOCK, MARKER_BODY].concat()
}

pub fn depth_shader() -> String {
    [OBJECT_BLOCK, DEPTH_BODY].concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programs_expose_every_uniform_name() {
        let sources = [lit_shader(), depth_shader(), DEPTH_VIEW_SHADER.to_string()].concat();
        for name in UNIFORM_NAMES {
            assert!(sources.contains(name), "no program declares {name}");
        }
    }

    #[test]
    fn lit_and_cpu_bias_agree() {
        let expected = format!("SHADOW_BIAS: f32 = {:?};", crate::shadow::SHADOW_BIAS);
        assert!(lit_shader().contains(&expected));
    }

    #[test]
    fn depth_program_has_no_lighting_inputs() {
        let source = depth_shader();
        assert!(source.contains("lightSpaceTrMatrix"));
        assert!(!source.contains("lightDir"));
        assert!(!source.contains("@fragment"));
    }
}
