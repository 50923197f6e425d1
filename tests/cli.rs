use assert_cmd::prelude::*;
use once_cell::sync::Lazy;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Flat 40x40 quad at the given height, facing up.
fn slab_obj(height: f32) -> String {
    format!(
        "# slab\nv -20 {h} -20\nv 20 {h} -20\nv 20 {h} 20\nv -20 {h} 20\nvn 0 1 0\nf 1//1 4//1 3//1 2//1\n",
        h = height
    )
}

static LIGHTS_XML: Lazy<String> = Lazy::new(|| {
    r#"
  <object>
    <name>Camera</name>
    <type>camera</type>
    <position>0 5 3</position>
    <target>0 5 -10</target>
  </object>
  <object>
    <name>Sun</name>
    <type>sun</type>
    <direction>10 20 10</direction>
  </object>"#
        .to_string()
});

fn write_scene(objects: &str, files: &[(&str, String)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).expect("write mesh");
    }
    let scene = format!("<scene>{}{objects}\n</scene>\n", *LIGHTS_XML);
    let path = dir.path().join("scene.xml");
    fs::write(&path, scene).expect("write scene");
    (dir, path)
}

fn viewer() -> Command {
    Command::cargo_bin("shadow-scene").expect("binary exists")
}

#[test]
fn summary_lists_meshes_and_reports_sunlight() {
    let (_dir, scene) = write_scene(
        r#"
  <object>
    <name>Ground</name>
    <mesh>ground.obj</mesh>
    <color>120 160 90</color>
  </object>
  <object>
    <name>Fan</name>
    <pivot>0.7752 6.9715 8.6792</pivot>
  </object>"#,
        &[("ground.obj", slab_obj(0.0))],
    );

    viewer()
        .arg(&scene)
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains("Loaded scene with 2 meshes"))
        .stdout(contains(" - Ground (ground.obj)"))
        .stdout(contains(" - Fan (unit cube, rotates about (0.78, 6.97, 8.68))"))
        .stdout(contains("Camera at (0.00, 5.00, 3.00) with target (0.00, 5.00, -10.00)"))
        .stdout(contains("Sun direction (10.00, 20.00, 10.00)"))
        .stdout(contains("Camera is in sunlight"));
}

#[test]
fn roof_between_camera_and_sun_casts_shadow() {
    let (_dir, scene) = write_scene(
        r#"
  <object>
    <name>Roof</name>
    <mesh>roof.obj</mesh>
  </object>"#,
        &[("roof.obj", slab_obj(8.0))],
    );

    viewer()
        .arg(&scene)
        .args(["--summary-only", "--shadow-size", "1024"])
        .assert()
        .success()
        .stdout(contains("Camera is in shadow"));
}

#[test]
fn broken_mesh_falls_back_to_cube() {
    let (_dir, scene) = write_scene(
        r#"
  <object>
    <name>Broken</name>
    <mesh>broken.obj</mesh>
  </object>"#,
        &[("broken.obj", "v 1 2\nf 1 2 3\n".to_string())],
    );

    viewer()
        .arg(&scene)
        .arg("--summary-only")
        .assert()
        .success()
        .stdout(contains(" - Broken (broken.obj)"))
        .stdout(contains("Camera is in sunlight"));
}

#[test]
fn unknown_flag_prints_usage() {
    let (_dir, scene) = write_scene("", &[]);
    viewer()
        .arg(&scene)
        .arg("--fullscreen")
        .assert()
        .failure()
        .stderr(contains("Unknown argument: --fullscreen"))
        .stderr(contains("Usage: shadow-scene"));
}

#[test]
fn shadow_size_must_be_positive() {
    let (_dir, scene) = write_scene("", &[]);
    viewer()
        .arg(&scene)
        .args(["--summary-only", "--shadow-size", "0"])
        .assert()
        .failure()
        .stderr(contains("invalid shadow map size"));
}

#[test]
fn missing_scene_file_fails() {
    let dir = TempDir::new().expect("temp dir");
    viewer()
        .arg(dir.path().join("nope.xml"))
        .arg("--summary-only")
        .assert()
        .failure()
        .stderr(contains("unable to read scene"))
        .stdout(predicate::str::is_empty());
}

#[cfg(target_os = "linux")]
#[test]
fn missing_display_points_at_summary_mode() {
    let (_dir, scene) = write_scene("", &[]);
    viewer()
        .arg(&scene)
        .env_remove("DISPLAY")
        .env_remove("WAYLAND_DISPLAY")
        .env_remove("WAYLAND_SOCKET")
        .assert()
        .failure()
        .stdout(contains("Loaded scene with 0 meshes"))
        .stderr(contains("failed to initialize event loop"))
        .stderr(contains("Use --summary-only"));
}
