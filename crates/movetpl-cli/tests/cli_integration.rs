//! Integration tests for the movetpl binary.
//!
//! Fixtures are hex dumps of compiled modules; each test writes the binary
//! form into a temporary directory and drives the CLI against it.

use movetpl_bytecode::{deserialize, get_constants, ConstantType};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Write the binary form of a hex fixture into `dir`.
fn module_file(dir: &Path, fixture: &str) -> PathBuf {
    let text = std::fs::read_to_string(fixtures_dir().join(format!("{fixture}.hex"))).unwrap();
    let path = dir.join(format!("{fixture}.mv"));
    std::fs::write(&path, hex::decode(text.trim()).unwrap()).unwrap();
    path
}

fn movetpl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_movetpl"))
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("MOVETPL_LOG")
        .output()
        .expect("failed to spawn movetpl")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ────────────────────────────────────────────────────────────────────────────
// Read-only commands
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_version() {
    let output = movetpl(&["version"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "movetpl-bytecode 0.1.1");
}

#[test]
fn test_inspect_summary() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "pokemon");

    let output = movetpl(&["inspect", path_arg(&module)]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("pokemon_v1"));
    assert!(text.contains("SHA-256"));
    assert!(text.contains("constant pool"));
    assert!(text.contains("struct Stats (8 fields)"));
}

#[test]
fn test_inspect_json_assembles_back() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "u64_module");

    let output = movetpl(&["inspect", "--json", path_arg(&module)]);
    assert!(output.status.success());
    let json_path = dir.path().join("module.json");
    std::fs::write(&json_path, &output.stdout).unwrap();

    let rebuilt = dir.path().join("rebuilt.mv");
    let output = movetpl(&["assemble", path_arg(&json_path), "-o", path_arg(&rebuilt)]);
    assert!(output.status.success());
    assert_eq!(
        std::fs::read(&rebuilt).unwrap(),
        std::fs::read(&module).unwrap()
    );
}

#[test]
fn test_constants_listing() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "coin_template");

    let output = movetpl(&["constants", path_arg(&module)]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("b\"TMPL\""));
    assert!(text.contains("Vector(U8)"));

    let output = movetpl(&["constants", "--json", path_arg(&module)]);
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 4);
    assert_eq!(json[0]["value"], "06");
}

#[test]
fn test_roundtrip_all_fixtures() {
    let dir = TempDir::new().unwrap();
    for fixture in ["pokemon", "coin_template", "u64_module"] {
        let module = module_file(dir.path(), fixture);
        let output = movetpl(&["roundtrip", path_arg(&module)]);
        assert!(output.status.success(), "{fixture}");
        assert!(stdout(&output).starts_with("ok"));
    }
}

#[test]
fn test_inspect_rejects_garbage() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.mv");
    std::fs::write(&path, b"not a module").unwrap();

    let output = movetpl(&["inspect", path_arg(&path)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to decode"));
}

// ────────────────────────────────────────────────────────────────────────────
// Patching commands
// ────────────────────────────────────────────────────────────────────────────

#[test]
fn test_rename() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "coin_template");
    let out = dir.path().join("mcn.mv");

    let output = movetpl(&[
        "rename",
        path_arg(&module),
        "-o",
        path_arg(&out),
        "--map",
        "TEMPLATE=MCN",
        "--map",
        "template=mcn",
    ]);
    assert!(output.status.success());

    let renamed = deserialize(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(renamed.name().map(|n| n.as_str()), Some("mcn"));
}

#[test]
fn test_rename_invalid_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "pokemon");
    let out = dir.path().join("out.mv");

    let output = movetpl(&[
        "rename",
        path_arg(&module),
        "-o",
        path_arg(&out),
        "--map",
        "Stats=123Stats",
    ]);
    assert!(!output.status.success());
    assert!(!out.exists());
}

#[test]
fn test_patch_constant() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "coin_template");
    let out = dir.path().join("patched.mv");

    let output = movetpl(&[
        "patch-constant",
        path_arg(&module),
        "-o",
        path_arg(&out),
        "--type",
        "U8",
        "--expected",
        "06",
        "--new",
        "0x03",
    ]);
    assert!(output.status.success());

    let constants = get_constants(&std::fs::read(&out).unwrap()).unwrap();
    assert_eq!(constants[0].type_tag, ConstantType::U8);
    assert_eq!(constants[0].value, vec![3]);
}

#[test]
fn test_patch_constant_value_guard() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "coin_template");
    let out = dir.path().join("patched.mv");

    let output = movetpl(&[
        "patch-constant",
        path_arg(&module),
        "-o",
        path_arg(&out),
        "--type",
        "U8",
        "--expected",
        "00",
        "--new",
        "03",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No U8 constant"));
    assert!(!out.exists());
}

#[test]
fn test_patch_constant_unknown_type() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "coin_template");
    let out = dir.path().join("patched.mv");

    let output = movetpl(&[
        "patch-constant",
        path_arg(&module),
        "-o",
        path_arg(&out),
        "--type",
        "U512",
        "--expected",
        "06",
        "--new",
        "03",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("U512"));
    assert!(!out.exists());
}

#[test]
fn test_apply_plan() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "coin_template");
    let plan = dir.path().join("plan.toml");
    std::fs::write(
        &plan,
        r#"
[renames]
TEMPLATE = "MCN"
template = "mcn"

[[constants]]
type = "U8"
expected = "06"
new = "03"

[[constants]]
type = "Vector(U8)"
expected = "04544d504c"
new = "034d434e"
"#,
    )
    .unwrap();
    let out = dir.path().join("mcn.mv");

    let output = movetpl(&[
        "apply",
        path_arg(&module),
        "--plan",
        path_arg(&plan),
        "-o",
        path_arg(&out),
    ]);
    assert!(output.status.success());

    let bytes = std::fs::read(&out).unwrap();
    let patched = deserialize(&bytes).unwrap();
    assert_eq!(patched.name().map(|n| n.as_str()), Some("mcn"));
    assert_eq!(patched.constant_pool[0].value, vec![3]);
    assert_eq!(patched.constant_pool[1].value, b"\x03MCN".to_vec());
}

#[test]
fn test_apply_is_all_or_nothing() {
    let dir = TempDir::new().unwrap();
    let module = module_file(dir.path(), "coin_template");
    let plan = dir.path().join("plan.toml");
    std::fs::write(
        &plan,
        r#"
[renames]
TEMPLATE = "MCN"

[[constants]]
type = "U8"
expected = "07"
new = "03"
"#,
    )
    .unwrap();
    let out = dir.path().join("mcn.mv");

    let output = movetpl(&[
        "apply",
        path_arg(&module),
        "--plan",
        path_arg(&plan),
        "-o",
        path_arg(&out),
    ]);
    assert!(!output.status.success());
    assert!(!out.exists());
}
