//! Binary-level tests: flags, dry-run plans, early failures.
//!
//! Nothing here needs Python or pyarmor; every run either stops at
//! `--dry-run` or fails before an external tool is started.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn packarmor(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("packarmor").expect("binary built");
    cmd.env("HOME", home.path())
        .env("USERPROFILE", home.path())
        .env_remove("PACKARMOR_PYTHON")
        .env_remove("PACKARMOR_OBFUSCATOR")
        .env_remove("PACKARMOR_HOME")
        .env("RUST_LOG", "warn");
    cmd
}

fn app_dir(root: &TempDir) -> std::path::PathBuf {
    let app = root.path().join("app");
    std::fs::create_dir_all(&app).expect("mkdir");
    std::fs::write(app.join("main.py"), "print('hi')").expect("write entry");
    app
}

#[test]
fn long_and_short_version_flags() {
    let home = TempDir::new().unwrap();
    for flag in ["--version", "-v"] {
        packarmor(&home)
            .arg(flag)
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

#[test]
fn unknown_packager_type_is_rejected() {
    let home = TempDir::new().unwrap();
    packarmor(&home)
        .args(["--type", "nuitka", "main.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown packager type 'nuitka'"));
}

#[test]
fn entry_script_is_required() {
    let home = TempDir::new().unwrap();
    packarmor(&home)
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("SCRIPT"));
}

#[test]
fn json_requires_dry_run() {
    let home = TempDir::new().unwrap();
    packarmor(&home)
        .args(["--json", "main.py"])
        .assert()
        .failure();
}

#[test]
fn dry_run_json_reports_py2exe_layout() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let app = app_dir(&root);

    let output = packarmor(&home)
        .current_dir(root.path())
        .args(["--dry-run", "--json", "--type", "PyInstaller"])
        .arg(app.join("main.py"))
        .output()
        .expect("run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(plan["kind"], "PyInstaller");
    assert_eq!(plan["entry"], "main.py");
    assert_eq!(plan["pack_command"], "py2exe");
    assert_eq!(plan["python"], "python");
    assert_eq!(plan["obfuscator"], "pyarmor");
    let library = plan["library"].as_str().expect("library string");
    assert!(library.ends_with("dist/library.zip"), "got: {library}");
    assert_eq!(plan["setup"], app.join("setup.py").display().to_string());
}

#[test]
fn dry_run_respects_path_setup_and_config_file() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join(".packarmor")).unwrap();
    std::fs::write(
        home.path().join(".packarmor/config.yaml"),
        "python: /opt/py/bin/python3\nobfuscator: /opt/py/bin/pyarmor\n",
    )
    .unwrap();

    let root = TempDir::new().unwrap();
    let app = app_dir(&root);
    std::fs::create_dir_all(app.join("cli")).unwrap();
    std::fs::write(app.join("cli/run.py"), "main()").unwrap();

    let output = packarmor(&home)
        .current_dir(root.path())
        .args(["--dry-run", "--json", "--python", "/usr/bin/python3.11"])
        .arg("--path")
        .arg(&app)
        .arg("--setup")
        .arg(root.path().join("setup_win.py"))
        .arg(app.join("cli/run.py"))
        .output()
        .expect("run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(plan["entry"], "cli/run.py");
    assert_eq!(plan["python"], "/usr/bin/python3.11", "flag beats config file");
    assert_eq!(plan["obfuscator"], "/opt/py/bin/pyarmor");
    assert_eq!(
        plan["output_dir"],
        root.path().join("dist").display().to_string()
    );
}

#[test]
fn dry_run_table_lists_library() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let app = app_dir(&root);

    packarmor(&home)
        .current_dir(root.path())
        .arg("--dry-run")
        .arg(app.join("main.py"))
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"))
        .stdout(predicate::str::contains("library.zip"))
        .stdout(predicate::str::contains("py2exe"));
}

#[test]
fn entry_outside_source_path_fails() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let app = app_dir(&root);

    packarmor(&home)
        .current_dir(root.path())
        .arg("--dry-run")
        .arg("--path")
        .arg(app.join("nested"))
        .arg(app.join("main.py"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not inside source path"));
}

#[test]
fn missing_entry_fails_before_running_tools() {
    let home = TempDir::new().unwrap();
    let root = TempDir::new().unwrap();
    let app = app_dir(&root);

    packarmor(&home)
        .current_dir(root.path())
        .args(["--obfuscator", "/definitely/not/pyarmor"])
        .arg(app.join("missing.py"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("entry script not found"));
}

#[test]
fn malformed_config_is_reported_with_path() {
    let home = TempDir::new().unwrap();
    std::fs::create_dir_all(home.path().join(".packarmor")).unwrap();
    std::fs::write(home.path().join(".packarmor/config.yaml"), "- not a mapping\n").unwrap();

    packarmor(&home)
        .args(["--dry-run", "main.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config.yaml"));
}
