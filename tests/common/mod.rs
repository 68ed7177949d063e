use std::{fs, path::Path, process::Command};

use tempfile::TempDir;

/// Compile `source` with the nanocc binary, run the produced executable and
/// return its stdout.
pub fn compile_and_run(source: &str, name: &str) -> String {
    let dir = TempDir::new().expect("could not create a scratch directory");

    let src_path = dir.path().join(format!("{name}.c"));
    fs::write(&src_path, source).expect("could not write the source file");

    let exec_path = dir.path().join(name);
    assert_cmd::Command::cargo_bin("nanocc")
        .expect("nanocc binary not built")
        .arg(&src_path)
        .arg("-o")
        .arg(&exec_path)
        .assert()
        .success();

    run_executable(&exec_path)
}

fn run_executable(path: &Path) -> String {
    let output = Command::new(path)
        .output()
        .expect("could not run the compiled program");
    assert!(
        output.status.success(),
        "compiled program exited with {}",
        output.status
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}
