use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const SETTINGS_ENV: [&str; 12] = [
    "STACK_NAME",
    "STACK_STAGE",
    "STACK_OWNER",
    "STACK_CLIENT",
    "STACK_MEMORY",
    "STACK_TIMEOUT",
    "STACK_MAX_CONCURRENT",
    "STACK_ENV",
    "STACK_BUCKETS",
    "STACK_RUNTIME",
    "STACK_CODE_DIR",
    "STACK_OUTPUT",
];

fn stack_synth(args: &[&str], cwd: &Path) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_stack_synth"));
    for key in SETTINGS_ENV {
        command.env_remove(key);
    }
    command
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "off")
        .output()
        .expect("stack_synth should start")
}

#[test]
fn missing_build_descriptor_fails_without_writing_assembly() {
    let root = tempfile::tempdir().expect("root");
    let code_dir = root.path().join("src");
    fs::create_dir_all(&code_dir).expect("code dir");
    fs::write(code_dir.join("handler.py"), "def handler(event, context):\n    return {}\n")
        .expect("write");
    let out_dir = root.path().join("cdk.out");

    let output = stack_synth(
        &[
            "--name",
            "api",
            "--stage",
            "prod",
            "--code-dir",
            code_dir.to_str().expect("utf-8 path"),
            "--output",
            out_dir.to_str().expect("utf-8 path"),
        ],
        root.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: failed to synthesize stack 'api-prod': "));
    assert!(stderr.contains("build descriptor"));
    assert!(output.stdout.is_empty());
    assert!(!out_dir.join("manifest.json").exists());
}

#[test]
fn output_over_code_dir_is_refused() {
    let root = tempfile::tempdir().expect("root");
    fs::write(root.path().join("handler.py"), "def handler(event, context):\n    return {}\n")
        .expect("write");

    let output = stack_synth(
        &["--name", "api", "--stage", "prod", "--output", "."],
        root.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("must not be or contain the code directory"));
    assert!(root.path().join("handler.py").is_file());
}

#[test]
fn missing_name_is_a_usage_error() {
    let root = tempfile::tempdir().expect("root");

    let output = stack_synth(&["--stage", "prod"], root.path());

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--name"));
}
