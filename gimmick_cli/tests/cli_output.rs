use std::{env, fs, process::Command};

fn norm_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "")
}

#[test]
fn compile_error_output_format_is_stable() {
    let exe = env!("CARGO_BIN_EXE_gimmicks");

    let tmp = env::temp_dir().join(format!(
        "gimmick_cli_compile_error_format_{}.yaml",
        std::process::id()
    ));
    fs::write(&tmp, "bpm: 120\ngimmicks:\n  0: bpm 120\n  8-: 1/4 2x stutter\n").unwrap();

    let output = Command::new(exe)
        .args(["compile", tmp.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Error: compile failed: "));
    assert!(stderr.contains("Caused by:"));
    assert!(stderr.contains(
        "E4101: can't end with an indefinite gimmick (context=8-: 1/4 2x stutter) (entry 2)"
    ));
}

#[test]
fn compile_missing_input_file_is_e2001() {
    let exe = env!("CARGO_BIN_EXE_gimmicks");

    let missing = env::temp_dir().join(format!(
        "gimmick_cli_missing_input_{}.yaml",
        std::process::id()
    ));
    let _ = fs::remove_file(&missing);

    let output = Command::new(exe)
        .args(["compile", missing.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));

    let stderr = norm_newlines(&String::from_utf8_lossy(&output.stderr));
    assert!(stderr.contains("Error: compile failed: "));
    // The OS error text varies; only the prefix and entry are fixed.
    assert!(stderr.contains("E2001: failed to read gimmick file:"));
    assert!(stderr.contains("(entry 0)"));
}

#[test]
fn compile_success_writes_output_json() {
    let exe = env!("CARGO_BIN_EXE_gimmicks");

    let dir = env::temp_dir().join(format!(
        "gimmick_cli_compile_success_{}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).unwrap();

    let input = dir.join("gimmicks.yaml");
    let output_path = dir.join("out.timing.json");
    fs::write(&input, "bpm: 120\ngimmicks:\n  0: 1/4 2x stutter\n").unwrap();

    let out = Command::new(exe)
        .args([
            "compile",
            input.to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();

    assert!(out.status.success());

    let json = fs::read_to_string(&output_path).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["bpms"][0]["beat"], 0.0);
    assert_eq!(v["bpms"][0]["value"], 240.0);
    assert_eq!(v["bpms"][1]["beat"], 1.0);
    assert_eq!(v["stops"][0]["value"], 0.25);
}

#[test]
fn compile_sm_format_uses_default_output_path() {
    let exe = env!("CARGO_BIN_EXE_gimmicks");

    let dir = env::temp_dir().join(format!("gimmick_cli_compile_sm_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();

    let input = dir.join("song.yaml");
    fs::write(&input, "bpm: 120\ngimmicks:\n  0: 1/4 2x stutter\n").unwrap();
    let expected = dir.join("song.timing.sm");
    let _ = fs::remove_file(&expected);

    let out = Command::new(exe)
        .args(["compile", input.to_str().unwrap(), "--format", "sm"])
        .output()
        .unwrap();

    assert!(out.status.success());
    let sm = norm_newlines(&fs::read_to_string(&expected).unwrap());
    assert_eq!(sm, "#BPMS:0.000=240.000,1.000=120.000;\n#STOPS:0.000=0.250;\n");
}

#[test]
fn extra_patterns_file_extends_builtins() {
    let exe = env!("CARGO_BIN_EXE_gimmicks");

    let dir = env::temp_dir().join(format!("gimmick_cli_patterns_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let patterns = dir.join("patterns.yaml");
    fs::write(&patterns, "double:\n  bpms:\n    0: bpm * 2\n").unwrap();

    let out = Command::new(exe)
        .args(["patterns", "--patterns", patterns.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(out.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&out.stdout));
    let names: Vec<&str> = stdout.lines().collect();
    assert!(names.contains(&"double"));
    assert!(names.contains(&"stutter"));
    assert_eq!(names.len(), 7);
}

#[test]
fn failed_compile_writes_nothing() {
    let exe = env!("CARGO_BIN_EXE_gimmicks");

    let dir = env::temp_dir().join(format!("gimmick_cli_no_partial_{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let input = dir.join("bad.yaml");
    fs::write(&input, "bpm: 120\ngimmicks:\n  0: 1/2 4x undefined\n").unwrap();
    let expected = dir.join("bad.timing.json");
    let _ = fs::remove_file(&expected);

    let out = Command::new(exe)
        .args(["compile", input.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(!expected.exists());
    let stderr = norm_newlines(&String::from_utf8_lossy(&out.stderr));
    assert!(stderr.contains("E2101: nonexistent pattern definition: undefined"));
}

#[test]
fn help_mentions_compile_subcommand() {
    let exe = env!("CARGO_BIN_EXE_gimmicks");

    let output = Command::new(exe).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = norm_newlines(&String::from_utf8_lossy(&output.stdout));

    // clap's wording may change between versions; only check presence.
    assert!(stdout.contains("compile"));
    assert!(stdout.contains("patterns"));
}
