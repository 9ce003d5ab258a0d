
use fixtures::*;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::process::Command;
use tempfile::tempdir;

fn msce_dump() -> Command {
    Command::new(assert_cmd::cargo_bin!("msce_dump"))
}

#[test]
fn it_respects_directory_output() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("test.out");
    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());

    let mut cmd = msce_dump();
    cmd.args(["-f", &f.to_string_lossy(), sample.to_str().unwrap()]);

    assert!(
        cmd.output().unwrap().stdout.is_empty(),
        "Expected output to be printed to file, but was printed to stdout"
    );

    let mut expected = vec![];

    File::open(&f).unwrap().read_to_end(&mut expected).unwrap();
    assert!(
        !expected.is_empty(),
        "Expected output to be printed to file"
    )
}

#[test]
fn test_it_refuses_to_overwrite_directory() {
    let d = tempdir().unwrap();
    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());

    let mut cmd = msce_dump();
    cmd.args(["-f", &d.path().to_string_lossy(), sample.to_str().unwrap()]);

    cmd.assert().failure().code(1);
}

#[test]
fn test_it_overwrites_file_anyways_if_passed_flag() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("test.out");

    let mut file = File::create(&f).unwrap();
    file.write_all(b"I'm a file!").unwrap();

    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());
    let mut cmd = msce_dump();
    cmd.args([
        "-f",
        &f.to_string_lossy(),
        "--no-confirm-overwrite",
        sample.to_str().unwrap(),
    ]);

    cmd.assert().success();

    let written = fs::read_to_string(&f).unwrap();
    assert!(written.contains("STRINGS:"), "unexpected output: {written}");
}

#[test]
fn test_it_does_not_overwrite_without_a_terminal_to_confirm() {
    let d = tempdir().unwrap();
    let f = d.as_ref().join("test.out");
    fs::write(&f, b"I'm a file!").unwrap();

    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());
    let mut cmd = msce_dump();
    cmd.args(["-f", &f.to_string_lossy(), sample.to_str().unwrap()]);

    cmd.assert().failure().code(1);
    assert_eq!(fs::read(&f).unwrap(), b"I'm a file!");
}

#[test]
fn it_dumps_every_section_as_text() {
    let d = tempdir().unwrap();
    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());

    let mut cmd = msce_dump();
    cmd.arg(sample.to_str().unwrap());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Target Architecture: StrongArm (2577)"))
        .stdout(predicate::str::contains("App Name: \"Demo\""))
        .stdout(predicate::str::contains("| 4        | \"Demo.lnk\""))
        .stdout(predicate::str::contains("\"\\Program Files\\Demo\""))
        .stdout(predicate::str::contains("- SELF_REGISTER"))
        .stdout(predicate::str::contains("1: HKEY_LOCAL_MACHINE\nSoftware\nAcme\n"))
        .stdout(predicate::str::contains("Reading REGKEYS is not supported (2 records"))
        .stdout(predicate::str::contains(
            "1: \\Windows\\Programs -> \\APP.EXE (File) [Demo.lnk]",
        ));
}

#[test]
fn it_renders_dos_names_on_request() {
    let d = tempdir().unwrap();
    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());

    msce_dump()
        .arg(sample.to_str().unwrap())
        .assert()
        .success()
        .stdout(predicate::str::contains("2: demo-runtime.dll"));

    msce_dump()
        .args(["--dos-names", sample.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2: DEMO-RUN.DLL"))
        .stdout(predicate::str::contains("1: APP.EXE"));
}

#[test]
fn it_applies_install_dir() {
    let d = tempdir().unwrap();
    let data = ManifestBuilder::new()
        .string(1, "%CE0%")
        .directory(1, &[1])
        .build();
    let sample = write_manifest(d.path(), "setup.000", &data);

    msce_dump()
        .args(["--install-dir", "\\Storage Card", sample.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"\\Storage Card\""));
}

#[test]
fn it_emits_json() {
    let d = tempdir().unwrap();
    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());

    let output = msce_dump()
        .args(["-o", "json", sample.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["provider"], "Acme");
    assert_eq!(value["registry_keys"]["status"], "unsupported");
    assert_eq!(value["links"]["2"]["target_path"], "\\Program Files\\Demo");
}

#[test]
fn it_emits_one_json_object_per_record() {
    let d = tempdir().unwrap();
    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());

    let output = msce_dump()
        .args(["-o", "jsonl", sample.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    // header + 7 strings + 2 dirs + 2 files + 1 hive + regkeys marker + 2 links
    assert_eq!(lines.len(), 16);
    assert_eq!(lines[0]["kind"], "header");
    assert_eq!(lines[0]["record"]["app_name"], "Demo");
    assert_eq!(lines[1]["kind"], "string");
    assert_eq!(lines[1]["id"], 1);
    assert_eq!(lines[13]["kind"], "registry_keys");
    assert_eq!(lines[15]["record"]["spec"], serde_json::json!([]));
}

#[test]
fn it_supports_stdin_input_with_dash() {
    let d = tempdir().unwrap();
    let sample = write_manifest(d.path(), "setup.000", &sample_manifest().build());

    let out_file = msce_dump()
        .args(["-o", "jsonl", sample.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(
        out_file.status.success(),
        "expected file-input run to succeed"
    );

    let stdin_file = File::open(&sample).unwrap();
    let mut cmd_stdin = msce_dump();
    cmd_stdin.args(["-o", "jsonl", "-"]);
    cmd_stdin.stdin(stdin_file);
    let out_stdin = cmd_stdin.output().unwrap();
    assert!(
        out_stdin.status.success(),
        "expected stdin-input run to succeed"
    );
    assert_eq!(
        out_stdin.stdout, out_file.stdout,
        "stdin and file input should produce identical output"
    );
}

#[test]
fn it_fails_on_a_bad_signature() {
    let d = tempdir().unwrap();
    let mut builder = sample_manifest();
    builder.signature = *b"XXXX";
    let sample = write_manifest(d.path(), "setup.000", &builder.build());

    msce_dump()
        .arg(sample.to_str().unwrap())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("invalid signature at offset 0"));
}

#[test]
fn it_fails_on_a_missing_file() {
    let d = tempdir().unwrap();
    let missing = d.path().join("missing.000");

    msce_dump()
        .arg(missing.to_str().unwrap())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed to open file"));
}

#[test]
fn it_reports_duplicates_unless_allowed() {
    let d = tempdir().unwrap();
    let data = ManifestBuilder::new()
        .string(1, "first")
        .string(1, "second")
        .build();
    let sample = write_manifest(d.path(), "setup.000", &data);

    msce_dump()
        .arg(sample.to_str().unwrap())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("duplicate id `1` in the STRINGS section"));

    msce_dump()
        .args(["--allow-duplicate-ids", sample.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"second\""));
}
