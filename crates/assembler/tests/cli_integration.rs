//! Integration tests for the runic-asm CLI.

use runic_asm as _;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("runic-asm")
}

fn create_temp_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn assembles_a_simple_program() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "add.tal", "|0100 #01 #02 ADD BRK\n");
    let rom = temp_dir.path().join("add.rom");

    let output = Command::new(binary_path())
        .args([source.to_str().unwrap(), rom.to_str().unwrap()])
        .output()
        .expect("failed to run runic-asm");

    assert!(output.status.success());
    assert_eq!(
        fs::read(&rom).unwrap(),
        &[0x80, 0x01, 0x80, 0x02, 0x18, 0x00]
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Assembled"));
    assert!(stdout.contains("6 bytes"));
    assert!(stdout.contains("0 labels"));
    assert!(stdout.contains("0 macros."));
}

#[test]
fn summary_uses_the_singular_for_one_label() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(
        temp_dir.path(),
        "loop.tal",
        "|0100 @loop INC2 ;loop JMP2 BRK\n",
    );
    let rom = temp_dir.path().join("loop.rom");

    let output = Command::new(binary_path())
        .args([source.to_str().unwrap(), rom.to_str().unwrap()])
        .output()
        .expect("failed to run runic-asm");

    assert!(output.status.success());
    assert_eq!(
        fs::read(&rom).unwrap(),
        &[0x21, 0xa0, 0x01, 0x00, 0x2c, 0x00]
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 label,"));
    assert!(!stdout.contains("1 labels"));
}

#[test]
fn wrong_argument_count_prints_usage_and_fails() {
    let output = Command::new(binary_path())
        .output()
        .expect("failed to run runic-asm");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage: runic-asm <input> <output>"));
}

#[test]
fn unreadable_input_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("missing.tal");
    let rom = temp_dir.path().join("out.rom");

    let output = Command::new(binary_path())
        .args([missing.to_str().unwrap(), rom.to_str().unwrap()])
        .output()
        .expect("failed to run runic-asm");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("couldn't read"));
    assert!(!rom.exists());
}

#[test]
fn assembly_errors_exit_zero_and_write_no_output() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "bad.tal", "|0100 .nope\n");
    let rom = temp_dir.path().join("bad.rom");

    let output = Command::new(binary_path())
        .args([source.to_str().unwrap(), rom.to_str().unwrap()])
        .output()
        .expect("failed to run runic-asm");

    assert!(output.status.success());
    assert!(!rom.exists());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Label 'nope' does not exist."));
    assert!(output.stdout.is_empty());
}

#[test]
fn empty_source_warns_but_still_writes() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(temp_dir.path(), "empty.tal", "");
    let rom = temp_dir.path().join("empty.rom");

    let output = Command::new(binary_path())
        .args([source.to_str().unwrap(), rom.to_str().unwrap()])
        .output()
        .expect("failed to run runic-asm");

    assert!(output.status.success());
    assert_eq!(fs::read(&rom).unwrap().len(), 0);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Output rom is empty."));
}

#[test]
fn macros_and_strings_assemble_end_to_end() {
    let temp_dir = tempfile::tempdir().unwrap();
    let source = create_temp_file(
        temp_dir.path(),
        "mixed.tal",
        "%double { #02 MUL } |0100 #03 double \"hi BRK\n",
    );
    let rom = temp_dir.path().join("mixed.rom");

    let output = Command::new(binary_path())
        .args([source.to_str().unwrap(), rom.to_str().unwrap()])
        .output()
        .expect("failed to run runic-asm");

    assert!(output.status.success());
    assert_eq!(
        fs::read(&rom).unwrap(),
        &[0x80, 0x03, 0x80, 0x02, 0x1a, 0x68, 0x69, 0x00]
    );
}
