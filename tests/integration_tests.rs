//! Integration tests: build collaborator hands over files, tools merge and validate them.

use std::fs;
use std::path::Path;
use std::process::Command;

use kpack::{merge_files, BlobReader, FixedLayout, MergeManifest};

/// Six kernels with fixed file names, as produced by one kernel build.
const SIX_KERNELS: FixedLayout<'static> = FixedLayout::new(
    &[
        "copy_1d_to_2d",
        "copy_2d_to_1d",
        "copy_2d_to_2d",
        "copy_1d_to_2d_rgbp",
        "copy_2d_to_2d_rgbp",
        "copy_2d_to_1d_rgbp",
    ],
    "bin",
);

fn write_kernels(dir: &Path, layout: &FixedLayout<'_>) -> Vec<Vec<u8>> {
    layout
        .sources(dir)
        .iter()
        .enumerate()
        .map(|(i, src)| {
            let bytes: Vec<u8> = (0..(40 + i * 33)).map(|b| (b % 251 + 1) as u8).collect();
            fs::write(&src.path, &bytes).unwrap();
            bytes
        })
        .collect()
}

#[test]
fn fixed_layout_merges_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let kernels = write_kernels(dir.path(), &SIX_KERNELS);
    let out = dir.path().join("copy_kernels.bin");

    let outcome = merge_files(&SIX_KERNELS.sources(dir.path()), &out).unwrap();
    assert_eq!(outcome.plan.count(), 6);

    let reader = BlobReader::open(&out).unwrap();
    reader.verify().unwrap();
    let view = reader.view();
    assert_eq!(view.directory().offsets, outcome.plan.offsets);
    for (i, k) in kernels.iter().enumerate().take(5) {
        assert_eq!(view.payload(i).unwrap(), k.as_slice());
    }
    assert!(view.tail().starts_with(&kernels[5]));
}

#[test]
fn manifest_relative_to_its_own_directory() {
    let dir = tempfile::tempdir().unwrap();
    let kdir = dir.path().join("kernels");
    fs::create_dir(&kdir).unwrap();
    fs::write(kdir.join("a.bin"), [1u8; 10]).unwrap();
    fs::write(kdir.join("b.bin"), [2u8; 130]).unwrap();
    let manifest_path = dir.path().join("merge.toml");
    fs::write(
        &manifest_path,
        r#"
output = "out.bin"
base_dir = "kernels"

[[kernel]]
name = "first"
path = "a.bin"

[[kernel]]
path = "b.bin"
"#,
    )
    .unwrap();

    let manifest = MergeManifest::load(&manifest_path).unwrap();
    let sources = manifest.sources();
    assert_eq!(sources[0].name, "first");
    assert_eq!(sources[1].name, "b");
    let output = manifest.output_path().unwrap();
    assert_eq!(output, kdir.join("out.bin"));

    let outcome = merge_files(&sources, &output).unwrap();
    assert_eq!(outcome.bytes_written, 448);
    assert_eq!(fs::metadata(&output).unwrap().len(), 448);
}

#[test]
fn merge_tool_rejects_sixteen_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let mut args = Vec::new();
    for i in 0..16 {
        let path = dir.path().join(format!("k{i}.bin"));
        fs::write(&path, [1u8; 4]).unwrap();
        args.push(path);
    }
    let out = dir.path().join("out.bin");

    let result = Command::new(env!("CARGO_BIN_EXE_kpack-merge"))
        .args(&args)
        .arg("-o")
        .arg(&out)
        .output()
        .unwrap();

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("16 kernels given, maximum is 15"), "{stderr}");
    assert!(!out.exists());
}

#[test]
fn merge_then_verify_with_tools() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.bin");
    let b = dir.path().join("b.bin");
    fs::write(&a, [7u8; 10]).unwrap();
    fs::write(&b, [9u8; 130]).unwrap();
    let out = dir.path().join("out.bin");

    let merged = Command::new(env!("CARGO_BIN_EXE_kpack-merge"))
        .arg(format!("first={}", a.display()))
        .arg(&b)
        .arg("-o")
        .arg(&out)
        .arg("--json")
        .output()
        .unwrap();
    assert!(merged.status.success(), "{}", String::from_utf8_lossy(&merged.stderr));
    let summary: serde_json::Value = serde_json::from_slice(&merged.stdout).unwrap();
    assert_eq!(summary["bytes_written"], 448);
    assert_eq!(summary["plan"]["offsets"], serde_json::json!([64, 128]));

    let verified = Command::new(env!("CARGO_BIN_EXE_kpack"))
        .arg("verify")
        .arg(&out)
        .output()
        .unwrap();
    assert!(verified.status.success());

    let inspected = Command::new(env!("CARGO_BIN_EXE_kpack"))
        .args(["inspect", "--json"])
        .arg(&out)
        .output()
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&inspected.stdout).unwrap();
    assert_eq!(report["count"], 2);
    assert_eq!(report["entries"][0]["size"], 10);

    let extract_dir = dir.path().join("extracted");
    let extracted = Command::new(env!("CARGO_BIN_EXE_kpack"))
        .arg("extract")
        .arg(&out)
        .arg("--out-dir")
        .arg(&extract_dir)
        .output()
        .unwrap();
    assert!(extracted.status.success());
    assert_eq!(fs::read(extract_dir.join("entry_0.bin")).unwrap(), vec![7u8; 10]);
    assert_eq!(fs::read(extract_dir.join("entry_1.tail.bin")).unwrap().len(), 130 + 62 + 128);
}

#[test]
fn verify_tool_fails_on_corrupt_blob() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.bin");
    fs::write(&path, [0u8; 256]).unwrap();

    let result = Command::new(env!("CARGO_BIN_EXE_kpack"))
        .arg("verify")
        .arg(&path)
        .output()
        .unwrap();
    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("corrupt header"));
}
