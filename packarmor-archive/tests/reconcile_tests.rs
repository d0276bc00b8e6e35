//! Reconciliation of library archives against a staging directory.
//!
//! A fake compiler stands in for `py_compile`: `x.py` becomes `x.pyc`
//! containing `compiled:` followed by the source bytes.

use std::collections::BTreeSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use packarmor_archive::{
    reconcile, CompileError, Compiler, ReconcileError, SourceArchive,
};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct FakeCompiler;

impl Compiler for FakeCompiler {
    fn accepts(&self, source: &Path) -> bool {
        source.extension().is_some_and(|ext| ext == "py")
    }

    fn compile(&self, source: &Path, target: &Path) -> Result<(), CompileError> {
        let text = fs::read(source).map_err(|e| CompileError::Other(e.to_string()))?;
        let mut out = b"compiled:".to_vec();
        out.extend_from_slice(&text);
        fs::write(target, out).map_err(|e| CompileError::Other(e.to_string()))
    }
}

struct FailingCompiler;

impl Compiler for FailingCompiler {
    fn compile(&self, source: &Path, _target: &Path) -> Result<(), CompileError> {
        Err(CompileError::Other(format!("syntax error in {}", source.display())))
    }
}

fn write_archive(path: &Path, members: &[(&str, &[u8])]) {
    let file = fs::File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(DateTime::default());
    for (name, data) in members {
        zip.start_file(*name, options).expect("start_file");
        zip.write_all(data).expect("write member");
    }
    zip.finish().expect("finish");
}

fn read_archive(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(fs::File::open(path).expect("open")).expect("zip");
    (0..zip.len())
        .map(|i| {
            let mut entry = zip.by_index(i).expect("entry");
            let mut buf = Vec::new();
            entry.read_to_end(&mut buf).expect("read member");
            (entry.name().to_string(), buf)
        })
        .collect()
}

fn names(path: &Path) -> Vec<String> {
    read_archive(path).into_iter().map(|(n, _)| n).collect()
}

fn setup() -> (TempDir, PathBuf, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let archive = dir.path().join("library.zip");
    let staging = dir.path().join("dist");
    fs::create_dir_all(&staging).expect("mkdir staging");
    (dir, archive, staging)
}

// ---------------------------------------------------------------------------
// 1. Member set and order
// ---------------------------------------------------------------------------

#[test]
fn fresh_source_replaces_stale_member_and_old_member_is_restored() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("a.pyc", b"old-a"), ("b.pyc", b"old-b")]);
    fs::write(staging.join("a.py"), b"fresh-a").expect("stage a.py");

    let report = reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");

    assert_eq!(
        read_archive(&archive),
        vec![
            ("a.pyc".to_string(), b"compiled:fresh-a".to_vec()),
            ("b.pyc".to_string(), b"old-b".to_vec()),
        ]
    );
    assert_eq!(report.members, vec!["a.pyc", "b.pyc"]);
    assert_eq!(report.compiled, vec![PathBuf::from("a.pyc")]);
    assert_eq!(
        fs::read(staging.join("b.pyc")).expect("restored b.pyc"),
        b"old-b"
    );
}

#[test]
fn member_order_is_preserved_not_sorted() {
    let (_dir, archive, staging) = setup();
    write_archive(
        &archive,
        &[
            ("zeta.pyc", b"z"),
            ("pkg/__init__.pyc", b"i"),
            ("alpha.pyc", b"a"),
        ],
    );
    fs::write(staging.join("alpha.py"), b"new").expect("stage");

    reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");
    assert_eq!(names(&archive), vec!["zeta.pyc", "pkg/__init__.pyc", "alpha.pyc"]);
}

#[test]
fn staged_files_not_in_archive_are_not_added() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("a.pyc", b"old")]);
    fs::write(staging.join("a.py"), b"a").expect("stage");
    fs::write(staging.join("extra.py"), b"extra").expect("stage");

    reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");
    assert_eq!(names(&archive), vec!["a.pyc"]);
    assert!(staging.join("extra.pyc").exists(), "extra source is still compiled");
}

#[test]
fn nested_members_are_compiled_in_place() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("pkg/mod.pyc", b"old"), ("pkg/util.pyc", b"util")]);
    fs::create_dir_all(staging.join("pkg")).expect("mkdir");
    fs::write(staging.join("pkg/mod.py"), b"new").expect("stage");

    reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");
    assert_eq!(
        read_archive(&archive),
        vec![
            ("pkg/mod.pyc".to_string(), b"compiled:new".to_vec()),
            ("pkg/util.pyc".to_string(), b"util".to_vec()),
        ]
    );
}

// ---------------------------------------------------------------------------
// 2. Byte-level stability
// ---------------------------------------------------------------------------

#[test]
fn empty_staging_restores_members_and_leaves_archive_unchanged() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("a.pyc", b"one"), ("b.pyc", b"two")]);
    let before = fs::read(&archive).expect("read before");

    reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");

    let after = fs::read(&archive).expect("read after");
    assert_eq!(before, after, "archive must be byte-for-byte unchanged");

    let staged: BTreeSet<PathBuf> = packarmor_archive::staged_files(&staging).expect("walk");
    let expected: BTreeSet<PathBuf> = ["a.pyc", "b.pyc"].into_iter().map(PathBuf::from).collect();
    assert_eq!(staged, expected);
}

#[test]
fn reconcile_twice_is_byte_identical() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("a.pyc", b"old-a"), ("b.pyc", b"old-b")]);
    fs::write(staging.join("a.py"), b"fresh-a").expect("stage");

    reconcile(&archive, &staging, &FakeCompiler).expect("first");
    let first = fs::read(&archive).expect("read first");
    reconcile(&archive, &staging, &FakeCompiler).expect("second");
    let second = fs::read(&archive).expect("read second");

    assert_eq!(first, second);
}

#[test]
fn deflated_members_stay_deflated() {
    let (_dir, archive, staging) = setup();
    {
        let file = fs::File::create(&archive).expect("create");
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("a.pyc", options).expect("start");
        zip.write_all(&[7u8; 512]).expect("write");
        zip.finish().expect("finish");
    }

    reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");

    let mut zip = ZipArchive::new(fs::File::open(&archive).expect("open")).expect("zip");
    let entry = zip.by_index(0).expect("entry");
    assert_eq!(entry.compression(), CompressionMethod::Deflated);
}

fn write_archive_with_modes(path: &Path, members: &[(&str, &[u8], CompressionMethod, u32)]) {
    let file = fs::File::create(path).expect("create archive");
    let mut zip = ZipWriter::new(file);
    for (name, data, method, mode) in members {
        let options = FileOptions::default()
            .compression_method(*method)
            .last_modified_time(DateTime::default())
            .unix_permissions(*mode);
        zip.start_file(*name, options).expect("start_file");
        zip.write_all(data).expect("write member");
    }
    zip.finish().expect("finish");
}

fn member_modes(path: &Path) -> Vec<(String, u32)> {
    let mut zip = ZipArchive::new(fs::File::open(path).expect("open")).expect("zip");
    (0..zip.len())
        .map(|i| {
            let entry = zip.by_index(i).expect("entry");
            (entry.name().to_string(), entry.unix_mode().expect("unix mode") & 0o777)
        })
        .collect()
}

#[test]
fn non_default_modes_survive_empty_staging_byte_for_byte() {
    let (_dir, archive, staging) = setup();
    write_archive_with_modes(
        &archive,
        &[
            ("a.pyc", b"one", CompressionMethod::Stored, 0o600),
            ("b.pyc", &[3u8; 256], CompressionMethod::Deflated, 0o755),
        ],
    );
    let before = fs::read(&archive).expect("read before");

    reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");

    assert_eq!(fs::read(&archive).expect("read after"), before);
}

#[test]
fn modes_are_kept_for_changed_and_untouched_members() {
    let (_dir, archive, staging) = setup();
    write_archive_with_modes(
        &archive,
        &[
            ("a.pyc", b"old-a", CompressionMethod::Stored, 0o600),
            ("b.pyc", b"old-b", CompressionMethod::Stored, 0o640),
        ],
    );
    fs::write(staging.join("a.py"), b"fresh-a").expect("stage a.py");

    reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");

    assert_eq!(
        member_modes(&archive),
        vec![("a.pyc".to_string(), 0o600), ("b.pyc".to_string(), 0o640)]
    );
    assert_eq!(
        read_archive(&archive),
        vec![
            ("a.pyc".to_string(), b"compiled:fresh-a".to_vec()),
            ("b.pyc".to_string(), b"old-b".to_vec()),
        ]
    );
}

// ---------------------------------------------------------------------------
// 3. Fresh content wins over archived content
// ---------------------------------------------------------------------------

#[test]
fn fresh_file_with_member_name_is_not_overwritten_by_extraction() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("data.txt", b"stale"), ("b.pyc", b"old-b")]);
    fs::write(staging.join("data.txt"), b"fresh").expect("stage");

    let report = reconcile(&archive, &staging, &FakeCompiler).expect("reconcile");

    assert_eq!(report.kept_fresh, vec!["data.txt"]);
    assert_eq!(report.extracted, vec!["b.pyc"]);
    assert_eq!(fs::read(staging.join("data.txt")).expect("read"), b"fresh");
    assert_eq!(
        read_archive(&archive)[0],
        ("data.txt".to_string(), b"fresh".to_vec())
    );
}

// ---------------------------------------------------------------------------
// 4. Failures
// ---------------------------------------------------------------------------

#[test]
fn missing_member_fails_and_keeps_original_archive() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("a.pyc", b"a"), ("gone.pyc", b"g")]);
    let before = fs::read(&archive).expect("read");

    let manifest = {
        let mut source = SourceArchive::open(&archive).expect("open");
        source.manifest().expect("manifest")
    };
    fs::write(staging.join("a.pyc"), b"a").expect("stage only a.pyc");

    let err = manifest.rebuild(&archive, &staging).unwrap_err();
    match &err {
        ReconcileError::MissingMember { name, path } => {
            assert_eq!(name, "gone.pyc");
            assert!(path.ends_with("gone.pyc"));
        }
        other => panic!("expected MissingMember, got: {other}"),
    }
    assert!(err.is_not_found());
    assert_eq!(fs::read(&archive).expect("read"), before, "original left intact");
    assert!(
        !archive.with_file_name("library.zip.packarmor.tmp").exists(),
        "temporary archive cleaned up"
    );
}

#[test]
fn invalid_archive_is_a_zip_error() {
    let (_dir, archive, staging) = setup();
    fs::write(&archive, b"PK but not really").expect("write");

    let err = reconcile(&archive, &staging, &FakeCompiler).unwrap_err();
    assert!(matches!(err, ReconcileError::Zip { .. }), "got: {err}");
}

#[test]
fn compiler_failure_is_reported_and_archive_untouched() {
    let (_dir, archive, staging) = setup();
    write_archive(&archive, &[("a.pyc", b"a")]);
    fs::write(staging.join("a.py"), b"def (:").expect("stage");
    let before = fs::read(&archive).expect("read");

    let err = reconcile(&archive, &staging, &FailingCompiler).unwrap_err();
    assert!(matches!(err, ReconcileError::Compile { .. }), "got: {err}");
    assert_eq!(fs::read(&archive).expect("read"), before);
}

#[test]
fn path_traversal_member_is_rejected() {
    let (dir, archive, staging) = setup();
    write_archive(&archive, &[("../escape.pyc", b"evil")]);

    let err = reconcile(&archive, &staging, &FakeCompiler).unwrap_err();
    assert!(matches!(err, ReconcileError::UnsafeMemberName { .. }), "got: {err}");
    assert!(!dir.path().join("escape.pyc").exists());
}
