//! End-to-end tests for the role lifecycle: `init`, `dist`, `clean`,
//! `package` and `show`.
//!
//! These tests invoke the actual CLI binary on a temporary role directory
//! and validate the files it leaves behind.

mod common;
use common::prelude::*;

use std::fs::{self, File};

use flate2::read::GzDecoder;

#[test]
fn test_init_creates_skeleton_and_manifest() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("[INIT] Initialized role"));

    for dir in ["defaults", "files", "handlers", "meta", "tasks", "templates", "vars"] {
        fixture.child(dir).assert(predicate::path::is_dir());
    }
    fixture
        .child("defaults/main.yml")
        .assert(predicate::path::is_file());
    fixture
        .child("handlers/main.yml")
        .assert(predicate::path::is_file());

    let manifest = fixture.child("meta/main.yml");
    manifest.assert(predicate::str::contains("version: 0.0.1"));
    manifest.assert(predicate::str::contains("license: MIT"));
    manifest.assert(predicate::str::contains("include_when: {}"));
}

#[test]
fn test_init_twice_fails_unless_forced() {
    let fixture = TestFixture::new();
    fixture.command().arg("init").assert().success();

    fixture
        .command()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    fixture
        .command()
        .args(["--force", "init"])
        .assert()
        .success();
}

#[test]
fn test_init_dist_clean_package() {
    let fixture = TestFixture::new();

    fixture
        .command()
        .args(["-W", "manifest", "init", "dist"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[GEN] Generated README.md"))
        .stdout(predicate::str::contains("[GEN] Generated tasks/main.yml"));

    let readme = fixture.child("README.md");
    readme.assert(predicate::str::starts_with(
        "<!-- THIS IS A GENERATED FILE, DO NOT EDIT -->",
    ));
    readme.assert(predicate::str::contains("# foo"));
    fixture
        .child("tasks/main.yml")
        .assert(predicate::path::is_file());

    fixture
        .command()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("[RM] Removed README.md"));
    fixture.child("README.md").assert(predicate::path::missing());
    fixture
        .child("tasks/main.yml")
        .assert(predicate::path::missing());
    fixture
        .child("meta/main.yml")
        .assert(predicate::path::is_file());

    fixture
        .command()
        .args(["-W", "manifest", "package"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[PKG] Packaged dist/foo-0.0.1.tgz"));

    let archive = fixture.child("dist/foo-0.0.1.tgz");
    archive.assert(predicate::path::is_file());

    let mut tar = tar::Archive::new(GzDecoder::new(File::open(archive.path()).unwrap()));
    let names: Vec<String> = tar
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names.contains(&"foo/meta/main.yml".to_string()));
    assert!(names.contains(&"foo/README.md".to_string()));
    assert!(names.contains(&"foo/tasks/main.yml".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("foo/dist")));
}

#[test]
fn test_distclean_alias() {
    let fixture = TestFixture::new().with_manifest(manifests::COMPLETE);
    fixture.command().arg("dist").assert().success();
    fixture.command().arg("distclean").assert().success();
    fixture.child("README.md").assert(predicate::path::missing());
}

#[test]
fn test_dist_is_idempotent() {
    let fixture = TestFixture::new()
        .with_manifest(manifests::COMPLETE)
        .with_file("defaults/main.yml", "foo_port: 80\n")
        .with_file("tasks/install.yml", "- name: install foo\n  apt: {name: foo}\n");

    fixture.command().arg("dist").assert().success();
    let readme = fs::read(fixture.child("README.md").path()).unwrap();
    let tasks = fs::read(fixture.child("tasks/main.yml").path()).unwrap();

    fixture.command().args(["clean", "dist"]).assert().success();
    assert_eq!(fs::read(fixture.child("README.md").path()).unwrap(), readme);
    assert_eq!(fs::read(fixture.child("tasks/main.yml").path()).unwrap(), tasks);

    let tasks = String::from_utf8(tasks).unwrap();
    assert!(tasks.contains("assert the target platform is supported"));
    assert!(tasks.contains("include: install.yml"));
}

#[test]
fn test_legacy_maintask_survives() {
    let legacy = "- name: install foo\n  apt: {name: foo}\n";
    let fixture = TestFixture::new()
        .with_manifest("version: 0.0.1\n")
        .with_file("tasks/main.yml", legacy);

    fixture.command().args(["dist", "clean"]).assert().success();

    let tasks = fixture.child("tasks/main.yml");
    tasks.assert(predicate::str::contains("name: install foo"));
    tasks.assert(predicate::str::contains("apt:"));
}

#[test]
fn test_malformed_maintask_kept_and_progress_reported() {
    let malformed = "- name: [unclosed\n";
    let fixture = TestFixture::new()
        .with_manifest("version: 0.0.1\n")
        .with_file("tasks/main.yml", malformed);
    filetime::set_file_mtime(
        fixture.child("tasks/main.yml").path(),
        filetime::FileTime::from_unix_time(1_000, 0),
    )
    .unwrap();

    fixture
        .command()
        .arg("dist")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[GEN] Generated README.md"))
        .stderr(predicate::str::contains("tasks/main.yml"));

    fixture
        .command()
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("[SKIP] Kept tasks/main.yml"));
    fixture
        .child("tasks/main.yml")
        .assert(predicate::str::diff(malformed));
}

#[test]
fn test_excluded_readme_left_alone() {
    let fixture = TestFixture::new()
        .with_manifest(manifests::COMPLETE)
        .with_file("README.md", "my own readme\n");

    fixture
        .command()
        .args(["-x", ".*,README.md", "dist", "clean"])
        .assert()
        .success();

    fixture
        .child("README.md")
        .assert(predicate::str::diff("my own readme\n"));
}

#[test]
fn test_show_prints_role() {
    let fixture = TestFixture::new()
        .with_manifest(manifests::COMPLETE)
        .with_file("defaults/main.yml", "foo_port: 80\n");

    fixture
        .command()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("name: foo"))
        .stdout(predicate::str::contains("version: 1.0.0"))
        .stdout(predicate::str::contains("author: jdoe"))
        .stdout(predicate::str::contains("prefix: foo_"))
        .stdout(predicate::str::contains("  - EL (7)"))
        .stdout(predicate::str::contains("  - foo_port = 80: listening port"));
}

#[test]
fn test_dist_without_manifest_fails() {
    let fixture = TestFixture::new();
    fixture
        .command()
        .arg("dist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Manifest not found"));
}

#[test]
fn test_variable_set_twice_fails() {
    let fixture = TestFixture::new()
        .with_manifest(manifests::COMPLETE)
        .with_file("defaults/main.yml", "foo_port: 80\n")
        .with_file("vars/main.yml", "foo_port: 8080\n");

    fixture
        .command()
        .arg("dist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("set twice"));
}
