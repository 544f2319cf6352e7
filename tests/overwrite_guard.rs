mod common;

use adxlink::{Config, Container, LinkError, LinkKind, OpenMode, overwrite};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn digest(p: &Path) -> Vec<u8> {
    Sha256::digest(fs::read(p).unwrap()).to_vec()
}

#[test]
fn absent_link_leaves_the_file_byte_identical() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");
    let before = digest(&p);

    assert_eq!(overwrite(&Config::default(), &p, "layers/counts", true).unwrap(), p);
    assert_eq!(digest(&p), before);
}

#[test]
fn missing_file_is_created_empty() {
    let td = tempdir().unwrap();
    let p = td.path().join("new.adx");

    overwrite(&Config::default(), &p, "X", false).unwrap();
    let c = Container::open(&p, OpenMode::ReadOnly).unwrap();
    assert!(c.child_kinds("/").unwrap().is_empty());
}

#[test]
fn present_link_needs_must_overwrite() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");
    let before = digest(&p);

    assert!(matches!(
        overwrite(&Config::default(), &p, "obsm", false),
        Err(LinkError::AlreadyExists { .. })
    ));
    assert!(matches!(
        overwrite(&Config::default(), &p, "/", false),
        Err(LinkError::AlreadyExists { .. })
    ));
    assert_eq!(digest(&p), before);
}

#[test]
fn removes_exactly_one_subtree() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");

    overwrite(&Config::default(), &p, "obsm", true).unwrap();
    let c = common::open_ro(&p);
    assert_eq!(c.kind_of("obsm"), None);
    assert_eq!(c.kind_of("obsm/pca"), None);
    assert_eq!(c.kind_of("obs/_index"), Some(LinkKind::Dataset));
    assert_eq!(c.shape("X").unwrap(), vec![20, 80]);
    assert_eq!(c.read_attributes("/").unwrap().len(), 1);

    let names: Vec<_> = fs::read_dir(td.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.adx"]);
}

#[test]
fn root_truncates_the_container() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");

    overwrite(&Config::default(), &p, "", true).unwrap();
    let c = common::open_ro(&p);
    assert!(c.child_kinds("/").unwrap().is_empty());
    assert!(c.read_attributes("/").unwrap().is_empty());
}

#[cfg(unix)]
#[test]
fn rebuild_keeps_private_permissions() {
    use std::os::unix::fs::PermissionsExt;
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");
    fs::set_permissions(&p, fs::Permissions::from_mode(0o600)).unwrap();

    overwrite(&Config::default(), &p, "obsm", true).unwrap();

    let mode = fs::metadata(&p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600, "mode after overwrite: {mode:o}");
    assert_eq!(common::open_ro(&p).kind_of("obsm"), None);
}

#[cfg(unix)]
#[test]
fn symlinked_container_is_rebuilt_in_place() {
    let td = tempdir().unwrap();
    let real = common::annotated_in(td.path(), "real.adx");
    let link = td.path().join("link.adx");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    overwrite(&Config::default(), &link, "obsm", true).unwrap();

    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(common::open_ro(&real).kind_of("obsm"), None);
    assert_eq!(common::open_ro(&real).kind_of("obs"), Some(LinkKind::Group));
    let names: Vec<_> = fs::read_dir(td.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2, "stray files left: {names:?}");
}
