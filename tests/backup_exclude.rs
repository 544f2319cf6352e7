mod common;

use adxlink::{Config, Container, LinkError, LinkKind, OpenMode, backup};
use sha2::{Digest, Sha256};
use std::fs;
use tempfile::tempdir;

#[test]
fn excluding_obs_keeps_obs2() {
    let td = tempdir().unwrap();
    let src = common::annotated_in(td.path(), "src.adx");
    {
        let c = Container::open(&src, OpenMode::ReadWrite).unwrap();
        c.create_group("obs2").unwrap();
        c.write_array("obs2/n_counts", &[3i64; 20], &[20]).unwrap();
        c.close().unwrap();
    }
    let dst = td.path().join("out").join("dst.adx");

    let written = backup(&Config::default(), &src, &dst, &["obs"], false).unwrap();
    assert_eq!(written, dst);

    let c = common::open_ro(&dst);
    assert_eq!(c.kind_of("obs"), None);
    assert_eq!(c.kind_of("obs2"), Some(LinkKind::Group));
    assert_eq!(c.read_array::<i64>("obs2/n_counts").unwrap(), vec![3; 20]);
    assert_eq!(c.shape("obsm/pca").unwrap(), vec![19, 80]);
    assert_eq!(c.read_attributes("obsm/pca").unwrap().len(), 1);
    assert_eq!(c.read_attributes("/").unwrap().len(), 1);
}

#[test]
fn nested_exclusions_drop_only_their_subtree() {
    let td = tempdir().unwrap();
    let src = common::annotated_in(td.path(), "src.adx");
    let dst = td.path().join("dst.adx");

    backup(&Config::default(), &src, &dst, &["/obsm/pca", "var/_index", "X"], false).unwrap();
    let c = common::open_ro(&dst);
    assert_eq!(c.kind_of("obsm"), Some(LinkKind::Group));
    assert_eq!(c.kind_of("obsm/pca"), None);
    assert_eq!(c.kind_of("obsm/tsne"), Some(LinkKind::Dataset));
    assert_eq!(c.kind_of("var"), Some(LinkKind::Group));
    assert_eq!(c.kind_of("var/_index"), None);
    assert_eq!(c.kind_of("X"), None);
}

#[test]
fn no_exclusions_is_a_byte_copy() {
    let td = tempdir().unwrap();
    let src = common::annotated_in(td.path(), "src.adx");
    let dst = td.path().join("dst.adx");

    backup::<&str>(&Config::default(), &src, &dst, &[], false).unwrap();
    assert_eq!(
        Sha256::digest(fs::read(&src).unwrap()),
        Sha256::digest(fs::read(&dst).unwrap())
    );
}

#[test]
fn excluding_the_root_leaves_an_empty_container() {
    let td = tempdir().unwrap();
    let src = common::annotated_in(td.path(), "src.adx");
    let dst = td.path().join("dst.adx");

    backup(&Config::default(), &src, &dst, &["/"], false).unwrap();
    let c = common::open_ro(&dst);
    assert!(c.child_kinds("/").unwrap().is_empty());
    assert!(c.read_attributes("/").unwrap().is_empty());
}

#[test]
fn file_level_preconditions() {
    let td = tempdir().unwrap();
    let cfg = Config::default();
    let src = common::annotated_in(td.path(), "src.adx");
    let other = common::annotated_in(td.path(), "other.adx");

    assert!(matches!(
        backup(&cfg, &td.path().join("missing.adx"), &td.path().join("x.adx"), &["obs"], false),
        Err(LinkError::FileNotFound(_))
    ));
    assert!(matches!(
        backup(&cfg, &src, &src, &["obs"], true),
        Err(LinkError::SameFile(_))
    ));
    assert!(matches!(
        backup(&cfg, &src, &other, &["obs"], false),
        Err(LinkError::FileExists(_))
    ));

    backup(&cfg, &src, &other, &["obs"], true).unwrap();
    assert_eq!(common::open_ro(&other).kind_of("obs"), None);
    assert_eq!(common::open_ro(&src).kind_of("obs"), Some(LinkKind::Group));
}

#[test]
fn no_staging_files_are_left_behind() {
    let td = tempdir().unwrap();
    let src = common::annotated_in(td.path(), "src.adx");
    backup(&Config::default(), &src, &td.path().join("dst.adx"), &["obsm"], false).unwrap();

    let mut names: Vec<String> = fs::read_dir(td.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["dst.adx", "src.adx"]);
}
