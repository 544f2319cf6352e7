#![allow(dead_code)]

use adxlink::{Container, OpenMode};
use std::path::{Path, PathBuf};

/// Build the annotated-matrix layout most tests start from:
///
/// ```text
/// /X            dataset [20, 80]
/// /obs          group    (_index [20])
/// /obsm         group
/// /obsm/pca     dataset [19, 80]
/// /obsm/tsne    dataset [19, 2]
/// /var          group    (_index [80])
/// ```
pub fn annotated(path: &Path) {
    let c = Container::open(path, OpenMode::Exclusive).unwrap();
    c.write_array("X", &vec![0.5f32; 20 * 80], &[20, 80]).unwrap();
    c.write_attribute("X", "encoding-type", "array").unwrap();

    c.create_group("obs").unwrap();
    let cells: Vec<String> = (0..20).map(|i| format!("cell{i}")).collect();
    c.write_strings("obs/_index", &cells).unwrap();
    c.write_attribute("obs", "_index", "_index").unwrap();

    c.create_group("obsm").unwrap();
    c.write_array("obsm/pca", &vec![1.0f64; 19 * 80], &[19, 80]).unwrap();
    c.write_attribute("obsm/pca", "method", "svd").unwrap();
    c.write_array("obsm/tsne", &vec![2.0f64; 19 * 2], &[19, 2]).unwrap();

    c.create_group("var").unwrap();
    let genes: Vec<String> = (0..80).map(|i| format!("gene{i}")).collect();
    c.write_strings("var/_index", &genes).unwrap();
    c.write_attribute("/", "encoding-version", "0.1.0").unwrap();
    c.close().unwrap();
}

/// Create the layout at `dir/name` and return its path.
pub fn annotated_in(dir: &Path, name: &str) -> PathBuf {
    let p = dir.join(name);
    annotated(&p);
    p
}

pub fn open_ro(path: &Path) -> Container {
    Container::open(path, OpenMode::ReadOnly).unwrap()
}
