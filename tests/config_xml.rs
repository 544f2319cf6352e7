use adxlink::config::{CONFIG_ENV, config_path, create_template_config, load_config, load_config_from_xml_path};
use adxlink::{Config, LogLevel, default_log_path};
use assert_fs::prelude::*;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

struct EnvGuard;

impl EnvGuard {
    fn set(value: &std::path::Path) -> Self {
        unsafe {
            std::env::set_var(CONFIG_ENV, value);
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            std::env::remove_var(CONFIG_ENV);
        }
    }
}

#[test]
#[serial]
fn explicit_config_is_loaded() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("custom.xml");
    fs::write(
        &cfg_path,
        "<config>\n  <log_level>info</log_level>\n  <log_file>  /tmp/adxlink-test.log  </log_file>\n  <open_timeout_seconds>4</open_timeout_seconds>\n  <open_interval_seconds>0.5</open_interval_seconds>\n</config>\n",
    )
    .unwrap();
    let _env = EnvGuard::set(&cfg_path);

    assert_eq!(config_path().unwrap(), cfg_path);
    let (path, cfg) = load_config().unwrap().expect("config should load");
    assert_eq!(path, cfg_path);
    assert_eq!(cfg.log_level, LogLevel::Info);
    assert_eq!(cfg.log_file.as_deref(), Some(std::path::Path::new("/tmp/adxlink-test.log")));
    assert!(cfg.retry_enabled());
    assert_eq!(cfg.open_timeout_secs, 4.0);
}

#[test]
#[serial]
fn explicit_config_that_is_missing_is_an_error() {
    let td = tempdir().unwrap();
    let _env = EnvGuard::set(&td.path().join("nowhere.xml"));
    let err = load_config().unwrap_err();
    assert!(err.to_string().contains(CONFIG_ENV), "got {err}");
}

#[test]
fn empty_elements_keep_defaults() {
    let td = tempdir().unwrap();
    let p = td.path().join("c.xml");
    fs::write(
        &p,
        "<config><log_file>   </log_file><open_timeout_seconds></open_timeout_seconds></config>",
    )
    .unwrap();
    assert_eq!(load_config_from_xml_path(&p).unwrap(), Config::default());
}

#[test]
fn unknown_or_invalid_values_are_rejected() {
    let td = tempdir().unwrap();
    let p = td.path().join("c.xml");

    fs::write(&p, "<config><download_base>/tmp</download_base></config>").unwrap();
    assert!(load_config_from_xml_path(&p).is_err());

    fs::write(&p, "<config><log_level>loud</log_level></config>").unwrap();
    assert!(load_config_from_xml_path(&p).is_err());

    fs::write(&p, "<config><open_interval_seconds>soon</open_interval_seconds></config>").unwrap();
    assert!(load_config_from_xml_path(&p).is_err());

    fs::write(&p, "<config><log_level>debug</log_level>").unwrap();
    assert!(load_config_from_xml_path(&p).is_err());
}

#[test]
fn template_is_written_once_and_parses_to_defaults() {
    let td = assert_fs::TempDir::new().unwrap();
    let child = td.child("nested").child("config.xml");
    let p = child.path();
    create_template_config(p).unwrap();
    assert!(fs::read_to_string(p).unwrap().contains("<open_timeout_seconds>0</open_timeout_seconds>"));
    assert_eq!(load_config_from_xml_path(p).unwrap(), Config::default());
    assert!(create_template_config(p).is_err());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}

#[test]
fn validation_rejects_directory_log_file() {
    let td = tempdir().unwrap();
    let mut cfg = Config {
        log_file: Some(td.path().to_path_buf()),
        ..Config::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn default_log_path_is_under_adxlink() {
    if let Some(p) = default_log_path() {
        assert_eq!(p.file_name().unwrap(), "adxlink.log");
        assert_eq!(p.parent().unwrap().file_name().unwrap(), "adxlink");
    }
}
