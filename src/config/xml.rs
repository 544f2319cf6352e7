//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - Writes a commented template on request.
//!
//! Unknown XML fields are rejected to surface misconfigurations early.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::paths::{CONFIG_ENV, config_path, default_log_path, path_has_symlink_ancestor};
use crate::config::types::{Config, LogLevel};
use crate::platform::write_config_secure_new_0600;

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    #[serde(rename = "log_level")]
    log_level: Option<String>,
    #[serde(rename = "log_file")]
    log_file: Option<String>,
    #[serde(rename = "open_timeout_seconds", default, deserialize_with = "de_f64_trimmed_opt")]
    open_timeout_seconds: Option<f64>,
    #[serde(rename = "open_interval_seconds", default, deserialize_with = "de_f64_trimmed_opt")]
    open_interval_seconds: Option<f64>,
}

// Optional float with surrounding whitespace trimmed; blank means unset.
fn de_f64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid number '{s}': {e}"))),
    }
}

fn xml_to_config(parsed: XmlConfig) -> Result<Config> {
    let mut cfg = Config::default();
    if let Some(s) = parsed.log_level.as_deref() {
        cfg.log_level = s.trim().parse::<LogLevel>().map_err(|e| anyhow!(e))?;
    }
    if let Some(s) = parsed.log_file.as_deref() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            cfg.log_file = Some(PathBuf::from(trimmed));
        }
    }
    if let Some(t) = parsed.open_timeout_seconds {
        cfg.open_timeout_secs = t;
    }
    if let Some(i) = parsed.open_interval_seconds {
        cfg.open_interval_secs = i;
    }
    Ok(cfg)
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    xml_to_config(parsed).with_context(|| format!("invalid value in config xml '{}'", path.display()))
}

/// Load the config file named by `$ADXLINK_CONFIG`, else the default location.
///
/// Returns `Ok(None)` when the default file does not exist; an explicitly named file
/// that is missing is an error.
pub fn load_config() -> Result<Option<(PathBuf, Config)>> {
    let explicit = std::env::var_os(CONFIG_ENV).is_some_and(|v| !v.is_empty());
    let Some(path) = config_path() else {
        debug!("no config directory available; using defaults");
        return Ok(None);
    };
    if !path.exists() {
        if explicit {
            bail!("{CONFIG_ENV} points at '{}', which does not exist", path.display());
        }
        debug!(path = %path.display(), "no config file; using defaults");
        return Ok(None);
    }
    let cfg = load_config_from_xml_path(&path)?;
    debug!(path = %path.display(), "loaded config");
    Ok(Some((path, cfg)))
}

/// Create a commented template config file with owner-only permissions.
/// Refuses to write through a symlinked ancestor or over an existing file.
pub fn create_template_config(path: &Path) -> Result<()> {
    if path_has_symlink_ancestor(path)? {
        bail!(
            "Refusing to create config: ancestor of {} is a symlink",
            path.display()
        );
    }

    let suggested_log = default_log_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "/path/to/adxlink.log".into());

    let content = format!(
        "<!--\n  adxlink configuration (XML)\n\n  log_level              -> quiet | normal | info | debug\n  log_file               -> path to a log file (optional; stderr is always used)\n  open_timeout_seconds   -> keep retrying a busy container this long (0 = no retry)\n  open_interval_seconds  -> pause between open attempts (0 = no retry)\n\n  CLI flags override XML values.\n-->\n<config>\n  <log_level>normal</log_level>\n  <!-- <log_file>{suggested_log}</log_file> -->\n  <open_timeout_seconds>0</open_timeout_seconds>\n  <open_interval_seconds>0</open_interval_seconds>\n</config>\n"
    );

    write_config_secure_new_0600(path, content.as_bytes())?;
    info!(path = %path.display(), "created template config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_round_trips() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("adxlink").join("config.xml");
        create_template_config(&p).unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(create_template_config(&p).is_err());
    }

    #[test]
    fn reads_trimmed_values() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("config.xml");
        fs::write(
            &p,
            "<config>\n  <log_level> Debug </log_level>\n  <open_timeout_seconds> 2.5 </open_timeout_seconds>\n  <open_interval_seconds>0.25</open_interval_seconds>\n</config>",
        )
        .unwrap();
        let cfg = load_config_from_xml_path(&p).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.open_timeout_secs, 2.5);
        assert_eq!(cfg.open_interval_secs, 0.25);
        assert!(cfg.log_file.is_none());
    }
}
