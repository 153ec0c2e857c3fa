//! Process configuration read from the environment.
//!
//! Loading never fails because the master secret is missing: that is
//! detected the first time a value is sealed or opened.

use std::ffi::OsString;
use std::fmt;

use serde::Deserialize;

use crate::error::{CredsealError, ErrorCategory, ErrorKind, Result};

/// Prefix of every environment variable read by [`Settings`].
pub const ENV_PREFIX: &str = "CREDSEAL";

/// Full name of the variable carrying the master secret.
pub const MASTER_SECRET_VAR: &str = "CREDSEAL_MASTER_SECRET";

#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Master secret all stored credentials are sealed under.
    #[serde(default)]
    pub master_secret: Option<String>,

    /// Default tracing filter for the command-line tool.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "warn".into()
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Variables outside the `CREDSEAL_` namespace are never decoded, so a
    /// non-Unicode entry elsewhere in the environment is harmless.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(prefixed_vars(std::env::vars_os())?)
    }

    /// Read settings from an explicit variable map instead of the process
    /// environment. Keys carry the full `CREDSEAL_` name.
    pub fn from_vars(vars: config::Map<String, String>) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
            .build()
            .map_err(config_error)?;

        cfg.try_deserialize().map_err(config_error)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field(
                "master_secret",
                &self.master_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("log_level", &self.log_level)
            .finish()
    }
}

/// Keep the `CREDSEAL_` entries of `vars` that are valid Unicode.
///
/// A non-Unicode master secret is an error rather than silently absent;
/// other non-Unicode entries in the namespace are dropped.
fn prefixed_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> Result<config::Map<String, String>> {
    let prefix = format!("{}_", ENV_PREFIX);
    let mut map = config::Map::new();
    for (key, value) in vars {
        let Some(key) = key.to_str() else {
            continue;
        };
        if !key.to_ascii_uppercase().starts_with(&prefix) {
            continue;
        }
        match value.into_string() {
            Ok(value) => {
                map.insert(key.to_string(), value);
            }
            Err(_) if key.eq_ignore_ascii_case(MASTER_SECRET_VAR) => {
                return Err(CredsealError::configuration(format!(
                    "{} is not valid Unicode",
                    MASTER_SECRET_VAR
                )));
            }
            Err(_) => continue,
        }
    }
    Ok(map)
}

fn config_error(err: config::ConfigError) -> CredsealError {
    CredsealError::with_source(
        ErrorCategory::User,
        ErrorKind::Configuration,
        "failed to read configuration from environment",
        err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> config::Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_vars(vars(&[])).unwrap();
        assert!(settings.master_secret.is_none());
        assert_eq!(settings.log_level, "warn");
    }

    #[test]
    fn test_reads_prefixed_vars() {
        let settings = Settings::from_vars(vars(&[
            (MASTER_SECRET_VAR, "s3cr3t"),
            ("CREDSEAL_LOG_LEVEL", "debug"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();
        assert_eq!(settings.master_secret.as_deref(), Some("s3cr3t"));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = Settings::from_vars(vars(&[(MASTER_SECRET_VAR, "s3cr3t")])).unwrap();
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn test_prefixed_vars_filters_namespace() {
        let map = prefixed_vars([
            (OsString::from(MASTER_SECRET_VAR), OsString::from("s3cr3t")),
            (OsString::from("PATH"), OsString::from("/usr/bin")),
            (OsString::from("CREDSEALED"), OsString::from("nope")),
        ])
        .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(MASTER_SECRET_VAR).map(String::as_str), Some("s3cr3t"));
    }

    #[cfg(unix)]
    #[test]
    fn test_prefixed_vars_non_unicode() {
        use std::os::unix::ffi::OsStringExt;

        let bad = || OsString::from_vec(vec![0xff, 0xfe]);

        // Unrelated variables and keys are skipped whatever they hold.
        let map = prefixed_vars([
            (OsString::from("UNRELATED_VAR"), bad()),
            (bad(), OsString::from("value")),
            (OsString::from("CREDSEAL_LOG_LEVEL"), bad()),
            (OsString::from(MASTER_SECRET_VAR), OsString::from("s3cr3t")),
        ])
        .unwrap();
        let settings = Settings::from_vars(map).unwrap();
        assert_eq!(settings.master_secret.as_deref(), Some("s3cr3t"));
        assert_eq!(settings.log_level, "warn");

        let err = prefixed_vars([(OsString::from(MASTER_SECRET_VAR), bad())]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message().contains(MASTER_SECRET_VAR));
    }
}
