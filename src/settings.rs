use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::Result;
use crate::segmenter::SegmentParams;

/// Config file picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "raidlogger.toml";
/// Prefix of environment overrides, e.g. `RAIDLOGGER_THREAT__GAP_SECONDS=45`
pub const ENV_PREFIX: &str = "RAIDLOGGER_";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Guilds whose members make up the permitted player set
    #[serde(default = "default_target_guilds")]
    pub target_guilds: Vec<String>,
    #[serde(default)]
    pub threat: SegmentParams,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_level: default_log_level(),
            target_guilds: default_target_guilds(),
            threat: SegmentParams::default(),
        }
    }
}

impl Settings {
    /// Defaults, then the TOML file, then `RAIDLOGGER_*` variables.
    ///
    /// An explicit `config` path must exist; the default file is optional.
    pub fn load(config: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));

        match config {
            Some(path) => {
                if !path.exists() {
                    return Err(crate::Error::MissingInput(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        Ok(figment.extract()?)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_target_guilds() -> Vec<String> {
    vec!["Dark Sun".to_string(), "Knights Hospitaller".to_string()]
}

/// Install the stderr `fmt` subscriber; `RUST_LOG` wins over `log_level`
pub fn init_logging(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.target_guilds, vec!["Dark Sun", "Knights Hospitaller"]);
        assert_eq!(settings.threat, SegmentParams::default());
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raidlogger.toml");
        std::fs::write(
            &path,
            "target_guilds = [\"Nightfall\"]\n\n[threat]\ngap_seconds = 45.0\nmin_duration = 10.0\nmin_snapshots = 5\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.target_guilds, vec!["Nightfall"]);
        assert_eq!(settings.threat.gap_seconds, 45.0);
        assert_eq!(settings.threat.min_snapshots, 5);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/raidlogger.toml"))).unwrap_err();
        assert!(matches!(err, crate::Error::MissingInput(_)));
    }
}
