//! Default operator options, layered from several sources.
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::LazyLock;

#[cfg(not(target_arch = "wasm32"))]
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
#[cfg(not(target_arch = "wasm32"))]
use directories::ProjectDirs;
use eyre::Result;
#[cfg(not(target_arch = "wasm32"))]
use eyre::WrapErr;
use serde::de;
use serde::{Deserialize, Deserializer};

use crate::integrate::{IntegrateOptions, IntegrationMethod, RectStep, Sign};
use crate::window::WindowPolicy;

const DEFAULT_CONFIG: &str = include_str!("../../default_config.toml");

#[cfg(not(target_arch = "wasm32"))]
pub static PROJECT_DIR: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("org", "stepwise", "stepwise"));
#[cfg(not(target_arch = "wasm32"))]
const CONFIG_FILE: &str = "config.toml";
pub const LOCAL_DIR: &str = ".stepwise";
#[cfg(not(target_arch = "wasm32"))]
const ENV_PREFIX: &str = "STEPWISE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisConfig {
    pub window: WindowConfig,
    pub integrate: IntegrateConfig,
    #[serde(default)]
    pub align: AlignConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WindowConfig {
    #[serde(deserialize_with = "deserialize_from_str")]
    pub policy: WindowPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntegrateConfig {
    #[serde(deserialize_with = "deserialize_from_str")]
    pub method: IntegrationMethod,
    #[serde(deserialize_with = "deserialize_from_str")]
    pub rect_step: RectStep,
    /// Only integrate one side of zero. Both sides when absent.
    #[serde(default, deserialize_with = "deserialize_sign")]
    pub sign: Option<Sign>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AlignConfig {
    /// Largest shift, in time units, the aligner may apply.
    pub max_shift: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directives used when `RUST_LOG` is not set.
    pub filter: String,
}

impl AnalysisConfig {
    #[cfg(target_arch = "wasm32")]
    pub fn new(_force_default_config: bool) -> Result<Self> {
        Self::new_from_toml(DEFAULT_CONFIG)
    }

    /// Load the configuration. Unless `force_default_config` is set, the embedded
    /// defaults are overridden by the user config file, then by every local
    /// `.stepwise/config.toml` from the outermost directory inwards, then by the
    /// environment.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn new(force_default_config: bool) -> Result<Self> {
        let config = default_sources();
        let config = if force_default_config {
            config
        } else {
            let config = match &*PROJECT_DIR {
                Some(proj_dirs) => config.add_source(
                    File::from(proj_dirs.config_dir().join(CONFIG_FILE)).required(false),
                ),
                None => config,
            };
            add_local_configs(config, find_local_configs()).add_source(environment())
        };
        finish(config)
    }

    pub fn new_from_toml(config: &str) -> Result<Self> {
        Ok(toml::from_str(config)?)
    }

    /// The integration options to pass to [`crate::integrate::integrate`] and
    /// [`crate::mean::mean`].
    #[must_use]
    pub fn integrate_options(&self) -> IntegrateOptions {
        IntegrateOptions {
            sign: self.integrate.sign,
            method: self.integrate.method,
            rect_step: self.integrate.rect_step,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig {
                policy: WindowPolicy::default(),
            },
            integrate: IntegrateConfig {
                method: IntegrationMethod::default(),
                rect_step: RectStep::default(),
                sign: None,
            },
            align: AlignConfig::default(),
            log: LogConfig {
                filter: "info".to_string(),
            },
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_sources() -> ConfigBuilder<DefaultState> {
    Config::builder().add_source(File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
}

/// `STEPWISE_<SECTION>__<KEY>` variables, e.g. `STEPWISE_INTEGRATE__SIGN=-`.
#[cfg(not(target_arch = "wasm32"))]
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Layer the `config.toml` of every directory in `dirs`, later ones taking precedence.
#[cfg(not(target_arch = "wasm32"))]
fn add_local_configs(
    config: ConfigBuilder<DefaultState>,
    dirs: impl IntoIterator<Item = PathBuf>,
) -> ConfigBuilder<DefaultState> {
    dirs.into_iter().fold(config, |c, p| {
        c.add_source(File::from(p.join(CONFIG_FILE)).required(false))
    })
}

#[cfg(not(target_arch = "wasm32"))]
fn finish(config: ConfigBuilder<DefaultState>) -> Result<AnalysisConfig> {
    config
        .build()
        .wrap_err("Failed to read config")?
        .try_deserialize()
        .wrap_err("Failed to parse config")
}

fn deserialize_from_str<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let buf = String::deserialize(deserializer)?;
    buf.parse().map_err(de::Error::custom)
}

fn deserialize_sign<'de, D>(deserializer: D) -> Result<Option<Sign>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_from_str(deserializer).map(Some)
}

/// Every `item` found in `start` or one of its ancestors, stopping at `end`,
/// innermost first.
pub fn search_upward(
    start: impl AsRef<Path>,
    end: impl AsRef<Path>,
    item: impl AsRef<Path>,
) -> Vec<PathBuf> {
    start
        .as_ref()
        .ancestors()
        .take_while(|p| p.starts_with(end.as_ref()))
        .map(|p| p.join(&item))
        .filter(|p| p.try_exists().is_ok_and(std::convert::identity))
        .collect()
}

/// `.stepwise` directories from the filesystem root down to the working directory.
/// Empty when the working directory cannot be determined.
#[cfg(not(target_arch = "wasm32"))]
fn find_local_configs() -> Vec<PathBuf> {
    match std::env::current_dir() {
        Ok(dir) => outermost_first(search_upward(dir, "/", LOCAL_DIR)),
        Err(_) => vec![],
    }
}

fn outermost_first(found: Vec<PathBuf>) -> Vec<PathBuf> {
    found.into_iter().filter(|p| p.is_dir()).rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use test_log::test;

    #[test]
    fn embedded_defaults_parse() {
        let config = AnalysisConfig::new_from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.integrate_options(), IntegrateOptions::default());
    }

    #[test]
    fn forced_defaults_ignore_other_sources() {
        assert_eq!(AnalysisConfig::new(true).unwrap(), AnalysisConfig::default());
    }

    #[test]
    fn explicit_options() {
        let config = AnalysisConfig::new_from_toml(
            r#"
            [window]
            policy = "nearest"
            [integrate]
            method = "simps"
            rect_step = "pre"
            sign = "-"
            [align]
            max_shift = 2.5
            [log]
            filter = "libstepwise=trace"
            "#,
        )
        .unwrap();
        assert_eq!(config.window.policy, WindowPolicy::Nearest);
        assert_eq!(config.align.max_shift, Some(2.5));
        assert_eq!(
            config.integrate_options(),
            IntegrateOptions {
                sign: Some(Sign::Negative),
                method: IntegrationMethod::Simps,
                rect_step: RectStep::Pre,
            }
        );
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = AnalysisConfig::new_from_toml(&DEFAULT_CONFIG.replace("\"rect\"", "\"quad\""))
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported integration method: quad"));

        let err = AnalysisConfig::new_from_toml(&DEFAULT_CONFIG.replace("\"inclusive\"", "\"both\""))
            .unwrap_err();
        assert!(err.to_string().contains("Unsupported window policy: both"));
    }

    #[test]
    fn local_configs_override_from_the_outside_in() {
        let root = tempfile::tempdir().unwrap();
        let outer = root.path().join(LOCAL_DIR);
        let project = root.path().join("project");
        let inner = project.join(LOCAL_DIR);
        let cwd = project.join("src");
        for dir in [&outer, &inner, &cwd] {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(
            outer.join(CONFIG_FILE),
            "[window]\npolicy = \"exclusive\"\n[integrate]\nmethod = \"trapz\"\nrect_step = \"post\"\n",
        )
        .unwrap();
        fs::write(inner.join(CONFIG_FILE), "[window]\npolicy = \"nearest\"\n").unwrap();
        // A plain file named like the local directory is not a config directory
        fs::write(cwd.join(LOCAL_DIR), "").unwrap();

        let dirs = outermost_first(search_upward(&cwd, root.path(), LOCAL_DIR));
        assert_eq!(dirs, vec![outer, inner]);

        let config = finish(add_local_configs(default_sources(), dirs)).unwrap();
        assert_eq!(config.window.policy, WindowPolicy::Nearest);
        assert_eq!(config.integrate.method, IntegrationMethod::Trapz);
        assert_eq!(config.log.filter, "info");
    }

    fn with_env(vars: &[(&str, &str)]) -> Result<AnalysisConfig> {
        let vars: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        finish(default_sources().add_source(environment().source(Some(vars))))
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = with_env(&[
            ("STEPWISE_INTEGRATE__SIGN", "+"),
            ("STEPWISE_WINDOW__POLICY", "nearest"),
            ("STEPWISE_ALIGN__MAX_SHIFT", "2.5"),
            ("OTHER_WINDOW__POLICY", "exclusive"),
        ])
        .unwrap();
        assert_eq!(config.integrate.sign, Some(Sign::Positive));
        assert_eq!(config.window.policy, WindowPolicy::Nearest);
        assert_eq!(config.align.max_shift, Some(2.5));
        assert_eq!(config.integrate.method, IntegrationMethod::Rect);

        // A bare sign is not mistaken for a number
        let config = with_env(&[("STEPWISE_INTEGRATE__SIGN", "-")]).unwrap();
        assert_eq!(config.integrate.sign, Some(Sign::Negative));
        assert_eq!(config.window.policy, WindowPolicy::Inclusive);

        assert!(with_env(&[("STEPWISE_INTEGRATE__SIGN", "1")]).is_err());
    }

    #[test]
    fn invalid_local_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[integrate]\nsign = \"0\"\n").unwrap();
        let result = finish(add_local_configs(default_sources(), [dir.path().to_path_buf()]));
        assert!(result.is_err());
    }
}
