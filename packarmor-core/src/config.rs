//! Persisted user configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.packarmor/
//!   config.yaml   (optional: mode 0600 when written by packarmor)
//! ```
//!
//! # API pattern
//!
//! Every function touching the home directory has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! # Precedence
//!
//! CLI flag > environment (`PACKARMOR_PYTHON`, `PACKARMOR_OBFUSCATOR`,
//! `PACKARMOR_HOME`) > `config.yaml` > built-in default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_PYTHON: &str = "PACKARMOR_PYTHON";
pub const ENV_OBFUSCATOR: &str = "PACKARMOR_OBFUSCATOR";
pub const ENV_ARMOR_HOME: &str = "PACKARMOR_HOME";

pub const DEFAULT_PYTHON: &str = "python";
pub const DEFAULT_OBFUSCATOR: &str = "pyarmor";

/// One layer of optional settings: the config file, the environment, or CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Interpreter that runs setup scripts and `py_compile`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    /// Obfuscator executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfuscator: Option<String>,
    /// Directory holding `pytransform.py`; scratch projects are created under it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub armor_home: Option<PathBuf>,
}

impl Config {
    /// Build a layer from environment variables, looked up through `var`.
    pub fn from_env_with(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            python: var(ENV_PYTHON).filter(|v| !v.is_empty()),
            obfuscator: var(ENV_OBFUSCATOR).filter(|v| !v.is_empty()),
            armor_home: var(ENV_ARMOR_HOME)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Fill every unset field of `self` from `lower`.
    pub fn or(self, lower: Config) -> Config {
        Config {
            python: self.python.or(lower.python),
            obfuscator: self.obfuscator.or(lower.obfuscator),
            armor_home: self.armor_home.or(lower.armor_home),
        }
    }

    /// Apply defaults. A relative `armor_home` is taken relative to `cwd`.
    pub fn into_settings(self, cwd: &Path) -> Settings {
        let armor_home = match self.armor_home {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };
        Settings {
            python: self.python.unwrap_or_else(|| DEFAULT_PYTHON.to_string()),
            obfuscator: self
                .obfuscator
                .unwrap_or_else(|| DEFAULT_OBFUSCATOR.to_string()),
            armor_home,
        }
    }
}

/// Fully resolved settings, every field populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub python: String,
    pub obfuscator: String,
    pub armor_home: PathBuf,
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.packarmor/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".packarmor").join("config.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load `<home>/.packarmor/config.yaml`.
///
/// A missing file is the empty layer. Malformed YAML returns
/// `ConfigError::Parse` with the path and serde_yaml's line context.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save `config` to `<home>/.packarmor/config.yaml`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Resolve
// ---------------------------------------------------------------------------

/// Layer `flags` over the environment over the config file under `home`.
pub fn resolve_at(
    home: &Path,
    flags: Config,
    env: Config,
    cwd: &Path,
) -> Result<Settings, ConfigError> {
    let file = load_at(home)?;
    Ok(flags.or(env).or(file).into_settings(cwd))
}

/// `resolve_at` convenience wrapper: real home, real environment, real cwd.
pub fn resolve(flags: Config) -> Result<Settings, ConfigError> {
    let cwd = std::env::current_dir()?;
    resolve_at(&home()?, flags, Config::from_env(), &cwd)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
