//! Host configuration.
//!
//! A [`PluginHostConfig`] names the bundle directory, the file extensions a
//! bundle may have, and the [`AmbiguityPolicy`]. It can be built in code,
//! read from the environment, or read from a JSON file:
//!
//! ```json
//! {
//!     "bundle_dir": "bundles",
//!     "extensions": ["so"],
//!     "ambiguity": "reject"
//! }
//! ```
//!
//! Missing fields take their defaults.

use std::env;
use std::env::consts::DLL_EXTENSION;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bundle::BundleDirectory;
use crate::error::ConfigError;

/// Environment variable naming the bundle directory.
pub const BUNDLE_DIR_VAR: &str = "KILN_BUNDLE_DIR";

/// Environment variable selecting the [`AmbiguityPolicy`].
pub const AMBIGUITY_VAR: &str = "KILN_AMBIGUITY";

// =============================================================================
// Ambiguity Policy
// =============================================================================

/// What the resolver does when several implementations match one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AmbiguityPolicy {
    /// Use the first matching record in catalog order, logging a warning.
    #[default]
    FirstRegistered,
    /// Fail with [`ResolveError::AmbiguousPlugin`](crate::error::ResolveError::AmbiguousPlugin).
    Reject,
}

impl fmt::Display for AmbiguityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstRegistered => write!(f, "first-registered"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for AmbiguityPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first-registered" => Ok(Self::FirstRegistered),
            "reject" => Ok(Self::Reject),
            _ => Err(ConfigError::InvalidValue {
                variable: AMBIGUITY_VAR,
                value: s.to_owned(),
            }),
        }
    }
}

// =============================================================================
// Host Config
// =============================================================================

/// Configuration of a [`PluginHost`](crate::host::PluginHost).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginHostConfig {
    /// Directory searched for bundle files.
    pub bundle_dir: PathBuf,
    /// Accepted bundle file extensions, without the dot. Empty accepts any
    /// file.
    pub extensions: Vec<String>,
    /// Resolution behaviour when several implementations match.
    pub ambiguity: AmbiguityPolicy,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            bundle_dir: PathBuf::from("bundles"),
            extensions: vec![DLL_EXTENSION.to_owned()],
            ambiguity: AmbiguityPolicy::default(),
        }
    }
}

impl PluginHostConfig {
    /// Searches `bundle_dir` with the default extension and policy.
    #[must_use]
    pub fn new(bundle_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle_dir: bundle_dir.into(),
            ..Self::default()
        }
    }

    /// Reads [`BUNDLE_DIR_VAR`] and [`AMBIGUITY_VAR`] from the process
    /// environment. Without a bundle directory variable the executable's
    /// own directory is searched.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for an unknown policy, or
    /// [`ConfigError::MissingBundleDirectory`] when neither source yields a
    /// directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        Self::from_vars(|name| env::var(name).ok(), exe_dir)
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// As for [`from_env`](Self::from_env).
    pub fn from_vars<F>(lookup: F, fallback_dir: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bundle_dir = lookup(BUNDLE_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .or(fallback_dir)
            .ok_or(ConfigError::MissingBundleDirectory)?;

        let ambiguity = match lookup(AMBIGUITY_VAR) {
            Some(value) if !value.trim().is_empty() => value.parse()?,
            _ => AmbiguityPolicy::default(),
        };

        Ok(Self {
            bundle_dir,
            ambiguity,
            ..Self::default()
        })
    }

    /// Reads a JSON config file. A relative `bundle_dir` is taken relative
    /// to the file's own directory.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not a valid config document.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.bundle_dir.is_relative() {
            if let Some(base) = path.parent() {
                config.bundle_dir = base.join(&config.bundle_dir);
            }
        }
        Ok(config)
    }

    /// Replaces the ambiguity policy.
    #[must_use]
    pub fn with_ambiguity(mut self, ambiguity: AmbiguityPolicy) -> Self {
        self.ambiguity = ambiguity;
        self
    }

    /// Replaces the accepted extensions.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// The bundle directory this configuration describes.
    #[must_use]
    pub fn directory(&self) -> BundleDirectory {
        BundleDirectory::new(&self.bundle_dir, self.extensions.clone())
    }
}
