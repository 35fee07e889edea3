//! Error types for bundle loading, configuration and capability resolution.
//!
//! Every failure in this crate is deterministic given the same bundle
//! directory and the same host declarations, so none of these errors are
//! retried internally. Callers constructing a subsystem (renderer, physics,
//! input) are expected to treat them as fatal to that subsystem's startup.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Loading
// =============================================================================

/// Failure to locate or open a backend bundle.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bundle directory could not be listed.
    #[error("cannot read bundle directory {}: {source}", .dir.display())]
    DirectoryUnreadable {
        /// Directory that was searched.
        dir: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// No file in the bundle directory matched the requested name.
    #[error("no bundle matching `{name}` in {}", .dir.display())]
    NotFound {
        /// Requested bundle name.
        name: String,
        /// Directory that was searched.
        dir: PathBuf,
    },

    /// More than one file matched the requested name.
    #[error("bundle name `{name}` is ambiguous: {} candidates", .candidates.len())]
    Ambiguous {
        /// Requested bundle name.
        name: String,
        /// Every matching file, sorted.
        candidates: Vec<PathBuf>,
    },

    /// The matching file was found but could not be opened as a bundle.
    #[error("failed to open bundle {}", .path.display())]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// Why the opener rejected it.
        #[source]
        source: OpenError,
    },
}

/// Failure reported by a [`BundleOpener`](crate::bundle::BundleOpener).
#[derive(Debug, Error)]
pub enum OpenError {
    /// The dynamic library could not be mapped.
    #[error("dynamic library error: {0}")]
    Library(#[from] libloading::Error),

    /// A required export symbol is absent.
    #[error("missing export symbol `{symbol}`")]
    MissingSymbol {
        /// Symbol name.
        symbol: &'static str,
        /// Loader error.
        #[source]
        source: libloading::Error,
    },

    /// The bundle was built against a different registration ABI.
    #[error("bundle ABI version {found} does not match host ABI version {expected}")]
    AbiMismatch {
        /// Version reported by the bundle.
        found: u32,
        /// Version this host understands.
        expected: u32,
    },

    /// A statically linked opener has no bundle registered for this file.
    #[error("no statically linked bundle named `{stem}`")]
    UnknownStaticBundle {
        /// Lowercase file stem that was looked up.
        stem: String,
    },
}

// =============================================================================
// Construction
// =============================================================================

/// Failure raised by a constructor factory while consuming its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructError {
    /// The argument at `index` was already taken or never supplied.
    #[error("argument {index} is missing")]
    MissingArgument {
        /// Zero-based argument position.
        index: usize,
    },

    /// The argument at `index` does not hold a value of the expected type.
    #[error("argument {index} is not a `{expected}`")]
    ArgumentType {
        /// Zero-based argument position.
        index: usize,
        /// Rust type name the factory asked for.
        expected: &'static str,
    },

    /// The factory rejected otherwise well-typed arguments.
    #[error("{0}")]
    Invalid(String),
}

// =============================================================================
// Resolution
// =============================================================================

/// Failure to produce a capability instance.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No bundle has been loaded into the host yet.
    #[error("no backend bundle has been loaded")]
    NotLoaded,

    /// The requested type is not a declared, marker-derived capability.
    #[error("`{name}` is not a recognized capability")]
    CapabilityNotRecognized {
        /// Capability name that was requested.
        name: String,
    },

    /// No catalog record matches the requested capability (and name).
    #[error("no plugin implements `{capability}`{}", name_suffix(.implementation))]
    PluginNotFound {
        /// Requested capability.
        capability: String,
        /// Requested implementation name, if the lookup was by name.
        implementation: Option<String>,
    },

    /// No constructor of the matched implementation accepts the arguments.
    #[error("no constructor of `{implementation}` accepts ({})", .arguments.join(", "))]
    ConstructorMismatch {
        /// Fully qualified implementation name.
        implementation: String,
        /// Runtime type names of the supplied arguments.
        arguments: Vec<String>,
    },

    /// The constructed value does not satisfy the requested capability.
    #[error("`{implementation}` was constructed but does not implement `{capability}`")]
    ContractViolation {
        /// Fully qualified implementation name.
        implementation: String,
        /// Requested capability.
        capability: String,
    },

    /// More than one implementation matches and the host rejects ambiguity.
    #[error("`{capability}` is implemented by several plugins: {}", .candidates.join(", "))]
    AmbiguousPlugin {
        /// Requested capability.
        capability: String,
        /// Fully qualified names of every candidate.
        candidates: Vec<String>,
    },

    /// A matching constructor ran and failed.
    #[error("constructing `{implementation}` failed")]
    ConstructionFailed {
        /// Fully qualified implementation name.
        implementation: String,
        /// Error raised by the factory.
        #[source]
        source: ConstructError,
    },
}

fn name_suffix(implementation: &Option<String>) -> String {
    implementation
        .as_deref()
        .map(|name| format!(" under the name `{name}`"))
        .unwrap_or_default()
}

// =============================================================================
// Configuration
// =============================================================================

/// Failure to assemble a [`PluginHostConfig`](crate::config::PluginHostConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        /// Configuration file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid JSON for the config schema.
    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        /// Configuration file path.
        path: PathBuf,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// Neither `KILN_BUNDLE_DIR` nor the executable directory is available.
    #[error("no bundle directory configured and the executable directory is unknown")]
    MissingBundleDirectory,

    /// An environment variable held a value outside its accepted set.
    #[error("invalid value `{value}` for {variable}")]
    InvalidValue {
        /// Environment variable name.
        variable: &'static str,
        /// Rejected value.
        value: String,
    },
}
