//! Turning a bundle file into a [`BundleManifest`].
//!
//! [`BundleOpener`] is the seam between the host and whatever mechanism
//! actually brings backend code into the process. Two are provided:
//!
//! - [`DylibOpener`] maps a dynamic library built with
//!   [`export_bundle!`](crate::export_bundle) and calls its registration
//!   symbol.
//! - [`StaticOpener`] runs registration functions linked into the
//!   executable, selected by the file found in the bundle directory.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use libloading::{Library, Symbol};
use tracing::debug;

use super::descriptor::{BundleBuilder, BundleManifest};
use crate::error::OpenError;

/// Registration ABI version. Bumped whenever [`BundleBuilder`] or the
/// export symbols change shape.
pub const BUNDLE_ABI_VERSION: u32 = 1;

/// Symbol reporting the ABI version a bundle was built against.
pub const ABI_VERSION_SYMBOL: &str = "kiln_bundle_abi_version";

/// Symbol registering a bundle's exports.
pub const REGISTER_SYMBOL: &str = "kiln_bundle_register";

/// Signature of [`ABI_VERSION_SYMBOL`].
pub type AbiVersionFn = fn() -> u32;

/// Signature of [`REGISTER_SYMBOL`], and of statically linked registrations.
pub type RegisterFn = fn(&mut BundleBuilder);

/// Opens a located bundle file.
pub trait BundleOpener: Send + Sync {
    /// Reads the bundle at `path` and returns everything it exports.
    ///
    /// # Errors
    ///
    /// Any [`OpenError`]; the host wraps it into
    /// [`LoadError::Open`](crate::error::LoadError::Open).
    fn open(&self, path: &Path) -> Result<BundleManifest, OpenError>;
}

impl<F> BundleOpener for F
where
    F: Fn(&Path) -> Result<BundleManifest, OpenError> + Send + Sync,
{
    fn open(&self, path: &Path) -> Result<BundleManifest, OpenError> {
        self(path)
    }
}

/// Lowercase file stem, used as the default root namespace and static key.
fn bundle_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

// =============================================================================
// Dynamic Libraries
// =============================================================================

/// Opens bundles compiled as dynamic libraries.
///
/// The bundle must be built by the same compiler and against the same
/// `kiln-plugins` version as the host: registration passes Rust types across
/// the boundary. The ABI version symbol catches the common mismatch.
///
/// The library carries its own copy of `kiln-plugins`, so its `TypeId`s do
/// not match the host's. Constructed values, arguments and upcasts travel as
/// [`ErasedBox`](crate::erased::ErasedBox)es and are matched by
/// [`TypeTag`](crate::erased::TypeTag) instead.
///
/// Opened libraries are never unloaded. Factories and upcasts in the
/// manifest point into the library's code for the rest of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibOpener;

impl BundleOpener for DylibOpener {
    fn open(&self, path: &Path) -> Result<BundleManifest, OpenError> {
        // SAFETY: mapping a library runs its initialisers; bundles are
        // trusted deployment artifacts.
        let library = unsafe { Library::new(path) }?;

        let manifest = {
            // SAFETY: the symbol type is fixed by `export_bundle!`.
            let version: Symbol<'_, AbiVersionFn> = unsafe {
                library.get(ABI_VERSION_SYMBOL.as_bytes())
            }
            .map_err(|source| OpenError::MissingSymbol {
                symbol: ABI_VERSION_SYMBOL,
                source,
            })?;
            let found = version();
            if found != BUNDLE_ABI_VERSION {
                return Err(OpenError::AbiMismatch {
                    found,
                    expected: BUNDLE_ABI_VERSION,
                });
            }

            // SAFETY: as above; the ABI version matched.
            let register: Symbol<'_, RegisterFn> = unsafe {
                library.get(REGISTER_SYMBOL.as_bytes())
            }
            .map_err(|source| OpenError::MissingSymbol {
                symbol: REGISTER_SYMBOL,
                source,
            })?;

            let mut builder = BundleBuilder::new(bundle_stem(path));
            register(&mut builder);
            builder.finish()
        };

        debug!(
            path = %path.display(),
            types = manifest.types.len(),
            "mapped dynamic bundle"
        );
        std::mem::forget(library);
        Ok(manifest)
    }
}

// =============================================================================
// Statically Linked Bundles
// =============================================================================

/// Opens bundles linked into the executable.
///
/// Each registration is keyed by the lowercase file stem it answers to; a
/// `lib` prefix on the file stem is ignored, so `libkiln_headless.so` and
/// `kiln_headless.dll` both select the `kiln_headless` registration. The
/// file still has to exist in the bundle directory, which keeps backend
/// selection a deployment decision.
///
/// ```
/// use std::path::Path;
/// use kiln_plugins::bundle::{BundleBuilder, BundleOpener, StaticOpener};
///
/// fn register(_bundle: &mut BundleBuilder) {}
///
/// let opener = StaticOpener::new().with_bundle("Headless", register);
/// let manifest = opener.open(Path::new("bundles/libheadless.so")).unwrap();
/// assert_eq!(manifest.root_namespace, "headless");
/// ```
#[derive(Clone, Default)]
pub struct StaticOpener {
    bundles: HashMap<String, RegisterFn>,
}

impl fmt::Debug for StaticOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stems: Vec<&str> = self.bundles.keys().map(String::as_str).collect();
        stems.sort_unstable();
        f.debug_struct("StaticOpener").field("bundles", &stems).finish()
    }
}

impl StaticOpener {
    /// An opener with no registrations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a registration answering to `stem` (case-insensitive).
    #[must_use]
    pub fn with_bundle(mut self, stem: &str, register: RegisterFn) -> Self {
        self.bundles.insert(stem.to_lowercase(), register);
        self
    }

    fn lookup(&self, stem: &str) -> Option<(&str, RegisterFn)> {
        let candidates = [Some(stem), stem.strip_prefix("lib")];
        candidates.into_iter().flatten().find_map(|key| {
            self.bundles
                .get_key_value(key)
                .map(|(key, register)| (key.as_str(), *register))
        })
    }
}

impl BundleOpener for StaticOpener {
    fn open(&self, path: &Path) -> Result<BundleManifest, OpenError> {
        let stem = bundle_stem(path);
        let (key, register) = self
            .lookup(&stem)
            .ok_or_else(|| OpenError::UnknownStaticBundle { stem: stem.clone() })?;

        let mut builder = BundleBuilder::new(key);
        register(&mut builder);
        Ok(builder.finish())
    }
}
