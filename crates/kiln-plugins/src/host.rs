//! The composition root's handle on backend plugins.
//!
//! A [`PluginHost`] is created once by whatever assembles the engine and is
//! passed by reference to the subsystems that need backends. It moves
//! through two states:
//!
//! ```text
//! Unloaded --load(name) ok--> Loaded(handle, catalog)
//!     ^            |
//!     +--- error --+
//! ```
//!
//! `Loaded` is terminal. Later `load` calls, whatever the name, return the
//! bundle that is already loaded without searching the directory again.

use std::fmt;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::bundle::{BundleOpener, ComponentLibraryHandle, DylibOpener};
use crate::capability::CapabilityInterfaceSet;
use crate::catalog::PluginCatalog;
use crate::config::PluginHostConfig;
use crate::error::{LoadError, ResolveError};
use crate::resolver::PluginResolver;

/// A loaded bundle and the catalog built from it.
#[derive(Debug)]
struct LoadedBundle {
    handle: ComponentLibraryHandle,
    catalog: PluginCatalog,
}

/// Loads one backend bundle per process and hands out resolvers for it.
///
/// # Example
///
/// ```no_run
/// use kiln_plugins::config::PluginHostConfig;
/// use kiln_plugins::host::PluginHost;
/// use kiln_plugins::interfaces::Renderer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let host = PluginHost::new(PluginHostConfig::from_env()?);
/// host.load("headless")?;
///
/// let renderer = host.resolver()?.resolve_default::<dyn Renderer>()?;
/// println!("rendering with {}", renderer.component_name());
/// # Ok(())
/// # }
/// ```
pub struct PluginHost {
    config: PluginHostConfig,
    capabilities: CapabilityInterfaceSet,
    opener: Box<dyn BundleOpener>,
    loaded: OnceCell<LoadedBundle>,
}

impl PluginHost {
    /// A host opening dynamic libraries, with the built-in capabilities.
    #[must_use]
    pub fn new(config: PluginHostConfig) -> Self {
        Self::with_opener(config, DylibOpener)
    }

    /// A host opening bundles through `opener`.
    #[must_use]
    pub fn with_opener(config: PluginHostConfig, opener: impl BundleOpener + 'static) -> Self {
        Self {
            config,
            capabilities: CapabilityInterfaceSet::discover(),
            opener: Box::new(opener),
            loaded: OnceCell::new(),
        }
    }

    /// Replaces the capability set catalogs are built against.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilityInterfaceSet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Loads the bundle whose file name contains `bundle_name` and builds
    /// its catalog.
    ///
    /// Only the first successful call does any work. Every later call
    /// returns the bundle loaded first, even for a different name.
    ///
    /// # Errors
    ///
    /// Any [`LoadError`] from locating or opening the bundle. The host stays
    /// unloaded, so a later call may try again.
    pub fn load(&self, bundle_name: &str) -> Result<&ComponentLibraryHandle, LoadError> {
        if let Some(loaded) = self.loaded.get() {
            debug!(
                requested = bundle_name,
                loaded = loaded.handle.name(),
                "bundle already loaded; ignoring load request"
            );
            return Ok(&loaded.handle);
        }

        let loaded = self.loaded.get_or_try_init(|| {
            let directory = self.config.directory();
            let handle = ComponentLibraryHandle::load(&directory, self.opener.as_ref(), bundle_name)?;
            let catalog = PluginCatalog::build(&handle, &self.capabilities);
            info!(
                bundle = bundle_name,
                path = %handle.path().display(),
                types = handle.exported_types().count(),
                plugins = catalog.len(),
                "loaded backend bundle"
            );
            Ok::<_, LoadError>(LoadedBundle { handle, catalog })
        })?;
        Ok(&loaded.handle)
    }

    /// Returns true once a bundle has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    /// The loaded bundle, if any.
    #[must_use]
    pub fn handle(&self) -> Option<&ComponentLibraryHandle> {
        self.loaded.get().map(|loaded| &loaded.handle)
    }

    /// The loaded bundle's catalog, if any.
    #[must_use]
    pub fn catalog(&self) -> Option<&PluginCatalog> {
        self.loaded.get().map(|loaded| &loaded.catalog)
    }

    /// A resolver over the loaded bundle.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NotLoaded`] before the first successful
    /// [`load`](Self::load).
    pub fn resolver(&self) -> Result<PluginResolver<'_>, ResolveError> {
        let loaded = self.loaded.get().ok_or(ResolveError::NotLoaded)?;
        Ok(PluginResolver::new(
            &loaded.handle,
            &loaded.catalog,
            &self.capabilities,
            self.config.ambiguity,
        ))
    }

    /// Capabilities catalogs are built against.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilityInterfaceSet {
        &self.capabilities
    }

    /// The host's configuration.
    #[must_use]
    pub fn config(&self) -> &PluginHostConfig {
        &self.config
    }
}

impl fmt::Debug for PluginHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHost")
            .field("config", &self.config)
            .field("capabilities", &self.capabilities)
            .field("loaded", &self.handle().map(ComponentLibraryHandle::name))
            .finish_non_exhaustive()
    }
}
