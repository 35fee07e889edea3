//! Backend bundles: registration, opening, and on-disk lookup.
//!
//! A bundle is a library of backend types. It describes its exports by
//! running a registration function against a [`BundleBuilder`]; the host
//! finds the bundle file in its bundle directory, opens it through a
//! [`BundleOpener`], and keeps the resulting [`ComponentLibraryHandle`] for
//! the rest of the process.
//!
//! # Writing a dynamic bundle
//!
//! ```rust,ignore
//! use kiln_plugins::bundle::BundleBuilder;
//!
//! fn register(bundle: &mut BundleBuilder) {
//!     bundle
//!         .export::<HeadlessRenderer>("HeadlessRenderer")
//!         .implements::<dyn Renderer>(|r| r)
//!         .default_constructor();
//! }
//!
//! kiln_plugins::export_bundle!(register);
//! ```

mod descriptor;
mod library;
mod opener;

pub use descriptor::{
    BundleBuilder, BundleManifest, ConstructorDescriptor, Factory, TypeBuilder, TypeDescriptor,
};
pub use library::{BundleDirectory, ComponentLibraryHandle};
pub use opener::{
    AbiVersionFn, BundleOpener, DylibOpener, RegisterFn, StaticOpener, ABI_VERSION_SYMBOL,
    BUNDLE_ABI_VERSION, REGISTER_SYMBOL,
};

/// Emits the export symbols a dynamically loaded bundle needs.
///
/// `$register` is a `fn(&mut BundleBuilder)`. The root namespace is set to
/// the invoking module's path before it runs, so types exported without an
/// explicit namespace land in the bundle's own namespace.
#[macro_export]
macro_rules! export_bundle {
    ($register:path) => {
        /// Registration ABI version this bundle was built against.
        #[no_mangle]
        pub fn kiln_bundle_abi_version() -> u32 {
            $crate::bundle::BUNDLE_ABI_VERSION
        }

        /// Registers this bundle's exports.
        #[no_mangle]
        pub fn kiln_bundle_register(bundle: &mut $crate::bundle::BundleBuilder) {
            bundle.set_root_namespace(::core::module_path!());
            $register(bundle);
        }
    };
}
