//! The capability → implementation index built from a loaded bundle.
//!
//! [`PluginCatalog::build`] walks the bundle's exported types once, right
//! after the bundle is loaded, and records every type in the bundle's root
//! namespace that declares a recognized capability. The catalog is never
//! mutated afterwards.
//!
//! A type declaring several recognized capabilities is recorded once, under
//! the first of them in its own declaration order. This is logged but not
//! treated as an error.

use serde::Serialize;
use tracing::{debug, warn};

use crate::bundle::ComponentLibraryHandle;
use crate::capability::{CapabilityInterface, CapabilityInterfaceSet};

// =============================================================================
// Plugin Record
// =============================================================================

/// One implementation of one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginRecord {
    implementation_name: String,
    fully_qualified_name: String,
    capability: CapabilityInterface,
}

impl PluginRecord {
    /// Short name the implementation was exported under.
    #[must_use]
    pub fn implementation_name(&self) -> &str {
        &self.implementation_name
    }

    /// `namespace::name` of the implementation.
    #[must_use]
    pub fn fully_qualified_name(&self) -> &str {
        &self.fully_qualified_name
    }

    /// The capability this implementation was recorded under.
    #[must_use]
    pub fn capability(&self) -> &CapabilityInterface {
        &self.capability
    }
}

// =============================================================================
// Plugin Catalog
// =============================================================================

/// Ordered, read-only list of [`PluginRecord`]s for one bundle.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    bundle: String,
    root_namespace: String,
    declared: Vec<CapabilityInterface>,
    records: Vec<PluginRecord>,
}

impl PluginCatalog {
    /// Indexes `handle`'s exported types against `capabilities`.
    #[must_use]
    pub fn build(handle: &ComponentLibraryHandle, capabilities: &CapabilityInterfaceSet) -> Self {
        let root = handle.root_namespace();
        let mut records = Vec::new();

        for ty in handle.exported_types().filter(|ty| ty.namespace() == root) {
            let mut matched = ty
                .interfaces()
                .iter()
                .filter_map(|name| capabilities.get(name))
                .filter(|capability| !capability.is_marker());

            let Some(capability) = matched.next() else {
                continue;
            };
            let ignored: Vec<&str> = matched.map(CapabilityInterface::name).collect();
            if !ignored.is_empty() {
                warn!(
                    implementation = %ty.full_name(),
                    recorded = capability.name(),
                    ?ignored,
                    "implementation satisfies several capabilities; only the first is recorded"
                );
            }

            let record = PluginRecord {
                implementation_name: ty.name().to_owned(),
                fully_qualified_name: ty.full_name(),
                capability: capability.clone(),
            };
            debug!(
                capability = capability.name(),
                implementation = %record.fully_qualified_name,
                "catalog record"
            );
            records.push(record);
        }

        Self {
            bundle: handle.name().to_owned(),
            root_namespace: root.to_owned(),
            declared: capabilities.iter().cloned().collect(),
            records,
        }
    }

    /// Every record, in catalog order.
    #[must_use]
    pub fn records(&self) -> &[PluginRecord] {
        &self.records
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the bundle implements none of the host's capabilities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for `capability`, in catalog order.
    ///
    /// The records borrow from the catalog, not from `capability`.
    pub fn records_for<'a, 'c>(
        &'a self,
        capability: &'c str,
    ) -> impl Iterator<Item = &'a PluginRecord> + Clone + 'c
    where
        'a: 'c,
    {
        self.records
            .iter()
            .filter(move |record| record.capability.name() == capability)
    }

    /// Implementation names under `capability` containing `fragment`,
    /// ignoring case.
    #[must_use]
    pub fn names_matching(&self, capability: &str, fragment: &str) -> Vec<&str> {
        let fragment = fragment.to_lowercase();
        self.records_for(capability)
            .map(PluginRecord::implementation_name)
            .filter(|name| name.to_lowercase().contains(&fragment))
            .collect()
    }

    /// Distinct capability names that have at least one record, in catalog
    /// order.
    #[must_use]
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = Vec::new();
        for record in &self.records {
            let name = record.capability.name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Serializable summary for diagnostics.
    #[must_use]
    pub fn report(&self) -> CatalogReport {
        let capabilities = self
            .declared
            .iter()
            .map(|capability| CapabilityReport {
                capability: capability.name(),
                implementations: self
                    .records_for(capability.name())
                    .map(|record| record.fully_qualified_name.clone())
                    .collect(),
            })
            .collect();

        CatalogReport {
            bundle: self.bundle.clone(),
            root_namespace: self.root_namespace.clone(),
            capabilities,
            records: self.records.clone(),
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Diagnostic snapshot of a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    /// Name the bundle was loaded by.
    pub bundle: String,
    /// The bundle's root namespace.
    pub root_namespace: String,
    /// Every host capability with its implementations, including those with
    /// none.
    pub capabilities: Vec<CapabilityReport>,
    /// Every record, in catalog order.
    pub records: Vec<PluginRecord>,
}

/// Implementations of one capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    /// Capability name.
    pub capability: &'static str,
    /// Fully qualified implementation names, in catalog order.
    pub implementations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::{BundleBuilder, ComponentLibraryHandle};
    use crate::capability::{CapabilityDeclaration, MARKER};

    fn handle(register: fn(&mut BundleBuilder)) -> ComponentLibraryHandle {
        let mut bundle = BundleBuilder::new("demo");
        register(&mut bundle);
        ComponentLibraryHandle::from_manifest("Demo", "bundles/demo.so", bundle.finish())
    }

    fn capabilities() -> CapabilityInterfaceSet {
        CapabilityInterfaceSet::discover_from(&[
            MARKER,
            CapabilityDeclaration::derived("Renderer"),
            CapabilityDeclaration::derived("PhysicsBody"),
            CapabilityDeclaration::derived("InputDevice"),
        ])
    }

    fn mixed_bundle(bundle: &mut BundleBuilder) {
        bundle
            .export::<u8>("GlRenderer")
            .interface("Renderer")
            .interface("Component");
        bundle.export::<u16>("SoftRenderer").interface("Renderer");
        bundle.export::<u32>("Body").interface("PhysicsBody");
        bundle.export::<u64>("Helper").interface("Component");
        bundle.export::<i8>("Plain");
    }

    mod build_tests {
        use super::*;

        #[test]
        fn records_types_declaring_capabilities() {
            let catalog = PluginCatalog::build(&handle(mixed_bundle), &capabilities());

            let names: Vec<_> = catalog
                .records()
                .iter()
                .map(PluginRecord::implementation_name)
                .collect();
            assert_eq!(names, ["GlRenderer", "SoftRenderer", "Body"]);
            assert_eq!(catalog.len(), 3);
            assert_eq!(catalog.records()[0].fully_qualified_name(), "demo::GlRenderer");
        }

        #[test]
        fn marker_only_types_are_not_recorded() {
            let catalog = PluginCatalog::build(&handle(mixed_bundle), &capabilities());
            assert!(catalog
                .records()
                .iter()
                .all(|record| record.implementation_name() != "Helper"));
        }

        #[test]
        fn first_declared_capability_wins() {
            fn register(bundle: &mut BundleBuilder) {
                bundle
                    .export::<u8>("Hybrid")
                    .interface("InputDevice")
                    .interface("Renderer");
            }

            let catalog = PluginCatalog::build(&handle(register), &capabilities());
            assert_eq!(catalog.len(), 1);
            assert_eq!(catalog.records()[0].capability().name(), "InputDevice");
        }

        #[test]
        fn types_outside_root_namespace_are_skipped() {
            fn register(bundle: &mut BundleBuilder) {
                bundle
                    .export::<u8>("Nested")
                    .namespace("demo::detail")
                    .interface("Renderer");
                bundle.export::<u16>("Top").interface("Renderer");
            }

            let catalog = PluginCatalog::build(&handle(register), &capabilities());
            let names: Vec<_> = catalog.names_matching("Renderer", "");
            assert_eq!(names, ["Top"]);
        }

        #[test]
        fn internal_types_are_skipped() {
            fn register(bundle: &mut BundleBuilder) {
                bundle.export::<u8>("Hidden").interface("Renderer").internal();
            }

            let catalog = PluginCatalog::build(&handle(register), &capabilities());
            assert!(catalog.is_empty());
        }

        #[test]
        fn unrecognized_interfaces_are_ignored() {
            fn register(bundle: &mut BundleBuilder) {
                bundle.export::<u8>("Speaker").interface("Audio");
            }

            let catalog = PluginCatalog::build(&handle(register), &capabilities());
            assert!(catalog.is_empty());
        }

        #[test]
        fn build_is_deterministic() {
            let handle = handle(mixed_bundle);
            let a = PluginCatalog::build(&handle, &capabilities());
            let b = PluginCatalog::build(&handle, &capabilities());
            assert_eq!(a.records(), b.records());
        }
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn records_for_keeps_catalog_order() {
            let catalog = PluginCatalog::build(&handle(mixed_bundle), &capabilities());
            let names: Vec<_> = catalog
                .records_for("Renderer")
                .map(PluginRecord::implementation_name)
                .collect();
            assert_eq!(names, ["GlRenderer", "SoftRenderer"]);
            assert_eq!(catalog.records_for("InputDevice").count(), 0);
        }

        #[test]
        fn names_matching_ignores_case() {
            let catalog = PluginCatalog::build(&handle(mixed_bundle), &capabilities());
            assert_eq!(catalog.names_matching("Renderer", "soft"), ["SoftRenderer"]);
            assert_eq!(
                catalog.names_matching("Renderer", "RENDERER"),
                ["GlRenderer", "SoftRenderer"]
            );
            assert!(catalog.names_matching("PhysicsBody", "renderer").is_empty());
        }

        #[test]
        fn matched_names_outlive_the_query() {
            let catalog = PluginCatalog::build(&handle(mixed_bundle), &capabilities());
            let (records, names) = {
                let capability = String::from("Renderer");
                let records: Vec<&PluginRecord> = catalog.records_for(&capability).collect();
                (records, catalog.names_matching(&capability, "gl"))
            };
            assert_eq!(records.len(), 2);
            assert_eq!(names, ["GlRenderer"]);
        }

        #[test]
        fn capabilities_are_distinct_and_ordered() {
            let catalog = PluginCatalog::build(&handle(mixed_bundle), &capabilities());
            assert_eq!(catalog.capabilities(), ["Renderer", "PhysicsBody"]);
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn report_lists_every_declared_capability() {
            let report = PluginCatalog::build(&handle(mixed_bundle), &capabilities()).report();

            assert_eq!(report.bundle, "Demo");
            assert_eq!(report.root_namespace, "demo");
            let input = report
                .capabilities
                .iter()
                .find(|entry| entry.capability == "InputDevice")
                .unwrap();
            assert!(input.implementations.is_empty());
            assert_eq!(report.capabilities[0].implementations, ["demo::GlRenderer", "demo::SoftRenderer"]);
        }

        #[test]
        fn report_serializes() {
            let report = PluginCatalog::build(&handle(mixed_bundle), &capabilities()).report();
            let json = serde_json::to_value(&report).unwrap();

            assert_eq!(json["records"][2]["implementation_name"], "Body");
            assert_eq!(json["records"][2]["capability"]["name"], "PhysicsBody");
            assert_eq!(json["capabilities"][1]["capability"], "PhysicsBody");
        }
    }
}
