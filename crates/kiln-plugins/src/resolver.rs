//! Capability resolution: from "give me a `dyn Renderer`" to a live backend.
//!
//! A [`PluginResolver`] borrows the host's loaded bundle and catalog. Every
//! call looks the capability up in the catalog, picks a constructor, runs
//! it, and upcasts the result. Nothing shared is mutated; each call returns
//! a fresh instance owned by the caller.
//!
//! ```rust,ignore
//! let resolver = host.resolver()?;
//! let renderer: Box<dyn Renderer> = resolver.resolve_default::<dyn Renderer>()?;
//! let body: Box<dyn PhysicsBody> = resolver.resolve_with_args::<dyn PhysicsBody>(vec![
//!     Argument::new(vec![0.0_f32, 1.0]),
//!     Argument::new(vec![0.0_f32, 1.0]),
//!     Argument::new(1.0_f32),
//!     Argument::new(0.2_f32),
//! ])?;
//! ```

use tracing::{debug, warn};

use crate::bundle::{ComponentLibraryHandle, ConstructorDescriptor, TypeDescriptor};
use crate::capability::{Capability, CapabilityInterface, CapabilityInterfaceSet};
use crate::catalog::{PluginCatalog, PluginRecord};
use crate::config::AmbiguityPolicy;
use crate::error::ResolveError;
use crate::matcher::find_constructor;
use crate::types::Arguments;

/// Resolves capability requests against one loaded bundle.
#[derive(Debug, Clone, Copy)]
pub struct PluginResolver<'h> {
    handle: &'h ComponentLibraryHandle,
    catalog: &'h PluginCatalog,
    capabilities: &'h CapabilityInterfaceSet,
    policy: AmbiguityPolicy,
}

impl<'h> PluginResolver<'h> {
    /// A resolver over `catalog`, which must have been built from `handle`
    /// and `capabilities`.
    #[must_use]
    pub fn new(
        handle: &'h ComponentLibraryHandle,
        catalog: &'h PluginCatalog,
        capabilities: &'h CapabilityInterfaceSet,
        policy: AmbiguityPolicy,
    ) -> Self {
        Self {
            handle,
            catalog,
            capabilities,
            policy,
        }
    }

    /// The ambiguity policy in force.
    #[must_use]
    pub fn policy(&self) -> AmbiguityPolicy {
        self.policy
    }

    /// Constructs the implementation of `C` through its zero-argument
    /// constructor.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::CapabilityNotRecognized`] if `C` is not a host capability
    /// - [`ResolveError::PluginNotFound`] if the bundle has no implementation
    /// - [`ResolveError::AmbiguousPlugin`] under [`AmbiguityPolicy::Reject`]
    /// - [`ResolveError::ConstructorMismatch`] if there is no zero-argument constructor
    /// - [`ResolveError::ConstructionFailed`] or
    ///   [`ResolveError::ContractViolation`] from construction
    pub fn resolve_default<C: Capability + ?Sized>(&self) -> Result<Box<C>, ResolveError> {
        self.resolve_with_args::<C>(Arguments::new())
    }

    /// Constructs the implementation of `C` through the first constructor
    /// compatible with `args`.
    ///
    /// # Errors
    ///
    /// As for [`resolve_default`](Self::resolve_default), with
    /// [`ResolveError::ConstructorMismatch`] when no constructor accepts the
    /// argument types.
    pub fn resolve_with_args<C: Capability + ?Sized>(
        &self,
        args: impl Into<Arguments>,
    ) -> Result<Box<C>, ResolveError> {
        let capability = self.recognize::<C>()?;
        let record = self.select(capability, None)?;
        self.construct(record, &mut args.into())
    }

    /// Constructs the implementation of `C` exported under exactly `name`,
    /// through its zero-argument constructor.
    ///
    /// # Errors
    ///
    /// As for [`resolve_default`](Self::resolve_default);
    /// [`ResolveError::PluginNotFound`] names `name` when no implementation
    /// of `C` has it.
    pub fn resolve_by_name<C: Capability + ?Sized>(
        &self,
        name: &str,
    ) -> Result<Box<C>, ResolveError> {
        let capability = self.recognize::<C>()?;
        let record = self.select(capability, Some(name))?;
        self.construct(record, &mut Arguments::new())
    }

    /// Constructs every implementation of `C` that has a zero-argument
    /// constructor, in catalog order. Implementations without one are
    /// skipped.
    ///
    /// # Errors
    ///
    /// [`ResolveError::CapabilityNotRecognized`], or the first construction
    /// failure.
    pub fn resolve_all<C: Capability + ?Sized>(&self) -> Result<Vec<Box<C>>, ResolveError> {
        let capability = self.recognize::<C>()?;
        let mut instances = Vec::new();
        for record in self.catalog.records_for(capability.name()) {
            let ty = self.type_of(record)?;
            let Some(constructor) = find_constructor(ty, &[]) else {
                debug!(
                    capability = capability.name(),
                    implementation = record.fully_qualified_name(),
                    "skipped: no zero-argument constructor"
                );
                continue;
            };
            instances.push(self.instantiate::<C>(ty, constructor, &mut Arguments::new())?);
        }
        Ok(instances)
    }

    /// Implementation names of `C` containing the capability's stem, for
    /// diagnostics. Empty if `C` is not recognized.
    #[must_use]
    pub fn list_candidate_names<C: Capability + ?Sized>(&self) -> Vec<&'h str> {
        self.capabilities
            .get(C::name())
            .map(|capability| self.catalog.names_matching(capability.name(), capability.stem()))
            .unwrap_or_default()
    }

    fn recognize<C: Capability + ?Sized>(&self) -> Result<&'h CapabilityInterface, ResolveError> {
        self.capabilities
            .get(C::name())
            .ok_or_else(|| ResolveError::CapabilityNotRecognized {
                name: C::name().to_owned(),
            })
    }

    /// Picks the record answering a request, applying the ambiguity policy.
    fn select(
        &self,
        capability: &CapabilityInterface,
        name: Option<&str>,
    ) -> Result<&'h PluginRecord, ResolveError> {
        let candidates: Vec<&'h PluginRecord> = self
            .catalog
            .records_for(capability.name())
            .filter(|record| name.map_or(true, |name| record.implementation_name() == name))
            .collect();

        let Some(&first) = candidates.first() else {
            return Err(ResolveError::PluginNotFound {
                capability: capability.name().to_owned(),
                implementation: name.map(str::to_owned),
            });
        };

        if candidates.len() > 1 {
            let names: Vec<String> = candidates
                .iter()
                .map(|record| record.fully_qualified_name().to_owned())
                .collect();
            match self.policy {
                AmbiguityPolicy::Reject => {
                    return Err(ResolveError::AmbiguousPlugin {
                        capability: capability.name().to_owned(),
                        candidates: names,
                    });
                }
                AmbiguityPolicy::FirstRegistered => {
                    warn!(
                        capability = capability.name(),
                        chosen = first.fully_qualified_name(),
                        candidates = ?names,
                        "several implementations match; using the first registered"
                    );
                }
            }
        }
        Ok(first)
    }

    fn type_of(&self, record: &PluginRecord) -> Result<&'h TypeDescriptor, ResolveError> {
        self.handle
            .find_type(record.fully_qualified_name())
            .ok_or_else(|| ResolveError::PluginNotFound {
                capability: record.capability().name().to_owned(),
                implementation: Some(record.implementation_name().to_owned()),
            })
    }

    fn construct<C: Capability + ?Sized>(
        &self,
        record: &PluginRecord,
        args: &mut Arguments,
    ) -> Result<Box<C>, ResolveError> {
        let ty = self.type_of(record)?;
        let constructor =
            find_constructor(ty, args.types()).ok_or_else(|| ResolveError::ConstructorMismatch {
                implementation: record.fully_qualified_name().to_owned(),
                arguments: args.types().iter().map(ToString::to_string).collect(),
            })?;
        self.instantiate::<C>(ty, constructor, args)
    }

    fn instantiate<C: Capability + ?Sized>(
        &self,
        ty: &TypeDescriptor,
        constructor: &ConstructorDescriptor,
        args: &mut Arguments,
    ) -> Result<Box<C>, ResolveError> {
        let implementation = ty.full_name();
        let value = constructor
            .invoke(args)
            .map_err(|source| ResolveError::ConstructionFailed {
                implementation: implementation.clone(),
                source,
            })?;

        let instance = ty
            .upcast::<C>(value)
            .ok_or_else(|| ResolveError::ContractViolation {
                implementation: implementation.clone(),
                capability: C::name().to_owned(),
            })?;
        debug!(
            capability = C::name(),
            implementation = %implementation,
            arity = constructor.arity(),
            "resolved"
        );
        Ok(instance)
    }
}
