//! Exported type inventory and the builder bundles register through.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::capability::Capability;
use crate::erased::{self, ErasedBox, TypeTag};
use crate::error::ConstructError;
use crate::types::{Arguments, TypeRef};

/// Type-erased constructor body.
pub type Factory = Arc<dyn Fn(&mut Arguments) -> Result<ErasedBox, ConstructError> + Send + Sync>;

/// Converts a boxed concrete value into one capability's trait object.
struct Upcast<C: ?Sized>(Box<dyn Fn(ErasedBox) -> Option<Box<C>> + Send + Sync>);

/// A registered [`Upcast`], found by the tag of its type since the host and
/// a dynamically loaded bundle disagree on `TypeId`s.
struct UpcastEntry {
    tag: TypeTag,
    cast: Box<dyn Any + Send + Sync>,
}

// =============================================================================
// Constructor Descriptor
// =============================================================================

/// One constructor of an exported type.
#[derive(Clone)]
pub struct ConstructorDescriptor {
    params: Vec<TypeRef>,
    factory: Factory,
}

impl ConstructorDescriptor {
    /// Declared parameter types, in order.
    #[must_use]
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    /// Number of parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Runs the constructor.
    ///
    /// # Errors
    ///
    /// Whatever the factory reports while consuming `args`.
    pub fn invoke(&self, args: &mut Arguments) -> Result<ErasedBox, ConstructError> {
        (self.factory)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Type Descriptor
// =============================================================================

/// One type exported by a bundle: its identity, declared interfaces,
/// constructors, and the capability upcasts it supports.
pub struct TypeDescriptor {
    name: String,
    namespace: String,
    public: bool,
    interfaces: Vec<String>,
    constructors: Vec<ConstructorDescriptor>,
    upcasts: Vec<UpcastEntry>,
}

impl TypeDescriptor {
    /// Short type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaring namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `namespace::name`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.namespace, self.name)
    }

    /// Whether the type is publicly exported.
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Declared interface names, in declaration order.
    #[must_use]
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Returns true if `interface` is among the declared interfaces.
    #[must_use]
    pub fn declares(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    /// Declared constructors, in declaration order.
    #[must_use]
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// The runtime type of an instance of this type.
    #[must_use]
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::named(self.full_name()).implementing(self.interfaces.iter().cloned())
    }

    /// Converts a value constructed from this type into `Box<C>`.
    ///
    /// Returns `None` if the type registered no upcast to `C`, or if `value`
    /// is not actually an instance of this type.
    #[must_use]
    pub fn upcast<C: Capability + ?Sized>(&self, value: ErasedBox) -> Option<Box<C>> {
        let tag = TypeTag::of::<Upcast<C>>();
        let entry = self.upcasts.iter().find(|entry| entry.tag == tag)?;
        let upcast = erased::downcast_ref::<Upcast<C>>(entry.cast.as_ref(), entry.tag)?;
        (upcast.0)(value)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("public", &self.public)
            .field("interfaces", &self.interfaces)
            .field("constructors", &self.constructors)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Bundle Manifest
// =============================================================================

/// Everything a bundle exported, as collected by [`BundleBuilder`].
#[derive(Debug, Default)]
pub struct BundleManifest {
    /// Namespace the bundle declares as its own.
    pub root_namespace: String,
    /// Exported types, in registration order.
    pub types: Vec<TypeDescriptor>,
}

// =============================================================================
// Builders
// =============================================================================

/// Collects a bundle's exported types.
///
/// A bundle's registration function receives one of these:
///
/// ```
/// use kiln_plugins::bundle::BundleBuilder;
/// use kiln_plugins::capability::Component;
/// use kiln_plugins::interfaces::InputDevice;
///
/// #[derive(Default)]
/// struct NullInput;
///
/// impl Component for NullInput {
///     fn component_name(&self) -> &str { "null" }
/// }
///
/// impl InputDevice for NullInput {
///     fn poll(&mut self) {}
///     fn is_down(&self, _key: &str) -> bool { false }
/// }
///
/// let mut bundle = BundleBuilder::new("null_backend");
/// bundle
///     .export::<NullInput>("NullInput")
///     .implements::<dyn InputDevice>(|input| input)
///     .default_constructor();
///
/// let manifest = bundle.finish();
/// assert_eq!(manifest.types[0].full_name(), "null_backend::NullInput");
/// assert_eq!(manifest.types[0].interfaces(), ["InputDevice", "Component"]);
/// ```
#[derive(Debug, Default)]
pub struct BundleBuilder {
    manifest: BundleManifest,
}

impl BundleBuilder {
    /// Starts a bundle with the given root namespace.
    #[must_use]
    pub fn new(root_namespace: impl Into<String>) -> Self {
        Self {
            manifest: BundleManifest {
                root_namespace: root_namespace.into(),
                types: Vec::new(),
            },
        }
    }

    /// Replaces the root namespace. Types exported earlier keep theirs.
    pub fn set_root_namespace(&mut self, root_namespace: impl Into<String>) {
        self.manifest.root_namespace = root_namespace.into();
    }

    /// The current root namespace.
    #[must_use]
    pub fn root_namespace(&self) -> &str {
        &self.manifest.root_namespace
    }

    /// Exports type `T` under `name` in the root namespace.
    pub fn export<T: Any + Send>(&mut self, name: impl Into<String>) -> TypeBuilder<'_, T> {
        let namespace = self.manifest.root_namespace.clone();
        self.manifest.types.push(TypeDescriptor {
            name: name.into(),
            namespace,
            public: true,
            interfaces: Vec::new(),
            constructors: Vec::new(),
            upcasts: Vec::new(),
        });
        let index = self.manifest.types.len() - 1;
        TypeBuilder {
            descriptor: &mut self.manifest.types[index],
            _type: PhantomData,
        }
    }

    /// Finishes registration.
    #[must_use]
    pub fn finish(self) -> BundleManifest {
        self.manifest
    }
}

/// Describes one exported type. Returned by [`BundleBuilder::export`].
pub struct TypeBuilder<'a, T> {
    descriptor: &'a mut TypeDescriptor,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any + Send> TypeBuilder<'_, T> {
    /// Declares that `T` implements capability `C`.
    ///
    /// Adds `C` and the interfaces it derives from to the declared interface
    /// list, and registers `cast` as the upcast used after construction.
    pub fn implements<C: Capability + ?Sized>(mut self, cast: fn(Box<T>) -> Box<C>) -> Self {
        let declaration = C::DECLARATION;
        self.push_interface(declaration.name);
        for parent in declaration.extends {
            self.push_interface(parent);
        }
        let upcast = Upcast::<C>(Box::new(move |value: ErasedBox| {
            value.downcast::<T>().ok().map(cast)
        }));
        let tag = TypeTag::of::<Upcast<C>>();
        self.descriptor.upcasts.retain(|entry| entry.tag != tag);
        self.descriptor.upcasts.push(UpcastEntry {
            tag,
            cast: Box::new(upcast),
        });
        self
    }

    /// Declares an interface by name only, without an upcast.
    pub fn interface(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.push_interface(&name);
        self
    }

    /// Places the type in `namespace` instead of the bundle root.
    pub fn namespace(self, namespace: impl Into<String>) -> Self {
        self.descriptor.namespace = namespace.into();
        self
    }

    /// Marks the type as not publicly exported.
    pub fn internal(self) -> Self {
        self.descriptor.public = false;
        self
    }

    /// Adds a constructor taking `params`.
    pub fn constructor<F>(self, params: Vec<TypeRef>, factory: F) -> Self
    where
        F: Fn(&mut Arguments) -> Result<T, ConstructError> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |args: &mut Arguments| {
            factory(args).map(ErasedBox::new)
        });
        self.descriptor
            .constructors
            .push(ConstructorDescriptor { params, factory });
        self
    }

    /// Adds a zero-argument constructor calling `T::default`.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    fn push_interface(&mut self, name: &str) {
        if !self.descriptor.declares(name) {
            self.descriptor.interfaces.push(name.to_owned());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
